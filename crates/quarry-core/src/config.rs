use crate::{DEFAULT_HOP_LIMIT, DEFAULT_MAX_HOPS, error::TranslateError};
use serde::Deserialize;

///
/// Strictness
///
/// How the value sanitizer treats operands that cannot be coerced to the
/// field's storage type.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Strictness {
    /// Invalid operands become a constraint that matches nothing.
    #[default]
    Lenient,
    /// Invalid operands are recorded as `InvalidValue` path errors.
    Strict,
}

///
/// TranslateConfig
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TranslateConfig {
    /// Result window for each relationship-hop sub-query.
    pub hop_limit: usize,

    /// Maximum relationship hops one path may cross.
    pub max_hops: usize,

    pub strictness: Strictness,

    /// Forgive unknown-field errors in the strict entry point.
    /// Access errors still fail the request.
    pub tolerate_unknown_paths: bool,
}

impl TranslateConfig {
    /// Parse a config document, filling omitted keys with defaults.
    pub fn from_json(input: &str) -> Result<Self, TranslateError> {
        let config: Self = serde_json::from_str(input)
            .map_err(|err| TranslateError::InvalidConfig(err.to_string()))?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), TranslateError> {
        if self.hop_limit == 0 {
            return Err(TranslateError::InvalidConfig(
                "hop_limit must be at least 1".to_string(),
            ));
        }
        if self.max_hops == 0 {
            return Err(TranslateError::InvalidConfig(
                "max_hops must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    #[must_use]
    pub const fn with_hop_limit(mut self, hop_limit: usize) -> Self {
        self.hop_limit = hop_limit;
        self
    }

    #[must_use]
    pub const fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    #[must_use]
    pub const fn with_strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    #[must_use]
    pub const fn tolerating_unknown_paths(mut self) -> Self {
        self.tolerate_unknown_paths = true;
        self
    }
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            hop_limit: DEFAULT_HOP_LIMIT,
            max_hops: DEFAULT_MAX_HOPS,
            strictness: Strictness::Lenient,
            tolerate_unknown_paths: false,
        }
    }
}
