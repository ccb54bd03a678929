//! Module: query::operator
//! Responsibility: the fixed logical operator set and per-backend token tables.
//! Does not own: structural operators (`like`, `contains`, geo) which the
//! search param builder emits directly.
//! Boundary: operator names outside the set are skipped, never escalated.

use std::{fmt, str::FromStr};
use thiserror::Error as ThisError;

///
/// Operator
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Operator {
    Equals,
    NotEquals,
    In,
    NotIn,
    All,
    Exists,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
    Like,
    NotLike,
    Contains,
    Near,
    Within,
    Intersects,
}

impl Operator {
    pub const ALL: [Self; 16] = [
        Self::Equals,
        Self::NotEquals,
        Self::In,
        Self::NotIn,
        Self::All,
        Self::Exists,
        Self::GreaterThan,
        Self::GreaterThanEqual,
        Self::LessThan,
        Self::LessThanEqual,
        Self::Like,
        Self::NotLike,
        Self::Contains,
        Self::Near,
        Self::Within,
        Self::Intersects,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::All => "all",
            Self::Exists => "exists",
            Self::GreaterThan => "greater_than",
            Self::GreaterThanEqual => "greater_than_equal",
            Self::LessThan => "less_than",
            Self::LessThanEqual => "less_than_equal",
            Self::Like => "like",
            Self::NotLike => "not_like",
            Self::Contains => "contains",
            Self::Near => "near",
            Self::Within => "within",
            Self::Intersects => "intersects",
        }
    }

    /// Operators whose operand is a list (array or comma-delimited string).
    #[must_use]
    pub const fn takes_list(self) -> bool {
        matches!(self, Self::In | Self::NotIn | Self::All)
    }

    #[must_use]
    pub const fn is_geo(self) -> bool {
        matches!(self, Self::Near | Self::Within | Self::Intersects)
    }

    /// Substring-search operators.
    #[must_use]
    pub const fn is_text_search(self) -> bool {
        matches!(self, Self::Like | Self::NotLike | Self::Contains)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

///
/// UnknownOperator
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("unknown operator '{0}'")]
pub struct UnknownOperator(pub String);

impl FromStr for Operator {
    type Err = UnknownOperator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| UnknownOperator(s.to_string()))
    }
}

///
/// OperatorMap
///
/// Static lookup from logical operator to a backend's native token.
/// Operators absent from the table have no single-token form.
///

#[derive(Clone, Copy, Debug)]
pub struct OperatorMap {
    entries: &'static [(Operator, &'static str)],
}

impl OperatorMap {
    #[must_use]
    pub const fn new(entries: &'static [(Operator, &'static str)]) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn token(&self, operator: Operator) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(op, _)| *op == operator)
            .map(|(_, token)| *token)
    }
}
