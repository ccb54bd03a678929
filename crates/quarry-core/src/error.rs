//! Module: error
//! Responsibility: path-level error records and hard translation failures.
//! Does not own: client-facing error shaping (the facade crate maps these).
//! Boundary: resolver/builder record `PathError`s; storage and config
//! failures abort translation as `TranslateError`.

use derive_more::{Deref, IntoIterator};
use std::fmt;
use thiserror::Error as ThisError;

///
/// PathErrorKind
///
/// Why a filter path could not contribute a constraint.
/// Every kind fails the request; the distinction exists for observability.
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum PathErrorKind {
    UnknownField,
    AccessDenied,
    PolymorphicTraversal,
    InvalidValue,
}

impl PathErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnknownField => "unknown_field",
            Self::AccessDenied => "access_denied",
            Self::PolymorphicTraversal => "polymorphic_traversal",
            Self::InvalidValue => "invalid_value",
        }
    }
}

impl fmt::Display for PathErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

///
/// PathError
///

#[derive(Clone, Debug, Eq, Hash, PartialEq, ThisError)]
#[error("{kind}: '{path}'")]
pub struct PathError {
    pub path: String,
    pub kind: PathErrorKind,
}

impl PathError {
    pub fn new(path: impl Into<String>, kind: PathErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

///
/// PathErrors
///
/// Ordered error list collected over one translation pass.
/// Identical entries are recorded once, so a path referenced from several
/// branches reports a single error.
///

#[derive(Clone, Debug, Default, Deref, Eq, IntoIterator, PartialEq)]
pub struct PathErrors(#[into_iterator(owned, ref)] Vec<PathError>);

impl PathErrors {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Record one error; exact duplicates are ignored.
    pub fn push(&mut self, error: PathError) {
        if !self.0.contains(&error) {
            self.0.push(error);
        }
    }

    pub fn record(&mut self, path: impl Into<String>, kind: PathErrorKind) {
        self.push(PathError::new(path, kind));
    }

    /// Whether the list must fail the request.
    ///
    /// With `tolerate_unknown`, only unknown-field errors are forgiven.
    #[must_use]
    pub fn is_fatal(&self, tolerate_unknown: bool) -> bool {
        self.0
            .iter()
            .any(|err| !(tolerate_unknown && err.kind == PathErrorKind::UnknownField))
    }

    #[must_use]
    pub fn has_kind(&self, kind: PathErrorKind) -> bool {
        self.0.iter().any(|err| err.kind == kind)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|err| err.path.as_str())
    }
}

impl fmt::Display for PathErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{err}")?;
        }

        Ok(())
    }
}

///
/// StorageError
///
/// Failure reported by a storage handle while running a bounded sub-query.
/// Not retried by the translator.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum StorageError {
    #[error("storage unavailable for collection '{collection}'")]
    Unavailable { collection: String },

    #[error("storage timed out for collection '{collection}'")]
    Timeout { collection: String },

    #[error("collection '{0}' has no storage handle")]
    UnknownCollection(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

///
/// ErrorClass
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    /// The client sent a filter that cannot be honored.
    Invalid,
    /// The caller wired the translator inconsistently.
    Misconfigured,
    /// A collaborator failed at runtime.
    Unavailable,
}

///
/// TranslateError
///
/// Hard failures that abort a translation. No partial filter is returned
/// alongside any of these.
///

#[derive(Debug, ThisError)]
pub enum TranslateError {
    #[error("invalid query: {0}")]
    InvalidQuery(PathErrors),

    #[error("unknown entity '{0}'")]
    UnknownEntity(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("invalid translator config: {0}")]
    InvalidConfig(String),
}

impl TranslateError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidQuery(_) => ErrorClass::Invalid,
            Self::UnknownEntity(_) | Self::InvalidConfig(_) => ErrorClass::Misconfigured,
            Self::Storage(_) => ErrorClass::Unavailable,
        }
    }
}
