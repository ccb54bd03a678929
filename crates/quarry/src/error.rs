use derive_more::Display;
use quarry_core::error::{PathErrorKind, StorageError, TranslateError};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable class + origin taxonomy.
///

#[derive(Debug, Deserialize, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }

    /// Whether the client can fix the request (a 4xx-class failure).
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self.kind, ErrorKind::Query(_))
    }
}

impl From<TranslateError> for Error {
    fn from(err: TranslateError) -> Self {
        match err {
            TranslateError::InvalidQuery(ref errors) => {
                let kind = if errors.has_kind(PathErrorKind::AccessDenied) {
                    QueryErrorKind::Forbidden
                } else {
                    QueryErrorKind::Invalid
                };
                Self::new(ErrorKind::Query(kind), ErrorOrigin::Query, err.to_string())
            }

            TranslateError::UnknownEntity(_) => Self::new(
                ErrorKind::Query(QueryErrorKind::Invalid),
                ErrorOrigin::Schema,
                err.to_string(),
            ),

            TranslateError::Storage(store) => store.into(),

            TranslateError::InvalidConfig(_) => {
                Self::new(ErrorKind::Internal, ErrorOrigin::Config, err.to_string())
            }
        }
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        let kind = match err {
            StorageError::Unavailable { .. } => StoreErrorKind::Unavailable,
            StorageError::Timeout { .. } => StoreErrorKind::Timeout,
            StorageError::UnknownCollection(_) => StoreErrorKind::NotFound,
            StorageError::Backend(_) => StoreErrorKind::Backend,
        };

        Self::new(ErrorKind::Store(kind), ErrorOrigin::Store, err.to_string())
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers and API layers.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    Query(QueryErrorKind),
    Store(StoreErrorKind),

    /// The caller cannot remediate this.
    Internal,
}

///
/// QueryErrorKind
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum QueryErrorKind {
    /// Filter references paths that do not resolve, or carries bad operands.
    Invalid,

    /// Filter references fields or collections the requester cannot read.
    Forbidden,
}

///
/// StoreErrorKind
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum StoreErrorKind {
    NotFound,
    Unavailable,
    Timeout,
    Backend,
}

///
/// ErrorOrigin
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    Config,
    Query,
    Schema,
    Store,
}

///
/// TESTS
///
