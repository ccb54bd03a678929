//! Module: store
//! Responsibility: the storage-handle boundary used for relationship-hop
//! sub-queries, plus an in-memory document store.
//! Does not own: connections, pooling, or executing the caller's final filter.
//! Boundary: translation only ever asks for bounded identifier lists.

mod memory;

pub use memory::MemoryStore;

use crate::{backend::Backend, error::StorageError};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use ulid::Ulid;

///
/// DocumentId
///
/// Identifier of a stored document as returned by a sub-query.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum DocumentId {
    Text(String),
    Number(i64),
    Object(Ulid),
}

impl DocumentId {
    /// Decode a stored identifier value (`{"$oid": ..}`, integer or string).
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => Some(Self::Text(text.clone())),
            Value::Number(n) => n.as_i64().map(Self::Number),
            Value::Object(map) => map
                .get("$oid")
                .and_then(Value::as_str)
                .and_then(|s| Ulid::from_string(s).ok())
                .map(Self::Object),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Number(n) => write!(f, "{n}"),
            Self::Object(ulid) => write!(f, "{ulid}"),
        }
    }
}

///
/// FindOptions
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FindOptions {
    /// Maximum identifiers returned. Matches beyond the window are dropped.
    pub limit: usize,
}

impl FindOptions {
    #[must_use]
    pub const fn limit(limit: usize) -> Self {
        Self { limit }
    }
}

///
/// Storage
///
/// Per-collection bounded reads. Implementations own timeouts and retries;
/// a returned error aborts the whole translation.
///

#[async_trait]
pub trait Storage<B: Backend>: Send + Sync {
    /// Identifiers of documents in `collection` matching `filter`, in storage
    /// order, at most `options.limit` of them.
    async fn find(
        &self,
        collection: &str,
        filter: &B::Filter,
        options: FindOptions,
    ) -> Result<Vec<DocumentId>, StorageError>;
}
