//! Module: backend
//! Responsibility: native constraint emission for each storage flavor.
//! Does not own: path resolution, value coercion, sub-query execution.
//! Boundary: the translator hands backends resolved storage paths and
//! coerced operands; backends only shape them into native filters.

mod document;
mod relational;
mod value;

pub use document::DocumentBackend;
pub use relational::{Column, RelationalBackend, SqlPredicate};
pub use value::{GeoQuery, NativeValue};

use crate::{query::OperatorMap, query::StoragePath, schema::IdKind, store::DocumentId};
use std::fmt::Debug;

///
/// Backend
///
/// Pluggable native emission. Every constructor is total: structural forms a
/// backend cannot express are reported by returning `None` from the
/// optional constructors, never by panicking.
///

pub trait Backend: Send + Sync {
    type Filter: Clone + Debug + PartialEq + Send + Sync;

    /// Short backend name for diagnostics.
    fn name(&self) -> &'static str;

    fn operators(&self) -> &OperatorMap;

    /// Identifier representation of collections without a custom id field.
    fn default_id_kind(&self) -> IdKind;

    /// `path <token> value` for a token taken from `operators()`.
    fn compare(&self, path: &StoragePath, token: &'static str, value: NativeValue) -> Self::Filter;

    /// Field present and non-null (`present`), or absent / null.
    fn exists(&self, path: &StoragePath, present: bool) -> Self::Filter;

    /// Case-insensitive substring match of every token, in any order.
    fn contains_all(&self, path: &StoragePath, tokens: &[String]) -> Self::Filter;

    /// Case-insensitive negated substring match of the whole fragment.
    fn not_contains(&self, path: &StoragePath, fragment: &str) -> Self::Filter;

    fn geo(&self, path: &StoragePath, query: &GeoQuery) -> Option<Self::Filter>;

    /// Conjunction; empty members are dropped and a single member is
    /// returned unchanged.
    fn and(&self, filters: Vec<Self::Filter>) -> Self::Filter;

    /// Disjunction with the same elision rules as `and`.
    fn or(&self, filters: Vec<Self::Filter>) -> Self::Filter;

    /// Constraint that matches every document.
    fn empty(&self) -> Self::Filter;

    /// Constraint that matches no document.
    fn never(&self) -> Self::Filter;

    fn is_empty(&self, filter: &Self::Filter) -> bool;

    /// Stable serialization used to memoize identical sub-queries.
    fn cache_key(&self, filter: &Self::Filter) -> String;

    /// Identifier operand encodings this backend can compare against a key
    /// of one of `kinds`. Document stores may hold any of them.
    fn id_candidates(&self, _kinds: &[IdKind], candidates: Vec<NativeValue>) -> Vec<NativeValue> {
        candidates
    }

    /// Values an identifier returned by a sub-query may be stored as.
    fn id_values(&self, id: &DocumentId) -> Vec<NativeValue> {
        match id {
            DocumentId::Object(ulid) => vec![
                NativeValue::ObjectId(*ulid),
                NativeValue::Text(ulid.to_string()),
            ],
            DocumentId::Number(n) => vec![NativeValue::Int(*n), NativeValue::Text(n.to_string())],
            DocumentId::Text(text) => vec![NativeValue::Text(text.clone())],
        }
    }
}
