//! Core runtime for Quarry: schema model, access policy, path resolution,
//! value sanitizing, and translation of nested `Where` filters into native
//! document-store and relational constraints.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod access;
pub mod backend;
pub mod config;
pub mod error;
pub mod obs;
pub mod query;
pub mod schema;
pub mod store;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

///
/// CONSTANTS
///

/// Default result window for one relationship-hop sub-query.
///
/// Hops that match more related documents than this under-match; the cap is
/// never silently raised.
pub const DEFAULT_HOP_LIMIT: usize = 50;

/// Default maximum number of relationship hops one path may cross.
pub const DEFAULT_MAX_HOPS: usize = 8;

///
/// Prelude
///
/// Prelude contains only domain vocabulary and the translation entry point.
///

pub mod prelude {
    pub use crate::{
        access::{AccessEvaluator, AccessResult, EntityPolicy, RequestContext},
        backend::{Backend, DocumentBackend, RelationalBackend},
        config::{Strictness, TranslateConfig},
        query::{Operator, ParsedQuery, QueryRequest, Translator, Where},
        schema::{CollectionConfig, EntityRef, Field, FieldKind, GlobalConfig, Schema},
        store::{DocumentId, Storage},
    };
}
