//! ## Crate layout
//! - `core`: schema model, access policies, the `Where` input model, path
//!   resolution, native backends, storage handles, and observability.
//! - `error`: the public error type with a stable kind + origin taxonomy.
//!
//! The `prelude` module carries what a caller needs to describe a schema,
//! wire a translator, and turn a client filter into a native one.

pub use quarry_core as core;

pub mod error;

pub use error::{Error, ErrorKind, ErrorOrigin, QueryErrorKind, StoreErrorKind};

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
///

pub mod prelude {
    pub use crate::core::{
        access::{AccessEvaluator, AccessResult, AllowAll, EntityPolicy, RequestContext, StaticPolicies},
        backend::{Backend, DocumentBackend, RelationalBackend, SqlPredicate},
        config::{Strictness, TranslateConfig},
        error::{PathError, PathErrorKind, PathErrors},
        query::{Operator, ParsedQuery, QueryRequest, Translator, Where},
        schema::{
            Block, CollectionConfig, EntityRef, Field, FieldKind, GlobalConfig, Localization,
            RelationTo, Schema, SchemaProvider, Tab,
        },
        store::{DocumentId, FindOptions, MemoryStore, Storage},
    };
    pub use crate::{Error, ErrorKind};
    pub use serde_json::json;
}
