//! Module: schema
//! Responsibility: the logical field tree of collections and globals, plus
//! localization settings, as consumed by path resolution.
//! Does not own: schema sanitization or default filling (callers hand in a
//! finished tree).
//! Boundary: `SchemaProvider` is the only lookup the translator uses.

mod entity;
mod field;
mod locale;
mod registry;

pub use entity::{CollectionConfig, EntityRef, GlobalConfig, IdKind};
pub use field::{Block, Field, FieldKind, FieldType, RelationTo, Tab};
pub use locale::{LocaleContext, Localization};
pub use registry::{Schema, SchemaError, SchemaProvider};
