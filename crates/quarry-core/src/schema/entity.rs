use crate::schema::{Field, FieldKind};
use std::fmt;

///
/// IdKind
///
/// Storage representation of a collection's primary identifier.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum IdKind {
    /// Backend-generated object identifier.
    ObjectId,
    Number,
    Text,
}

///
/// CollectionConfig
///

#[derive(Clone, Debug, PartialEq)]
pub struct CollectionConfig {
    pub slug: String,
    pub fields: Vec<Field>,
    /// Auth collections carry credential fields (`salt`, `hash`) that are
    /// never queryable without an access override.
    pub auth: bool,
}

impl CollectionConfig {
    pub fn new(slug: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            slug: slug.into(),
            fields,
            auth: false,
        }
    }

    #[must_use]
    pub const fn with_auth(mut self) -> Self {
        self.auth = true;
        self
    }

    /// Custom identifier type, declared as a top-level field named `id`.
    ///
    /// The declared type is authoritative; `id`/`_id` in a path stay a pure
    /// alias for the primary key and never resolve to a second field.
    #[must_use]
    pub fn custom_id_kind(&self) -> Option<IdKind> {
        let field = self.fields.iter().find(|field| field.name == "id")?;

        match field.kind {
            FieldKind::Number => Some(IdKind::Number),
            FieldKind::Text | FieldKind::Textarea | FieldKind::Email | FieldKind::Code => {
                Some(IdKind::Text)
            }
            _ => None,
        }
    }
}

///
/// GlobalConfig
///

#[derive(Clone, Debug, PartialEq)]
pub struct GlobalConfig {
    pub slug: String,
    pub fields: Vec<Field>,
}

impl GlobalConfig {
    pub fn new(slug: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            slug: slug.into(),
            fields,
        }
    }
}

///
/// EntityRef
///
/// Names the collection or global a filter (or one resolution unit) is
/// written against.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum EntityRef {
    Collection(String),
    Global(String),
}

impl EntityRef {
    pub fn collection(slug: impl Into<String>) -> Self {
        Self::Collection(slug.into())
    }

    pub fn global(slug: impl Into<String>) -> Self {
        Self::Global(slug.into())
    }

    #[must_use]
    pub fn slug(&self) -> &str {
        match self {
            Self::Collection(slug) | Self::Global(slug) => slug,
        }
    }

    #[must_use]
    pub const fn is_global(&self) -> bool {
        matches!(self, Self::Global(_))
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collection(slug) => write!(f, "collection:{slug}"),
            Self::Global(slug) => write!(f, "global:{slug}"),
        }
    }
}
