use std::slice;

///
/// Field
///
/// One node of a collection or global field tree.
/// Presentational containers (`Row`, `Collapsible`, unnamed tabs) carry an
/// empty name and are transparent to path resolution.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    pub localized: bool,
    pub has_many: bool,
    /// Hidden fields are never queryable without an access override.
    pub hidden: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            localized: false,
            has_many: false,
            hidden: false,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub fn textarea(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Textarea)
    }

    pub fn email(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Email)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Number)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Date)
    }

    pub fn checkbox(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Checkbox)
    }

    pub fn select(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Select)
    }

    pub fn point(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Point)
    }

    pub fn json(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Json)
    }

    pub fn rich_text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::RichText)
    }

    pub fn relationship(name: impl Into<String>, relation_to: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldKind::Relationship(RelationTo::One(relation_to.into())),
        )
    }

    /// Relationship that may point at any of several collections.
    pub fn polymorphic<I, S>(name: impl Into<String>, relation_to: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            FieldKind::Relationship(RelationTo::Many(
                relation_to.into_iter().map(Into::into).collect(),
            )),
        )
    }

    pub fn upload(name: impl Into<String>, relation_to: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Upload(RelationTo::One(relation_to.into())))
    }

    pub fn group(name: impl Into<String>, fields: Vec<Self>) -> Self {
        Self::new(name, FieldKind::Group(fields))
    }

    pub fn array(name: impl Into<String>, fields: Vec<Self>) -> Self {
        Self::new(name, FieldKind::Array(fields))
    }

    pub fn blocks(name: impl Into<String>, blocks: Vec<Block>) -> Self {
        Self::new(name, FieldKind::Blocks(blocks))
    }

    #[must_use]
    pub fn row(fields: Vec<Self>) -> Self {
        Self::new(String::new(), FieldKind::Row(fields))
    }

    #[must_use]
    pub fn collapsible(fields: Vec<Self>) -> Self {
        Self::new(String::new(), FieldKind::Collapsible(fields))
    }

    #[must_use]
    pub fn tabs(tabs: Vec<Tab>) -> Self {
        Self::new(String::new(), FieldKind::Tabs(tabs))
    }

    #[must_use]
    pub const fn localize(mut self) -> Self {
        self.localized = true;
        self
    }

    #[must_use]
    pub const fn many(mut self) -> Self {
        self.has_many = true;
        self
    }

    #[must_use]
    pub const fn hide(mut self) -> Self {
        self.hidden = true;
        self
    }
}

///
/// FieldKind
///
/// Closed set of field kinds. Resolver and sanitizer match on this
/// exhaustively, so a new kind is a compile-time change everywhere.
///

#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    // Scalars
    Text,
    Textarea,
    Email,
    Code,
    Number,
    Date,
    Checkbox,
    Select,
    Point,

    // Opaque terminals; trailing path segments pass through verbatim
    Json,
    RichText,

    // Relations
    Relationship(RelationTo),
    Upload(RelationTo),

    // Containers
    Group(Vec<Field>),
    Array(Vec<Field>),
    Blocks(Vec<Block>),
    Tabs(Vec<Tab>),
    Row(Vec<Field>),
    Collapsible(Vec<Field>),
}

impl FieldKind {
    /// Flat type tag used by resolved field descriptors.
    #[must_use]
    pub const fn field_type(&self) -> FieldType {
        match self {
            Self::Text | Self::Textarea | Self::Email | Self::Code => FieldType::Text,
            Self::Number => FieldType::Number,
            Self::Date => FieldType::Date,
            Self::Checkbox => FieldType::Checkbox,
            Self::Select => FieldType::Select,
            Self::Point => FieldType::Point,
            Self::Json => FieldType::Json,
            Self::RichText => FieldType::RichText,
            Self::Relationship(_) => FieldType::Relationship,
            Self::Upload(_) => FieldType::Upload,
            Self::Group(_) => FieldType::Group,
            Self::Array(_) => FieldType::Array,
            Self::Blocks(_) => FieldType::Blocks,
            Self::Tabs(_) => FieldType::Tabs,
            Self::Row(_) => FieldType::Row,
            Self::Collapsible(_) => FieldType::Collapsible,
        }
    }

    #[must_use]
    pub const fn relation_to(&self) -> Option<&RelationTo> {
        match self {
            Self::Relationship(relation_to) | Self::Upload(relation_to) => Some(relation_to),
            _ => None,
        }
    }
}

///
/// FieldType
///
/// Type tag carried by a resolved field. `Id` marks the storage-level
/// primary identifier reached through the reserved `id` alias.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FieldType {
    Text,
    Number,
    Date,
    Checkbox,
    Select,
    Point,
    Json,
    RichText,
    Relationship,
    Upload,
    Group,
    Array,
    Blocks,
    Tabs,
    Row,
    Collapsible,
    Id,
}

impl FieldType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Date => "date",
            Self::Checkbox => "checkbox",
            Self::Select => "select",
            Self::Point => "point",
            Self::Json => "json",
            Self::RichText => "richText",
            Self::Relationship => "relationship",
            Self::Upload => "upload",
            Self::Group => "group",
            Self::Array => "array",
            Self::Blocks => "blocks",
            Self::Tabs => "tabs",
            Self::Row => "row",
            Self::Collapsible => "collapsible",
            Self::Id => "id",
        }
    }

    #[must_use]
    pub const fn is_relation(self) -> bool {
        matches!(self, Self::Relationship | Self::Upload)
    }
}

///
/// RelationTo
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RelationTo {
    One(String),
    /// Polymorphic: stored as `{ relationTo, value }`.
    Many(Vec<String>),
}

impl RelationTo {
    #[must_use]
    pub const fn is_polymorphic(&self) -> bool {
        matches!(self, Self::Many(_))
    }

    #[must_use]
    pub fn slugs(&self) -> &[String] {
        match self {
            Self::One(slug) => slice::from_ref(slug),
            Self::Many(slugs) => slugs,
        }
    }
}

///
/// Block
///

#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub slug: String,
    pub fields: Vec<Field>,
}

impl Block {
    pub fn new(slug: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            slug: slug.into(),
            fields,
        }
    }
}

///
/// Tab
///
/// A named tab nests its fields like a group; an unnamed tab is
/// presentational only.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Tab {
    pub name: Option<String>,
    pub fields: Vec<Field>,
}

impl Tab {
    pub fn named(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: Some(name.into()),
            fields,
        }
    }

    #[must_use]
    pub const fn unnamed(fields: Vec<Field>) -> Self {
        Self { name: None, fields }
    }
}
