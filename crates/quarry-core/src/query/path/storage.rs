use std::fmt;

///
/// PathPart
///
/// One component of a storage path. Backends render parts differently:
/// the document store joins everything with dots, the relational backend
/// turns arrays into child tables and locales into a locale table.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum PathPart {
    /// Named field or group member.
    Field(String),
    /// Array field; its rows are addressed by the parts that follow.
    Array(String),
    /// Locale qualifier of a localized field.
    Locale(String),
    /// Verbatim sub-path inside an opaque JSON-like value.
    Json(String),
    /// Storage-level primary identifier.
    Id,
}

///
/// StoragePath
///
/// Native location of a field within the table (or collection) that owns
/// it. Produced by the path resolver, consumed by backends.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct StoragePath {
    table: String,
    parts: Vec<PathPart>,
}

impl StoragePath {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            parts: Vec::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, part: PathPart) -> Self {
        self.parts.push(part);
        self
    }

    pub fn push(&mut self, part: PathPart) {
        self.parts.push(part);
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub fn parts(&self) -> &[PathPart] {
        &self.parts
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Locale qualifier, if the path addresses a localized value.
    #[must_use]
    pub fn locale(&self) -> Option<&str> {
        self.parts.iter().find_map(|part| match part {
            PathPart::Locale(code) => Some(code.as_str()),
            _ => None,
        })
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match part {
                PathPart::Field(s) | PathPart::Array(s) | PathPart::Locale(s) | PathPart::Json(s) => {
                    f.write_str(s)?;
                }
                PathPart::Id => f.write_str("id")?,
            }
        }

        Ok(())
    }
}
