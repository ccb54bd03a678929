use crate::schema::{CollectionConfig, EntityRef, Field, GlobalConfig, IdKind, Localization};
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

///
/// SchemaProvider
///
/// Lookup surface the translator uses to reach field trees.
///

pub trait SchemaProvider: Send + Sync {
    fn collection(&self, slug: &str) -> Option<&CollectionConfig>;

    fn global(&self, slug: &str) -> Option<&GlobalConfig>;

    fn localization(&self) -> Option<&Localization>;

    /// Field tree of a collection or global.
    fn entity_fields(&self, entity: &EntityRef) -> Option<&[Field]> {
        match entity {
            EntityRef::Collection(slug) => self.collection(slug).map(|c| c.fields.as_slice()),
            EntityRef::Global(slug) => self.global(slug).map(|g| g.fields.as_slice()),
        }
    }

    /// Custom identifier type of an entity; globals never declare one.
    fn custom_id_kind(&self, entity: &EntityRef) -> Option<IdKind> {
        match entity {
            EntityRef::Collection(slug) => self
                .collection(slug)
                .and_then(CollectionConfig::custom_id_kind),
            EntityRef::Global(_) => None,
        }
    }

    /// Whether a configured locale code exists.
    fn has_locale(&self, code: &str) -> bool {
        self.localization()
            .is_some_and(|localization| localization.contains(code))
    }
}

///
/// SchemaError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum SchemaError {
    #[error("collection '{0}' already registered")]
    CollectionAlreadyRegistered(String),

    #[error("global '{0}' already registered")]
    GlobalAlreadyRegistered(String),

    #[error("default locale '{0}' is not one of the configured locales")]
    UnknownDefaultLocale(String),
}

///
/// Schema
///
/// In-memory registry of collections and globals.
///

#[derive(Debug, Default)]
pub struct Schema {
    collections: BTreeMap<String, CollectionConfig>,
    globals: BTreeMap<String, GlobalConfig>,
    localization: Option<Localization>,
}

impl Schema {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_collection(&mut self, config: CollectionConfig) -> Result<(), SchemaError> {
        if self.collections.contains_key(&config.slug) {
            return Err(SchemaError::CollectionAlreadyRegistered(config.slug));
        }
        self.collections.insert(config.slug.clone(), config);

        Ok(())
    }

    pub fn register_global(&mut self, config: GlobalConfig) -> Result<(), SchemaError> {
        if self.globals.contains_key(&config.slug) {
            return Err(SchemaError::GlobalAlreadyRegistered(config.slug));
        }
        self.globals.insert(config.slug.clone(), config);

        Ok(())
    }

    pub fn set_localization(&mut self, localization: Localization) -> Result<(), SchemaError> {
        if !localization.contains(&localization.default_locale) {
            return Err(SchemaError::UnknownDefaultLocale(
                localization.default_locale,
            ));
        }
        self.localization = Some(localization);

        Ok(())
    }

    /// Iterate registered collections in slug order.
    pub fn collections(&self) -> impl Iterator<Item = &CollectionConfig> {
        self.collections.values()
    }
}

impl SchemaProvider for Schema {
    fn collection(&self, slug: &str) -> Option<&CollectionConfig> {
        self.collections.get(slug)
    }

    fn global(&self, slug: &str) -> Option<&GlobalConfig> {
        self.globals.get(slug)
    }

    fn localization(&self) -> Option<&Localization> {
        self.localization.as_ref()
    }
}
