use crate::{
    backend::Backend,
    error::StorageError,
    obs::{MetricsEvent, MetricsSink},
    schema::{
        Block, CollectionConfig, Field, GlobalConfig, Localization, Schema, Tab,
    },
    store::{DocumentId, FindOptions, Storage},
};
use async_trait::async_trait;
use std::{collections::BTreeMap, sync::Mutex};

/// Blog-shaped schema exercising every field kind.
pub(crate) fn blog_schema() -> Schema {
    let mut schema = Schema::new();

    schema
        .register_collection(CollectionConfig::new(
            "posts",
            vec![
                Field::text("title"),
                Field::text("body").localize(),
                Field::number("views"),
                Field::checkbox("published"),
                Field::date("published_at"),
                Field::relationship("author", "users"),
                Field::text("tags").many(),
                Field::group(
                    "meta",
                    vec![
                        Field::text("keywords"),
                        Field::group("seo", vec![Field::number("score")]),
                    ],
                ),
                Field::blocks(
                    "layout",
                    vec![Block::new("hero", vec![Field::text("heading")])],
                ),
                Field::json("data"),
                Field::point("location"),
                Field::polymorphic("related", ["users", "counters"]),
                Field::tabs(vec![
                    Tab::unnamed(vec![Field::text("summary")]),
                    Tab::named("stats", vec![Field::number("likes")]),
                ]),
                Field::row(vec![Field::text("slug")]),
                Field::array("items", vec![Field::text("label").localize()]),
                Field::collapsible(vec![Field::select("status")]),
            ],
        ))
        .unwrap();

    schema
        .register_collection(
            CollectionConfig::new(
                "users",
                vec![
                    Field::email("email"),
                    Field::text("name"),
                    Field::select("role"),
                    Field::relationship("org", "orgs"),
                    Field::text("secret").hide(),
                ],
            )
            .with_auth(),
        )
        .unwrap();

    schema
        .register_collection(CollectionConfig::new(
            "orgs",
            vec![Field::text("name"), Field::relationship("owner", "users")],
        ))
        .unwrap();

    schema
        .register_collection(CollectionConfig::new(
            "counters",
            vec![Field::number("id"), Field::text("label")],
        ))
        .unwrap();

    schema
        .register_collection(CollectionConfig::new(
            "codes",
            vec![Field::text("id"), Field::text("label")],
        ))
        .unwrap();

    schema
        .register_global(GlobalConfig::new("settings", vec![Field::text("site_name")]))
        .unwrap();

    schema
        .set_localization(Localization::new(["en", "de"], "en"))
        .unwrap();

    schema
}

///
/// ScriptedStore
///
/// Storage double returning fixed identifiers per collection and recording
/// every find it serves.
///

#[derive(Debug, Default)]
pub(crate) struct ScriptedStore {
    responses: BTreeMap<String, Vec<DocumentId>>,
    failure: Option<StorageError>,
    calls: Mutex<Vec<(String, String, usize)>>,
}

impl ScriptedStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(mut self, collection: &str, ids: Vec<DocumentId>) -> Self {
        self.responses.insert(collection.to_string(), ids);
        self
    }

    pub(crate) fn failing(mut self, error: StorageError) -> Self {
        self.failure = Some(error);
        self
    }

    /// `(collection, filter debug, limit)` per find, in call order.
    pub(crate) fn calls(&self) -> Vec<(String, String, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl<B: Backend> Storage<B> for ScriptedStore {
    async fn find(
        &self,
        collection: &str,
        filter: &B::Filter,
        options: FindOptions,
    ) -> Result<Vec<DocumentId>, StorageError> {
        self.calls.lock().unwrap().push((
            collection.to_string(),
            format!("{filter:?}"),
            options.limit,
        ));
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        Ok(self.responses.get(collection).cloned().unwrap_or_default())
    }
}

///
/// RecordingSink
///

#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    events: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub(crate) fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, prefix: &str) -> usize {
        self.events()
            .iter()
            .filter(|event| event.starts_with(prefix))
            .count()
    }
}

impl MetricsSink for RecordingSink {
    fn record(&self, event: MetricsEvent<'_>) {
        self.events.lock().unwrap().push(format!("{event:?}"));
    }
}
