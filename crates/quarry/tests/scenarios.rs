use async_trait::async_trait;
use proptest::prelude::*;
use quarry::{
    QueryErrorKind, StoreErrorKind,
    core::error::StorageError,
    prelude::*,
};
use serde_json::Value;
use std::time::Duration;
use ulid::Ulid;

///
/// Fixtures
///

fn schema() -> Schema {
    let mut schema = Schema::new();

    schema
        .register_collection(CollectionConfig::new(
            "posts",
            vec![
                Field::text("title"),
                Field::text("body").localize(),
                Field::relationship("author", "users"),
                Field::relationship("counter", "counters"),
                Field::text("tags").many(),
            ],
        ))
        .unwrap();
    schema
        .register_collection(CollectionConfig::new(
            "users",
            vec![Field::email("email"), Field::text("name")],
        ))
        .unwrap();
    schema
        .register_collection(CollectionConfig::new(
            "counters",
            vec![Field::number("id"), Field::text("label")],
        ))
        .unwrap();
    schema
        .set_localization(Localization::new(["en", "de"], "en"))
        .unwrap();

    schema
}

fn blog_store() -> MemoryStore {
    MemoryStore::new()
        .with_collection(
            "users",
            [
                json!({ "_id": "u1", "email": "a@x.com", "name": "Ann" }),
                json!({ "_id": "u2", "email": "b@x.com", "name": "Bob" }),
            ],
        )
        .with_collection(
            "posts",
            [
                json!({ "_id": "p1", "title": "Launch day", "body": {}, "author": "u2" }),
                json!({ "_id": "p2", "title": "Pre-launch notes", "body": { "en": "hello" }, "author": "u2" }),
                json!({ "_id": "p3", "title": "The LAUNCH", "body": { "de": "hallo" }, "author": "u1" }),
                json!({ "_id": "p4", "title": "Other", "body": { "en": "x" }, "author": "u1" }),
            ],
        )
}

fn request(filter: Value) -> QueryRequest {
    QueryRequest::new(EntityRef::collection("posts"), Where::from_value(filter).unwrap())
        .with_locale("en")
}

// Ids of `collection` documents matching a translated filter.
fn matching(store: &MemoryStore, collection: &str, filter: &Value) -> Vec<String> {
    store
        .matching(collection, filter)
        .unwrap()
        .iter()
        .map(|doc| match &doc["_id"] {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect()
}

///
/// Scenarios
///

#[tokio::test]
async fn end_to_end_filter_selects_the_expected_posts() {
    let schema = schema();
    let store = blog_store();
    let translator = Translator::new(&DocumentBackend, &schema, &store);

    let filter = translator
        .translate(&request(json!({ "and": [
            { "title": { "contains": "launch" } },
            { "or": [
                { "author.email": { "equals": "a@x.com" } },
                { "body": { "exists": true } },
            ] },
        ] })))
        .await
        .unwrap();

    assert_eq!(matching(&store, "posts", &filter), vec!["p2", "p3"]);
    assert_eq!(store.find_calls(), 1);
}

#[tokio::test]
async fn like_matches_tokens_in_any_order() {
    let schema = schema();
    let store = MemoryStore::new().with_collection(
        "posts",
        [
            json!({ "_id": "both", "title": "a car that is Red" }),
            json!({ "_id": "one", "title": "a red bicycle" }),
        ],
    );

    let filter = Translator::new(&DocumentBackend, &schema, &store)
        .translate(&request(json!({ "title": { "like": "red car" } })))
        .await
        .unwrap();

    assert_eq!(matching(&store, "posts", &filter), vec!["both"]);
}

#[tokio::test]
async fn numeric_custom_ids_match_numeric_and_string_storage() {
    let schema = schema();
    let store = MemoryStore::new()
        .with_collection("counters", [json!({ "_id": 42, "label": "answer" })])
        .with_collection(
            "posts",
            [
                json!({ "_id": "numeric", "counter": 42 }),
                json!({ "_id": "string", "counter": "42" }),
                json!({ "_id": "other", "counter": 7 }),
            ],
        );
    let translator = Translator::new(&DocumentBackend, &schema, &store);

    let direct = translator
        .translate(&request(json!({ "counter": { "equals": "42" } })))
        .await
        .unwrap();
    assert_eq!(matching(&store, "posts", &direct), vec!["numeric", "string"]);

    let hop = translator
        .translate(&request(json!({ "counter.label": { "equals": "answer" } })))
        .await
        .unwrap();
    assert_eq!(matching(&store, "posts", &hop), vec!["numeric", "string"]);
}

#[tokio::test]
async fn object_ids_match_either_encoding() {
    let schema = schema();
    let id = Ulid::new().to_string();
    let store = MemoryStore::new().with_collection(
        "posts",
        [
            json!({ "_id": "native", "author": { "$oid": id } }),
            json!({ "_id": "text", "author": id }),
            json!({ "_id": "other", "author": "someone" }),
        ],
    );

    let filter = Translator::new(&DocumentBackend, &schema, &store)
        .translate(&request(json!({ "author": { "equals": id } })))
        .await
        .unwrap();

    assert_eq!(matching(&store, "posts", &filter), vec!["native", "text"]);
}

#[tokio::test]
async fn hop_limit_under_matches_instead_of_failing() {
    let schema = schema();
    let users = (0..1000).map(|i| json!({ "_id": i, "name": "bulk" }));
    let posts = (0..1000).map(|i| json!({ "_id": i, "author": i }));
    let store = MemoryStore::new()
        .with_collection("users", users)
        .with_collection("posts", posts);
    let req = request(json!({ "author.name": { "equals": "bulk" } }));

    let capped = Translator::new(&DocumentBackend, &schema, &store)
        .translate(&req)
        .await
        .unwrap();
    assert_eq!(capped["author"]["$in"].as_array().unwrap().len(), 100);
    assert_eq!(matching(&store, "posts", &capped).len(), 50);

    let widened = Translator::new(&DocumentBackend, &schema, &store)
        .with_config(TranslateConfig::default().with_hop_limit(1000))
        .translate(&req)
        .await
        .unwrap();
    assert_eq!(matching(&store, "posts", &widened).len(), 1000);
}

#[tokio::test]
async fn invalid_paths_are_all_reported_as_one_invalid_query() {
    let schema = schema();
    let store = blog_store();

    let err: Error = Translator::new(&DocumentBackend, &schema, &store)
        .translate(&request(json!({
            "nope": { "equals": 1 },
            "or": [{ "author.missing": { "equals": 1 } }, { "title": { "equals": "x" } }],
            "and": [{ "body.fr": { "equals": "x" } }],
        })))
        .await
        .unwrap_err()
        .into();

    assert_eq!(err.kind, ErrorKind::Query(QueryErrorKind::Invalid));
    for path in ["nope", "author.missing", "body.fr"] {
        assert!(err.message.contains(path), "{path} missing from {}", err.message);
    }
    assert_eq!(store.find_calls(), 0);
}

#[tokio::test]
async fn denied_relations_are_forbidden() {
    let schema = schema();
    let store = blog_store();
    let policies = StaticPolicies::new().with(
        EntityRef::collection("users"),
        EntityPolicy::granted().with_field("email", AccessResult::Denied),
    );

    let err: Error = Translator::new(&DocumentBackend, &schema, &store)
        .with_access(&policies)
        .translate(&request(json!({ "author.email": { "equals": "a@x.com" } })))
        .await
        .unwrap_err()
        .into();

    assert_eq!(err.kind, ErrorKind::Query(QueryErrorKind::Forbidden));
    assert_eq!(store.find_calls(), 0);
}

#[tokio::test]
async fn explicit_locale_segments_override_the_active_locale() {
    let schema = schema();
    let store = blog_store();
    let translator = Translator::new(&DocumentBackend, &schema, &store);

    let active = translator
        .translate(&request(json!({ "body": { "equals": "hallo" } })).with_locale("de"))
        .await
        .unwrap();
    assert_eq!(matching(&store, "posts", &active), vec!["p3"]);

    let explicit = translator
        .translate(&request(json!({ "body.en": { "equals": "hello" } })).with_locale("de"))
        .await
        .unwrap();
    assert_eq!(matching(&store, "posts", &explicit), vec!["p2"]);
}

#[tokio::test]
async fn translation_is_repeatable_and_memoized() {
    let schema = schema();
    let store = blog_store();
    let translator = Translator::new(&DocumentBackend, &schema, &store);
    let req = request(json!({ "or": [
        { "author.name": { "equals": "Ann" } },
        { "and": [
            { "author.name": { "equals": "Ann" } },
            { "title": { "like": "other" } },
        ] },
    ] }));

    let first = translator.parse(&req).await.unwrap();
    assert_eq!(store.find_calls(), 1);

    let second = translator.parse(&req).await.unwrap();
    assert_eq!(store.find_calls(), 2);
    assert_eq!(first, second);
    assert_eq!(matching(&store, "posts", &first.filter), vec!["p3", "p4"]);
}

#[tokio::test]
async fn storage_failures_surface_as_store_errors() {
    let schema = schema();
    let store = blog_store();
    store.set_unavailable(true);

    let err: Error = Translator::new(&DocumentBackend, &schema, &store)
        .translate(&request(json!({ "author.email": { "equals": "a@x.com" } })))
        .await
        .unwrap_err()
        .into();

    assert_eq!(err.kind, ErrorKind::Store(StoreErrorKind::Unavailable));
    assert!(!err.is_client_error());
}

///
/// PendingStore
///
/// Never answers; dropping the translation future must be enough to
/// abandon it.
///

struct PendingStore;

#[async_trait]
impl Storage<DocumentBackend> for PendingStore {
    async fn find(
        &self,
        _: &str,
        _: &Value,
        _: FindOptions,
    ) -> Result<Vec<DocumentId>, StorageError> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn cancelled_translations_yield_nothing() {
    let schema = schema();
    let store = PendingStore;
    let translator = Translator::new(&DocumentBackend, &schema, &store);
    let req = request(json!({ "author.email": { "equals": "a@x.com" } }));

    let outcome = tokio::time::timeout(Duration::from_millis(20), translator.parse(&req)).await;

    assert!(outcome.is_err());
}

///
/// Escaping
///

fn blocking_translate(store: &MemoryStore, filter: Value) -> Value {
    let schema = schema();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    runtime
        .block_on(Translator::new(&DocumentBackend, &schema, store).translate(&request(filter)))
        .unwrap()
}

proptest! {
    #[test]
    fn like_tokens_match_literally(token in r"[a-z0-9.*+?()\[\]{}|^$\\]{1,10}") {
        let store = MemoryStore::new().with_collection(
            "posts",
            [
                json!({ "_id": "hit", "title": format!("xx{token}yy") }),
                json!({ "_id": "miss", "title": "- -" }),
            ],
        );

        let filter = blocking_translate(&store, json!({ "title": { "like": token } }));

        prop_assert_eq!(matching(&store, "posts", &filter), vec!["hit"]);
    }
}
