use super::*;
use crate::{
    access::StaticPolicies,
    query::Operator,
    schema::{LocaleContext, Schema},
    test_fixtures::blog_schema,
};

///
/// Harness
///

struct Harness {
    schema: Schema,
    access: Option<StaticPolicies>,
    request: RequestContext,
    locale: LocaleContext,
    enforce_access: bool,
    max_hops: usize,
}

impl Harness {
    fn new() -> Self {
        Self {
            schema: blog_schema(),
            access: None,
            request: RequestContext::default(),
            locale: LocaleContext::new("en"),
            enforce_access: true,
            max_hops: crate::DEFAULT_MAX_HOPS,
        }
    }

    fn with_access(mut self, access: StaticPolicies) -> Self {
        self.access = Some(access);
        self
    }

    fn resolve(&self, entity: &EntityRef, path: &str) -> (Vec<ResolvedPathSegment>, PathErrors) {
        let cx = ResolveContext {
            schema: &self.schema,
            access: self.access.as_ref().map(|a| a as &dyn AccessEvaluator),
            request: &self.request,
            locale: &self.locale,
            enforce_access: self.enforce_access,
            max_hops: self.max_hops,
            default_id_kind: IdKind::ObjectId,
        };
        let mut policies = PolicyCache::default();
        let mut errors = PathErrors::new();
        let segments = resolve_path(&cx, &mut policies, entity, path, path, &mut errors);

        (segments, errors)
    }

    fn paths(&self, entity: &EntityRef, path: &str) -> Vec<String> {
        let (segments, errors) = self.resolve(entity, path);
        assert!(errors.is_empty(), "unexpected errors for {path}: {errors}");

        segments.iter().map(|s| s.path.to_string()).collect()
    }

    fn error(&self, entity: &EntityRef, path: &str) -> PathErrorKind {
        let (segments, errors) = self.resolve(entity, path);
        assert!(segments.is_empty());
        assert_eq!(errors.len(), 1, "expected one error for {path}");

        errors[0].kind
    }
}

fn posts() -> EntityRef {
    EntityRef::collection("posts")
}

#[test]
fn localized_fields_take_the_active_locale() {
    let h = Harness::new();

    assert_eq!(h.paths(&posts(), "body"), vec!["body.en"]);
    assert_eq!(h.paths(&posts(), "items.label"), vec!["items.label.en"]);
}

#[test]
fn explicit_locale_segment_overrides_the_active_locale() {
    let h = Harness::new();

    assert_eq!(h.paths(&posts(), "body.de"), vec!["body.de"]);
    assert_eq!(h.paths(&posts(), "items.label.de"), vec!["items.label.de"]);
}

#[test]
fn all_locales_request_leaves_localized_paths_unqualified() {
    let mut h = Harness::new();
    h.locale = LocaleContext::new("all");

    assert_eq!(h.paths(&posts(), "body"), vec!["body"]);
}

#[test]
fn missing_request_locale_uses_the_default_locale() {
    let mut h = Harness::new();
    h.locale = LocaleContext::default();

    assert_eq!(h.paths(&posts(), "body"), vec!["body.en"]);
    assert_eq!(h.paths(&posts(), "body.de"), vec!["body.de"]);
}

#[test]
fn unconfigured_locale_segment_is_an_unknown_field() {
    let h = Harness::new();

    assert_eq!(h.error(&posts(), "body.fr"), PathErrorKind::UnknownField);
}

#[test]
fn presentational_containers_are_transparent() {
    let h = Harness::new();

    assert_eq!(h.paths(&posts(), "slug"), vec!["slug"]);
    assert_eq!(h.paths(&posts(), "status"), vec!["status"]);
    assert_eq!(h.paths(&posts(), "summary"), vec!["summary"]);
}

#[test]
fn named_tabs_and_groups_nest() {
    let h = Harness::new();

    assert_eq!(h.paths(&posts(), "stats.likes"), vec!["stats.likes"]);
    assert_eq!(h.paths(&posts(), "meta.seo.score"), vec!["meta.seo.score"]);
    assert_eq!(h.error(&posts(), "likes"), PathErrorKind::UnknownField);
}

#[test]
fn opaque_values_pass_remaining_segments_through() {
    let h = Harness::new();
    let (segments, errors) = h.resolve(&posts(), "data.owner.name");

    assert!(errors.is_empty());
    assert_eq!(
        segments[0].path.parts(),
        &[
            PathPart::Field("data".to_string()),
            PathPart::Json("owner".to_string()),
            PathPart::Json("name".to_string()),
        ]
    );
    assert_eq!(h.paths(&posts(), "layout.0.heading"), vec!["layout.0.heading"]);
}

#[test]
fn id_aliases_resolve_to_the_primary_key() {
    let h = Harness::new();

    for alias in ["id", "_id"] {
        let (segments, errors) = h.resolve(&posts(), alias);
        assert!(errors.is_empty());
        assert_eq!(segments[0].path.parts(), &[PathPart::Id]);
        assert_eq!(segments[0].field.kind, FieldType::Id);
        assert_eq!(segments[0].field.id_kinds, vec![IdKind::ObjectId]);
    }
}

#[test]
fn custom_id_type_is_taken_from_the_declared_field() {
    let h = Harness::new();

    let (counters, _) = h.resolve(&EntityRef::collection("counters"), "id");
    assert_eq!(counters[0].field.id_kinds, vec![IdKind::Number]);

    let (codes, _) = h.resolve(&EntityRef::collection("codes"), "_id");
    assert_eq!(codes[0].field.id_kinds, vec![IdKind::Text]);
}

#[test]
fn relationship_hop_opens_a_new_segment() {
    let h = Harness::new();
    let (segments, errors) = h.resolve(&posts(), "author.email");

    assert!(errors.is_empty());
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].path.to_string(), "author");
    assert_eq!(segments[0].entity, posts());
    assert_eq!(segments[0].field.kind, FieldType::Relationship);
    assert_eq!(segments[1].path.to_string(), "email");
    assert_eq!(segments[1].path.table(), "users");
    assert_eq!(segments[1].entity, EntityRef::collection("users"));
}

#[test]
fn trailing_id_on_a_relationship_stays_on_the_relation() {
    let h = Harness::new();

    assert_eq!(h.paths(&posts(), "author.id"), vec!["author"]);
    assert_eq!(h.paths(&posts(), "author.org.id"), vec!["author", "org"]);
}

#[test]
fn polymorphic_relations_only_resolve_terminal_keys() {
    let h = Harness::new();

    assert_eq!(h.paths(&posts(), "related"), vec!["related"]);
    assert_eq!(h.paths(&posts(), "related.value"), vec!["related.value"]);
    assert_eq!(h.paths(&posts(), "related.relationTo"), vec!["related.relationTo"]);
    assert_eq!(
        h.error(&posts(), "related.email"),
        PathErrorKind::PolymorphicTraversal
    );

    let (segments, _) = h.resolve(&posts(), "related.value");
    assert_eq!(
        segments[0].field.id_kinds,
        vec![IdKind::ObjectId, IdKind::Number]
    );
}

#[test]
fn hidden_and_credential_fields_are_denied() {
    let h = Harness::new();
    let users = EntityRef::collection("users");

    assert_eq!(h.error(&users, "secret"), PathErrorKind::AccessDenied);
    assert_eq!(h.error(&users, "hash"), PathErrorKind::AccessDenied);
    assert_eq!(h.error(&posts(), "author.salt"), PathErrorKind::AccessDenied);
}

#[test]
fn override_access_reaches_hidden_fields() {
    let mut h = Harness::new();
    h.enforce_access = false;

    assert_eq!(
        h.paths(&EntityRef::collection("users"), "secret"),
        vec!["secret"]
    );
}

#[test]
fn field_policies_deny_or_attach_conditions() {
    let condition = Where::field("role", Operator::Equals, "editor");
    let h = Harness::new().with_access(
        StaticPolicies::new()
            .with(
                posts(),
                EntityPolicy::granted().with_field("views", AccessResult::Denied),
            )
            .with(
                EntityRef::collection("users"),
                EntityPolicy::granted()
                    .with_field("email", AccessResult::Where(condition.clone())),
            ),
    );

    assert_eq!(h.error(&posts(), "views"), PathErrorKind::AccessDenied);

    let (segments, errors) = h.resolve(&posts(), "author.email");
    assert!(errors.is_empty());
    assert!(segments[0].conditions.is_empty());
    assert_eq!(segments[1].conditions, vec![condition]);
}

#[test]
fn global_type_only_exists_on_globals() {
    let h = Harness::new();

    assert_eq!(
        h.paths(&EntityRef::global("settings"), "globalType"),
        vec!["globalType"]
    );
    assert_eq!(h.error(&posts(), "globalType"), PathErrorKind::UnknownField);
}

#[test]
fn hop_budget_is_enforced() {
    let mut h = Harness::new();
    h.max_hops = 1;

    assert_eq!(h.paths(&posts(), "author.name"), vec!["author", "name"]);
    assert_eq!(
        h.error(&posts(), "author.org.name"),
        PathErrorKind::UnknownField
    );
}

#[test]
fn malformed_paths_are_unknown() {
    let h = Harness::new();

    for path in ["", "title.", ".title", "nope", "title.extra"] {
        assert_eq!(h.error(&posts(), path), PathErrorKind::UnknownField, "{path}");
    }
    assert_eq!(h.paths(&posts(), "meta"), vec!["meta"]);
}
