//! Module: query::path
//! Responsibility: resolve a dotted client path against a field tree into
//! storage paths, one segment per collection crossed.
//! Does not own: operand coercion or native emission.
//! Boundary: failures are recorded into the caller's `PathErrors`; a failed
//! path resolves to no segments.

mod storage;

#[cfg(test)]
mod tests;

pub use storage::{PathPart, StoragePath};

use crate::{
    access::{AccessEvaluator, AccessResult, EntityPolicy, PolicyCache, RequestContext},
    error::{PathErrorKind, PathErrors},
    query::Where,
    schema::{
        EntityRef, Field, FieldKind, FieldType, IdKind, LocaleContext, RelationTo, SchemaProvider,
    },
};
use std::sync::Arc;

///
/// FieldDescriptor
///
/// Flattened metadata of the field a segment ends on.
///

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct FieldDescriptor {
    pub(crate) name: String,
    pub(crate) kind: FieldType,
    pub(crate) localized: bool,
    pub(crate) has_many: bool,
    /// Identifier kinds an operand may need to match: the entity's own kind
    /// for `id`, every target's kind for relations.
    pub(crate) id_kinds: Vec<IdKind>,
}

impl FieldDescriptor {
    fn id(kind: IdKind) -> Self {
        Self {
            name: "id".to_string(),
            kind: FieldType::Id,
            localized: false,
            has_many: false,
            id_kinds: vec![kind],
        }
    }

    fn synthetic_text(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: FieldType::Text,
            localized: false,
            has_many: false,
            id_kinds: Vec::new(),
        }
    }

    /// Whether equality operands are identifiers with alternate encodings.
    pub(crate) const fn is_identifier(&self) -> bool {
        matches!(
            self.kind,
            FieldType::Id | FieldType::Relationship | FieldType::Upload
        )
    }
}

///
/// ResolvedPathSegment
///
/// Storage location of one path component inside the entity that owns it.
/// Segments come out outer-to-inner; every segment but the last ends on
/// the relationship field that leads into the next segment's entity.
///

#[derive(Clone, Debug)]
pub(crate) struct ResolvedPathSegment {
    pub(crate) path: StoragePath,
    pub(crate) field: FieldDescriptor,
    pub(crate) entity: EntityRef,
    /// Conditional field grants met along this segment, to be ANDed into
    /// the constraint built on `entity`.
    pub(crate) conditions: Vec<Where>,
}

///
/// ResolveContext
///

pub(crate) struct ResolveContext<'a> {
    pub(crate) schema: &'a dyn SchemaProvider,
    pub(crate) access: Option<&'a dyn AccessEvaluator>,
    pub(crate) request: &'a RequestContext,
    pub(crate) locale: &'a LocaleContext,
    pub(crate) enforce_access: bool,
    pub(crate) max_hops: usize,
    pub(crate) default_id_kind: IdKind,
}

impl ResolveContext<'_> {
    pub(crate) fn id_kind(&self, entity: &EntityRef) -> IdKind {
        self.schema
            .custom_id_kind(entity)
            .unwrap_or(self.default_id_kind)
    }

    /// Read policy for an entity, or `None` when access is not enforced.
    pub(crate) fn policy(
        &self,
        policies: &mut PolicyCache,
        entity: &EntityRef,
    ) -> Option<Arc<EntityPolicy>> {
        match (self.enforce_access, self.access) {
            (true, Some(evaluator)) => {
                Some(policies.get_or_load(evaluator, self.request, entity))
            }
            _ => None,
        }
    }
}

/// Resolve `path` against `entity`.
///
/// On failure one error is recorded under `error_path` (the path as the
/// client wrote it) and no segments are returned.
pub(crate) fn resolve_path(
    cx: &ResolveContext<'_>,
    policies: &mut PolicyCache,
    entity: &EntityRef,
    path: &str,
    error_path: &str,
    errors: &mut PathErrors,
) -> Vec<ResolvedPathSegment> {
    let mut resolver = Resolver {
        cx,
        policies,
        segments: Vec::new(),
    };

    match resolver.run(entity, path) {
        Ok(()) => resolver.segments,
        Err(kind) => {
            tracing::warn!(path = error_path, %kind, "filter path rejected");
            errors.record(error_path, kind);
            Vec::new()
        }
    }
}

///
/// Unit
///
/// One resolution unit: the part of the path that lives in a single entity.
///

struct Unit<'a> {
    entity: EntityRef,
    fields: &'a [Field],
    path: StoragePath,
    /// Dotted field names consumed so far; the key into field policies.
    policy_key: String,
    policy: Option<Arc<EntityPolicy>>,
    conditions: Vec<Where>,
    auth: bool,
}

enum Matched<'a> {
    Field(&'a Field),
    NamedTab(&'a str, &'a [Field]),
}

struct Resolver<'c, 'a> {
    cx: &'c ResolveContext<'a>,
    policies: &'c mut PolicyCache,
    segments: Vec<ResolvedPathSegment>,
}

impl<'a> Resolver<'_, 'a> {
    fn run(&mut self, root: &EntityRef, path: &str) -> Result<(), PathErrorKind> {
        let segs: Vec<&str> = path.split('.').collect();
        if segs.iter().any(|s| s.is_empty()) {
            return Err(PathErrorKind::UnknownField);
        }

        let mut unit = self.open(root.clone())?;
        let mut fields = unit.fields;
        let mut hops = 0;
        let mut idx = 0;

        while let Some(&seg) = segs.get(idx) {
            let last = idx + 1 == segs.len();
            let at_root = unit.policy_key.is_empty();

            if at_root && last && matches!(seg, "id" | "_id") {
                let kind = self.cx.id_kind(&unit.entity);
                unit.path.push(PathPart::Id);
                return self.finish(unit, FieldDescriptor::id(kind));
            }
            if at_root && last && seg == "globalType" && unit.entity.is_global() {
                unit.path.push(PathPart::Field(seg.to_string()));
                return self.finish(unit, FieldDescriptor::synthetic_text(seg));
            }
            if at_root && unit.auth && self.cx.enforce_access && matches!(seg, "salt" | "hash") {
                return Err(PathErrorKind::AccessDenied);
            }

            let matched = find_field(fields, seg).ok_or(PathErrorKind::UnknownField)?;
            idx += 1;

            let field = match matched {
                Matched::NamedTab(name, tab_fields) => {
                    self.check_access(&mut unit, name, false)?;
                    unit.path.push(PathPart::Field(name.to_string()));
                    if idx == segs.len() {
                        return self.finish(unit, container(name, FieldType::Tabs));
                    }
                    fields = tab_fields;
                    continue;
                }
                Matched::Field(field) => field,
            };

            self.check_access(&mut unit, &field.name, field.hidden)?;
            let descriptor = self.describe(field);

            match &field.kind {
                FieldKind::Group(sub) | FieldKind::Array(sub) => {
                    let part = if matches!(field.kind, FieldKind::Array(_)) {
                        PathPart::Array(field.name.clone())
                    } else {
                        PathPart::Field(field.name.clone())
                    };
                    unit.path.push(part);
                    self.qualify_locale(field, &segs, &mut idx, &mut unit.path);
                    if idx == segs.len() {
                        return self.finish(unit, descriptor);
                    }
                    fields = sub.as_slice();
                }

                FieldKind::Json | FieldKind::RichText | FieldKind::Blocks(_) => {
                    unit.path.push(PathPart::Field(field.name.clone()));
                    self.qualify_locale(field, &segs, &mut idx, &mut unit.path);
                    for rest in &segs[idx..] {
                        unit.path.push(PathPart::Json((*rest).to_string()));
                    }
                    return self.finish(unit, descriptor);
                }

                FieldKind::Relationship(relation) | FieldKind::Upload(relation) => {
                    unit.path.push(PathPart::Field(field.name.clone()));
                    self.qualify_locale(field, &segs, &mut idx, &mut unit.path);

                    let target = match (&segs[idx..], relation) {
                        ([], _) => return self.finish(unit, descriptor),
                        ([leaf @ ("value" | "relationTo")], RelationTo::Many(_)) => {
                            unit.path.push(PathPart::Field((*leaf).to_string()));
                            let descriptor = if *leaf == "value" {
                                descriptor
                            } else {
                                FieldDescriptor::synthetic_text(leaf)
                            };
                            return self.finish(unit, descriptor);
                        }
                        (_, RelationTo::Many(_)) => {
                            return Err(PathErrorKind::PolymorphicTraversal);
                        }
                        (["id" | "_id"], RelationTo::One(_)) => {
                            return self.finish(unit, descriptor);
                        }
                        (_, RelationTo::One(slug)) => EntityRef::collection(slug.clone()),
                    };

                    hops += 1;
                    if hops > self.cx.max_hops {
                        return Err(PathErrorKind::UnknownField);
                    }

                    let next = self.open(target)?;
                    fields = next.fields;
                    let crossed = std::mem::replace(&mut unit, next);
                    self.push_segment(crossed, descriptor);
                }

                FieldKind::Text
                | FieldKind::Textarea
                | FieldKind::Email
                | FieldKind::Code
                | FieldKind::Number
                | FieldKind::Date
                | FieldKind::Checkbox
                | FieldKind::Select
                | FieldKind::Point => {
                    unit.path.push(PathPart::Field(field.name.clone()));
                    self.qualify_locale(field, &segs, &mut idx, &mut unit.path);
                    if idx != segs.len() {
                        return Err(PathErrorKind::UnknownField);
                    }
                    return self.finish(unit, descriptor);
                }

                // Presentational containers have no name and never match.
                FieldKind::Tabs(_) | FieldKind::Row(_) | FieldKind::Collapsible(_) => {
                    return Err(PathErrorKind::UnknownField);
                }
            }
        }

        Err(PathErrorKind::UnknownField)
    }

    fn open(&mut self, entity: EntityRef) -> Result<Unit<'a>, PathErrorKind> {
        let schema = self.cx.schema;
        let fields = schema
            .entity_fields(&entity)
            .ok_or(PathErrorKind::UnknownField)?;
        let auth = match &entity {
            EntityRef::Collection(slug) => schema.collection(slug).is_some_and(|c| c.auth),
            EntityRef::Global(_) => false,
        };
        let policy = self.cx.policy(self.policies, &entity);

        Ok(Unit {
            path: StoragePath::new(entity.slug()),
            entity,
            fields,
            policy_key: String::new(),
            policy,
            conditions: Vec::new(),
            auth,
        })
    }

    fn check_access(
        &self,
        unit: &mut Unit<'a>,
        name: &str,
        hidden: bool,
    ) -> Result<(), PathErrorKind> {
        let key = if unit.policy_key.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", unit.policy_key)
        };

        if self.cx.enforce_access {
            if hidden {
                return Err(PathErrorKind::AccessDenied);
            }
            if let Some(policy) = &unit.policy {
                match policy.field(&key) {
                    AccessResult::Granted => {}
                    AccessResult::Denied => return Err(PathErrorKind::AccessDenied),
                    AccessResult::Where(condition) => unit.conditions.push(condition.clone()),
                }
            }
        }
        unit.policy_key = key;

        Ok(())
    }

    // An explicit configured locale segment wins over the active locale.
    fn qualify_locale(&self, field: &Field, segs: &[&str], idx: &mut usize, path: &mut StoragePath) {
        let Some(localization) = self.cx.schema.localization() else {
            return;
        };
        if !field.localized {
            return;
        }

        if let Some(next) = segs.get(*idx)
            && self.cx.schema.has_locale(next)
        {
            path.push(PathPart::Locale((*next).to_string()));
            *idx += 1;
        } else if let Some(active) = self
            .cx
            .locale
            .qualifying_locale(&localization.default_locale)
        {
            path.push(PathPart::Locale(active.to_string()));
        }
    }

    fn describe(&self, field: &Field) -> FieldDescriptor {
        let mut id_kinds = Vec::new();
        if let Some(relation) = field.kind.relation_to() {
            for slug in relation.slugs() {
                let kind = self.cx.id_kind(&EntityRef::collection(slug.clone()));
                if !id_kinds.contains(&kind) {
                    id_kinds.push(kind);
                }
            }
        }

        FieldDescriptor {
            name: field.name.clone(),
            kind: field.kind.field_type(),
            localized: field.localized,
            has_many: field.has_many,
            id_kinds,
        }
    }

    fn push_segment(&mut self, unit: Unit<'a>, field: FieldDescriptor) {
        self.segments.push(ResolvedPathSegment {
            path: unit.path,
            field,
            entity: unit.entity,
            conditions: unit.conditions,
        });
    }

    fn finish(&mut self, unit: Unit<'a>, field: FieldDescriptor) -> Result<(), PathErrorKind> {
        self.push_segment(unit, field);

        Ok(())
    }
}

fn container(name: &str, kind: FieldType) -> FieldDescriptor {
    FieldDescriptor {
        kind,
        ..FieldDescriptor::synthetic_text(name)
    }
}

// Row, collapsible and unnamed tabs are transparent; named tabs nest.
fn find_field<'a>(fields: &'a [Field], name: &str) -> Option<Matched<'a>> {
    for field in fields {
        match &field.kind {
            FieldKind::Row(sub) | FieldKind::Collapsible(sub) => {
                if let Some(found) = find_field(sub, name) {
                    return Some(found);
                }
            }
            FieldKind::Tabs(tabs) => {
                for tab in tabs {
                    match &tab.name {
                        Some(tab_name) if tab_name == name => {
                            return Some(Matched::NamedTab(tab_name, &tab.fields));
                        }
                        Some(_) => {}
                        None => {
                            if let Some(found) = find_field(&tab.fields, name) {
                                return Some(found);
                            }
                        }
                    }
                }
            }
            _ if field.name == name => return Some(Matched::Field(field)),
            _ => {}
        }
    }

    None
}
