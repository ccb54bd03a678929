//! Module: access
//! Responsibility: read-policy vocabulary consumed during translation, and
//! the per-translation policy cache.
//! Does not own: evaluating user sessions or roles (the evaluator does).
//! Boundary: an `AccessEvaluator` answers once per entity per translation.

use crate::{query::Where, schema::EntityRef};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

///
/// AccessResult
///
/// Outcome of a read-policy check. `Where` is a conditional grant: reads are
/// allowed only for documents matching the filter, which the translator ANDs
/// into the constraint it builds.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub enum AccessResult {
    #[default]
    Granted,
    Denied,
    Where(Where),
}

impl AccessResult {
    #[must_use]
    pub const fn is_denied(&self) -> bool {
        matches!(self, Self::Denied)
    }
}

impl From<bool> for AccessResult {
    fn from(granted: bool) -> Self {
        if granted { Self::Granted } else { Self::Denied }
    }
}

///
/// EntityPolicy
///
/// Read policy for one collection or global. Field entries are keyed by
/// dotted field-name path within the entity (presentational containers do
/// not contribute a segment). Fields without an entry are readable.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntityPolicy {
    pub read: AccessResult,
    pub fields: BTreeMap<String, AccessResult>,
}

static GRANTED: AccessResult = AccessResult::Granted;

impl EntityPolicy {
    #[must_use]
    pub fn granted() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn denied() -> Self {
        Self {
            read: AccessResult::Denied,
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_read(mut self, read: AccessResult) -> Self {
        self.read = read;
        self
    }

    #[must_use]
    pub fn with_field(mut self, path: impl Into<String>, result: AccessResult) -> Self {
        self.fields.insert(path.into(), result);
        self
    }

    #[must_use]
    pub fn field(&self, path: &str) -> &AccessResult {
        self.fields.get(path).unwrap_or(&GRANTED)
    }
}

///
/// RequestContext
///
/// Identity of the requester, passed through to the evaluator untouched.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RequestContext {
    pub user: Option<String>,
    pub roles: BTreeSet<String>,
}

impl RequestContext {
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(id: impl Into<String>) -> Self {
        Self {
            user: Some(id.into()),
            roles: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

///
/// AccessEvaluator
///

pub trait AccessEvaluator: Send + Sync {
    fn entity_policy(&self, request: &RequestContext, entity: &EntityRef) -> EntityPolicy;
}

///
/// AllowAll
///

#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAll;

impl AccessEvaluator for AllowAll {
    fn entity_policy(&self, _: &RequestContext, _: &EntityRef) -> EntityPolicy {
        EntityPolicy::granted()
    }
}

///
/// StaticPolicies
///
/// Fixed per-entity policies, independent of the requester.
/// Entities without an entry are fully readable.
///

#[derive(Clone, Debug, Default)]
pub struct StaticPolicies {
    entries: BTreeMap<EntityRef, EntityPolicy>,
}

impl StaticPolicies {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, entity: EntityRef, policy: EntityPolicy) -> Self {
        self.entries.insert(entity, policy);
        self
    }
}

impl AccessEvaluator for StaticPolicies {
    fn entity_policy(&self, _: &RequestContext, entity: &EntityRef) -> EntityPolicy {
        self.entries.get(entity).cloned().unwrap_or_default()
    }
}

///
/// PolicyCache
///
/// Evaluator answers memoized for one top-level translation.
///

#[derive(Debug, Default)]
pub(crate) struct PolicyCache {
    entries: BTreeMap<EntityRef, Arc<EntityPolicy>>,
}

impl PolicyCache {
    pub(crate) fn get_or_load(
        &mut self,
        evaluator: &dyn AccessEvaluator,
        request: &RequestContext,
        entity: &EntityRef,
    ) -> Arc<EntityPolicy> {
        self.entries
            .entry(entity.clone())
            .or_insert_with(|| Arc::new(evaluator.entity_policy(request, entity)))
            .clone()
    }
}
