//! Module: query::param
//! Responsibility: turn one `path: { operator: operand }` pair into a native
//! constraint, running bounded relationship-hop sub-queries when the path
//! crosses into related collections.
//! Does not own: boolean composition or the entity's own read policy.

use crate::{
    access::AccessResult,
    backend::{Backend, NativeValue},
    config::Strictness,
    error::{PathErrorKind, TranslateError},
    obs::MetricsEvent,
    query::{
        Operator, StoragePath,
        compose::Session,
        path::{ResolvedPathSegment, resolve_path},
        sanitize::{Sanitized, sanitize},
        subquery::SubqueryKey,
    },
    schema::EntityRef,
    store::{DocumentId, FindOptions},
};
use serde_json::Value;

///
/// SearchParam
///
/// One constraint contributed to the enclosing filter node. `path` is the
/// root storage path the constraint applies to.
///

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SearchParam<F> {
    pub(crate) path: String,
    pub(crate) filter: F,
}

impl<B: Backend> Session<'_, B> {
    /// Build the constraint for `key` / `operator`.
    ///
    /// `None` means no constraint was contributed; whether that is an error
    /// is decided by what was recorded in the session's error list.
    pub(crate) async fn build_param(
        &mut self,
        entity: &EntityRef,
        key: &str,
        operator: Operator,
        raw: &Value,
    ) -> Result<Option<SearchParam<B::Filter>>, TranslateError> {
        let normalized = key.replace("__", ".");

        let before = self.errors.len();
        let segments = resolve_path(
            &self.resolve,
            &mut self.policies,
            entity,
            &normalized,
            key,
            &mut self.errors,
        );
        if self.errors.len() > before
            && let Some(error) = self.errors.last()
        {
            self.sink
                .record(MetricsEvent::PathRejected { kind: error.kind });
        }

        let Some((leaf_segment, hops)) = segments.split_last() else {
            return Ok(None);
        };
        let Some(leaf) = self.leaf(leaf_segment, operator, raw, key) else {
            return Ok(None);
        };
        let mut filter = self.with_conditions(leaf_segment, leaf).await?;

        // innermost first: each hop's ids constrain the relation one level out
        let mut collection = &leaf_segment.entity;
        for segment in hops.iter().rev() {
            let Some(scoped) = self.read_scoped(collection, filter, key).await? else {
                return Ok(None);
            };
            let ids = self.bridge(collection, scoped).await?;
            let constraint = self.in_ids(&segment.path, &ids);
            filter = self.with_conditions(segment, constraint).await?;
            collection = &segment.entity;
        }

        Ok(Some(SearchParam {
            path: segments[0].path.to_string(),
            filter,
        }))
    }

    // Leaf constraint on the final segment, before any field conditions.
    fn leaf(
        &mut self,
        segment: &ResolvedPathSegment,
        operator: Operator,
        raw: &Value,
        key: &str,
    ) -> Option<B::Filter> {
        let backend = self.backend;
        let path = &segment.path;

        let sanitized = match sanitize(&segment.field, operator, raw) {
            Ok(sanitized) => sanitized,
            Err(err) => return self.invalid_operand(key, &err),
        };

        tracing::trace!(
            path = %path,
            field = %segment.field.name,
            kind = segment.field.kind.as_str(),
            localized = segment.field.localized,
            has_many = segment.field.has_many,
            %operator,
            "leaf constraint"
        );

        match sanitized {
            Sanitized::Exists(present) => Some(backend.exists(path, present)),
            Sanitized::Tokens(tokens) if tokens.is_empty() => {
                tracing::debug!(path = key, %operator, "blank search text skipped");
                None
            }
            Sanitized::Tokens(tokens) => Some(backend.contains_all(path, &tokens)),
            Sanitized::Fragment(fragment) if fragment.is_empty() => {
                tracing::debug!(path = key, %operator, "blank search text skipped");
                None
            }
            Sanitized::Fragment(fragment) => Some(backend.not_contains(path, &fragment)),
            Sanitized::Geo(query) => {
                let filter = backend.geo(path, &query);
                if filter.is_none() {
                    self.skip_operator(key, operator.as_str());
                }
                filter
            }
            Sanitized::Identifiers(candidates) => {
                let candidates = backend.id_candidates(&segment.field.id_kinds, candidates);
                if candidates.is_empty() {
                    return self.invalid_operand(key, &"no identifier form fits the key type");
                }
                let token = self.token(operator, key)?;
                let alternatives: Vec<_> = candidates
                    .into_iter()
                    .map(|value| backend.compare(path, token, value))
                    .collect();

                // `or` / `and` return a lone member unchanged
                Some(if operator == Operator::NotEquals {
                    backend.and(alternatives)
                } else {
                    backend.or(alternatives)
                })
            }
            Sanitized::Value(NativeValue::List(values)) if segment.field.is_identifier() => {
                let token = self.token(operator, key)?;
                let values = backend.id_candidates(&segment.field.id_kinds, values);
                Some(backend.compare(path, token, NativeValue::List(values)))
            }
            Sanitized::Value(value) => {
                let token = self.token(operator, key)?;
                Some(backend.compare(path, token, value))
            }
        }
    }

    // Lenient: the constraint matches nothing. Strict: the path is rejected.
    fn invalid_operand(&mut self, key: &str, reason: &dyn std::fmt::Display) -> Option<B::Filter> {
        match self.config.strictness {
            Strictness::Lenient => {
                tracing::debug!(path = key, %reason, "operand matches nothing");
                Some(self.backend.never())
            }
            Strictness::Strict => {
                self.reject(key, PathErrorKind::InvalidValue);
                None
            }
        }
    }

    fn token(&self, operator: Operator, key: &str) -> Option<&'static str> {
        let token = self.backend.operators().token(operator);
        if token.is_none() {
            self.skip_operator(key, operator.as_str());
        }

        token
    }

    // AND in trusted field-policy conditions gathered on this segment.
    async fn with_conditions(
        &mut self,
        segment: &ResolvedPathSegment,
        filter: B::Filter,
    ) -> Result<B::Filter, TranslateError> {
        if segment.conditions.is_empty() {
            return Ok(filter);
        }

        let mut parts = vec![filter];
        for condition in &segment.conditions {
            parts.push(self.parse_trusted(&segment.entity, condition).await?);
        }

        Ok(self.backend.and(parts))
    }

    // Apply a hop collection's own read result to its sub-query.
    async fn read_scoped(
        &mut self,
        collection: &EntityRef,
        filter: B::Filter,
        key: &str,
    ) -> Result<Option<B::Filter>, TranslateError> {
        let Some(policy) = self.resolve.policy(&mut self.policies, collection) else {
            return Ok(Some(filter));
        };

        match &policy.read {
            AccessResult::Granted => Ok(Some(filter)),
            AccessResult::Denied => {
                self.reject(key, PathErrorKind::AccessDenied);
                Ok(None)
            }
            AccessResult::Where(condition) => {
                let scoped = self.parse_trusted(collection, condition).await?;
                Ok(Some(self.backend.and(vec![filter, scoped])))
            }
        }
    }

    /// Run one bounded sub-query, memoized for the session.
    async fn bridge(
        &mut self,
        collection: &EntityRef,
        filter: B::Filter,
    ) -> Result<Vec<DocumentId>, TranslateError> {
        let slug = collection.slug();
        let key = SubqueryKey::new(slug, &self.backend.cache_key(&filter));
        if let Some(ids) = self.subqueries.get(&key) {
            self.sink
                .record(MetricsEvent::SubqueryCacheHit { collection: slug });
            return Ok(ids.to_vec());
        }

        let limit = self.config.hop_limit;
        let found = self
            .storage
            .find(slug, &filter, FindOptions::limit(limit))
            .await
            .inspect_err(|err| {
                tracing::warn!(collection = slug, %err, "relationship sub-query failed");
            })?;

        let capped = found.len() >= limit;
        let mut ids: Vec<DocumentId> = Vec::with_capacity(found.len().min(limit));
        for id in found.into_iter().take(limit) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }

        tracing::debug!(collection = slug, ids = ids.len(), capped, "relationship hop");
        self.sink.record(MetricsEvent::Subquery {
            collection: slug,
            returned: u64::try_from(ids.len()).unwrap_or(u64::MAX),
            capped,
        });
        self.subqueries.insert(key, ids.clone());

        Ok(ids)
    }

    // Zero ids yield an empty `in`, which matches nothing.
    fn in_ids(&self, path: &StoragePath, ids: &[DocumentId]) -> B::Filter {
        let mut values: Vec<NativeValue> = Vec::with_capacity(ids.len());
        for value in ids.iter().flat_map(|id| self.backend.id_values(id)) {
            if !values.contains(&value) {
                values.push(value);
            }
        }

        match self.backend.operators().token(Operator::In) {
            Some(token) => self.backend.compare(path, token, NativeValue::List(values)),
            None => self.backend.never(),
        }
    }
}
