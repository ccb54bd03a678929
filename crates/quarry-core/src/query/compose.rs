//! Module: query::compose
//! Responsibility: walk a `Where` tree, fold leaf constraints into one
//! native filter, and apply the entity's own read policy on top.
//! Does not own: path resolution or per-leaf emission (see `param`).
//! Boundary: `Translator` is the public entry point; `Session` is the
//! per-call state (policy cache, sub-query cache, error list).

use crate::{
    access::{AccessEvaluator, AccessResult, PolicyCache, RequestContext},
    backend::Backend,
    config::TranslateConfig,
    error::{PathErrorKind, PathErrors, TranslateError},
    obs::{GlobalMetricsSink, MetricsEvent, MetricsSink},
    query::{Operator, Where, path::ResolveContext, subquery::SubqueryCache},
    schema::{EntityRef, LocaleContext, SchemaProvider},
    store::Storage,
};
use serde_json::{Map, Value};
use std::{future::Future, pin::Pin, sync::Arc};

///
/// QueryRequest
///
/// One client filter plus the request-scoped context it is evaluated in.
///

#[derive(Clone, Debug, PartialEq)]
pub struct QueryRequest {
    pub entity: EntityRef,
    pub filter: Where,
    pub locale: LocaleContext,
    pub context: RequestContext,
    /// Skip every read-policy check, including hidden and credential fields.
    pub override_access: bool,
}

impl QueryRequest {
    #[must_use]
    pub fn new(entity: EntityRef, filter: Where) -> Self {
        Self {
            entity,
            filter,
            locale: LocaleContext::default(),
            context: RequestContext::default(),
            override_access: false,
        }
    }

    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = LocaleContext::new(locale);
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    #[must_use]
    pub const fn overriding_access(mut self) -> Self {
        self.override_access = true;
        self
    }
}

///
/// ParsedQuery
///
/// Translation output. A non-empty error list means the filter must not be
/// executed: the offending clauses contributed nothing.
///

#[derive(Clone, Debug, PartialEq)]
pub struct ParsedQuery<F> {
    pub filter: F,
    pub errors: PathErrors,
}

///
/// Translator
///

pub struct Translator<'a, B: Backend> {
    backend: &'a B,
    schema: &'a dyn SchemaProvider,
    storage: &'a dyn Storage<B>,
    access: Option<&'a dyn AccessEvaluator>,
    config: TranslateConfig,
    sink: Arc<dyn MetricsSink>,
}

impl<'a, B: Backend> Translator<'a, B> {
    #[must_use]
    pub fn new(
        backend: &'a B,
        schema: &'a dyn SchemaProvider,
        storage: &'a dyn Storage<B>,
    ) -> Self {
        Self {
            backend,
            schema,
            storage,
            access: None,
            config: TranslateConfig::default(),
            sink: Arc::new(GlobalMetricsSink),
        }
    }

    #[must_use]
    pub fn with_access(mut self, access: &'a dyn AccessEvaluator) -> Self {
        self.access = Some(access);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: TranslateConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sink = sink;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &TranslateConfig {
        &self.config
    }

    /// Translate a filter, returning path errors alongside the filter.
    ///
    /// Storage failures during relationship hops abort translation.
    pub async fn parse(
        &self,
        request: &QueryRequest,
    ) -> Result<ParsedQuery<B::Filter>, TranslateError> {
        self.config.validate()?;
        let entity = &request.entity;
        if self.schema.entity_fields(entity).is_none() {
            return Err(TranslateError::UnknownEntity(entity.slug().to_string()));
        }

        let label = entity.to_string();
        self.sink
            .record(MetricsEvent::TranslateStart { entity: &label });

        let mut session = Session::new(self, request);
        let result = session.parse_root().await;
        let errors = session.errors;

        self.sink.record(MetricsEvent::TranslateFinish {
            entity: &label,
            errors: u64::try_from(errors.len()).unwrap_or(u64::MAX),
        });
        let filter = result?;
        tracing::debug!(
            entity = %label,
            backend = self.backend.name(),
            errors = errors.len(),
            "filter translated"
        );

        Ok(ParsedQuery { filter, errors })
    }

    /// Translate a filter, failing on any path error not tolerated by the
    /// config.
    pub async fn translate(&self, request: &QueryRequest) -> Result<B::Filter, TranslateError> {
        let parsed = self.parse(request).await?;
        if parsed.errors.is_fatal(self.config.tolerate_unknown_paths) {
            tracing::warn!(
                entity = %request.entity,
                errors = %parsed.errors,
                "filter rejected"
            );
            return Err(TranslateError::InvalidQuery(parsed.errors));
        }

        Ok(parsed.filter)
    }
}

pub(crate) type NodeFuture<'s, F> =
    Pin<Box<dyn Future<Output = Result<F, TranslateError>> + Send + 's>>;

///
/// Session
///
/// State of one top-level translation. Caches die with it.
///

pub(crate) struct Session<'s, B: Backend> {
    pub(crate) backend: &'s B,
    pub(crate) storage: &'s dyn Storage<B>,
    pub(crate) config: &'s TranslateConfig,
    pub(crate) sink: &'s dyn MetricsSink,
    pub(crate) request: &'s QueryRequest,
    pub(crate) resolve: ResolveContext<'s>,
    pub(crate) policies: PolicyCache,
    pub(crate) subqueries: SubqueryCache,
    pub(crate) errors: PathErrors,
}

impl<'s, B: Backend> Session<'s, B> {
    fn new(translator: &'s Translator<'_, B>, request: &'s QueryRequest) -> Self {
        Self {
            backend: translator.backend,
            storage: translator.storage,
            config: &translator.config,
            sink: translator.sink.as_ref(),
            request,
            resolve: ResolveContext {
                schema: translator.schema,
                access: translator.access,
                request: &request.context,
                locale: &request.locale,
                enforce_access: !request.override_access,
                max_hops: translator.config.max_hops,
                default_id_kind: translator.backend.default_id_kind(),
            },
            policies: PolicyCache::default(),
            subqueries: SubqueryCache::default(),
            errors: PathErrors::new(),
        }
    }

    // The entity's own read result composes conjunctively with the client
    // filter, so neither can widen the other.
    async fn parse_root(&mut self) -> Result<B::Filter, TranslateError> {
        let request = self.request;
        let entity = &request.entity;

        let read = self
            .resolve
            .policy(&mut self.policies, entity)
            .map(|policy| policy.read.clone())
            .unwrap_or_default();
        let access = match read {
            AccessResult::Granted => None,
            AccessResult::Denied => {
                self.reject(entity.slug(), PathErrorKind::AccessDenied);
                Some(self.backend.never())
            }
            AccessResult::Where(condition) => Some(self.parse_trusted(entity, &condition).await?),
        };

        let user = self.parse_node(entity, request.filter.as_map()).await?;

        Ok(self.backend.and(user_and(user, access)))
    }

    pub(crate) fn parse_node<'n>(
        &'n mut self,
        entity: &'n EntityRef,
        node: &'n Map<String, Value>,
    ) -> NodeFuture<'n, B::Filter> {
        Box::pin(async move {
            let mut parts = Vec::new();

            for (key, value) in node {
                if let Some(conjunctive) = combinator(key)
                    && let Value::Array(items) = value
                {
                    let mut children = Vec::new();
                    for item in items {
                        let Value::Object(child) = item else {
                            continue;
                        };
                        let filter = self.parse_node(entity, child).await?;
                        if !self.backend.is_empty(&filter) {
                            children.push(filter);
                        }
                    }
                    if !children.is_empty() {
                        parts.push(if conjunctive {
                            self.backend.and(children)
                        } else {
                            self.backend.or(children)
                        });
                    }
                    continue;
                }

                let Value::Object(operators) = value else {
                    tracing::debug!(path = %key, "path without operator map skipped");
                    continue;
                };
                for (name, operand) in operators {
                    let Ok(operator) = name.parse::<Operator>() else {
                        self.skip_operator(key, name);
                        continue;
                    };
                    if let Some(param) = self.build_param(entity, key, operator, operand).await? {
                        tracing::trace!(entity = %entity, path = %param.path, %operator, "constraint added");
                        parts.push(param.filter);
                    }
                }
            }

            Ok(self.backend.and(parts))
        })
    }

    /// Translate a policy-supplied filter with access checks suspended.
    pub(crate) async fn parse_trusted(
        &mut self,
        entity: &EntityRef,
        condition: &Where,
    ) -> Result<B::Filter, TranslateError> {
        let enforce = std::mem::replace(&mut self.resolve.enforce_access, false);
        let result = self.parse_node(entity, condition.as_map()).await;
        self.resolve.enforce_access = enforce;

        result
    }

    pub(crate) fn reject(&mut self, path: &str, kind: PathErrorKind) {
        tracing::warn!(path, %kind, "filter path rejected");
        self.errors.record(path, kind);
        self.sink.record(MetricsEvent::PathRejected { kind });
    }

    pub(crate) fn skip_operator(&self, path: &str, operator: &str) {
        tracing::warn!(path, operator, "unsupported operator skipped");
        self.sink.record(MetricsEvent::OperatorSkipped { operator });
    }
}

fn user_and<F>(user: F, access: Option<F>) -> Vec<F> {
    let mut parts = vec![user];
    parts.extend(access);

    parts
}

// `and` / `or` keys, case-insensitively; `Some(true)` for conjunction.
fn combinator(key: &str) -> Option<bool> {
    if key.eq_ignore_ascii_case("and") {
        Some(true)
    } else if key.eq_ignore_ascii_case("or") {
        Some(false)
    } else {
        None
    }
}
