//! Metrics sink boundary.
//!
//! Translation code MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
use crate::{error::PathErrorKind, obs::metrics};

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug)]
pub enum MetricsEvent<'a> {
    TranslateStart {
        entity: &'a str,
    },
    TranslateFinish {
        entity: &'a str,
        errors: u64,
    },
    Subquery {
        collection: &'a str,
        returned: u64,
        capped: bool,
    },
    SubqueryCacheHit {
        collection: &'a str,
    },
    PathRejected {
        kind: PathErrorKind,
    },
    OperatorSkipped {
        operator: &'a str,
    },
}

///
/// MetricsSink
///
/// Sinks are shared across `.await` points, so they must be thread-safe.
///

pub trait MetricsSink: Send + Sync {
    fn record(&self, event: MetricsEvent<'_>);
}

///
/// GlobalMetricsSink
/// Default sink that writes into process-wide metrics state.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent<'_>) {
        match event {
            MetricsEvent::TranslateStart { .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.translations = m.ops.translations.saturating_add(1);
                });
            }

            MetricsEvent::TranslateFinish { errors, .. } => {
                if errors > 0 {
                    metrics::with_state_mut(|m| {
                        m.ops.translations_with_errors =
                            m.ops.translations_with_errors.saturating_add(1);
                    });
                }
            }

            MetricsEvent::Subquery {
                collection,
                returned,
                capped,
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.subqueries = m.ops.subqueries.saturating_add(1);
                    m.ops.subquery_ids = m.ops.subquery_ids.saturating_add(returned);
                    if capped {
                        m.ops.subqueries_capped = m.ops.subqueries_capped.saturating_add(1);
                    }

                    let entry = m.collections.entry(collection.to_string()).or_default();
                    entry.subqueries = entry.subqueries.saturating_add(1);
                    entry.ids_returned = entry.ids_returned.saturating_add(returned);
                    if capped {
                        entry.capped = entry.capped.saturating_add(1);
                    }
                });
            }

            MetricsEvent::SubqueryCacheHit { .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.subquery_cache_hits = m.ops.subquery_cache_hits.saturating_add(1);
                });
            }

            MetricsEvent::PathRejected { kind } => {
                metrics::with_state_mut(|m| {
                    let counter = match kind {
                        PathErrorKind::UnknownField => &mut m.ops.unknown_fields,
                        PathErrorKind::AccessDenied => &mut m.ops.access_denied,
                        PathErrorKind::PolymorphicTraversal => &mut m.ops.polymorphic_traversals,
                        PathErrorKind::InvalidValue => &mut m.ops.invalid_values,
                    };
                    *counter = counter.saturating_add(1);
                });
            }

            MetricsEvent::OperatorSkipped { .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.operators_skipped = m.ops.operators_skipped.saturating_add(1);
                });
            }
        }
    }
}

/// Snapshot the current metrics state.
///
/// `window_start_ms` filters by window start (`EventState::window_start_ms`),
/// not by per-event timestamps.
#[must_use]
pub fn metrics_report(window_start_ms: Option<u64>) -> metrics::EventReport {
    metrics::report_window_start(window_start_ms)
}

/// Reset all metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

///
/// TESTS
///
/// Other tests record into the global state concurrently, so assertions
/// here only check lower bounds.
///
