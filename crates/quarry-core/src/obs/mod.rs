//! Observability: translation telemetry and sink abstractions.
//!
//! Translation logic emits `MetricsEvent`s through a `MetricsSink`; it never
//! touches the counter state directly.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{CollectionCounters, EventOps, EventReport, EventState};
pub use sink::{GlobalMetricsSink, MetricsEvent, MetricsSink, metrics_report, metrics_reset_all};
