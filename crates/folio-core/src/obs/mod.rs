//! Observability: runtime telemetry (metrics) and sink abstractions.
//!
//! Execution code never touches `metrics` directly; every counter update
//! flows through `MetricsEvent` and a `MetricsSink`.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EngineMetrics, MutationCounters, OpCounters, TypeCounters};
pub use sink::{
    ExecKind, GlobalMetricsSink, MetricsEvent, MetricsSink, metrics_report, metrics_reset_all,
};
