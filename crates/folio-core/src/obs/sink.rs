//! Metrics sink boundary.
//!
//! Engine logic MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
//!
//! Engines hold an `Arc<dyn MetricsSink>`; the default is the global sink.
use crate::obs::metrics::{self, EngineMetrics};

///
/// ExecKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExecKind {
    Query,
    Mutation,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug)]
pub enum MetricsEvent<'a> {
    ExecStart {
        kind: ExecKind,
        doc_type: &'a str,
    },
    QueryFinish {
        doc_type: &'a str,
        rows: u64,
        total: u64,
    },
    PredicateCache {
        hit: bool,
    },
    PopulateBatch {
        doc_type: &'a str,
        attribute: &'a str,
        requested: u64,
        fetched: u64,
    },
    CycleSkip {
        doc_type: &'a str,
    },
    MutationFinish {
        doc_type: &'a str,
        action: &'a str,
        committed: bool,
    },
    HookAbort {
        doc_type: &'a str,
    },
    AfterHookFailure {
        doc_type: &'a str,
        failures: u64,
    },
    Cancelled,
}

///
/// MetricsSink
///

pub trait MetricsSink: Send + Sync {
    fn record(&self, event: MetricsEvent<'_>);
}

///
/// GlobalMetricsSink
///
/// Default sink that writes into the process-global metrics state.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent<'_>) {
        match event {
            MetricsEvent::ExecStart { kind, doc_type } => {
                metrics::with_state_mut(|m| {
                    match kind {
                        ExecKind::Query => {
                            m.ops.query_calls = m.ops.query_calls.saturating_add(1);
                        }
                        ExecKind::Mutation => {
                            m.ops.mutation_calls = m.ops.mutation_calls.saturating_add(1);
                        }
                    }

                    let entry = m.type_entry(doc_type);
                    match kind {
                        ExecKind::Query => entry.query_calls = entry.query_calls.saturating_add(1),
                        ExecKind::Mutation => {
                            entry.mutation_calls = entry.mutation_calls.saturating_add(1);
                        }
                    }
                });
            }

            MetricsEvent::QueryFinish { doc_type, rows, .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.rows_returned = m.ops.rows_returned.saturating_add(rows);
                    let entry = m.type_entry(doc_type);
                    entry.rows_returned = entry.rows_returned.saturating_add(rows);
                });
            }

            MetricsEvent::PredicateCache { hit } => {
                metrics::with_state_mut(|m| {
                    if hit {
                        m.ops.predicate_cache_hits = m.ops.predicate_cache_hits.saturating_add(1);
                    } else {
                        m.ops.predicate_cache_misses =
                            m.ops.predicate_cache_misses.saturating_add(1);
                    }
                });
            }

            MetricsEvent::PopulateBatch {
                doc_type,
                requested,
                fetched,
                ..
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.populate_batches = m.ops.populate_batches.saturating_add(1);
                    m.ops.populate_refs_requested =
                        m.ops.populate_refs_requested.saturating_add(requested);
                    m.ops.rows_populated = m.ops.rows_populated.saturating_add(fetched);
                    let entry = m.type_entry(doc_type);
                    entry.rows_populated = entry.rows_populated.saturating_add(fetched);
                });
            }

            MetricsEvent::CycleSkip { .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.populate_cycle_skips = m.ops.populate_cycle_skips.saturating_add(1);
                });
            }

            MetricsEvent::MutationFinish { committed, .. } => {
                metrics::with_state_mut(|m| {
                    if committed {
                        m.mutations.committed = m.mutations.committed.saturating_add(1);
                    } else {
                        m.mutations.aborted = m.mutations.aborted.saturating_add(1);
                    }
                });
            }

            MetricsEvent::HookAbort { doc_type } => {
                metrics::with_state_mut(|m| {
                    let entry = m.type_entry(doc_type);
                    entry.hook_aborts = entry.hook_aborts.saturating_add(1);
                });
            }

            MetricsEvent::AfterHookFailure { failures, .. } => {
                metrics::with_state_mut(|m| {
                    m.mutations.after_hook_failures =
                        m.mutations.after_hook_failures.saturating_add(failures);
                });
            }

            MetricsEvent::Cancelled => {
                metrics::with_state_mut(|m| {
                    m.ops.cancelled = m.ops.cancelled.saturating_add(1);
                });
            }
        }
    }
}

/// Snapshot the current global metrics state.
#[must_use]
pub fn metrics_report() -> EngineMetrics {
    metrics::snapshot()
}

/// Reset all global counters.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

///
/// TESTS
///
