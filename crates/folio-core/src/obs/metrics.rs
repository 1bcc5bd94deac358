use serde::Serialize;
use std::{
    collections::BTreeMap,
    sync::{Mutex, PoisonError},
};

static STATE: Mutex<EngineMetrics> = Mutex::new(EngineMetrics::new());

///
/// EngineMetrics
/// Ephemeral, process-global counters for queries, population, and mutations.
///

#[derive(Clone, Debug, Default, Serialize)]
pub struct EngineMetrics {
    pub ops: OpCounters,
    pub mutations: MutationCounters,
    pub types: BTreeMap<String, TypeCounters>,
}

impl EngineMetrics {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ops: OpCounters::new(),
            mutations: MutationCounters::new(),
            types: BTreeMap::new(),
        }
    }

    pub(crate) fn type_entry(&mut self, doc_type: &str) -> &mut TypeCounters {
        self.types.entry(doc_type.to_string()).or_default()
    }
}

///
/// OpCounters
///

#[derive(Clone, Debug, Default, Serialize)]
pub struct OpCounters {
    // Entrypoints
    pub query_calls: u64,
    pub mutation_calls: u64,

    // Rows
    pub rows_returned: u64,
    pub rows_populated: u64,

    // Population
    pub populate_batches: u64,
    pub populate_refs_requested: u64,
    pub populate_cycle_skips: u64,

    // Predicate cache
    pub predicate_cache_hits: u64,
    pub predicate_cache_misses: u64,

    pub cancelled: u64,
}

impl OpCounters {
    const fn new() -> Self {
        Self {
            query_calls: 0,
            mutation_calls: 0,
            rows_returned: 0,
            rows_populated: 0,
            populate_batches: 0,
            populate_refs_requested: 0,
            populate_cycle_skips: 0,
            predicate_cache_hits: 0,
            predicate_cache_misses: 0,
            cancelled: 0,
        }
    }
}

///
/// MutationCounters
///

#[derive(Clone, Debug, Default, Serialize)]
pub struct MutationCounters {
    pub committed: u64,
    pub aborted: u64,
    pub after_hook_failures: u64,
}

impl MutationCounters {
    const fn new() -> Self {
        Self {
            committed: 0,
            aborted: 0,
            after_hook_failures: 0,
        }
    }
}

///
/// TypeCounters
///

#[derive(Clone, Debug, Default, Serialize)]
pub struct TypeCounters {
    pub query_calls: u64,
    pub mutation_calls: u64,
    pub rows_returned: u64,
    pub rows_populated: u64,
    pub hook_aborts: u64,
}

pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EngineMetrics) -> R) -> R {
    let mut state = STATE.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut state)
}

pub(crate) fn snapshot() -> EngineMetrics {
    STATE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EngineMetrics::new());
}
