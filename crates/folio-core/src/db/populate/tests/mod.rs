
use crate::{
    db::{
        cancel::CancelToken,
        populate::{PopulatePlan, PopulateSpec, Resolver},
        predicate::PredicateCache,
        store::MemoryStore,
    },
    error::Error,
    obs::{MetricsEvent, MetricsSink},
    test_support::blog_registry,
    value::{Document, Status, Value},
};
use std::sync::{Mutex, PoisonError};

///
/// EventLog
///
/// Sink that keeps the populate events it sees.
///

#[derive(Default)]
struct EventLog {
    batches: Mutex<Vec<(String, String, u64, u64)>>,
    cycle_skips: Mutex<u64>,
}

impl EventLog {
    fn batches(&self) -> Vec<(String, String, u64, u64)> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn cycle_skips(&self) -> u64 {
        *self.cycle_skips.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MetricsSink for EventLog {
    fn record(&self, event: MetricsEvent<'_>) {
        match event {
            MetricsEvent::PopulateBatch {
                doc_type,
                attribute,
                requested,
                fetched,
            } => self
                .batches
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((doc_type.to_string(), attribute.to_string(), requested, fetched)),
            MetricsEvent::CycleSkip { .. } => {
                *self.cycle_skips.lock().unwrap_or_else(PoisonError::into_inner) += 1;
            }
            _ => {}
        }
    }
}

fn plan(spec: &PopulateSpec) -> PopulatePlan {
    let registry = blog_registry();
    let article = registry.try_get("article").unwrap();

    PopulatePlan::build(&registry, article, spec, &PredicateCache::new(8)).unwrap()
}

async fn populate_with(
    store: &MemoryStore,
    sink: &EventLog,
    roots: &mut [Document],
    spec: &PopulateSpec,
    cancel: &CancelToken,
) -> Result<(), Error> {
    let plan = plan(spec);

    Resolver::new(store, Some(Status::Published), cancel, sink)
        .resolve(roots, &plan)
        .await
}

async fn populate(store: &MemoryStore, roots: &mut [Document], spec: &PopulateSpec) -> Result<(), Error> {
    populate_with(store, &EventLog::default(), roots, spec, &CancelToken::never()).await
}

fn published(store: &MemoryStore, id: &str) -> Document {
    store
        .get("article", &id.into(), Some(Status::Published))
        .unwrap()
}

fn doc(value: Option<&Value>) -> &Document {
    value
        .and_then(Value::as_document)
        .expect("expected a populated document")
}
