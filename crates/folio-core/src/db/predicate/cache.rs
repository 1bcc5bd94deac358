use crate::{
    db::predicate::{FilterError, FilterNode, Predicate, compile, fingerprint},
    model::{DocumentType, SchemaRegistry},
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

type CacheKey = (String, [u8; 32]);

///
/// PredicateCache
///
/// Compiled predicates keyed by `(doc_type, fingerprint)`. Cleared wholesale
/// when full; a capacity of zero disables caching.
///

#[derive(Debug)]
pub struct PredicateCache {
    capacity: usize,
    entries: Mutex<HashMap<CacheKey, Arc<Predicate>>>,
}

impl PredicateCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached predicate or compile and insert it.
    /// The flag reports whether the cache was hit.
    pub fn get_or_compile(
        &self,
        registry: &SchemaRegistry,
        doc_type: &DocumentType,
        node: &FilterNode,
    ) -> Result<(Arc<Predicate>, bool), FilterError> {
        if self.capacity == 0 {
            return Ok((Arc::new(compile(registry, doc_type, node)?), false));
        }

        let key = (doc_type.name().to_string(), fingerprint(node));
        if let Some(hit) = self.lock().get(&key) {
            return Ok((Arc::clone(hit), true));
        }

        // Compile outside the lock; a racing insert of the same key is harmless.
        let predicate = Arc::new(compile(registry, doc_type, node)?);
        let mut entries = self.lock();
        if entries.len() >= self.capacity {
            entries.clear();
        }
        entries.insert(key, Arc::clone(&predicate));

        Ok((predicate, false))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, Arc<Predicate>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
