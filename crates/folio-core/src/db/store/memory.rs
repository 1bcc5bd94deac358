use crate::{
    db::{
        predicate::{Predicate, ReferenceLookup, semantics},
        store::{DocumentStore, FetchWindow, Projection, SortDirection, WriteOp},
    },
    error::AdapterError,
    model::{CREATED_AT, PUBLISHED_AT, ScalarKind, SchemaRegistry, UPDATED_AT},
    value::{Document, DocumentId, Fields, Status, Value, datetime},
};
use async_trait::async_trait;
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    sync::{
        Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use ulid::Generator;

type Tables = BTreeMap<String, BTreeMap<DocumentId, Versions>>;

///
/// Versions
///
/// Draft and published copies of one document. Types without
/// draft/publish keep their single version in `published`.
///

#[derive(Clone, Debug, Default)]
struct Versions {
    draft: Option<Document>,
    published: Option<Document>,
}

impl Versions {
    const fn get(&self, status: Option<Status>) -> Option<&Document> {
        match status {
            Some(Status::Draft) => self.draft.as_ref(),
            Some(Status::Published) | None => self.published.as_ref(),
        }
    }

    const fn slot_mut(&mut self, status: Option<Status>) -> &mut Option<Document> {
        match status {
            Some(Status::Draft) => &mut self.draft,
            Some(Status::Published) | None => &mut self.published,
        }
    }
}

///
/// MemoryStore
///
/// In-memory reference adapter. Linear scans, no persistence.
/// Also carries test hooks: per-type failure injection, artificial
/// latency, and operation counters.
///

pub struct MemoryStore {
    registry: Arc<SchemaRegistry>,
    tables: RwLock<Tables>,
    ids: Mutex<Generator>,
    failing: RwLock<BTreeSet<String>>,
    latency: Option<Duration>,
    reference_fetches: AtomicU64,
    writes: AtomicU64,
}

impl MemoryStore {
    #[must_use]
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            tables: RwLock::new(Tables::new()),
            ids: Mutex::new(Generator::new()),
            failing: RwLock::new(BTreeSet::new()),
            latency: None,
            reference_fetches: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    /// Delay every adapter call by `latency`.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Store a document as-is, bypassing the write path.
    ///
    /// A published document of a draft/publish type also seeds its draft
    /// when none exists.
    pub fn insert(&self, document: Document) {
        let has_draft_and_publish = self
            .registry
            .get(document.doc_type())
            .is_some_and(|doc_type| doc_type.has_draft_and_publish());

        let mut tables = self.write_tables();
        let versions = tables
            .entry(document.doc_type().to_string())
            .or_default()
            .entry(document.id().clone())
            .or_default();

        if has_draft_and_publish && document.status() == Some(Status::Published) && versions.draft.is_none() {
            let mut draft = document.clone();
            draft.set_status(Some(Status::Draft));
            versions.draft = Some(draft);
        }
        let status = document.status();
        *versions.slot_mut(status) = Some(document);
    }

    /// Read one stored version without going through the adapter contract.
    #[must_use]
    pub fn get(&self, doc_type: &str, id: &DocumentId, status: Option<Status>) -> Option<Document> {
        self.read_tables()
            .get(doc_type)
            .and_then(|table| table.get(id))
            .and_then(|versions| versions.get(status))
            .cloned()
    }

    /// Make every subsequent call touching `doc_type` fail.
    pub fn fail_type(&self, doc_type: &str) {
        self.failing
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(doc_type.to_string());
    }

    /// Number of `fetch_by_references` calls served.
    #[must_use]
    pub fn reference_fetches(&self) -> u64 {
        self.reference_fetches.load(Ordering::Relaxed)
    }

    /// Number of `write` calls served.
    #[must_use]
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    async fn enter(&self, doc_type: &str) -> Result<(), AdapterError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let failing = self.failing.read().unwrap_or_else(PoisonError::into_inner);
        if failing.contains(doc_type) {
            return Err(AdapterError::new(format!("injected failure for '{doc_type}'")));
        }

        Ok(())
    }

    fn read_tables(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_tables(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_id(&self) -> Result<DocumentId, AdapterError> {
        let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        let ulid = ids
            .generate()
            .map_err(|err| AdapterError::with_source("id generation failed", err))?;

        Ok(DocumentId::from_ulid(ulid))
    }

    fn has_draft_and_publish(&self, doc_type: &str) -> bool {
        self.registry
            .get(doc_type)
            .is_some_and(|doc_type| doc_type.has_draft_and_publish())
    }

    fn scalar_kind(&self, doc_type: &str, field: &str) -> Option<ScalarKind> {
        self.registry
            .get(doc_type)?
            .attribute_def(field)?
            .kind
            .scalar()
    }

    fn matching<'a>(
        &'a self,
        tables: &'a Tables,
        doc_type: &str,
        predicate: &Predicate,
        status: Option<Status>,
    ) -> Vec<&'a Document> {
        let lookup = TableLookup {
            registry: &self.registry,
            tables,
            status,
        };

        tables
            .get(doc_type)
            .into_iter()
            .flat_map(BTreeMap::values)
            .filter_map(|versions| versions.get(status))
            .filter(|document| predicate.matches(document, &lookup))
            .collect()
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("types", &self.read_tables().len())
            .field("latency", &self.latency)
            .field("reference_fetches", &self.reference_fetches())
            .field("writes", &self.writes())
            .finish_non_exhaustive()
    }
}

///
/// TableLookup
///
/// Follows relation hops during predicate evaluation. Targets with
/// draft/publish are read at the caller's status (published by default).
///

struct TableLookup<'a> {
    registry: &'a SchemaRegistry,
    tables: &'a Tables,
    status: Option<Status>,
}

impl ReferenceLookup for TableLookup<'_> {
    fn lookup(&self, doc_type: &str, id: &DocumentId) -> Option<&Document> {
        let status = self
            .registry
            .get(doc_type)
            .filter(|target| target.has_draft_and_publish())
            .map(|_| self.status.unwrap_or(Status::Published));

        self.tables.get(doc_type)?.get(id)?.get(status)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn count(
        &self,
        doc_type: &str,
        predicate: &Predicate,
        status: Option<Status>,
    ) -> Result<u64, AdapterError> {
        self.enter(doc_type).await?;
        let tables = self.read_tables();
        let count = self.matching(&tables, doc_type, predicate, status).len();

        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn fetch_page(
        &self,
        doc_type: &str,
        predicate: &Predicate,
        status: Option<Status>,
        window: &FetchWindow,
    ) -> Result<Vec<Document>, AdapterError> {
        self.enter(doc_type).await?;
        let tables = self.read_tables();
        let mut rows = self.matching(&tables, doc_type, predicate, status);

        // Stable sort over id-ordered rows keeps ties deterministic.
        let kinds: Vec<Option<ScalarKind>> = window
            .sort
            .iter()
            .map(|spec| self.scalar_kind(doc_type, &spec.field))
            .collect();
        rows.sort_by(|left, right| {
            for (spec, kind) in window.sort.iter().zip(&kinds) {
                let ord = semantics::canonical_cmp(
                    sort_key(left, &spec.field, *kind).as_ref(),
                    sort_key(right, &spec.field, *kind).as_ref(),
                );
                let ord = match spec.direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                };
                if ord.is_ne() {
                    return ord;
                }
            }
            std::cmp::Ordering::Equal
        });

        let start = usize::try_from(window.start).unwrap_or(usize::MAX);
        let limit = usize::try_from(window.limit).unwrap_or(usize::MAX);

        Ok(rows
            .into_iter()
            .skip(start)
            .take(limit)
            .map(|document| window.projection.apply(document.clone()))
            .collect())
    }

    async fn fetch_by_references(
        &self,
        doc_type: &str,
        ids: &[DocumentId],
        filter: Option<&Predicate>,
        projection: &Projection,
        status: Option<Status>,
    ) -> Result<Vec<Document>, AdapterError> {
        self.enter(doc_type).await?;
        self.reference_fetches.fetch_add(1, Ordering::Relaxed);

        let tables = self.read_tables();
        let Some(table) = tables.get(doc_type) else {
            return Ok(Vec::new());
        };
        let lookup = TableLookup {
            registry: &self.registry,
            tables: &tables,
            status,
        };

        let mut seen = BTreeSet::new();
        Ok(ids
            .iter()
            .filter(|id| seen.insert(*id))
            .filter_map(|id| table.get(id).and_then(|versions| versions.get(status)))
            .filter(|document| filter.is_none_or(|predicate| predicate.matches(document, &lookup)))
            .map(|document| projection.apply(document.clone()))
            .collect())
    }

    async fn write(&self, doc_type: &str, op: WriteOp) -> Result<Option<Document>, AdapterError> {
        self.enter(doc_type).await?;
        self.writes.fetch_add(1, Ordering::Relaxed);

        let now = datetime::now_rfc3339()
            .map_err(|err| AdapterError::with_source("timestamp formatting failed", err))?;
        let draft_and_publish = self.has_draft_and_publish(doc_type);

        match op {
            WriteOp::Create { data, status } => {
                let id = self.next_id()?;
                let mut document = Document::new(doc_type, id.clone());
                *document.fields_mut() = data;
                document.set(CREATED_AT, now.as_str());
                document.set(UPDATED_AT, now.as_str());

                let mut versions = Versions::default();
                if draft_and_publish {
                    document.set_status(Some(Status::Draft));
                    document.set(PUBLISHED_AT, Value::Null);
                    if status == Some(Status::Published) {
                        versions.published = Some(published_copy(&document, &now));
                    }
                    versions.draft = Some(document);
                } else {
                    versions.published = Some(document);
                }

                let result = versions.get(status).or(versions.draft.as_ref()).cloned();
                self.write_tables()
                    .entry(doc_type.to_string())
                    .or_default()
                    .insert(id, versions);

                Ok(result)
            }

            WriteOp::Update { id, data, status } => {
                let mut tables = self.write_tables();
                let Some(versions) = tables.get_mut(doc_type).and_then(|table| table.get_mut(&id))
                else {
                    return Ok(None);
                };

                let editable = if draft_and_publish {
                    Some(Status::Draft)
                } else {
                    None
                };
                let Some(document) = versions.slot_mut(editable).as_mut() else {
                    return Ok(None);
                };
                merge(document.fields_mut(), data);
                document.set(UPDATED_AT, now.as_str());

                if draft_and_publish && status == Some(Status::Published) {
                    let published = published_copy(document, &now);
                    versions.published = Some(published.clone());
                    return Ok(Some(published));
                }

                Ok(versions.get(editable).cloned())
            }

            WriteOp::Delete { id } => {
                let removed = self
                    .write_tables()
                    .get_mut(doc_type)
                    .and_then(|table| table.remove(&id));

                Ok(removed.and_then(|versions| versions.published.or(versions.draft)))
            }

            WriteOp::Publish { id } => {
                let mut tables = self.write_tables();
                let Some(versions) = tables.get_mut(doc_type).and_then(|table| table.get_mut(&id))
                else {
                    return Ok(None);
                };
                let Some(draft) = versions.draft.as_ref() else {
                    return Ok(None);
                };

                let published = published_copy(draft, &now);
                versions.published = Some(published.clone());

                Ok(Some(published))
            }

            WriteOp::Unpublish { id } => {
                let mut tables = self.write_tables();
                let Some(versions) = tables.get_mut(doc_type).and_then(|table| table.get_mut(&id))
                else {
                    return Ok(None);
                };
                versions.published = None;

                Ok(versions.draft.clone())
            }
        }
    }
}

// Datetimes sort by instant, not by their text form.
fn sort_key(document: &Document, field: &str, kind: Option<ScalarKind>) -> Option<Value> {
    let value = document.value_of(field)?;
    match kind {
        Some(kind) => semantics::normalize(kind, &value).or(Some(value)),
        None => Some(value),
    }
}

fn published_copy(draft: &Document, now: &str) -> Document {
    let mut published = draft.clone();
    published.set_status(Some(Status::Published));
    published.set(PUBLISHED_AT, now);

    published
}

fn merge(fields: &mut Fields, data: Fields) {
    for (name, value) in data {
        fields.insert(name, value);
    }
}
