use crate::{
    config::{ConfigError, EngineConfig},
    db::{
        cancel::CancelToken,
        lifecycle::{Action, LifecycleRegistry, MutationParams, Pipeline},
        page::{PageRequest, PageResult},
        populate::{PopulatePlan, Resolver},
        predicate::{FilterNode, Predicate, PredicateCache},
        query::QueryRequest,
        service::DocumentService,
        store::{DocumentStore, FetchWindow, Projection, SortSpec},
    },
    error::Error,
    model::{DOCUMENT_ID, DocumentType, SchemaError, SchemaRegistry},
    obs::{ExecKind, GlobalMetricsSink, MetricsEvent, MetricsSink},
    value::{Document, DocumentId, Status},
};
use std::{collections::BTreeSet, fmt, sync::Arc};
use tracing::debug;

///
/// Engine
///
/// Query orchestrator and mutation entry point over one schema, one storage
/// adapter, and one frozen hook registry. Shareable across tasks; the only
/// interior mutability is the predicate cache.
///

pub struct Engine {
    registry: Arc<SchemaRegistry>,
    store: Arc<dyn DocumentStore>,
    hooks: LifecycleRegistry,
    config: EngineConfig,
    sink: Arc<dyn MetricsSink>,
    predicates: PredicateCache,
}

impl Engine {
    #[must_use]
    pub fn builder(registry: Arc<SchemaRegistry>, store: Arc<dyn DocumentStore>) -> EngineBuilder {
        EngineBuilder {
            registry,
            store,
            hooks: LifecycleRegistry::default(),
            config: EngineConfig::default(),
            sink: Arc::new(GlobalMetricsSink),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Service bound to one document type.
    #[must_use]
    pub fn documents(&self, doc_type: impl Into<String>) -> DocumentService<'_> {
        DocumentService::new(self, doc_type.into())
    }

    //
    // Reads
    //

    /// Run one query: compile filters, fetch the count and the page
    /// concurrently, populate the page, and attach page metadata.
    pub async fn query(
        &self,
        doc_type: &str,
        request: &QueryRequest,
        cancel: &CancelToken,
    ) -> Result<PageResult<Document>, Error> {
        let definition = self.registry.try_collection(doc_type)?;
        self.sink.record(MetricsEvent::ExecStart {
            kind: ExecKind::Query,
            doc_type,
        });

        let status = definition.resolve_status(request.status)?;
        let predicate = self.predicate(definition, request.filters.as_ref())?;
        let plan = PopulatePlan::build(&self.registry, definition, &request.populate, &self.predicates)?;
        let window = request.page.window(&self.config.pagination)?;
        let fetch = FetchWindow {
            start: window.start,
            limit: window.limit,
            sort: sort_specs(definition, &request.sort)?,
            projection: root_projection(definition, request.fields.as_ref(), &plan)?,
        };
        if self.config.debug {
            debug!(doc_type, ?predicate, ?plan, ?fetch, "query plan");
        }

        let cancel = self.deadline(cancel);
        let count = self.store.count(doc_type, &predicate, status);
        let page = self.store.fetch_page(doc_type, &predicate, status, &fetch);
        let (total, mut data) = self
            .observe(
                cancel
                    .run(async move { tokio::try_join!(count, page).map_err(Error::from) })
                    .await,
            )?;

        if !plan.is_empty() {
            let resolved = Resolver::new(self.store.as_ref(), status, &cancel, self.sink.as_ref())
                .resolve(&mut data, &plan)
                .await;
            self.observe(resolved)?;
        }

        let meta = window.meta(total);
        let rows = u64::try_from(data.len()).unwrap_or(u64::MAX);
        self.sink.record(MetricsEvent::QueryFinish {
            doc_type,
            rows,
            total,
        });
        debug!(doc_type, rows, total, page = meta.page, "query finished");

        Ok(PageResult::new(data, meta))
    }

    /// First document of the query's order (`pageSize = 1`).
    pub async fn find_first(
        &self,
        doc_type: &str,
        request: &QueryRequest,
        cancel: &CancelToken,
    ) -> Result<Option<Document>, Error> {
        let request = request.clone().page(PageRequest::page(1, 1));
        let page = self.query(doc_type, &request, cancel).await?;

        Ok(page.data.into_iter().next())
    }

    /// One document by identifier, shaped by `request` (populate, fields,
    /// status). Additional filters still apply.
    pub async fn find_one(
        &self,
        doc_type: &str,
        id: &DocumentId,
        request: &QueryRequest,
        cancel: &CancelToken,
    ) -> Result<Option<Document>, Error> {
        let request = request
            .clone()
            .filter(FilterNode::eq(DOCUMENT_ID, id.as_str()));

        self.find_first(doc_type, &request, cancel).await
    }

    /// Count documents matching `filters` at `status`.
    pub async fn count(
        &self,
        doc_type: &str,
        filters: Option<&FilterNode>,
        status: Option<Status>,
        cancel: &CancelToken,
    ) -> Result<u64, Error> {
        let definition = self.registry.try_collection(doc_type)?;
        let status = definition.resolve_status(status)?;
        let predicate = self.predicate(definition, filters)?;
        let cancel = self.deadline(cancel);

        self.observe(
            cancel
                .run(async {
                    self.store
                        .count(doc_type, &predicate, status)
                        .await
                        .map_err(Error::from)
                })
                .await,
        )
    }

    //
    // Writes
    //

    /// Run one mutation through the lifecycle pipeline.
    pub async fn mutate(
        &self,
        doc_type: &str,
        action: Action,
        params: MutationParams,
        cancel: &CancelToken,
    ) -> Result<Option<Document>, Error> {
        let cancel = self.deadline(cancel);
        let pipeline = Pipeline::new(
            &self.registry,
            &self.hooks,
            self.store.as_ref(),
            &cancel,
            self.sink.as_ref(),
        );

        pipeline.run(doc_type, action, params).await
    }

    //
    // Internals
    //

    fn predicate(
        &self,
        definition: &DocumentType,
        filters: Option<&FilterNode>,
    ) -> Result<Arc<Predicate>, Error> {
        let Some(node) = filters else {
            return Ok(Arc::new(Predicate::True));
        };
        let (predicate, hit) = self.predicates.get_or_compile(&self.registry, definition, node)?;
        self.sink.record(MetricsEvent::PredicateCache { hit });

        Ok(predicate)
    }

    // The configured timeout tightens, never loosens, the caller's deadline.
    fn deadline(&self, cancel: &CancelToken) -> CancelToken {
        match self.config.query.timeout() {
            Some(timeout) => cancel.clone().with_timeout(timeout),
            None => cancel.clone(),
        }
    }

    fn observe<T>(&self, result: Result<T, Error>) -> Result<T, Error> {
        if matches!(result, Err(Error::Cancelled(_))) {
            self.sink.record(MetricsEvent::Cancelled);
        }

        result
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("types", &self.registry.len())
            .field("hooks", &self.hooks)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

///
/// EngineBuilder
///

pub struct EngineBuilder {
    registry: Arc<SchemaRegistry>,
    store: Arc<dyn DocumentStore>,
    hooks: LifecycleRegistry,
    config: EngineConfig,
    sink: Arc<dyn MetricsSink>,
}

impl EngineBuilder {
    #[must_use]
    pub fn lifecycle(mut self, hooks: LifecycleRegistry) -> Self {
        self.hooks = hooks;
        self
    }

    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Validate the configuration and that every hooked type is a
    /// registered collection type.
    pub fn build(self) -> Result<Engine, ConfigError> {
        self.config.validate()?;
        for doc_type in self.hooks.doc_types() {
            if self.registry.try_collection(doc_type).is_err() {
                return Err(ConfigError::Invalid(format!(
                    "lifecycle hooks registered for unknown collection type '{doc_type}'"
                )));
            }
        }

        let predicates = PredicateCache::new(self.config.query.predicate_cache_capacity);

        Ok(Engine {
            registry: self.registry,
            store: self.store,
            hooks: self.hooks,
            config: self.config,
            sink: self.sink,
            predicates,
        })
    }
}

fn sort_specs(definition: &DocumentType, sort: &[SortSpec]) -> Result<Vec<SortSpec>, SchemaError> {
    for spec in sort {
        let attribute = definition.try_attribute(&spec.field)?;
        if !attribute.kind.scalar().is_some_and(|kind| kind.is_orderable()) {
            return Err(SchemaError::NotSortable {
                doc_type: definition.name().to_string(),
                field: spec.field.clone(),
                kind: attribute.kind.label(),
            });
        }
    }

    Ok(sort.to_vec())
}

// Populated relations always survive root field selection.
fn root_projection(
    definition: &DocumentType,
    fields: Option<&BTreeSet<String>>,
    plan: &PopulatePlan,
) -> Result<Projection, SchemaError> {
    let Some(fields) = fields else {
        return Ok(Projection::All);
    };
    for field in fields {
        definition.try_attribute(field)?;
    }

    let mut projection = Projection::Only(fields.clone());
    projection.extend(plan.attributes());

    Ok(projection)
}
