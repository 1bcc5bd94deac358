use crate::{
    db::{
        Engine,
        cancel::CancelToken,
        lifecycle::{Action, MutationParams},
        page::PageResult,
        query::QueryRequest,
    },
    error::{AdapterError, Error},
    value::{Document, DocumentId, Fields, Status},
};

///
/// DocumentService
///
/// CRUD surface for one document type. Custom business logic composes on
/// top of this type instead of patching it; anything that must run on every
/// write belongs in a lifecycle hook.
///

#[derive(Clone, Debug)]
pub struct DocumentService<'a> {
    engine: &'a Engine,
    doc_type: String,
    cancel: CancelToken,
}

impl<'a> DocumentService<'a> {
    pub(crate) fn new(engine: &'a Engine, doc_type: String) -> Self {
        Self {
            engine,
            doc_type,
            cancel: CancelToken::never(),
        }
    }

    /// Run every following call under `cancel`.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn doc_type(&self) -> &str {
        &self.doc_type
    }

    pub async fn find_many(&self, request: &QueryRequest) -> Result<PageResult<Document>, Error> {
        self.engine.query(&self.doc_type, request, &self.cancel).await
    }

    pub async fn find_first(&self, request: &QueryRequest) -> Result<Option<Document>, Error> {
        self.engine
            .find_first(&self.doc_type, request, &self.cancel)
            .await
    }

    pub async fn find_one(
        &self,
        id: impl Into<DocumentId>,
        request: &QueryRequest,
    ) -> Result<Option<Document>, Error> {
        self.engine
            .find_one(&self.doc_type, &id.into(), request, &self.cancel)
            .await
    }

    /// Count with the request's filters and status; paging is ignored.
    pub async fn count(&self, request: &QueryRequest) -> Result<u64, Error> {
        self.engine
            .count(
                &self.doc_type,
                request.filters.as_ref(),
                request.status,
                &self.cancel,
            )
            .await
    }

    /// Create a document. Draft/publish types create a draft unless
    /// `status` is `Published`.
    pub async fn create(&self, data: Fields, status: Option<Status>) -> Result<Document, Error> {
        let params = MutationParams {
            data,
            document_id: None,
            status,
        };

        self.mutate(Action::Create, params)
            .await?
            .ok_or_else(|| AdapterError::new(format!("create on '{}' returned no document", self.doc_type)).into())
    }

    pub async fn update(
        &self,
        id: impl Into<DocumentId>,
        data: Fields,
        status: Option<Status>,
    ) -> Result<Option<Document>, Error> {
        let params = MutationParams {
            data,
            document_id: Some(id.into()),
            status,
        };

        self.mutate(Action::Update, params).await
    }

    /// Delete every version of a document; returns what was removed.
    pub async fn delete(&self, id: impl Into<DocumentId>) -> Result<Option<Document>, Error> {
        self.mutate(Action::Delete, targeted(id)).await
    }

    pub async fn publish(&self, id: impl Into<DocumentId>) -> Result<Option<Document>, Error> {
        self.mutate(Action::Publish, targeted(id)).await
    }

    pub async fn unpublish(&self, id: impl Into<DocumentId>) -> Result<Option<Document>, Error> {
        self.mutate(Action::Unpublish, targeted(id)).await
    }

    /// Run any action with caller-built params.
    pub async fn mutate(
        &self,
        action: Action,
        params: MutationParams,
    ) -> Result<Option<Document>, Error> {
        self.engine
            .mutate(&self.doc_type, action, params, &self.cancel)
            .await
    }
}

fn targeted(id: impl Into<DocumentId>) -> MutationParams {
    MutationParams {
        document_id: Some(id.into()),
        ..MutationParams::default()
    }
}
