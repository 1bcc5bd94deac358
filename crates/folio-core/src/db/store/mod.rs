//! Module: store
//! Responsibility: the storage adapter contract consumed by the engine.
//! Does not own: persistence; adapters decide how documents are stored.
//! Boundary: every read and write the engine performs goes through `DocumentStore`.

mod memory;


use crate::{
    db::predicate::Predicate,
    error::AdapterError,
    value::{Document, DocumentId, Fields, Status},
};
use async_trait::async_trait;
use std::{collections::BTreeSet, fmt};

pub use memory::MemoryStore;

///
/// DocumentStore
///
/// Storage adapter contract. Implementations must honor predicates exactly
/// as `Predicate::matches` evaluates them and must be cancel-safe: the
/// engine drops in-flight futures when the caller's token fires.
///

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Count documents of `doc_type` matching `predicate` at `status`.
    async fn count(
        &self,
        doc_type: &str,
        predicate: &Predicate,
        status: Option<Status>,
    ) -> Result<u64, AdapterError>;

    /// Fetch one bounded, ordered page of matching documents.
    async fn fetch_page(
        &self,
        doc_type: &str,
        predicate: &Predicate,
        status: Option<Status>,
        window: &FetchWindow,
    ) -> Result<Vec<Document>, AdapterError>;

    /// Fetch documents by identifier, keeping only those that match `filter`.
    /// Missing identifiers are skipped; order follows `ids`.
    async fn fetch_by_references(
        &self,
        doc_type: &str,
        ids: &[DocumentId],
        filter: Option<&Predicate>,
        projection: &Projection,
        status: Option<Status>,
    ) -> Result<Vec<Document>, AdapterError>;

    /// Apply one write. Returns the affected document, or `None` when the
    /// target does not exist.
    async fn write(&self, doc_type: &str, op: WriteOp) -> Result<Option<Document>, AdapterError>;
}

///
/// FetchWindow
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FetchWindow {
    pub start: u64,
    pub limit: u32,
    pub sort: Vec<SortSpec>,
    pub projection: Projection,
}

///
/// Projection
///
/// Stored attributes returned by a fetch. Identity and status are always
/// returned.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum Projection {
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl Projection {
    #[must_use]
    pub fn only<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(fields.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn includes(&self, field: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(fields) => fields.contains(field),
        }
    }

    /// Add attributes that must survive projection (e.g. populated relations).
    pub fn extend<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Self::Only(set) = self {
            set.extend(fields.into_iter().map(Into::into));
        }
    }

    /// Apply this projection to a fetched document.
    #[must_use]
    pub fn apply(&self, mut document: Document) -> Document {
        self.retain(&mut document);
        document
    }

    pub fn retain(&self, document: &mut Document) {
        if let Self::Only(fields) = self {
            document.retain_fields(|name| fields.contains(name));
        }
    }
}

///
/// SortDirection
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

///
/// SortSpec
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    #[must_use]
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    #[must_use]
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Parse `field`, `field:asc`, or `field:desc`.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let (field, direction) = match input.split_once(':') {
            None => (input, SortDirection::Asc),
            Some((field, dir)) if dir.eq_ignore_ascii_case("asc") => (field, SortDirection::Asc),
            Some((field, dir)) if dir.eq_ignore_ascii_case("desc") => (field, SortDirection::Desc),
            Some(_) => return None,
        };
        if field.is_empty() {
            return None;
        }

        Some(Self {
            field: field.to_string(),
            direction,
        })
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = match self.direction {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        };
        write!(f, "{}:{dir}", self.field)
    }
}

///
/// WriteOp
///

#[derive(Clone, Debug, PartialEq)]
pub enum WriteOp {
    /// Create a document. Draft/publish types create a draft and, with
    /// `Published`, publish it in the same write.
    Create {
        data: Fields,
        status: Option<Status>,
    },
    /// Merge `data` into an existing document.
    Update {
        id: DocumentId,
        data: Fields,
        status: Option<Status>,
    },
    /// Remove every version; returns the removed snapshot.
    Delete { id: DocumentId },
    Publish { id: DocumentId },
    Unpublish { id: DocumentId },
}

impl WriteOp {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
            Self::Publish { .. } => "publish",
            Self::Unpublish { .. } => "unpublish",
        }
    }
}
