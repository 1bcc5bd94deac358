//! Core runtime for Folio: schema registry, filter compilation, relation
//! population, pagination, and the mutation lifecycle, behind `db::Engine`.

// public exports are one module level down
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod obs;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

pub use error::Error;

///
/// Prelude
///
/// Domain vocabulary plus the engine entry points.
/// No stores, sinks, or error internals are re-exported here.
///

pub mod prelude {
    pub use crate::{
        db::{
            DocumentService, Engine,
            cancel::CancelToken,
            lifecycle::{Action, HookAbort, HookFailure, LifecycleRegistry, MutationEvent},
            page::{PageRequest, PageResult},
            populate::{PopulateNode, PopulateSpec},
            predicate::{FilterNode, FilterOp},
            query::QueryRequest,
            store::SortSpec,
        },
        model::{AttributeKind, DocumentType, SchemaRegistry},
        value::{Document, DocumentId, Status, Value, Variant},
    };
}
