//! Module: populate
//! Responsibility: expand relation references on fetched documents.
//! Does not own: root fetching or pagination; callers hand over the page.
//! Boundary: specs are validated into a `PopulatePlan` before any fetch runs.

mod plan;
mod resolve;
mod spec;

#[cfg(test)]
mod tests;

use crate::{db::predicate::FilterError, error::ErrorKind, model::SchemaError};
use thiserror::Error as ThisError;

pub use plan::PopulatePlan;
pub use spec::{PopulateNode, PopulateShape, PopulateSpec};

pub(crate) use resolve::Resolver;

///
/// PopulateError
///
/// Invalid populate request. Raised while planning, never mid-resolution.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum PopulateError {
    #[error("'{attribute}' on '{doc_type}' is not a relation, polymorphic, or dynamic-zone attribute")]
    UnknownAttribute { doc_type: String, attribute: String },

    #[error("'onVariant' is only valid on polymorphic or dynamic-zone attributes ('{doc_type}.{attribute}')")]
    VariantsNotSupported { doc_type: String, attribute: String },

    #[error("'{variant}' is not a permissible variant of '{doc_type}.{attribute}'")]
    UnknownVariant {
        doc_type: String,
        attribute: String,
        variant: String,
    },

    #[error("malformed populate: {0}")]
    Malformed(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Filter(#[from] FilterError),
}

impl PopulateError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownAttribute { .. }
            | Self::VariantsNotSupported { .. }
            | Self::UnknownVariant { .. }
            | Self::Malformed(_) => ErrorKind::UnknownAttribute,
            Self::Schema(_) => ErrorKind::Schema,
            Self::Filter(err) => err.kind(),
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }
}
