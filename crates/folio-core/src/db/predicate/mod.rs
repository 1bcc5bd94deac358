//! Module: predicate
//! Responsibility: filter expressions, their compilation against the schema, and evaluation.
//! Does not own: storage access; adapters evaluate predicates over their own rows.
//! Boundary: `compile` is the only way from caller filters to adapter predicates.

mod cache;
mod compile;
mod filter;
mod fingerprint;
mod model;
mod runtime;
pub(crate) mod semantics;

#[cfg(test)]
mod tests;

use crate::{error::ErrorKind, model::SchemaError};
use thiserror::Error as ThisError;

pub use cache::PredicateCache;
pub use compile::compile;
pub use filter::{FilterNode, FilterOp};
pub use fingerprint::fingerprint;
pub use model::{ComparePredicate, FieldKind, FieldPath, Operand, PathHop, Predicate};
pub use runtime::{NoLookup, ReferenceLookup};

///
/// FilterError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum FilterError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Operator(#[from] OperatorError),
}

impl FilterError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Schema(_) => ErrorKind::Schema,
            Self::Operator(_) => ErrorKind::Operator,
        }
    }
}

///
/// OperatorError
///
/// Operator or operand not valid for the attribute's value kind.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum OperatorError {
    #[error("unknown operator '{0}'")]
    UnknownOperator(String),

    #[error("operator '{op}' is not supported on '{field}' ({kind})")]
    NotSupported {
        op: FilterOp,
        field: String,
        kind: &'static str,
    },

    #[error("operator '{op}' on '{field}' expects {expected}, found {found}")]
    OperandKind {
        op: FilterOp,
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("'$between' on '{field}' has low > high")]
    InvalidRange { field: String },

    #[error("'{op}' requires at least one condition")]
    EmptyCombinator { op: &'static str },

    #[error("malformed filter: {0}")]
    Malformed(String),
}
