use crate::{
    config::ConfigError,
    db::{
        cancel::Cancelled,
        lifecycle::{AfterHookError, HookAbort},
        page::PageError,
        populate::PopulateError,
        predicate::FilterError,
        query::QueryError,
    },
    model::SchemaError,
};
use std::fmt;
use thiserror::Error as ThisError;

///
/// Error
///
/// Public error surface of the engine. Each variant keeps its specific
/// module error so transport layers can map `kind()` to a status.
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Populate(#[from] PopulateError),

    #[error(transparent)]
    Page(#[from] PageError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    HookAbort(#[from] HookAbort),

    #[error(transparent)]
    AfterHook(#[from] AfterHookError),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl Error {
    /// Classify this error into the stable taxonomy.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Schema(_) => ErrorKind::Schema,
            Self::Filter(err) => err.kind(),
            Self::Populate(err) => err.kind(),
            Self::Page(_) => ErrorKind::Range,
            Self::Query(err) => err.kind(),
            Self::HookAbort(_) => ErrorKind::HookAbort,
            Self::AfterHook(_) => ErrorKind::AfterHook,
            Self::Cancelled(_) => ErrorKind::Cancelled,
            Self::Adapter(_) => ErrorKind::Adapter,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    #[must_use]
    pub fn display_with_kind(&self) -> String {
        format!("{}: {self}", self.kind())
    }
}

///
/// ErrorKind
///
/// Stable error taxonomy.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    /// Unknown type, field, or attribute.
    Schema,
    /// Operator or operand not valid for the attribute kind.
    Operator,
    /// Populate key is not a relation or names an unknown variant.
    UnknownAttribute,
    /// Pagination bounds out of range.
    Range,
    /// A before-hook rejected the mutation.
    HookAbort,
    /// One or more after-hooks failed after the write committed.
    AfterHook,
    /// The caller withdrew the request or its deadline passed.
    Cancelled,
    /// Opaque storage adapter failure.
    Adapter,
    /// Invalid engine configuration.
    Config,
}

impl ErrorKind {
    /// True when the caller can fix the request; false for system faults.
    #[must_use]
    pub const fn is_caller_error(self) -> bool {
        matches!(
            self,
            Self::Schema | Self::Operator | Self::UnknownAttribute | Self::Range | Self::HookAbort
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Schema => "schema",
            Self::Operator => "operator",
            Self::UnknownAttribute => "unknown_attribute",
            Self::Range => "range",
            Self::HookAbort => "hook_abort",
            Self::AfterHook => "after_hook",
            Self::Cancelled => "cancelled",
            Self::Adapter => "adapter",
            Self::Config => "config",
        };
        write!(f, "{label}")
    }
}

///
/// AdapterError
///
/// Opaque failure raised by a storage adapter. Propagated unchanged.
///

#[derive(Debug, ThisError)]
#[error("storage adapter failure: {message}")]
pub struct AdapterError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AdapterError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::predicate::OperatorError;

    #[test]
    fn kinds_follow_nested_filter_errors() {
        let err = Error::from(FilterError::from(OperatorError::InvalidRange {
            field: "views".to_string(),
        }));
        assert_eq!(err.kind(), ErrorKind::Operator);
        assert!(err.kind().is_caller_error());

        let err = Error::from(FilterError::from(SchemaError::UnknownField {
            doc_type: "article".to_string(),
            field: "nope".to_string(),
        }));
        assert_eq!(err.kind(), ErrorKind::Schema);
    }

    #[test]
    fn adapter_errors_are_system_faults() {
        let err = Error::from(AdapterError::with_source(
            "read failed",
            std::io::Error::other("disk"),
        ));

        assert_eq!(err.kind(), ErrorKind::Adapter);
        assert!(!err.kind().is_caller_error());
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(
            err.display_with_kind(),
            "adapter: storage adapter failure: read failed"
        );
    }
}
