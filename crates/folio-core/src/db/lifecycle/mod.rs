//! Module: lifecycle
//! Responsibility: ordered before/after hooks around every mutation.
//! Does not own: storage isolation; same-document write ordering is the adapter's.
//! Boundary: mutations reach the adapter only through `Pipeline::run`.

mod event;
mod hooks;
mod pipeline;
mod validate;

#[cfg(test)]
mod tests;

use crate::value::Document;
use thiserror::Error as ThisError;

pub use event::{Action, MutationEvent, MutationParams, MutationState};
pub use hooks::{AfterHook, BeforeHook, Hook, HookPhase, LifecycleRegistry, LifecycleRegistryBuilder};

pub(crate) use pipeline::Pipeline;

///
/// HookAbort
///
/// Business-rule rejection raised by a before-hook. Not a system fault.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("mutation rejected: {message}")]
pub struct HookAbort {
    message: String,
}

impl HookAbort {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

///
/// HookFailure
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{message}")]
pub struct HookFailure {
    message: String,
}

impl HookFailure {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

///
/// AfterHookError
///
/// One or more after-hooks failed. The write is committed and is not
/// rolled back; the committed result travels with the error.
///

#[derive(Debug, ThisError)]
#[error(
    "{} after-hook(s) failed for {action} on '{doc_type}' (write committed)",
    .failures.len()
)]
pub struct AfterHookError {
    doc_type: String,
    action: Action,
    result: Option<Document>,
    failures: Vec<HookFailure>,
}

impl AfterHookError {
    #[must_use]
    pub fn doc_type(&self) -> &str {
        &self.doc_type
    }

    #[must_use]
    pub const fn action(&self) -> Action {
        self.action
    }

    /// The committed write result.
    #[must_use]
    pub const fn result(&self) -> Option<&Document> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn into_result(self) -> Option<Document> {
        self.result
    }

    #[must_use]
    pub fn failures(&self) -> &[HookFailure] {
        &self.failures
    }
}
