use crate::{
    db::store::WriteOp,
    value::{Document, DocumentId, Fields, Status, Value},
};
use serde_json::Value as JsonValue;
use std::{collections::BTreeMap, fmt};

///
/// Action
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Action {
    Create,
    Update,
    Delete,
    Publish,
    Unpublish,
}

impl Action {
    pub const ALL: [Self; 5] = [
        Self::Create,
        Self::Update,
        Self::Delete,
        Self::Publish,
        Self::Unpublish,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Publish => "publish",
            Self::Unpublish => "unpublish",
        }
    }

    /// Actions that only exist on draft/publish types.
    #[must_use]
    pub const fn requires_draft_and_publish(self) -> bool {
        matches!(self, Self::Publish | Self::Unpublish)
    }

    /// Actions whose `params.data` is written.
    #[must_use]
    pub const fn carries_data(self) -> bool {
        matches!(self, Self::Create | Self::Update)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

///
/// MutationState
///
/// `Pending → BeforeHooksRunning → Writing → AfterHooksRunning → Done`.
/// `Aborted` is only reachable from `BeforeHooksRunning`.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MutationState {
    Pending,
    BeforeHooksRunning,
    Writing,
    AfterHooksRunning,
    Done,
    Aborted,
}

impl MutationState {
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::BeforeHooksRunning)
                | (Self::BeforeHooksRunning, Self::Writing | Self::Aborted)
                | (Self::Writing, Self::AfterHooksRunning)
                | (Self::AfterHooksRunning, Self::Done)
        )
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }
}

///
/// MutationParams
///
/// Caller input. Before-hooks may rewrite any of it.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MutationParams {
    pub data: Fields,
    pub document_id: Option<DocumentId>,
    pub status: Option<Status>,
}

///
/// MutationEvent
///
/// Shared by every hook of one mutation call. `result` is set once the
/// write returns, so only after-hooks observe it.
///

#[derive(Clone, Debug)]
pub struct MutationEvent {
    action: Action,
    doc_type: String,
    state: MutationState,
    pub params: MutationParams,
    result: Option<Document>,
    /// Scratch space passed from before-hooks to after-hooks.
    pub context: BTreeMap<String, JsonValue>,
}

impl MutationEvent {
    #[must_use]
    pub fn new(action: Action, doc_type: impl Into<String>, params: MutationParams) -> Self {
        Self {
            action,
            doc_type: doc_type.into(),
            state: MutationState::Pending,
            params,
            result: None,
            context: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn action(&self) -> Action {
        self.action
    }

    #[must_use]
    pub fn doc_type(&self) -> &str {
        &self.doc_type
    }

    #[must_use]
    pub const fn state(&self) -> MutationState {
        self.state
    }

    #[must_use]
    pub const fn result(&self) -> Option<&Document> {
        self.result.as_ref()
    }

    /// Read one input attribute.
    #[must_use]
    pub fn data(&self, name: &str) -> Option<&Value> {
        self.params.data.get(name)
    }

    pub fn set_data(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.params.data.insert(name.into(), value.into());
    }

    pub(crate) fn advance(&mut self, next: MutationState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid mutation transition {:?} -> {next:?}",
            self.state
        );
        self.state = next;
    }

    pub(crate) fn set_result(&mut self, result: Option<Document>) {
        self.result = result;
    }

    pub(crate) fn into_result(self) -> Option<Document> {
        self.result
    }

    /// Lower the (possibly hook-rewritten) params into an adapter write.
    pub(crate) fn write_op(&self) -> Option<WriteOp> {
        let id = || self.params.document_id.clone();

        Some(match self.action {
            Action::Create => WriteOp::Create {
                data: self.params.data.clone(),
                status: self.params.status,
            },
            Action::Update => WriteOp::Update {
                id: id()?,
                data: self.params.data.clone(),
                status: self.params.status,
            },
            Action::Delete => WriteOp::Delete { id: id()? },
            Action::Publish => WriteOp::Publish { id: id()? },
            Action::Unpublish => WriteOp::Unpublish { id: id()? },
        })
    }
}
