use crate::{
    db::{
        cancel::CancelToken,
        lifecycle::{
            Action, AfterHookError, LifecycleRegistry, MutationEvent, MutationParams,
            MutationState, validate::DataValidator,
        },
        store::DocumentStore,
    },
    error::Error,
    model::{DOCUMENT_ID, SchemaError, SchemaRegistry},
    obs::{ExecKind, MetricsEvent, MetricsSink},
    value::Document,
};
use std::mem;
use tracing::{debug, warn};

///
/// Pipeline
///
/// Runs one mutation: before-hooks in registration order, data validation,
/// the adapter write, then every after-hook. The first before-hook abort
/// stops the call with no write. After-hook failures are collected and
/// reported together; the write stays committed.
///

pub(crate) struct Pipeline<'a> {
    registry: &'a SchemaRegistry,
    hooks: &'a LifecycleRegistry,
    store: &'a dyn DocumentStore,
    cancel: &'a CancelToken,
    sink: &'a dyn MetricsSink,
}

impl<'a> Pipeline<'a> {
    pub(crate) const fn new(
        registry: &'a SchemaRegistry,
        hooks: &'a LifecycleRegistry,
        store: &'a dyn DocumentStore,
        cancel: &'a CancelToken,
        sink: &'a dyn MetricsSink,
    ) -> Self {
        Self {
            registry,
            hooks,
            store,
            cancel,
            sink,
        }
    }

    pub(crate) async fn run(
        &self,
        doc_type: &str,
        action: Action,
        params: MutationParams,
    ) -> Result<Option<Document>, Error> {
        let definition = self.registry.try_collection(doc_type)?;
        if action.requires_draft_and_publish() && !definition.has_draft_and_publish() {
            return Err(SchemaError::DraftPublishDisabled {
                doc_type: doc_type.to_string(),
            }
            .into());
        }
        if action.carries_data() {
            definition.resolve_status(params.status)?;
        }
        if action != Action::Create && params.document_id.is_none() {
            return Err(missing_id(doc_type).into());
        }
        self.cancel.check()?;

        self.sink.record(MetricsEvent::ExecStart {
            kind: ExecKind::Mutation,
            doc_type,
        });

        let mut event = MutationEvent::new(action, doc_type, params);
        event.advance(MutationState::BeforeHooksRunning);

        for hook in self.hooks.before_hooks(doc_type, action) {
            if let Err(abort) = hook(&mut event) {
                debug!(doc_type, %action, reason = abort.message(), "mutation aborted by hook");
                self.abort(&mut event);
                self.sink.record(MetricsEvent::HookAbort { doc_type });

                return Err(abort.into());
            }
        }

        // Hooks may have rewritten the input; validate what will be written.
        if action.carries_data() {
            if let Err(err) = definition.resolve_status(event.params.status) {
                self.abort(&mut event);
                return Err(err.into());
            }
            let data = mem::take(&mut event.params.data);
            match DataValidator::new(self.registry).validate(definition, data, action == Action::Create) {
                Ok(data) => event.params.data = data,
                Err(err) => {
                    self.abort(&mut event);
                    return Err(err.into());
                }
            }
        }
        let Some(op) = event.write_op() else {
            self.abort(&mut event);
            return Err(missing_id(doc_type).into());
        };

        event.advance(MutationState::Writing);
        let written = self
            .cancel
            .run(async move { self.store.write(doc_type, op).await.map_err(Error::from) })
            .await;
        let result = match written {
            Ok(result) => result,
            Err(err) => {
                if matches!(err, Error::Cancelled(_)) {
                    self.sink.record(MetricsEvent::Cancelled);
                }
                return Err(err);
            }
        };
        debug!(doc_type, %action, found = result.is_some(), "mutation written");

        event.set_result(result);
        event.advance(MutationState::AfterHooksRunning);

        let mut failures = Vec::new();
        for hook in self.hooks.after_hooks(doc_type, action) {
            if let Err(failure) = hook(&event) {
                warn!(doc_type, %action, error = %failure, "after-hook failed");
                failures.push(failure);
            }
        }
        event.advance(MutationState::Done);

        self.sink.record(MetricsEvent::MutationFinish {
            doc_type,
            action: action.label(),
            committed: true,
        });

        if failures.is_empty() {
            return Ok(event.into_result());
        }

        self.sink.record(MetricsEvent::AfterHookFailure {
            doc_type,
            failures: u64::try_from(failures.len()).unwrap_or(u64::MAX),
        });

        Err(AfterHookError {
            doc_type: doc_type.to_string(),
            action,
            result: event.into_result(),
            failures,
        }
        .into())
    }

    fn abort(&self, event: &mut MutationEvent) {
        event.advance(MutationState::Aborted);
        self.sink.record(MetricsEvent::MutationFinish {
            doc_type: event.doc_type(),
            action: event.action().label(),
            committed: false,
        });
    }
}

fn missing_id(doc_type: &str) -> SchemaError {
    SchemaError::MissingField {
        doc_type: doc_type.to_string(),
        field: DOCUMENT_ID.to_string(),
    }
}
