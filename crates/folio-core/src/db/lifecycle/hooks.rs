use crate::{
    config::ConfigError,
    db::lifecycle::{Action, HookAbort, HookFailure, MutationEvent},
};
use std::{collections::BTreeMap, fmt, sync::Arc};

/// Before-hook: may rewrite `params` and `context`, or reject the mutation.
pub type BeforeHook = Arc<dyn Fn(&mut MutationEvent) -> Result<(), HookAbort> + Send + Sync>;

/// After-hook: observes the committed result. Failures never undo the write.
pub type AfterHook = Arc<dyn Fn(&MutationEvent) -> Result<(), HookFailure> + Send + Sync>;

///
/// Hook
///

#[derive(Clone)]
pub enum Hook {
    Before(BeforeHook),
    After(AfterHook),
}

impl Hook {
    #[must_use]
    pub const fn is_before(&self) -> bool {
        matches!(self, Self::Before(_))
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Before(_) => f.write_str("Hook::Before(..)"),
            Self::After(_) => f.write_str("Hook::After(..)"),
        }
    }
}

///
/// HookPhase
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum HookPhase {
    BeforeCreate,
    AfterCreate,
    BeforeUpdate,
    AfterUpdate,
    BeforeDelete,
    AfterDelete,
    BeforePublish,
    AfterPublish,
    BeforeUnpublish,
    AfterUnpublish,
}

impl HookPhase {
    pub const ALL: [Self; 10] = [
        Self::BeforeCreate,
        Self::AfterCreate,
        Self::BeforeUpdate,
        Self::AfterUpdate,
        Self::BeforeDelete,
        Self::AfterDelete,
        Self::BeforePublish,
        Self::AfterPublish,
        Self::BeforeUnpublish,
        Self::AfterUnpublish,
    ];

    #[must_use]
    pub const fn before(action: Action) -> Self {
        match action {
            Action::Create => Self::BeforeCreate,
            Action::Update => Self::BeforeUpdate,
            Action::Delete => Self::BeforeDelete,
            Action::Publish => Self::BeforePublish,
            Action::Unpublish => Self::BeforeUnpublish,
        }
    }

    #[must_use]
    pub const fn after(action: Action) -> Self {
        match action {
            Action::Create => Self::AfterCreate,
            Action::Update => Self::AfterUpdate,
            Action::Delete => Self::AfterDelete,
            Action::Publish => Self::AfterPublish,
            Action::Unpublish => Self::AfterUnpublish,
        }
    }

    #[must_use]
    pub const fn action(self) -> Action {
        match self {
            Self::BeforeCreate | Self::AfterCreate => Action::Create,
            Self::BeforeUpdate | Self::AfterUpdate => Action::Update,
            Self::BeforeDelete | Self::AfterDelete => Action::Delete,
            Self::BeforePublish | Self::AfterPublish => Action::Publish,
            Self::BeforeUnpublish | Self::AfterUnpublish => Action::Unpublish,
        }
    }

    #[must_use]
    pub const fn is_before(self) -> bool {
        matches!(
            self,
            Self::BeforeCreate
                | Self::BeforeUpdate
                | Self::BeforeDelete
                | Self::BeforePublish
                | Self::BeforeUnpublish
        )
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BeforeCreate => "beforeCreate",
            Self::AfterCreate => "afterCreate",
            Self::BeforeUpdate => "beforeUpdate",
            Self::AfterUpdate => "afterUpdate",
            Self::BeforeDelete => "beforeDelete",
            Self::AfterDelete => "afterDelete",
            Self::BeforePublish => "beforePublish",
            Self::AfterPublish => "afterPublish",
            Self::BeforeUnpublish => "beforeUnpublish",
            Self::AfterUnpublish => "afterUnpublish",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|phase| phase.name() == name)
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

///
/// LifecycleRegistry
///
/// Hooks per `(document type, phase)`, kept in registration order.
/// Read-only once built.
///

#[derive(Clone, Default)]
pub struct LifecycleRegistry {
    before: BTreeMap<(String, HookPhase), Vec<BeforeHook>>,
    after: BTreeMap<(String, HookPhase), Vec<AfterHook>>,
}

impl LifecycleRegistry {
    #[must_use]
    pub fn builder() -> LifecycleRegistryBuilder {
        LifecycleRegistryBuilder::default()
    }

    #[must_use]
    pub fn before_hooks(&self, doc_type: &str, action: Action) -> &[BeforeHook] {
        self.before
            .get(&(doc_type.to_string(), HookPhase::before(action)))
            .map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn after_hooks(&self, doc_type: &str, action: Action) -> &[AfterHook] {
        self.after
            .get(&(doc_type.to_string(), HookPhase::after(action)))
            .map_or(&[], Vec::as_slice)
    }

    /// Document types with at least one hook.
    pub fn doc_types(&self) -> impl Iterator<Item = &str> {
        let mut names: Vec<&str> = self
            .before
            .keys()
            .chain(self.after.keys())
            .map(|(doc_type, _)| doc_type.as_str())
            .collect();
        names.sort_unstable();
        names.dedup();

        names.into_iter()
    }

    /// Total number of registered hooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.before.values().map(Vec::len).sum::<usize>()
            + self.after.values().map(Vec::len).sum::<usize>()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for LifecycleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for ((doc_type, phase), hooks) in &self.before {
            map.entry(&format_args!("{doc_type}.{phase}"), &hooks.len());
        }
        for ((doc_type, phase), hooks) in &self.after {
            map.entry(&format_args!("{doc_type}.{phase}"), &hooks.len());
        }
        map.finish()
    }
}

///
/// LifecycleRegistryBuilder
///

#[derive(Debug, Default)]
pub struct LifecycleRegistryBuilder {
    hooks: Vec<(String, HookPhase, Hook)>,
}

impl LifecycleRegistryBuilder {
    #[must_use]
    pub fn before<F>(self, doc_type: impl Into<String>, action: Action, hook: F) -> Self
    where
        F: Fn(&mut MutationEvent) -> Result<(), HookAbort> + Send + Sync + 'static,
    {
        self.register(doc_type, HookPhase::before(action), Hook::Before(Arc::new(hook)))
    }

    #[must_use]
    pub fn after<F>(self, doc_type: impl Into<String>, action: Action, hook: F) -> Self
    where
        F: Fn(&MutationEvent) -> Result<(), HookFailure> + Send + Sync + 'static,
    {
        self.register(doc_type, HookPhase::after(action), Hook::After(Arc::new(hook)))
    }

    /// Register by phase; the hook kind must match the phase.
    #[must_use]
    pub fn register(mut self, doc_type: impl Into<String>, phase: HookPhase, hook: Hook) -> Self {
        self.hooks.push((doc_type.into(), phase, hook));
        self
    }

    pub fn build(self) -> Result<LifecycleRegistry, ConfigError> {
        let mut registry = LifecycleRegistry::default();

        for (doc_type, phase, hook) in self.hooks {
            if phase.is_before() != hook.is_before() {
                return Err(ConfigError::Invalid(format!(
                    "{hook:?} registered for '{doc_type}' under {phase}"
                )));
            }

            match hook {
                Hook::Before(hook) => registry
                    .before
                    .entry((doc_type, phase))
                    .or_default()
                    .push(hook),
                Hook::After(hook) => registry
                    .after
                    .entry((doc_type, phase))
                    .or_default()
                    .push(hook),
            }
        }

        Ok(registry)
    }
}
