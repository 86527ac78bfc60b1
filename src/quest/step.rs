//! Quest Step Instances
//!
//! Binds a shared step definition to one runtime, together with the enter and
//! exit hooks registered for it.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::definition::{StepDefinition, StepKindTable};
use super::signal::{Signal, SignalType};

/// What a step hook sees when it runs
#[derive(Debug)]
pub struct StepHookContext<'a> {
    pub quest_id: &'a str,
    pub step: &'a StepDefinition,
    /// Signal behind the transition, `None` when the quest starts
    pub signal: Option<&'a Signal>,
}

/// Callback run when a step is entered or exited
pub type StepHook = Arc<dyn Fn(&StepHookContext<'_>) + Send + Sync>;

/// Hooks attached to one step
#[derive(Clone, Default)]
pub struct StepHooks {
    on_enter: Vec<StepHook>,
    on_exit: Vec<StepHook>,
}

impl fmt::Debug for StepHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepHooks")
            .field("on_enter", &self.on_enter.len())
            .field("on_exit", &self.on_exit.len())
            .finish()
    }
}

/// Hooks for many steps, keyed by `(quest_id, step_id)`
#[derive(Debug, Clone, Default)]
pub struct HookTable {
    hooks: HashMap<(String, String), StepHooks>,
}

impl HookTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_enter<F>(&mut self, quest_id: &str, step_id: &str, hook: F)
    where
        F: Fn(&StepHookContext<'_>) + Send + Sync + 'static,
    {
        self.entry(quest_id, step_id).on_enter.push(Arc::new(hook));
    }

    pub fn on_exit<F>(&mut self, quest_id: &str, step_id: &str, hook: F)
    where
        F: Fn(&StepHookContext<'_>) + Send + Sync + 'static,
    {
        self.entry(quest_id, step_id).on_exit.push(Arc::new(hook));
    }

    fn entry(&mut self, quest_id: &str, step_id: &str) -> &mut StepHooks {
        self.hooks
            .entry((quest_id.to_string(), step_id.to_string()))
            .or_default()
    }

    /// Hooks for one step (empty when none were registered)
    pub fn for_step(&self, quest_id: &str, step_id: &str) -> StepHooks {
        self.hooks
            .get(&(quest_id.to_string(), step_id.to_string()))
            .cloned()
            .unwrap_or_default()
    }
}

/// A step definition bound to one quest run
#[derive(Debug)]
pub struct QuestStepInstance {
    definition: Arc<StepDefinition>,
    hooks: StepHooks,
    entered: bool,
    exited: bool,
}

impl QuestStepInstance {
    pub fn new(definition: Arc<StepDefinition>, hooks: StepHooks) -> Self {
        Self {
            definition,
            hooks,
            entered: false,
            exited: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.definition.id
    }

    pub fn definition(&self) -> &Arc<StepDefinition> {
        &self.definition
    }

    pub fn expected_signal_type(&self) -> SignalType {
        self.definition.expected_signal_type()
    }

    pub fn accepts(&self, signal: &Signal, kinds: &StepKindTable) -> bool {
        self.definition.accepts_with(signal, kinds)
    }

    /// Mark the step entered and hand back the enter hooks to run.
    /// Branches may loop back, so a step can be entered more than once.
    pub fn enter(&mut self) -> Vec<StepHook> {
        self.entered = true;
        self.exited = false;
        self.hooks.on_enter.clone()
    }

    /// Mark the step exited and hand back the exit hooks to run
    pub fn exit(&mut self) -> Vec<StepHook> {
        self.exited = true;
        self.hooks.on_exit.clone()
    }

    pub fn is_entered(&self) -> bool {
        self.entered
    }

    pub fn is_exited(&self) -> bool {
        self.exited
    }

    /// Entered and not yet exited
    pub fn is_active(&self) -> bool {
        self.entered && !self.exited
    }
}
