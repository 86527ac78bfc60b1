//! Quest Agent
//!
//! Per-actor owner of quest runtimes. Routes signals to the runtime for the
//! signal's quest and re-emits every runtime's lifecycle events on its own bus.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::definition::{QuestDefinition, StepKindTable};
use super::events::{EventBus, QuestEvent};
use super::registry::QuestRegistry;
use super::runtime::{QuestRuntime, QuestRuntimeHandle};
use super::signal::{Signal, SignalType};
use super::state::QuestSnapshot;
use super::step::{HookTable, StepHookContext};
use crate::mission::MissionSystem;

pub struct QuestAgent {
    actor_id: String,
    runtimes: HashMap<String, QuestRuntimeHandle>,
    events: EventBus,
    registry: Option<Arc<QuestRegistry>>,
    missions: Option<Arc<dyn MissionSystem>>,
    hooks: HookTable,
    kinds: Arc<StepKindTable>,
}

impl QuestAgent {
    pub fn new(actor_id: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            runtimes: HashMap::new(),
            events: EventBus::new(),
            registry: None,
            missions: None,
            hooks: HookTable::new(),
            kinds: Arc::new(StepKindTable::default()),
        }
    }

    /// Publish this agent's quests in a registry
    pub fn with_registry(mut self, registry: Arc<QuestRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_missions(mut self, missions: Arc<dyn MissionSystem>) -> Self {
        self.missions = Some(missions);
        self
    }

    /// Matchers for custom step kinds
    pub fn with_kinds(mut self, kinds: StepKindTable) -> Self {
        self.kinds = Arc::new(kinds);
        self
    }

    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }

    /// Lifecycle events from all of this agent's quests
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Run `hook` whenever the step is entered. Register before the quest.
    pub fn on_step_enter<F>(&mut self, quest_id: &str, step_id: &str, hook: F)
    where
        F: Fn(&StepHookContext<'_>) + Send + Sync + 'static,
    {
        self.hooks.on_enter(quest_id, step_id, hook);
    }

    /// Run `hook` whenever the step is exited. Register before the quest.
    pub fn on_step_exit<F>(&mut self, quest_id: &str, step_id: &str, hook: F)
    where
        F: Fn(&StepHookContext<'_>) + Send + Sync + 'static,
    {
        self.hooks.on_exit(quest_id, step_id, hook);
    }

    /// Build, register and start a runtime for `definition`.
    ///
    /// Rejects blank and already-registered quest ids, keeping the first.
    pub fn register_definition(&mut self, definition: Arc<QuestDefinition>) -> bool {
        let quest_id = definition.id.trim();
        if quest_id.is_empty() {
            warn!("Agent '{}' rejected a quest definition with a blank id", self.actor_id);
            return false;
        }
        if self.runtimes.contains_key(quest_id) {
            warn!(
                "Agent '{}' already has quest '{}', ignoring duplicate definition",
                self.actor_id, quest_id
            );
            return false;
        }
        let quest_id = quest_id.to_string();

        let mut runtime = QuestRuntime::with_hooks(Arc::clone(&definition), &self.hooks)
            .owned_by(self.actor_id.clone())
            .with_kinds(Arc::clone(&self.kinds));
        if let Some(missions) = &self.missions {
            runtime = runtime.with_missions(Arc::clone(missions));
        }
        let handle = QuestRuntimeHandle::new(runtime);

        let agent_events = self.events.clone();
        handle.events().subscribe(move |event| agent_events.emit(event));

        if let Some(registry) = &self.registry {
            registry.register(&handle);
        }
        self.runtimes.insert(quest_id.clone(), handle.clone());

        if definition.auto_register_mission {
            match &self.missions {
                Some(missions) => {
                    missions.register_mission(&quest_id, &definition.title, &definition.description)
                }
                None => debug!("No mission system for quest '{}', skipping mission", quest_id),
            }
        }

        info!("Agent '{}' registered quest '{}'", self.actor_id, quest_id);
        handle.start();
        self.events.emit(&QuestEvent::QuestStarted { quest_id });
        true
    }

    /// Route a signal to the runtime for its quest. False when this agent
    /// has no such quest or the quest did not consume the signal.
    pub fn try_handle_signal(&self, signal: &Signal) -> bool {
        match self.runtimes.get(signal.quest_id()) {
            Some(handle) => handle.try_process_signal(signal),
            None => false,
        }
    }

    /// Whether `quest_id` is running with `step_id` (any step when blank)
    /// current and waiting for `signal_type`
    pub fn is_step_active(&self, quest_id: &str, step_id: &str, signal_type: &SignalType) -> bool {
        self.runtimes
            .get(quest_id)
            .is_some_and(|handle| handle.is_step_active(step_id, signal_type))
    }

    pub fn runtime(&self, quest_id: &str) -> Option<QuestRuntimeHandle> {
        self.runtimes.get(quest_id).cloned()
    }

    pub fn quest_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.runtimes.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn is_quest_completed(&self, quest_id: &str) -> bool {
        self.runtimes
            .get(quest_id)
            .is_some_and(QuestRuntimeHandle::is_completed)
    }

    /// Snapshots of every quest, sorted by quest id
    pub fn snapshots(&self) -> Vec<QuestSnapshot> {
        let mut snapshots: Vec<QuestSnapshot> =
            self.runtimes.values().map(QuestRuntimeHandle::snapshot).collect();
        snapshots.sort_by(|a, b| a.quest_id.cmp(&b.quest_id));
        snapshots
    }

    pub fn len(&self) -> usize {
        self.runtimes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runtimes.is_empty()
    }

    /// Tear down one quest. The registry entry is only removed if it still
    /// points at this agent's runtime.
    pub fn remove_quest(&mut self, quest_id: &str) -> bool {
        let Some(handle) = self.runtimes.remove(quest_id) else {
            return false;
        };
        if let Some(registry) = &self.registry {
            registry.unregister_runtime(&handle);
        }
        handle.events().clear();
        debug!("Agent '{}' removed quest '{}'", self.actor_id, quest_id);
        true
    }
}

impl Drop for QuestAgent {
    fn drop(&mut self) {
        if let Some(registry) = &self.registry {
            for handle in self.runtimes.values() {
                registry.unregister_runtime(handle);
            }
        }
    }
}

impl fmt::Debug for QuestAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuestAgent")
            .field("actor_id", &self.actor_id)
            .field("quests", &self.quest_ids())
            .finish()
    }
}
