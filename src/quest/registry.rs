//! Quest Registry
//!
//! Process-wide directory of active quest runtimes by quest id. Lets any
//! system raise a trigger knowing only the quest id, and fans lifecycle events
//! out to decoupled listeners (audio, VFX, notebook UI).

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use tracing::{debug, warn};

use super::events::{EventBus, QuestEvent, SubscriptionId};
use super::runtime::QuestRuntimeHandle;
use super::signal::Signal;

static GLOBAL: OnceLock<Arc<QuestRegistry>> = OnceLock::new();

struct RegistryEntry {
    handle: QuestRuntimeHandle,
    /// Forwarding subscription on the runtime's bus
    subscription: SubscriptionId,
}

/// Registry of active quest runtimes. At most one runtime per quest id; the
/// last registration wins.
#[derive(Default)]
pub struct QuestRegistry {
    runtimes: DashMap<String, RegistryEntry>,
    events: EventBus,
}

impl QuestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry
    pub fn global() -> Arc<QuestRegistry> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(QuestRegistry::new())))
    }

    /// Register a runtime under its quest id, replacing any other runtime
    pub fn register(&self, handle: &QuestRuntimeHandle) {
        let bus = self.events.clone();
        let subscription = handle.events().subscribe(move |event| bus.emit(event));
        let entry = RegistryEntry {
            handle: handle.clone(),
            subscription,
        };

        if let Some(previous) = self.runtimes.insert(handle.quest_id().to_string(), entry) {
            if !previous.handle.ptr_eq(handle) {
                warn!(
                    "Quest '{}' already registered by another runtime, overwriting",
                    handle.quest_id()
                );
            }
            previous.handle.events().unsubscribe(previous.subscription);
        }
    }

    /// Remove whatever runtime is registered for `quest_id`
    pub fn unregister(&self, quest_id: &str) -> bool {
        match self.runtimes.remove(quest_id) {
            Some((_, entry)) => {
                entry.handle.events().unsubscribe(entry.subscription);
                true
            }
            None => false,
        }
    }

    /// Remove the entry for this runtime's quest only if it is still this runtime
    pub fn unregister_runtime(&self, handle: &QuestRuntimeHandle) -> bool {
        match self
            .runtimes
            .remove_if(handle.quest_id(), |_, entry| entry.handle.ptr_eq(handle))
        {
            Some((_, entry)) => {
                entry.handle.events().unsubscribe(entry.subscription);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, quest_id: &str) -> Option<QuestRuntimeHandle> {
        self.runtimes.get(quest_id).map(|entry| entry.handle.clone())
    }

    /// Forward a signal to the runtime registered for its quest id
    pub fn raise_trigger(&self, signal: &Signal) -> bool {
        // Clone the handle out so listeners may re-enter the registry
        let Some(handle) = self.get(signal.quest_id()) else {
            warn!("No runtime registered for quest '{}'", signal.quest_id());
            return false;
        };

        let handled = handle.try_process_signal(signal);
        if !handled {
            debug!(
                "Quest '{}' did not consume {} signal",
                signal.quest_id(),
                signal.signal_type()
            );
        }
        handled
    }

    /// All lifecycle events from registered runtimes
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn on_step_activated<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&QuestEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(move |event| {
            if matches!(event, QuestEvent::StepStarted { .. }) {
                listener(event);
            }
        })
    }

    pub fn on_step_completed<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&QuestEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(move |event| {
            if matches!(event, QuestEvent::StepCompleted { .. }) {
                listener(event);
            }
        })
    }

    pub fn on_quest_completed<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&QuestEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(move |event| {
            if matches!(event, QuestEvent::QuestCompleted { .. }) {
                listener(event);
            }
        })
    }

    pub fn contains(&self, quest_id: &str) -> bool {
        self.runtimes.contains_key(quest_id)
    }

    pub fn quest_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.runtimes.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.runtimes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runtimes.is_empty()
    }

    /// Drop every registration and listener
    pub fn reset(&self) {
        let ids = self.quest_ids();
        for id in ids {
            self.unregister(&id);
        }
        self.events.clear();
    }
}
