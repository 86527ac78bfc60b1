//! Quest Lifecycle Events
//!
//! Outbound notifications emitted as quests and their steps start and
//! complete, plus the observer list used to deliver them.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use super::signal::Signal;

/// Lifecycle notifications consumed by dialogue, UI, audio and mission systems
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum QuestEvent {
    /// An agent registered and started a quest
    QuestStarted { quest_id: String },

    /// A step became the current step
    StepStarted {
        quest_id: String,
        step_id: String,
        /// Signal that completed the previous step (`None` on quest start)
        signal: Option<Signal>,
    },

    /// The current step accepted a signal
    StepCompleted {
        quest_id: String,
        step_id: String,
        signal: Option<Signal>,
    },

    /// The quest reached its terminal state
    QuestCompleted {
        quest_id: String,
        signal: Option<Signal>,
    },
}

impl QuestEvent {
    pub fn quest_id(&self) -> &str {
        match self {
            QuestEvent::QuestStarted { quest_id } => quest_id,
            QuestEvent::StepStarted { quest_id, .. } => quest_id,
            QuestEvent::StepCompleted { quest_id, .. } => quest_id,
            QuestEvent::QuestCompleted { quest_id, .. } => quest_id,
        }
    }

    pub fn step_id(&self) -> Option<&str> {
        match self {
            QuestEvent::StepStarted { step_id, .. } | QuestEvent::StepCompleted { step_id, .. } => {
                Some(step_id)
            }
            _ => None,
        }
    }

    /// Signal that caused the transition, if any
    pub fn signal(&self) -> Option<&Signal> {
        match self {
            QuestEvent::QuestStarted { .. } => None,
            QuestEvent::StepStarted { signal, .. }
            | QuestEvent::StepCompleted { signal, .. }
            | QuestEvent::QuestCompleted { signal, .. } => signal.as_ref(),
        }
    }

    /// Get event type as string (for logging/debugging)
    pub fn event_type(&self) -> &'static str {
        match self {
            QuestEvent::QuestStarted { .. } => "quest_started",
            QuestEvent::StepStarted { .. } => "step_started",
            QuestEvent::StepCompleted { .. } => "step_completed",
            QuestEvent::QuestCompleted { .. } => "quest_completed",
        }
    }
}

/// Callback invoked for each emitted event
pub type Listener = Arc<dyn Fn(&QuestEvent) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct BusInner {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
}

/// Synchronous observer list. Clones share the same listeners.
///
/// Listeners are called in subscription order without the bus lock held, so a
/// listener may subscribe, unsubscribe or emit on the same bus.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<BusInner>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BusInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&QuestEvent) + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.listeners.push((id, Arc::new(listener)));
        id
    }

    /// Returns false if the subscription was already gone
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.lock();
        let before = inner.listeners.len();
        inner.listeners.retain(|(sub, _)| *sub != id);
        inner.listeners.len() != before
    }

    pub fn emit(&self, event: &QuestEvent) {
        let listeners: Vec<Listener> = self
            .lock()
            .listeners
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        for listener in listeners {
            listener(event);
        }
    }

    pub fn clear(&self) {
        self.lock().listeners.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus").field("listeners", &self.len()).finish()
    }
}
