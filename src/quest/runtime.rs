//! Quest Runtime
//!
//! The per-actor state machine for one quest:
//! `NotStarted → Active(step index) → Completed`.
//!
//! [`QuestRuntime`] performs transitions and records their side effects
//! (hooks, events, mission completion) in an outbox. [`QuestRuntimeHandle`]
//! shares a runtime between its agent and the registry and dispatches the
//! outbox after releasing the lock, so hooks and listeners can safely raise
//! further signals.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use super::definition::{QuestDefinition, StepDefinition, StepKindTable};
use super::events::{EventBus, QuestEvent};
use super::signal::{Signal, SignalType};
use super::state::{QuestSnapshot, RuntimeState};
use super::step::{HookTable, QuestStepInstance, StepHook, StepHookContext, StepHooks};
use crate::mission::MissionSystem;

/// A side effect recorded during a transition, dispatched once the runtime
/// lock is released
pub(crate) enum RuntimeEffect {
    Hook {
        hook: StepHook,
        step: Arc<StepDefinition>,
        signal: Option<Signal>,
    },
    Event(QuestEvent),
    FinishMission {
        missions: Arc<dyn MissionSystem>,
        actor: Option<String>,
    },
}

/// Live state of one quest for one actor
pub struct QuestRuntime {
    definition: Arc<QuestDefinition>,
    owner: Option<String>,
    steps: Vec<QuestStepInstance>,
    /// step id -> index of its first occurrence
    lookup: HashMap<String, usize>,
    current: Option<usize>,
    started: bool,
    completed: bool,
    kinds: Arc<StepKindTable>,
    missions: Option<Arc<dyn MissionSystem>>,
    outbox: VecDeque<RuntimeEffect>,
}

impl QuestRuntime {
    pub fn new(definition: Arc<QuestDefinition>) -> Self {
        Self::with_hooks(definition, &HookTable::default())
    }

    /// Build a runtime whose steps carry the hooks registered for this quest
    pub fn with_hooks(definition: Arc<QuestDefinition>, hooks: &HookTable) -> Self {
        let mut steps = Vec::with_capacity(definition.steps.len());
        let mut lookup = HashMap::with_capacity(definition.steps.len());

        for (index, step) in definition.steps.iter().enumerate() {
            // Hooks are addressed by id, so only the first occurrence carries them
            let step_hooks = if lookup.contains_key(&step.id) {
                warn!(
                    "Duplicate step id '{}' at index {} in quest '{}', keeping first occurrence",
                    step.id, index, definition.id
                );
                StepHooks::default()
            } else {
                lookup.insert(step.id.clone(), index);
                hooks.for_step(&definition.id, &step.id)
            };
            steps.push(QuestStepInstance::new(Arc::clone(step), step_hooks));
        }

        Self {
            definition,
            owner: None,
            steps,
            lookup,
            current: None,
            started: false,
            completed: false,
            kinds: Arc::new(StepKindTable::default()),
            missions: None,
            outbox: VecDeque::new(),
        }
    }

    /// Actor this runtime belongs to, credited when the mission finishes
    pub fn owned_by(mut self, actor_id: impl Into<String>) -> Self {
        self.owner = Some(actor_id.into());
        self
    }

    pub fn with_kinds(mut self, kinds: Arc<StepKindTable>) -> Self {
        self.kinds = kinds;
        self
    }

    pub fn with_missions(mut self, missions: Arc<dyn MissionSystem>) -> Self {
        self.missions = Some(missions);
        self
    }

    pub fn quest_id(&self) -> &str {
        &self.definition.id
    }

    pub fn definition(&self) -> &Arc<QuestDefinition> {
        &self.definition
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn state(&self) -> RuntimeState {
        if self.completed {
            RuntimeState::Completed
        } else {
            match self.current {
                Some(index) => RuntimeState::Active(index),
                None => RuntimeState::NotStarted,
            }
        }
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn current_step(&self) -> Option<&QuestStepInstance> {
        self.current.and_then(|index| self.steps.get(index))
    }

    /// Step reachable under this id (the first occurrence of duplicates)
    pub fn step(&self, step_id: &str) -> Option<&QuestStepInstance> {
        self.lookup.get(step_id).and_then(|&index| self.steps.get(index))
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Number of steps reachable by id
    pub fn distinct_step_count(&self) -> usize {
        self.lookup.len()
    }

    /// Whether the current step is `step_id` (any step when blank) and
    /// listens for `signal_type`
    pub fn is_step_active(&self, step_id: &str, signal_type: &SignalType) -> bool {
        if self.completed {
            return false;
        }
        match self.current_step() {
            Some(step) => {
                (step_id.trim().is_empty() || step.id() == step_id)
                    && step.expected_signal_type() == *signal_type
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> QuestSnapshot {
        QuestSnapshot {
            quest_id: self.quest_id().to_string(),
            status: self.state().status(),
            current_step: self.current_step().map(|s| s.id().to_string()),
            current_index: self.current,
        }
    }

    /// Activate the first step. No-op when already started, completed, or
    /// when the quest has no steps.
    ///
    /// Transitions only record their effects; [`QuestRuntimeHandle`] is the
    /// driver that dispatches them.
    pub(crate) fn start(&mut self) {
        if self.started || self.completed {
            return;
        }
        if self.steps.is_empty() {
            debug!("Quest '{}' has no steps, not starting", self.quest_id());
            return;
        }

        self.started = true;
        info!(
            "Quest '{}' started{}",
            self.quest_id(),
            self.owner
                .as_deref()
                .map(|o| format!(" for {}", o))
                .unwrap_or_default()
        );
        self.activate(0, None);
    }

    /// Offer a signal to the current step. Returns true when the step accepted
    /// it and the runtime advanced.
    pub(crate) fn try_process_signal(&mut self, signal: &Signal) -> bool {
        if self.completed {
            debug!("Quest '{}' already completed, ignoring signal", self.quest_id());
            return false;
        }
        let Some(index) = self.current else {
            return false;
        };

        if signal.quest_id().trim().is_empty() {
            debug!("Ignoring signal with blank quest id");
            return false;
        }
        if signal.quest_id() != self.quest_id() {
            return false;
        }

        let Some(step) = self.steps.get(index) else {
            warn!(
                "Quest '{}' current step index {} out of range",
                self.quest_id(),
                index
            );
            return false;
        };

        if let Some(target) = signal.step_id() {
            if target != step.id() {
                debug!(
                    "Signal for step '{}' ignored, quest '{}' is on step '{}'",
                    target,
                    self.quest_id(),
                    step.id()
                );
                return false;
            }
        }

        if !step.accepts(signal, &self.kinds) {
            debug!(
                "Step '{}' of quest '{}' rejected {} signal",
                step.id(),
                self.quest_id(),
                signal.signal_type()
            );
            return false;
        }

        let completed_step = Arc::clone(step.definition());
        let exit_hooks = self.steps[index].exit();
        self.queue_hooks(exit_hooks, &completed_step, Some(signal));
        self.outbox.push_back(RuntimeEffect::Event(QuestEvent::StepCompleted {
            quest_id: self.quest_id().to_string(),
            step_id: completed_step.id.clone(),
            signal: Some(signal.clone()),
        }));
        debug!("Quest '{}' completed step '{}'", self.quest_id(), completed_step.id);

        if completed_step.completes_quest {
            self.complete(signal);
            return true;
        }

        if let Some(next_id) = completed_step.next_step_id.as_deref() {
            match self.lookup.get(next_id) {
                Some(&next) => {
                    self.activate(next, Some(signal));
                    return true;
                }
                None => warn!(
                    "Step '{}' of quest '{}' points at unknown step '{}', continuing in order",
                    completed_step.id,
                    self.quest_id(),
                    next_id
                ),
            }
        }

        if index + 1 < self.steps.len() {
            self.activate(index + 1, Some(signal));
        } else {
            self.complete(signal);
        }
        true
    }

    fn activate(&mut self, index: usize, signal: Option<&Signal>) {
        self.current = Some(index);
        let step = Arc::clone(self.steps[index].definition());
        let enter_hooks = self.steps[index].enter();
        self.queue_hooks(enter_hooks, &step, signal);
        self.outbox.push_back(RuntimeEffect::Event(QuestEvent::StepStarted {
            quest_id: self.quest_id().to_string(),
            step_id: step.id.clone(),
            signal: signal.cloned(),
        }));
    }

    fn complete(&mut self, signal: &Signal) {
        self.completed = true;
        self.current = None;
        info!("Quest '{}' completed", self.quest_id());

        self.outbox.push_back(RuntimeEffect::Event(QuestEvent::QuestCompleted {
            quest_id: self.quest_id().to_string(),
            signal: Some(signal.clone()),
        }));

        if self.definition.auto_complete_mission {
            if let Some(missions) = &self.missions {
                self.outbox.push_back(RuntimeEffect::FinishMission {
                    missions: Arc::clone(missions),
                    actor: self.owner.clone(),
                });
            }
        }
    }

    fn queue_hooks(
        &mut self,
        hooks: Vec<StepHook>,
        step: &Arc<StepDefinition>,
        signal: Option<&Signal>,
    ) {
        for hook in hooks {
            self.outbox.push_back(RuntimeEffect::Hook {
                hook,
                step: Arc::clone(step),
                signal: signal.cloned(),
            });
        }
    }

    pub(crate) fn next_effect(&mut self) -> Option<RuntimeEffect> {
        self.outbox.pop_front()
    }
}

impl fmt::Debug for QuestRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuestRuntime")
            .field("quest_id", &self.definition.id)
            .field("owner", &self.owner)
            .field("state", &self.state())
            .field("pending_effects", &self.outbox.len())
            .finish()
    }
}

struct RuntimeCell {
    runtime: QuestRuntime,
    dispatching: bool,
}

/// Shared handle to a runtime, held by its agent and by the registry.
///
/// Signals raised from inside a hook or listener for the same runtime are
/// applied immediately; their effects are queued behind the effects already
/// being dispatched, so observers always see events in causal order.
#[derive(Clone)]
pub struct QuestRuntimeHandle {
    quest_id: Arc<str>,
    cell: Arc<Mutex<RuntimeCell>>,
    events: EventBus,
}

impl QuestRuntimeHandle {
    pub fn new(runtime: QuestRuntime) -> Self {
        Self {
            quest_id: Arc::from(runtime.quest_id()),
            cell: Arc::new(Mutex::new(RuntimeCell {
                runtime,
                dispatching: false,
            })),
            events: EventBus::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RuntimeCell> {
        self.cell.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn quest_id(&self) -> &str {
        &self.quest_id
    }

    /// Lifecycle events emitted by this runtime
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn start(&self) {
        self.run(|runtime| runtime.start());
    }

    pub fn try_process_signal(&self, signal: &Signal) -> bool {
        self.run(|runtime| runtime.try_process_signal(signal))
    }

    /// Read the runtime. Must not be called from inside `f` recursively.
    pub fn with<R>(&self, f: impl FnOnce(&QuestRuntime) -> R) -> R {
        f(&self.lock().runtime)
    }

    pub fn is_completed(&self) -> bool {
        self.with(QuestRuntime::is_completed)
    }

    pub fn is_step_active(&self, step_id: &str, signal_type: &SignalType) -> bool {
        self.with(|runtime| runtime.is_step_active(step_id, signal_type))
    }

    pub fn snapshot(&self) -> QuestSnapshot {
        self.with(QuestRuntime::snapshot)
    }

    /// Whether both handles point at the same runtime
    pub fn ptr_eq(&self, other: &QuestRuntimeHandle) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    fn run<R>(&self, f: impl FnOnce(&mut QuestRuntime) -> R) -> R {
        let result = {
            let mut cell = self.lock();
            let result = f(&mut cell.runtime);
            if cell.dispatching {
                // An outer call on this handle drains the outbox
                return result;
            }
            cell.dispatching = true;
            result
        };

        loop {
            let effect = {
                let mut cell = self.lock();
                match cell.runtime.next_effect() {
                    Some(effect) => effect,
                    None => {
                        cell.dispatching = false;
                        break;
                    }
                }
            };
            self.dispatch(effect);
        }

        result
    }

    fn dispatch(&self, effect: RuntimeEffect) {
        match effect {
            RuntimeEffect::Hook { hook, step, signal } => hook(&StepHookContext {
                quest_id: &self.quest_id,
                step: &step,
                signal: signal.as_ref(),
            }),
            RuntimeEffect::Event(event) => self.events.emit(&event),
            RuntimeEffect::FinishMission { missions, actor } => {
                missions.set_mission_finished(&self.quest_id, actor.as_deref());
            }
        }
    }
}

impl fmt::Debug for QuestRuntimeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuestRuntimeHandle")
            .field("quest_id", &self.quest_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::{MissionLog, MissionStatus};
    use crate::quest::test_support::{labels, recorder, two_step_quest};

    fn handle_for(definition: QuestDefinition) -> QuestRuntimeHandle {
        QuestRuntimeHandle::new(QuestRuntime::new(Arc::new(definition)))
    }

    #[test]
    fn test_start_activates_first_step_once() {
        let handle = handle_for(two_step_quest("intro"));
        let events = recorder(handle.events());

        handle.start();
        handle.start();

        assert_eq!(handle.with(QuestRuntime::state), RuntimeState::Active(0));
        assert_eq!(labels(&events), vec!["step_started:a"]);
        assert!(handle.with(|rt| rt.step("a").unwrap().is_active()));
    }

    #[test]
    fn test_start_without_steps_is_noop() {
        let handle = handle_for(QuestDefinition::new("empty", "Empty"));
        let events = recorder(handle.events());

        handle.start();

        assert_eq!(handle.with(QuestRuntime::state), RuntimeState::NotStarted);
        assert!(!handle.with(QuestRuntime::is_started));
        assert!(labels(&events).is_empty());
        assert!(!handle.try_process_signal(&Signal::talk("empty", "zorb")));
    }

    #[test]
    fn test_signal_before_start_is_ignored() {
        let handle = handle_for(two_step_quest("intro"));
        assert!(!handle.try_process_signal(&Signal::talk("intro", "zorb")));
        assert_eq!(handle.with(QuestRuntime::state), RuntimeState::NotStarted);
    }

    #[test]
    fn test_round_trip_event_order() {
        let handle = handle_for(two_step_quest("intro"));
        let events = recorder(handle.events());

        handle.start();
        assert!(handle.try_process_signal(&Signal::talk("intro", "zorb")));
        assert_eq!(handle.with(QuestRuntime::state), RuntimeState::Active(1));
        assert!(handle.try_process_signal(&Signal::give_item("intro", "key", 2)));
        assert_eq!(handle.with(QuestRuntime::state), RuntimeState::Completed);

        assert_eq!(
            labels(&events),
            vec![
                "step_started:a",
                "step_completed:a",
                "step_started:b",
                "step_completed:b",
                "quest_completed",
            ]
        );
        assert!(handle.with(|rt| rt.current_step().is_none()));
    }

    #[test]
    fn test_events_carry_causing_signal() {
        let handle = handle_for(two_step_quest("intro"));
        let events = recorder(handle.events());
        let signal = Signal::talk("intro", "zorb").with_sender("player");

        handle.start();
        handle.try_process_signal(&signal);

        let recorded = events.lock().unwrap();
        assert_eq!(recorded[0].signal(), None);
        assert_eq!(recorded[1].signal(), Some(&signal));
        assert_eq!(recorded[2].signal(), Some(&signal));
    }

    #[test]
    fn test_completion_is_idempotent() {
        let handle = handle_for(two_step_quest("intro"));
        handle.start();
        handle.try_process_signal(&Signal::talk("intro", "zorb"));
        handle.try_process_signal(&Signal::give_item("intro", "key", 2));

        let events = recorder(handle.events());
        assert!(!handle.try_process_signal(&Signal::give_item("intro", "key", 2)));
        assert!(!handle.try_process_signal(&Signal::talk("intro", "zorb")));
        handle.start();

        assert!(handle.is_completed());
        assert!(labels(&events).is_empty());
    }

    #[test]
    fn test_foreign_quest_id_rejected() {
        let handle = handle_for(two_step_quest("intro"));
        handle.start();
        let before = handle.snapshot();

        assert!(!handle.try_process_signal(&Signal::talk("other", "zorb")));
        assert!(!handle.try_process_signal(&Signal::talk("", "zorb")));
        assert_eq!(handle.snapshot(), before);
    }

    #[test]
    fn test_step_id_must_match_current_step() {
        let handle = handle_for(two_step_quest("intro"));
        handle.start();

        assert!(!handle.try_process_signal(&Signal::talk("intro", "zorb").with_step("b")));
        assert!(!handle.try_process_signal(&Signal::talk("intro", "zorb").with_step("missing")));
        assert!(handle.try_process_signal(&Signal::talk("intro", "zorb").with_step("a")));
    }

    #[test]
    fn test_rejected_signal_leaves_state() {
        let handle = handle_for(two_step_quest("intro"));
        handle.start();
        handle.try_process_signal(&Signal::talk("intro", "zorb"));
        let events = recorder(handle.events());

        assert!(!handle.try_process_signal(&Signal::give_item("intro", "key", 1)));
        assert_eq!(handle.with(QuestRuntime::state), RuntimeState::Active(1));
        assert!(labels(&events).is_empty());

        assert!(handle.try_process_signal(&Signal::give_item("intro", "key", 3)));
    }

    #[test]
    fn test_branching_follows_next_step_id() {
        let quest = QuestDefinition::new("branch", "Branch")
            .with_step(StepDefinition::talk("a", None).then("c"))
            .with_step(StepDefinition::talk("b", None))
            .with_step(StepDefinition::talk("c", None).completing_quest());
        let handle = handle_for(quest);
        let events = recorder(handle.events());

        handle.start();
        handle.try_process_signal(&Signal::talk("branch", "zorb"));

        assert_eq!(handle.with(QuestRuntime::state), RuntimeState::Active(2));
        assert_eq!(
            labels(&events),
            vec!["step_started:a", "step_completed:a", "step_started:c"]
        );
    }

    #[test]
    fn test_unknown_next_step_falls_back_to_order() {
        let quest = QuestDefinition::new("branch", "Branch")
            .with_step(StepDefinition::talk("a", None).then("nowhere"))
            .with_step(StepDefinition::talk("b", None));
        let handle = handle_for(quest);

        handle.start();
        assert!(handle.try_process_signal(&Signal::talk("branch", "zorb")));
        assert_eq!(handle.with(QuestRuntime::state), RuntimeState::Active(1));
    }

    #[test]
    fn test_running_off_the_end_completes() {
        let quest = QuestDefinition::new("short", "Short")
            .with_step(StepDefinition::talk("a", None));
        let handle = handle_for(quest);
        let events = recorder(handle.events());

        handle.start();
        assert!(handle.try_process_signal(&Signal::talk("short", "zorb")));

        assert!(handle.is_completed());
        assert_eq!(
            labels(&events),
            vec!["step_started:a", "step_completed:a", "quest_completed"]
        );
    }

    #[test]
    fn test_completes_quest_flag_ends_early() {
        let quest = QuestDefinition::new("early", "Early")
            .with_step(StepDefinition::talk("a", None).completing_quest())
            .with_step(StepDefinition::talk("b", None));
        let handle = handle_for(quest);

        handle.start();
        handle.try_process_signal(&Signal::talk("early", "zorb"));

        assert!(handle.is_completed());
        assert!(!handle.with(|rt| rt.step("b").unwrap().is_entered()));
    }

    #[test]
    fn test_duplicate_step_id_first_wins() {
        let quest = QuestDefinition::new("dupes", "Dupes")
            .with_step(StepDefinition::talk("s1", Some("zorb")))
            .with_step(StepDefinition::give_item("s1", "key", 1))
            .with_step(StepDefinition::talk("s2", None));
        let runtime = QuestRuntime::new(Arc::new(quest));

        assert_eq!(runtime.step_count(), 3);
        assert_eq!(runtime.distinct_step_count(), 2);
        assert_eq!(
            runtime.step("s1").unwrap().expected_signal_type(),
            SignalType::Talk
        );
    }

    #[test]
    fn test_is_step_active() {
        let handle = handle_for(two_step_quest("intro"));
        assert!(!handle.is_step_active("", &SignalType::Talk));

        handle.start();
        assert!(handle.is_step_active("a", &SignalType::Talk));
        assert!(handle.is_step_active("", &SignalType::Talk));
        assert!(!handle.is_step_active("a", &SignalType::GiveItem));
        assert!(!handle.is_step_active("b", &SignalType::GiveItem));
    }

    #[test]
    fn test_hooks_run_around_transitions() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = HookTable::new();
        for step in ["a", "b"] {
            let log = Arc::clone(&calls);
            hooks.on_enter("intro", step, move |ctx| {
                log.lock().unwrap().push(format!("enter:{}", ctx.step.id));
            });
            let log = Arc::clone(&calls);
            hooks.on_exit("intro", step, move |ctx| {
                log.lock().unwrap().push(format!("exit:{}", ctx.step.id));
            });
        }

        let runtime = QuestRuntime::with_hooks(Arc::new(two_step_quest("intro")), &hooks);
        let handle = QuestRuntimeHandle::new(runtime);
        handle.start();
        handle.try_process_signal(&Signal::talk("intro", "zorb"));
        handle.try_process_signal(&Signal::give_item("intro", "key", 2));

        assert_eq!(
            *calls.lock().unwrap(),
            vec!["enter:a", "exit:a", "enter:b", "exit:b"]
        );
    }

    #[test]
    fn test_handle_dispatches_every_recorded_effect() {
        let enters = Arc::new(Mutex::new(0));
        let mut hooks = HookTable::new();
        let count = Arc::clone(&enters);
        hooks.on_enter("intro", "a", move |_| *count.lock().unwrap() += 1);

        let handle = QuestRuntimeHandle::new(QuestRuntime::with_hooks(
            Arc::new(two_step_quest("intro")),
            &hooks,
        ));
        let events = recorder(handle.events());

        handle.start();
        assert!(handle.try_process_signal(&Signal::talk("intro", "zorb")));

        assert_eq!(*enters.lock().unwrap(), 1);
        assert_eq!(
            labels(&events),
            vec!["step_started:a", "step_completed:a", "step_started:b"]
        );
        assert!(handle.with(|rt| rt.outbox.is_empty()));
    }

    #[test]
    fn test_duplicate_step_id_hooks_stay_on_first() {
        let enters = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = HookTable::new();
        let log = Arc::clone(&enters);
        hooks.on_enter("dupes", "s1", move |ctx| {
            log.lock().unwrap().push(ctx.step.expected_signal_type());
        });

        let quest = QuestDefinition::new("dupes", "Dupes")
            .with_step(StepDefinition::talk("s1", None))
            .with_step(StepDefinition::give_item("s1", "key", 1));
        let handle = QuestRuntimeHandle::new(QuestRuntime::with_hooks(Arc::new(quest), &hooks));

        handle.start();
        assert!(handle.try_process_signal(&Signal::talk("dupes", "zorb")));

        // Sequential advance reaches the duplicate, which has no hooks of its own
        assert_eq!(handle.with(QuestRuntime::state), RuntimeState::Active(1));
        assert_eq!(*enters.lock().unwrap(), vec![SignalType::Talk]);
    }

    #[test]
    fn test_reentrant_signal_is_applied_in_causal_order() {
        let handle = handle_for(two_step_quest("intro"));
        let events = recorder(handle.events());

        let inner = handle.clone();
        let accepted = Arc::new(Mutex::new(None));
        let result = Arc::clone(&accepted);
        handle.events().subscribe(move |event| {
            if event.event_type() == "step_completed" && event.step_id() == Some("a") {
                let ok = inner.try_process_signal(&Signal::give_item("intro", "key", 2));
                *result.lock().unwrap() = Some(ok);
            }
        });

        handle.start();
        assert!(handle.try_process_signal(&Signal::talk("intro", "zorb")));

        assert_eq!(*accepted.lock().unwrap(), Some(true));
        assert!(handle.is_completed());
        assert_eq!(
            labels(&events),
            vec![
                "step_started:a",
                "step_completed:a",
                "step_started:b",
                "step_completed:b",
                "quest_completed",
            ]
        );
    }

    #[test]
    fn test_completion_finishes_mission() {
        let missions = Arc::new(MissionLog::new());
        missions.register_mission("intro", "Intro", "");

        let quest = two_step_quest("intro").with_mission(false, true);
        let runtime = QuestRuntime::new(Arc::new(quest))
            .owned_by("alien_7")
            .with_missions(missions.clone());
        let handle = QuestRuntimeHandle::new(runtime);

        handle.start();
        handle.try_process_signal(&Signal::talk("intro", "zorb"));
        assert_eq!(missions.get("intro").unwrap().status, MissionStatus::Active);

        handle.try_process_signal(&Signal::give_item("intro", "key", 2));
        let mission = missions.get("intro").unwrap();
        assert_eq!(mission.status, MissionStatus::Finished);
        assert_eq!(mission.finished_by.as_deref(), Some("alien_7"));
    }

    #[test]
    fn test_custom_kind_uses_table() {
        let quest = QuestDefinition::new("probe", "Probe")
            .with_step(StepDefinition::custom("scan", "scan"));
        let mut kinds = StepKindTable::new();
        kinds.register("scan", |_, signal| signal.sender() == Some("scanner"));
        let runtime = QuestRuntime::new(Arc::new(quest)).with_kinds(Arc::new(kinds));
        let handle = QuestRuntimeHandle::new(runtime);
        handle.start();

        let scan = SignalType::Custom("scan".to_string());
        assert!(!handle.try_process_signal(&Signal::new("probe", scan.clone())));
        assert!(handle.try_process_signal(&Signal::new("probe", scan).with_sender("scanner")));
    }
}
