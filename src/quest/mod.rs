//! Quest System Module
//!
//! Engine-agnostic quest runtime: authored definitions, per-actor state
//! machines driven by signals, and a process-wide registry for routing
//! signals and lifecycle events by quest id.

pub mod agent;
pub mod definition;
pub mod events;
pub mod library;
pub mod registry;
pub mod runtime;
pub mod signal;
pub mod state;
pub mod step;

pub use agent::QuestAgent;
pub use definition::{QuestDefinition, StepDefinition, StepKind, StepKindTable};
pub use events::{EventBus, QuestEvent, SubscriptionId};
pub use library::QuestLibrary;
pub use registry::QuestRegistry;
pub use runtime::{QuestRuntime, QuestRuntimeHandle};
pub use signal::{Signal, SignalPayload, SignalType};
pub use state::{QuestSnapshot, QuestStatus, RuntimeState};
pub use step::{HookTable, QuestStepInstance, StepHookContext, StepHooks};
