//! Quest runtime for actor-driven life-sim games.
//!
//! Quests are authored as data, run per actor as signal-driven state machines,
//! and publish lifecycle events that dialogue, UI, audio and mission systems
//! subscribe to.

pub mod config;
pub mod error;
pub mod mission;
pub mod quest;

pub use error::QuestError;
pub use mission::{Mission, MissionLog, MissionStatus, MissionSystem};
pub use quest::{
    QuestAgent, QuestDefinition, QuestEvent, QuestLibrary, QuestRegistry, Signal, SignalPayload,
    SignalType, StepDefinition,
};
