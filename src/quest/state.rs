//! Quest State Tracking
//!
//! Status of a quest runtime and the serializable snapshot handed to UI and
//! tooling.

use serde::{Deserialize, Serialize};

/// Coarse status of a quest runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    /// Registered but `start()` has not run
    NotStarted,
    /// A step is current and waiting for a signal
    Active,
    /// Terminal
    Completed,
}

impl QuestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestStatus::NotStarted => "not_started",
            QuestStatus::Active => "active",
            QuestStatus::Completed => "completed",
        }
    }
}

/// Exact runtime state: `NotStarted → Active(step index) → Completed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeState {
    NotStarted,
    Active(usize),
    Completed,
}

impl RuntimeState {
    pub fn status(&self) -> QuestStatus {
        match self {
            RuntimeState::NotStarted => QuestStatus::NotStarted,
            RuntimeState::Active(_) => QuestStatus::Active,
            RuntimeState::Completed => QuestStatus::Completed,
        }
    }
}

/// Point-in-time view of one quest runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestSnapshot {
    pub quest_id: String,
    pub status: QuestStatus,
    pub current_step: Option<String>,
    pub current_index: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings_match_serde() {
        for status in [
            QuestStatus::NotStarted,
            QuestStatus::Active,
            QuestStatus::Completed,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn test_runtime_state_status() {
        assert_eq!(RuntimeState::NotStarted.status(), QuestStatus::NotStarted);
        assert_eq!(RuntimeState::Active(3).status(), QuestStatus::Active);
        assert_eq!(RuntimeState::Completed.status(), QuestStatus::Completed);
    }
}
