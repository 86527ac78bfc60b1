//! Mission System
//!
//! Missions are the player-facing log entries paired with quests. The quest
//! system only calls into a [`MissionSystem`]; [`MissionLog`] is the in-memory
//! implementation used by the simulator and tests.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Interface the quest system uses to drive missions
pub trait MissionSystem: Send + Sync {
    fn register_mission(&self, id: &str, title: &str, description: &str);

    /// Mark a mission finished, crediting `actor` when known
    fn set_mission_finished(&self, id: &str, actor: Option<&str>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    Active,
    Finished,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mission {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: MissionStatus,
    pub finished_by: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// In-memory mission log
#[derive(Debug, Default)]
pub struct MissionLog {
    missions: DashMap<String, Mission>,
}

impl MissionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<Mission> {
        self.missions.get(id).map(|m| m.clone())
    }

    /// All missions, oldest first
    pub fn all(&self) -> Vec<Mission> {
        let mut missions: Vec<Mission> = self.missions.iter().map(|m| m.clone()).collect();
        missions.sort_by(|a, b| {
            a.registered_at
                .cmp(&b.registered_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        missions
    }

    pub fn len(&self) -> usize {
        self.missions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.missions.is_empty()
    }
}

impl MissionSystem for MissionLog {
    fn register_mission(&self, id: &str, title: &str, description: &str) {
        if self.missions.contains_key(id) {
            warn!("Mission '{}' already registered, keeping the first", id);
            return;
        }

        self.missions.insert(
            id.to_string(),
            Mission {
                id: id.to_string(),
                title: title.to_string(),
                description: description.to_string(),
                status: MissionStatus::Active,
                finished_by: None,
                registered_at: Utc::now(),
                finished_at: None,
            },
        );
        info!("Registered mission: {} ({})", title, id);
    }

    fn set_mission_finished(&self, id: &str, actor: Option<&str>) {
        let Some(mut mission) = self.missions.get_mut(id) else {
            warn!("Cannot finish unknown mission '{}'", id);
            return;
        };

        if mission.status == MissionStatus::Finished {
            debug!("Mission '{}' already finished", id);
            return;
        }

        mission.status = MissionStatus::Finished;
        mission.finished_by = actor.map(str::to_string);
        mission.finished_at = Some(Utc::now());
        info!("Mission '{}' finished", id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_finish() {
        let log = MissionLog::new();
        log.register_mission("intro", "Intro", "Meet the visitor");
        assert_eq!(log.len(), 1);
        assert_eq!(log.get("intro").unwrap().status, MissionStatus::Active);

        log.set_mission_finished("intro", Some("alien_7"));
        let mission = log.get("intro").unwrap();
        assert_eq!(mission.status, MissionStatus::Finished);
        assert_eq!(mission.finished_by.as_deref(), Some("alien_7"));
        assert!(mission.finished_at.is_some());
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let log = MissionLog::new();
        log.register_mission("intro", "First", "");
        log.register_mission("intro", "Second", "");
        assert_eq!(log.len(), 1);
        assert_eq!(log.get("intro").unwrap().title, "First");
    }

    #[test]
    fn test_finish_is_idempotent() {
        let log = MissionLog::new();
        log.register_mission("intro", "Intro", "");
        log.set_mission_finished("intro", Some("first"));
        log.set_mission_finished("intro", Some("second"));
        assert_eq!(log.get("intro").unwrap().finished_by.as_deref(), Some("first"));

        // Unknown missions are ignored
        log.set_mission_finished("missing", None);
        assert!(log.get("missing").is_none());
    }
}
