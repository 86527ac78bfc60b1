//! Simulator configuration, read from the environment with CLI overrides.

use std::path::PathBuf;

use uuid::Uuid;

const DATA_DIR_VAR: &str = "QUEST_DATA_DIR";
const ACTOR_ID_VAR: &str = "QUEST_ACTOR_ID";
const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Directory holding `quests/`
    pub data_dir: PathBuf,
    /// Actor that owns every loaded quest
    pub actor_id: String,
}

impl SimConfig {
    /// Read `QUEST_DATA_DIR` and `QUEST_ACTOR_ID`; the first CLI argument
    /// overrides the data directory.
    pub fn from_env() -> Self {
        Self::resolve(|key| std::env::var(key).ok(), std::env::args().skip(1))
    }

    fn resolve(
        lookup: impl Fn(&str) -> Option<String>,
        mut args: impl Iterator<Item = String>,
    ) -> Self {
        let data_dir = args
            .next()
            .or_else(|| lookup(DATA_DIR_VAR))
            .filter(|dir| !dir.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());

        let actor_id = lookup(ACTOR_ID_VAR)
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("actor-{}", Uuid::new_v4()));

        Self {
            data_dir: PathBuf::from(data_dir),
            actor_id,
        }
    }
}
