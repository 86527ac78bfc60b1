//! Quest Library
//!
//! Loads and caches quest definitions from TOML files (JSON is accepted as a
//! tooling import format) under `<data_dir>/quests`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use super::definition::QuestDefinition;
use crate::error::QuestError;

/// Loaded quest definitions, keyed by quest id
pub struct QuestLibrary {
    quests: BTreeMap<String, Arc<QuestDefinition>>,
    data_dir: PathBuf,
}

impl QuestLibrary {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            quests: BTreeMap::new(),
            data_dir: data_dir.join("quests"),
        }
    }

    /// Load all quest definitions from the data directory.
    /// Returns the number of quests loaded.
    pub fn load_all(&mut self) -> Result<usize, QuestError> {
        info!("Loading quests from {:?}", self.data_dir);

        if !self.data_dir.exists() {
            warn!("Quest directory does not exist: {:?}", self.data_dir);
            return Ok(0);
        }

        let mut paths = Vec::new();
        collect_quest_files(&self.data_dir, &mut paths)?;
        paths.sort();

        let mut count = 0;
        for path in paths {
            match load_quest_file(&path) {
                Ok(quest) => {
                    if self.insert(quest) {
                        count += 1;
                    }
                }
                Err(e) => warn!("Failed to load quest {:?}: {}", path, e),
            }
        }
        info!("Loaded {} quest definitions", count);

        self.validate_steps();
        Ok(count)
    }

    /// Add a definition. Duplicate quest ids keep the first definition.
    pub fn insert(&mut self, quest: QuestDefinition) -> bool {
        if self.quests.contains_key(&quest.id) {
            warn!("Duplicate quest id '{}', keeping the first definition", quest.id);
            return false;
        }
        info!("Loaded quest: {} ({})", quest.title, quest.id);
        self.quests.insert(quest.id.clone(), Arc::new(quest));
        true
    }

    /// Warn about duplicate step ids and `next` links that go nowhere
    fn validate_steps(&self) {
        for quest in self.quests.values() {
            for step_id in quest.duplicate_step_ids() {
                warn!(
                    "Quest '{}' has duplicate step id '{}', only the first is reachable",
                    quest.id, step_id
                );
            }
            for (step_id, next) in quest.dangling_links() {
                warn!(
                    "Quest '{}' step '{}' references non-existent step '{}'",
                    quest.id, step_id, next
                );
            }
        }
    }

    pub fn get(&self, quest_id: &str) -> Option<Arc<QuestDefinition>> {
        self.quests.get(quest_id).cloned()
    }

    /// Definitions in quest id order
    pub fn all(&self) -> impl Iterator<Item = &Arc<QuestDefinition>> {
        self.quests.values()
    }

    pub fn contains(&self, quest_id: &str) -> bool {
        self.quests.contains_key(quest_id)
    }

    pub fn len(&self) -> usize {
        self.quests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quests.is_empty()
    }
}

fn collect_quest_files(dir: &Path, paths: &mut Vec<PathBuf>) -> Result<(), QuestError> {
    let entries = std::fs::read_dir(dir).map_err(|e| QuestError::io(dir, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| QuestError::io(dir, e))?;
        let path = entry.path();

        if path.is_dir() {
            collect_quest_files(&path, paths)?;
        } else if path
            .extension()
            .is_some_and(|ext| ext == "toml" || ext == "json")
        {
            paths.push(path);
        }
    }

    Ok(())
}

fn load_quest_file(path: &Path) -> Result<QuestDefinition, QuestError> {
    let content = std::fs::read_to_string(path).map_err(|e| QuestError::io(path, e))?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => QuestDefinition::from_toml(&content),
        Some("json") => QuestDefinition::from_json(&content),
        _ => Err(QuestError::UnsupportedFormat(path.to_path_buf())),
    }
}
