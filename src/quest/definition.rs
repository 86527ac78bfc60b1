//! Quest Definition Structures
//!
//! Raw structures are deserialized from TOML quest files (or JSON for tooling
//! imports) and resolved into read-only definitions shared by every runtime.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use super::signal::{Signal, SignalType};
use crate::error::QuestError;

/// A quest definition file as it appears in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuestFile {
    pub quest: RawQuest,
}

/// Raw quest data. Also the JSON import DTO.
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuest {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Register a mission with the mission system when the quest starts
    #[serde(default)]
    pub auto_register_mission: bool,
    /// Finish the quest's mission when the quest completes
    #[serde(default)]
    pub auto_complete_mission: bool,
    #[serde(default)]
    pub steps: Vec<RawStep>,
}

/// Raw step as it appears in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawStep {
    /// Derived from the step index when absent
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub step_type: String,
    #[serde(default)]
    pub completes_quest: bool,
    /// Step to activate after this one, by id
    #[serde(default)]
    pub next: Option<String>,
    /// Required speaker for talk steps
    #[serde(default)]
    pub speaker: Option<String>,
    /// Required item for give_item steps
    #[serde(default)]
    pub item: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub description: String,
    /// Free-form parameters for custom step kinds
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

fn default_quantity() -> u32 {
    1
}

// ============================================================================
// Resolved Definitions
// ============================================================================

/// What a step waits for. Closed set of built-in kinds plus named custom kinds
/// whose matching is supplied through a [`StepKindTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKind {
    /// Talk to someone (anyone when `speaker_id` is `None`)
    Talk { speaker_id: Option<String> },
    /// Hand over at least `quantity` of an item (any item when `item_id` is `None`)
    GiveItem { item_id: Option<String>, quantity: u32 },
    /// Game-specific kind
    Custom {
        kind: String,
        params: BTreeMap<String, String>,
    },
}

impl StepKind {
    /// Signal type a step of this kind listens for
    pub fn signal_type(&self) -> SignalType {
        match self {
            StepKind::Talk { .. } => SignalType::Talk,
            StepKind::GiveItem { .. } => SignalType::GiveItem,
            StepKind::Custom { kind, .. } => SignalType::Custom(kind.clone()),
        }
    }

    fn from_raw(raw: &RawStep) -> Self {
        match SignalType::parse(&raw.step_type) {
            SignalType::Talk => StepKind::Talk {
                speaker_id: raw.speaker.clone(),
            },
            SignalType::GiveItem => StepKind::GiveItem {
                item_id: raw.item.clone(),
                quantity: raw.quantity,
            },
            SignalType::Custom(kind) => StepKind::Custom {
                kind,
                params: raw.params.clone(),
            },
        }
    }
}

/// Matching function for a custom step kind
pub type KindMatcher = Arc<dyn Fn(&StepDefinition, &Signal) -> bool + Send + Sync>;

/// Table of matchers for custom step kinds, keyed by kind name
#[derive(Clone, Default)]
pub struct StepKindTable {
    matchers: HashMap<String, KindMatcher>,
}

impl StepKindTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the matcher for a custom kind, replacing any previous one
    pub fn register<F>(&mut self, kind: &str, matcher: F)
    where
        F: Fn(&StepDefinition, &Signal) -> bool + Send + Sync + 'static,
    {
        self.matchers.insert(kind_key(kind), Arc::new(matcher));
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.matchers.contains_key(&kind_key(kind))
    }

    /// Kinds without a matcher match on signal type alone
    fn evaluate(&self, kind: &str, step: &StepDefinition, signal: &Signal) -> bool {
        match self.matchers.get(&kind_key(kind)) {
            Some(matcher) => matcher(step, signal),
            None => true,
        }
    }
}

/// Kind names are case-insensitive
fn kind_key(kind: &str) -> String {
    kind.trim().to_lowercase()
}

impl fmt::Debug for StepKindTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepKindTable")
            .field("kinds", &self.matchers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// One step of a quest. Never mutated after authoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDefinition {
    pub id: String,
    pub kind: StepKind,
    /// Completing this step completes the quest
    pub completes_quest: bool,
    /// Explicit successor; sequential order is used when unset
    pub next_step_id: Option<String>,
    pub description: String,
}

impl StepDefinition {
    pub fn new(id: impl Into<String>, kind: StepKind) -> Self {
        Self {
            id: id.into(),
            kind,
            completes_quest: false,
            next_step_id: None,
            description: String::new(),
        }
    }

    /// Talk step. `speaker` narrows it to one speaker.
    pub fn talk(id: impl Into<String>, speaker: Option<&str>) -> Self {
        Self::new(
            id,
            StepKind::Talk {
                speaker_id: speaker.map(str::to_string),
            },
        )
    }

    /// Give-item step requiring at least `quantity` of `item_id`
    pub fn give_item(id: impl Into<String>, item_id: &str, quantity: u32) -> Self {
        Self::new(
            id,
            StepKind::GiveItem {
                item_id: Some(item_id.to_string()),
                quantity,
            },
        )
    }

    /// Custom-kind step
    pub fn custom(id: impl Into<String>, kind: &str) -> Self {
        Self::new(
            id,
            StepKind::Custom {
                kind: kind.to_lowercase(),
                params: BTreeMap::new(),
            },
        )
    }

    pub fn completing_quest(mut self) -> Self {
        self.completes_quest = true;
        self
    }

    pub fn then(mut self, next_step_id: impl Into<String>) -> Self {
        self.next_step_id = Some(next_step_id.into());
        self
    }

    pub fn from_raw(raw: &RawStep, index: usize) -> Self {
        let id = raw
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| derived_step_id(index));

        Self {
            id,
            kind: StepKind::from_raw(raw),
            completes_quest: raw.completes_quest,
            next_step_id: raw.next.clone().filter(|next| !next.trim().is_empty()),
            description: raw.description.clone(),
        }
    }

    pub fn expected_signal_type(&self) -> SignalType {
        self.kind.signal_type()
    }

    /// Whether `signal` satisfies this step. Custom kinds match on type alone.
    pub fn accepts(&self, signal: &Signal) -> bool {
        self.accepts_with(signal, &StepKindTable::default())
    }

    /// Whether `signal` satisfies this step, consulting `kinds` for custom matchers.
    ///
    /// A missing payload capability is a non-match, never an error.
    pub fn accepts_with(&self, signal: &Signal, kinds: &StepKindTable) -> bool {
        if *signal.signal_type() != self.expected_signal_type() {
            return false;
        }

        match &self.kind {
            StepKind::Talk { speaker_id: None } => true,
            StepKind::Talk {
                speaker_id: Some(required),
            } => signal
                .payload()
                .speaker()
                .is_some_and(|speaker| speaker == required),
            StepKind::GiveItem { item_id, quantity } => match signal.payload().item() {
                Some((given, given_quantity)) => {
                    item_id.as_deref().is_none_or(|required| required == given)
                        && given_quantity >= *quantity
                }
                None => false,
            },
            StepKind::Custom { kind, .. } => kinds.evaluate(kind, self, signal),
        }
    }
}

fn derived_step_id(index: usize) -> String {
    format!("step_{}", index)
}

/// A fully resolved quest definition
#[derive(Debug, Clone)]
pub struct QuestDefinition {
    pub id: String,
    pub title: String,
    pub description: String,
    pub auto_register_mission: bool,
    pub auto_complete_mission: bool,
    pub steps: Vec<Arc<StepDefinition>>,
}

impl QuestDefinition {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            auto_register_mission: false,
            auto_complete_mission: false,
            steps: Vec::new(),
        }
    }

    /// Append a step. A blank step id is derived from its position.
    pub fn with_step(mut self, mut step: StepDefinition) -> Self {
        if step.id.trim().is_empty() {
            step.id = derived_step_id(self.steps.len());
        }
        self.steps.push(Arc::new(step));
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Register and finish a mission alongside the quest
    pub fn with_mission(mut self, auto_register: bool, auto_complete: bool) -> Self {
        self.auto_register_mission = auto_register;
        self.auto_complete_mission = auto_complete;
        self
    }

    /// Create a definition from raw TOML/JSON data
    pub fn from_raw(raw: &RawQuest) -> Result<Self, QuestError> {
        let id = raw.id.trim();
        if id.is_empty() {
            return Err(QuestError::MissingQuestId);
        }

        let steps = raw
            .steps
            .iter()
            .enumerate()
            .map(|(i, s)| Arc::new(StepDefinition::from_raw(s, i)))
            .collect();

        Ok(Self {
            id: id.to_string(),
            title: raw.title.clone(),
            description: raw.description.clone(),
            auto_register_mission: raw.auto_register_mission,
            auto_complete_mission: raw.auto_complete_mission,
            steps,
        })
    }

    /// Parse a TOML quest file (`[quest]` table with `[[quest.steps]]`)
    pub fn from_toml(content: &str) -> Result<Self, QuestError> {
        let raw: RawQuestFile = toml::from_str(content)?;
        Self::from_raw(&raw.quest)
    }

    /// Import a quest from its JSON DTO
    pub fn from_json(content: &str) -> Result<Self, QuestError> {
        let raw: RawQuest = serde_json::from_str(content)?;
        Self::from_raw(&raw)
    }

    /// Get the first step with this id
    pub fn get_step(&self, id: &str) -> Option<&Arc<StepDefinition>> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Step ids that appear more than once, in first-seen order
    pub fn duplicate_step_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();
        for step in &self.steps {
            if !seen.insert(step.id.as_str()) && !duplicates.contains(&step.id.as_str()) {
                duplicates.push(step.id.as_str());
            }
        }
        duplicates
    }

    /// `(step_id, next_step_id)` pairs whose successor does not exist
    pub fn dangling_links(&self) -> Vec<(&str, &str)> {
        self.steps
            .iter()
            .filter_map(|s| {
                let next = s.next_step_id.as_deref()?;
                self.get_step(next).is_none().then_some((s.id.as_str(), next))
            })
            .collect()
    }
}
