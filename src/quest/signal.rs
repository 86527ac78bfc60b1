//! Quest Signals
//!
//! Signals are the inbound side of the quest system: something happened in the
//! world (a conversation finished, an item was handed over) that may progress a
//! quest step.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Channel a signal arrives on. Step definitions declare which one they expect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SignalType {
    /// Player talked to someone
    Talk,
    /// Player handed over an item
    GiveItem,
    /// Game-specific channel, matched by name
    Custom(String),
}

impl SignalType {
    /// Parse a signal type name. Unknown names become custom channels.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "talk" | "talk_to" => SignalType::Talk,
            "give_item" | "give" => SignalType::GiveItem,
            other => SignalType::Custom(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SignalType::Talk => "talk",
            SignalType::GiveItem => "give_item",
            SignalType::Custom(name) => name,
        }
    }
}

impl From<String> for SignalType {
    fn from(s: String) -> Self {
        SignalType::parse(&s)
    }
}

impl From<SignalType> for String {
    fn from(t: SignalType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed data attached to a signal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalPayload {
    #[default]
    None,
    /// An item changed hands
    Item { item_id: String, quantity: u32 },
    /// Someone spoke
    Speaker { speaker_id: String },
}

impl SignalPayload {
    /// Item capability: `(item_id, quantity)` if this payload carries one
    pub fn item(&self) -> Option<(&str, u32)> {
        match self {
            SignalPayload::Item { item_id, quantity } => Some((item_id, *quantity)),
            _ => None,
        }
    }

    /// Speaker capability
    pub fn speaker(&self) -> Option<&str> {
        match self {
            SignalPayload::Speaker { speaker_id } => Some(speaker_id),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, SignalPayload::None)
    }
}

/// An immutable "something happened" notification addressed to a quest.
///
/// Fields are private; builders consume `self` so a signal cannot change once
/// it has been handed to the quest system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    quest_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    step_id: Option<String>,
    signal_type: SignalType,
    #[serde(default, skip_serializing_if = "SignalPayload::is_none")]
    payload: SignalPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sender: Option<String>,
}

impl Signal {
    pub fn new(quest_id: impl Into<String>, signal_type: SignalType) -> Self {
        Self {
            quest_id: quest_id.into(),
            step_id: None,
            signal_type,
            payload: SignalPayload::None,
            sender: None,
        }
    }

    /// Talk signal carrying the speaker's id
    pub fn talk(quest_id: impl Into<String>, speaker_id: impl Into<String>) -> Self {
        Self::new(quest_id, SignalType::Talk).with_payload(SignalPayload::Speaker {
            speaker_id: speaker_id.into(),
        })
    }

    /// Give-item signal carrying the item and quantity handed over
    pub fn give_item(
        quest_id: impl Into<String>,
        item_id: impl Into<String>,
        quantity: u32,
    ) -> Self {
        Self::new(quest_id, SignalType::GiveItem).with_payload(SignalPayload::Item {
            item_id: item_id.into(),
            quantity,
        })
    }

    /// Restrict the signal to one step of the quest
    pub fn with_step(mut self, step_id: impl Into<String>) -> Self {
        self.step_id = Some(step_id.into());
        self
    }

    pub fn with_payload(mut self, payload: SignalPayload) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn quest_id(&self) -> &str {
        &self.quest_id
    }

    /// Targeted step id. Blank ids count as untargeted.
    pub fn step_id(&self) -> Option<&str> {
        self.step_id.as_deref().filter(|id| !id.trim().is_empty())
    }

    pub fn signal_type(&self) -> &SignalType {
        &self.signal_type
    }

    pub fn payload(&self) -> &SignalPayload {
        &self.payload
    }

    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_type_parsing() {
        assert_eq!(SignalType::parse("talk"), SignalType::Talk);
        assert_eq!(SignalType::parse("Talk_To"), SignalType::Talk);
        assert_eq!(SignalType::parse("give_item"), SignalType::GiveItem);
        assert_eq!(SignalType::parse("give"), SignalType::GiveItem);
        assert_eq!(SignalType::parse("scan"), SignalType::Custom("scan".to_string()));
    }

    #[test]
    fn test_payload_capabilities() {
        let signal = Signal::give_item("intro", "key", 2);
        assert_eq!(signal.payload().item(), Some(("key", 2)));
        assert_eq!(signal.payload().speaker(), None);

        let signal = Signal::talk("intro", "zorb");
        assert_eq!(signal.payload().speaker(), Some("zorb"));
        assert_eq!(signal.payload().item(), None);
    }

    #[test]
    fn test_blank_step_id_is_untargeted() {
        let signal = Signal::new("intro", SignalType::Talk).with_step("  ");
        assert_eq!(signal.step_id(), None);

        let signal = Signal::new("intro", SignalType::Talk).with_step("greet");
        assert_eq!(signal.step_id(), Some("greet"));
    }

    #[test]
    fn test_signal_from_json() {
        let json = r#"{
            "quest_id": "intro",
            "step_id": "deliver",
            "signal_type": "give_item",
            "payload": { "kind": "item", "item_id": "key", "quantity": 3 },
            "sender": "player"
        }"#;
        let signal: Signal = serde_json::from_str(json).unwrap();
        assert_eq!(signal.quest_id(), "intro");
        assert_eq!(signal.step_id(), Some("deliver"));
        assert_eq!(signal.signal_type(), &SignalType::GiveItem);
        assert_eq!(signal.payload().item(), Some(("key", 3)));
        assert_eq!(signal.sender(), Some("player"));

        let minimal: Signal =
            serde_json::from_str(r#"{ "quest_id": "intro", "signal_type": "talk" }"#).unwrap();
        assert!(minimal.payload().is_none());
        assert_eq!(minimal.step_id(), None);
    }
}
