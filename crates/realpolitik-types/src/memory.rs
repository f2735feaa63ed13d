//! Memory entry types shared by the memory index and state views.

use serde::{Deserialize, Serialize};

use crate::enums::MemoryType;
use crate::ids::{CivId, EventId, MemoryId, MessageId};

/// Typed payload attached to a memory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MemoryPayload {
    /// No structured payload.
    Note,
    /// Derived from a logged event.
    Observation {
        /// Source event.
        event: EventId,
        /// Civs the event named.
        parties: Vec<CivId>,
    },
    /// A message sent or received.
    Communication {
        /// Source message.
        message: MessageId,
        /// Sender.
        from: CivId,
        /// Recipient, `None` for a broadcast.
        to: Option<CivId>,
    },
    /// Actions the agent chose.
    Decision {
        /// Applied action descriptions.
        actions: Vec<String>,
        /// Civs the actions targeted.
        targets: Vec<CivId>,
    },
}

impl MemoryPayload {
    /// First civ other than `owner` the payload names.
    pub fn related_civ(&self, owner: CivId) -> Option<CivId> {
        match self {
            Self::Note => None,
            Self::Observation { parties, .. } => parties.iter().copied().find(|&c| c != owner),
            Self::Communication { from, to, .. } => {
                if *from == owner {
                    *to
                } else {
                    Some(*from)
                }
            }
            Self::Decision { targets, .. } => targets.iter().copied().find(|&c| c != owner),
        }
    }
}

/// One remembered fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Identifier.
    pub id: MemoryId,
    /// Owning civ.
    pub agent: CivId,
    /// Natural-language content.
    pub content: String,
    /// Structured payload.
    pub payload: MemoryPayload,
    /// Type tag.
    pub memory_type: MemoryType,
    /// Turn created.
    pub turn: u64,
    /// Importance in `[0, 1]`.
    pub importance: f64,
    /// Civ this memory is about, if any.
    pub related_civ: Option<CivId>,
}

impl MemoryEntry {
    /// Build an entry. `related_civ` falls back to what the payload names.
    pub fn new(
        agent: CivId,
        memory_type: MemoryType,
        turn: u64,
        importance: f64,
        content: impl Into<String>,
        payload: MemoryPayload,
        related_civ: Option<CivId>,
    ) -> Self {
        let related_civ = related_civ.or_else(|| payload.related_civ(agent));
        Self {
            id: MemoryId::new(),
            agent,
            content: content.into(),
            payload,
            memory_type,
            turn,
            importance: importance.clamp(0.0, 1.0),
            related_civ,
        }
    }

    /// Shorthand for an entry without a structured payload.
    pub fn note(
        agent: CivId,
        memory_type: MemoryType,
        turn: u64,
        importance: f64,
        content: impl Into<String>,
    ) -> Self {
        Self::new(agent, memory_type, turn, importance, content, MemoryPayload::Note, None)
    }

    /// Rough token estimate: one token per four characters, at least one.
    pub fn approximate_tokens(&self) -> usize {
        self.content.chars().count().div_ceil(4).max(1)
    }
}
