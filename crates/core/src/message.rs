//! Turn and ConversationMemory domain types.
//!
//! Memory is an ordered sequence of `(role, text)` turns. It is mutated only
//! by the orchestrator after a fully successful turn, or reset with
//! [`ConversationMemory::clear`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a turn's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The assistant
    Assistant,
}

impl Role {
    /// Label used when rendering history into a prompt.
    pub fn prompt_label(&self) -> &'static str {
        match self {
            Role::User => "Human",
            Role::Assistant => "Assistant",
        }
    }
}

/// A single turn in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Unique turn ID
    pub id: String,

    /// Who authored this turn
    pub role: Role,

    /// The text content
    pub text: String,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Create a new user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// Create a new assistant turn.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Ordered conversation memory for one interactive session.
///
/// Optionally seeded with a single welcome turn from the assistant. The seed
/// is ordinary history: a seeded session condenses its first question
/// against the greeting, and the greeting reaches the QA prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMemory {
    turns: Vec<Turn>,
    seed: Option<Turn>,
}

impl ConversationMemory {
    /// Create memory, optionally seeded with a welcome message.
    pub fn new(welcome: Option<String>) -> Self {
        let seed = welcome.map(Turn::assistant);
        Self {
            turns: seed.iter().cloned().collect(),
            seed,
        }
    }

    /// Create memory with no seed.
    pub fn empty() -> Self {
        Self::new(None)
    }

    /// All turns, seed included.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Turns to condense against and render into prompts, seed included.
    pub fn history(&self) -> &[Turn] {
        &self.turns
    }

    /// False only for an unseeded session with no exchange yet.
    pub fn has_history(&self) -> bool {
        !self.turns.is_empty()
    }

    /// Number of turns, seed included.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Append one completed exchange. Both turns land or neither does.
    pub fn record_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.reserve(2);
        self.turns.push(Turn::user(question));
        self.turns.push(Turn::assistant(answer));
    }

    /// Reset to the seeded state. The turn list is swapped in one step.
    pub fn clear(&mut self) {
        self.turns = self.seed.iter().cloned().collect();
    }

    /// Render the exchange history as prompt text, one line per turn.
    pub fn render_history(&self) -> String {
        self.history()
            .iter()
            .map(|t| format!("{}: {}", t.role.prompt_label(), t.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::empty()
    }
}
