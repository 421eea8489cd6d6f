use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Originating role of a conversation turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One message in a conversation, tagged with its originating role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Append-only turn history for the active session.
///
/// Grounds follow-up recommendation requests; turns are never removed
/// or edited, only appended.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConversationHistory {
    turns: Vec<ConversationTurn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the history with the system prompt and the matched context,
    /// replacing any prior turns.
    pub fn initialize(system_prompt: &str, matched_text: &str) -> Self {
        Self {
            turns: vec![
                ConversationTurn::new(Role::System, system_prompt),
                ConversationTurn::new(Role::User, matched_text),
            ],
        }
    }

    /// Appends one turn. Turns with empty content are rejected.
    pub fn append(&mut self, turn: ConversationTurn) -> AppResult<()> {
        if turn.content.trim().is_empty() {
            return Err(AppError::Internal(
                "Refusing to append empty conversation turn".to_string(),
            ));
        }
        self.turns.push(turn);
        Ok(())
    }

    /// Deterministic role-tagged join of all turns, used to ground
    /// follow-up prompts.
    pub fn serialize(&self) -> String {
        self.turns
            .iter()
            .map(|turn| format!("{}: {}", turn.role.as_str(), turn.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
