//! Turn, content block, and Conversation domain types.
//!
//! A [`Conversation`] is the append-only transcript replayed to the model on
//! every call. Turns are built from typed [`ContentBlock`]s, so the loop
//! branches with exhaustive matches instead of probing for keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a conversation (session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a turn's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user (also carries tool results back to the model)
    User,
    /// The language model
    Assistant,
}

/// One typed fragment within a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text
    Text { text: String },

    /// A tool invocation requested by the assistant
    ToolUse {
        tool_use_id: String,
        name: String,
        input: serde_json::Value,
    },

    /// The outcome of a tool invocation, sent back as user content
    ToolResult {
        tool_use_id: String,
        content: Vec<String>,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// One role-attributed unit of conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Turn {
    /// A user turn holding a single text block.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::text(text)],
        }
    }

    /// An assistant turn holding a single text block.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![ContentBlock::text(text)],
        }
    }

    /// Space-joined, trimmed text of every `Text` block in this turn.
    pub fn text(&self) -> String {
        join_text(&self.content)
    }

    /// Ids of every `ToolUse` block in this turn, in order.
    pub fn tool_use_ids(&self) -> Vec<&str> {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { tool_use_id, .. } => Some(tool_use_id.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Ids of every `ToolResult` block in this turn, in order.
    pub fn tool_result_ids(&self) -> Vec<&str> {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolResult { tool_use_id, .. } => Some(tool_use_id.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Join the text blocks of a content sequence with spaces and trim.
pub fn join_text(content: &[ContentBlock]) -> String {
    content
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// The ordered, append-only transcript of one session.
///
/// Appending is the only mutation; [`Conversation::clear`] is the only way
/// to drop turns. Each `append_*` pushes exactly one whole turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation ID (regenerated on clear)
    pub id: ConversationId,

    turns: Vec<Turn>,

    /// When this conversation was created
    pub created_at: DateTime<Utc>,

    /// When the last turn was appended
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn push(&mut self, turn: Turn) {
        self.updated_at = Utc::now();
        self.turns.push(turn);
    }

    /// Append the user's query.
    pub fn append_user_text(&mut self, text: impl Into<String>) {
        self.push(Turn::user(text));
    }

    /// Append the assistant turn that requested tools.
    pub fn append_tool_use(&mut self, content: Vec<ContentBlock>) {
        self.push(Turn {
            role: Role::Assistant,
            content,
        });
    }

    /// Append one user turn carrying every tool result of a round.
    pub fn append_tool_results(&mut self, content: Vec<ContentBlock>) {
        self.push(Turn {
            role: Role::User,
            content,
        });
    }

    /// Append the assistant's final answer content.
    pub fn append_assistant(&mut self, content: Vec<ContentBlock>) {
        self.push(Turn {
            role: Role::Assistant,
            content,
        });
    }

    /// The ordered turns, for replay to the model.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Drop every turn and start over under a fresh id.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Ids of `ToolUse` blocks with no matching `ToolResult` later in the
    /// transcript. Empty whenever the conversation can be submitted.
    pub fn unanswered_tool_uses(&self) -> Vec<String> {
        let mut open: Vec<String> = Vec::new();
        for turn in &self.turns {
            match turn.role {
                Role::Assistant => open.extend(turn.tool_use_ids().into_iter().map(String::from)),
                Role::User => {
                    let answered = turn.tool_result_ids();
                    open.retain(|id| !answered.contains(&id.as_str()));
                }
            }
        }
        open
    }

    /// Get the total token count estimate (rough: 4 chars ≈ 1 token).
    pub fn estimated_tokens(&self) -> usize {
        self.turns
            .iter()
            .flat_map(|t| t.content.iter())
            .map(|block| match block {
                ContentBlock::Text { text } => text.len(),
                ContentBlock::ToolUse { name, input, .. } => name.len() + input.to_string().len(),
                ContentBlock::ToolResult { content, .. } => content.iter().map(String::len).sum(),
            })
            .sum::<usize>()
            / 4
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
