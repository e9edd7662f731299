//! Provider trait: the model-call boundary.
//!
//! A Provider takes the conversation so far, the tool catalog, a system
//! prompt, and inference settings, and returns one structured completion.
//! It never retries on its own; the caller decides.
//!
//! Implementations: Anthropic Messages API (`gridline-providers`), scripted
//! stubs in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::{ContentBlock, Role, Turn, join_text};
use crate::tool::{Tool, ToolCallRequest};

/// Sampling settings sent with every model call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Maximum tokens to generate
    pub max_output_tokens: u32,

    /// Temperature (0.0 = deterministic)
    pub temperature: f32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: 1000,
            temperature: 0.0,
        }
    }
}

/// Everything one model call needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRequest {
    /// The model to use (e.g., "claude-sonnet-4-20250514")
    pub model: String,

    /// The conversation turns, oldest first
    pub messages: Vec<Turn>,

    /// The tool catalog the model may call
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,

    pub system_prompt: String,

    pub config: InferenceConfig,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    ToolUse,
    End,
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A complete response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    pub stop_reason: StopReason,

    /// The generated message (always `Role::Assistant` from real providers)
    pub message: Turn,

    /// Token usage statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    #[serde(default)]
    pub model: String,
}

impl ModelResponse {
    /// A plain-text answer that ends the turn.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            stop_reason: StopReason::End,
            message: Turn::assistant(text),
            usage: None,
            model: String::new(),
        }
    }

    /// A response asking for the given tool calls.
    pub fn tool_use(requests: Vec<ToolCallRequest>) -> Self {
        Self {
            stop_reason: StopReason::ToolUse,
            message: Turn {
                role: Role::Assistant,
                content: requests.into_iter().map(ContentBlock::from).collect(),
            },
            usage: None,
            model: String::new(),
        }
    }

    /// Tool calls requested in this response, in the order they appear.
    ///
    /// The `ToolUse` blocks are the canonical signal; `stop_reason` alone
    /// never produces a request.
    pub fn tool_requests(&self) -> Vec<ToolCallRequest> {
        self.message
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse {
                    tool_use_id,
                    name,
                    input,
                } => Some(ToolCallRequest {
                    tool_use_id: tool_use_id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    /// The response's text fragments, space-joined and trimmed.
    pub fn text_content(&self) -> String {
        join_text(&self.message.content)
    }
}

/// The core Provider trait.
///
/// The agent loop calls `complete()` without knowing which backend is
/// answering.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "anthropic").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(&self, request: ModelRequest) -> std::result::Result<ModelResponse, ProviderError>;
}
