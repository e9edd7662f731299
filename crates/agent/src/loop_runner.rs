//! The orchestration loop: model call, tool rounds, final answer.

use std::sync::Arc;

use chrono::Utc;
use gridline_core::event::{DomainEvent, EventBus};
use gridline_core::message::{ContentBlock, Conversation};
use gridline_core::provider::{InferenceConfig, ModelRequest, Provider, StopReason};
use gridline_core::tool::{ToolCallOutcome, ToolRegistry};
use tracing::{debug, info, warn};

use crate::dispatcher::ToolDispatcher;

/// Returned when the model produced neither text nor tool calls.
pub const NO_RESPONSE: &str = "No response generated.";

/// Returned when tool rounds ran but neither the model nor the tools
/// produced any text.
pub const NO_RESPONSE_AFTER_TOOLS: &str = "No response generated after tool use.";

/// Returned when the round limit is hit before any tool produced text.
pub const ROUND_LIMIT_REACHED: &str =
    "I've reached the maximum number of tool calls for this question. Please try rephrasing it.";

/// Drives one query through model calls and tool rounds.
pub struct AgentLoop {
    /// The model-call boundary
    provider: Arc<dyn Provider>,

    /// The model to use
    model: String,

    /// Sent as the top-level system prompt on every call
    system_prompt: String,

    config: InferenceConfig,

    /// Maximum tool dispatch rounds per query
    max_tool_rounds: u32,

    dispatcher: ToolDispatcher,

    /// Event bus for domain events
    event_bus: Arc<EventBus>,
}

impl AgentLoop {
    /// Create a new agent loop.
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        dispatcher: ToolDispatcher,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            system_prompt: String::new(),
            config: InferenceConfig::default(),
            max_tool_rounds: 8,
            dispatcher,
            event_bus,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_inference_config(mut self, config: InferenceConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the maximum number of tool rounds per query.
    pub fn with_max_tool_rounds(mut self, max: u32) -> Self {
        self.max_tool_rounds = max;
        self
    }

    /// Run one query to completion.
    ///
    /// Appends the query, then alternates model calls and tool rounds until
    /// the model answers in text, gives nothing back, or the round limit is
    /// hit. Model failures propagate; the query's user turn stays appended
    /// and no partial assistant turn is added.
    pub async fn process(
        &self,
        conversation: &mut Conversation,
        registry: &ToolRegistry,
        query: &str,
    ) -> Result<String, gridline_core::Error> {
        info!(
            conversation_id = %conversation.id,
            turns = conversation.len(),
            "Processing query"
        );

        conversation.append_user_text(query);

        let mut rounds_remaining = self.max_tool_rounds;
        let mut last_outcomes: Vec<ToolCallOutcome> = Vec::new();
        let mut round: u32 = 0;

        loop {
            round += 1;
            debug!(conversation_id = %conversation.id, round, "Invoking model");
            self.event_bus.publish(DomainEvent::ModelInvoked {
                conversation_id: conversation.id.to_string(),
                round,
                timestamp: Utc::now(),
            });

            let request = ModelRequest {
                model: self.model.clone(),
                messages: conversation.snapshot(),
                tools: registry.tools().to_vec(),
                system_prompt: self.system_prompt.clone(),
                config: self.config,
            };

            let response = self.provider.complete(request).await?;

            if let Some(usage) = &response.usage {
                self.event_bus.publish(DomainEvent::ResponseGenerated {
                    conversation_id: conversation.id.to_string(),
                    model: response.model.clone(),
                    tokens_used: usage.total_tokens,
                    timestamp: Utc::now(),
                });
            }

            let requests = response.tool_requests();
            if !requests.is_empty() {
                if rounds_remaining == 0 {
                    warn!(
                        conversation_id = %conversation.id,
                        max_tool_rounds = self.max_tool_rounds,
                        "Tool round limit reached, returning fallback"
                    );
                    return Ok(outcome_text(&last_outcomes).unwrap_or_else(|| ROUND_LIMIT_REACHED.into()));
                }
                rounds_remaining -= 1;

                info!(count = requests.len(), round, "Model requested tools");
                let outcomes = self.dispatcher.dispatch(registry, &requests).await;

                // Both turns land together so a cancelled dispatch leaves no
                // unanswered tool use behind.
                conversation.append_tool_use(requests.into_iter().map(ContentBlock::from).collect());
                conversation.append_tool_results(
                    outcomes.iter().cloned().map(ContentBlock::from).collect(),
                );
                last_outcomes = outcomes;
                continue;
            }

            if response.stop_reason == StopReason::ToolUse {
                warn!("Model signalled tool use without any tool_use blocks");
            }

            let text = response.text_content();
            if !text.is_empty() {
                let content: Vec<ContentBlock> = response
                    .message
                    .content
                    .into_iter()
                    .filter(|block| matches!(block, ContentBlock::Text { .. }))
                    .collect();
                conversation.append_assistant(content);
                return Ok(text);
            }

            if round > 1 {
                return Ok(outcome_text(&last_outcomes)
                    .unwrap_or_else(|| NO_RESPONSE_AFTER_TOOLS.into()));
            }

            return Ok(NO_RESPONSE.into());
        }
    }
}

/// The last round's outcome texts, blank-line separated.
fn outcome_text(outcomes: &[ToolCallOutcome]) -> Option<String> {
    let joined = outcomes
        .iter()
        .map(|o| o.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    (!joined.is_empty()).then_some(joined)
}
