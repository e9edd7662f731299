//! Anthropic native provider implementation.
//!
//! Uses Anthropic's Messages API directly. The API speaks the same content
//! block vocabulary as the conversation store (`text`, `tool_use`,
//! `tool_result`), so turns map one-to-one onto API messages.
//!
//! Features:
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - System prompt as top-level field
//! - `stop_reason` mapped onto [`StopReason`]

use async_trait::async_trait;
use gridline_core::error::ProviderError;
use gridline_core::message::{ContentBlock, Role, Turn};
use gridline_core::provider::{ModelRequest, ModelResponse, Provider, StopReason, Usage};
use gridline_core::tool::Tool;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Anthropic native Messages API provider.
pub struct AnthropicProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider with a request timeout.
    pub fn new(
        api_key: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: "anthropic".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Convert turns to Anthropic API messages.
    fn to_api_messages(turns: &[Turn]) -> Vec<AnthropicMessage> {
        turns
            .iter()
            .map(|turn| AnthropicMessage {
                role: match turn.role {
                    Role::User => "user".into(),
                    Role::Assistant => "assistant".into(),
                },
                content: turn.content.iter().map(ApiBlock::from).collect(),
            })
            .collect()
    }

    /// Convert the tool catalog to Anthropic format.
    fn to_api_tools(tools: &[Tool]) -> Vec<AnthropicTool> {
        tools
            .iter()
            .map(|t| AnthropicTool {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: t.object_schema(),
            })
            .collect()
    }

    fn request_body(request: &ModelRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "max_tokens": request.config.max_output_tokens,
            "temperature": request.config.temperature,
        });

        if !request.system_prompt.is_empty() {
            body["system"] = serde_json::json!(request.system_prompt);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
            body["tool_choice"] = serde_json::json!({ "type": "auto" });
        }

        body
    }

    /// Convert Anthropic API response to our ModelResponse.
    fn to_model_response(resp: AnthropicResponse) -> ModelResponse {
        let content = resp
            .content
            .into_iter()
            .filter_map(|block| match block {
                ResponseBlock::Text { text } => Some(ContentBlock::Text { text }),
                ResponseBlock::ToolUse { id, name, input } => Some(ContentBlock::ToolUse {
                    tool_use_id: id,
                    name,
                    input,
                }),
                ResponseBlock::Other => None,
            })
            .collect();

        let stop_reason = match resp.stop_reason.as_deref() {
            Some("tool_use") => StopReason::ToolUse,
            _ => StopReason::End,
        };

        ModelResponse {
            stop_reason,
            message: Turn {
                role: Role::Assistant,
                content,
            },
            usage: Some(Usage {
                prompt_tokens: resp.usage.input_tokens,
                completion_tokens: resp.usage.output_tokens,
                total_tokens: resp.usage.input_tokens + resp.usage.output_tokens,
            }),
            model: resp.model,
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = Self::request_body(&request);

        debug!(
            provider = "anthropic",
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ProviderError::RateLimited {
                retry_after_secs: 5,
            });
        }
        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid Anthropic API key".into(),
            ));
        }
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Anthropic API error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let raw = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        trace!(body = %raw, "Anthropic response");

        let api_resp: AnthropicResponse = serde_json::from_str(&raw).map_err(|e| {
            ProviderError::MalformedResponse(format!("Failed to parse Anthropic response: {e}"))
        })?;

        Ok(Self::to_model_response(api_resp))
    }
}

// --- Anthropic API types ---

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: Vec<ApiBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: Vec<ApiTextBlock>,
    },
}

#[derive(Debug, Serialize)]
struct ApiTextBlock {
    #[serde(rename = "type")]
    kind: &'static str,
    text: String,
}

impl From<&ContentBlock> for ApiBlock {
    fn from(block: &ContentBlock) -> Self {
        match block {
            ContentBlock::Text { text } => ApiBlock::Text { text: text.clone() },
            ContentBlock::ToolUse {
                tool_use_id,
                name,
                input,
            } => ApiBlock::ToolUse {
                id: tool_use_id.clone(),
                name: name.clone(),
                input: input.clone(),
            },
            ContentBlock::ToolResult {
                tool_use_id,
                content,
            } => ApiBlock::ToolResult {
                tool_use_id: tool_use_id.clone(),
                content: content
                    .iter()
                    .map(|text| ApiTextBlock {
                        kind: "text",
                        text: text.clone(),
                    })
                    .collect(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    content: Vec<ResponseBlock>,
    usage: AnthropicUsage,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridline_core::provider::InferenceConfig;
    use std::time::Duration;

    fn provider() -> AnthropicProvider {
        AnthropicProvider::new("sk-ant-test", Duration::from_secs(5)).unwrap()
    }

    fn billing_tool() -> Tool {
        Tool {
            name: "check_billing_status".into(),
            description: "Check billing status for a meter".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": { "meter_number": { "type": "string" } },
                "required": ["meter_number"]
            }),
        }
    }

    #[test]
    fn constructor() {
        let provider = provider();
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn constructor_with_base_url() {
        let provider = provider().with_base_url("https://custom.proxy.com/");
        assert_eq!(provider.base_url, "https://custom.proxy.com");
    }

    #[test]
    fn tool_round_maps_to_native_blocks() {
        let turns = vec![
            Turn::user("What's due on UP7284651023?"),
            Turn {
                role: Role::Assistant,
                content: vec![ContentBlock::ToolUse {
                    tool_use_id: "toolu_1".into(),
                    name: "check_billing_status".into(),
                    input: serde_json::json!({"meter_number": "UP7284651023"}),
                }],
            },
            Turn {
                role: Role::User,
                content: vec![ContentBlock::ToolResult {
                    tool_use_id: "toolu_1".into(),
                    content: vec!["status: Pending".into()],
                }],
            },
        ];

        let json = serde_json::to_value(AnthropicProvider::to_api_messages(&turns)).unwrap();
        assert_eq!(json[0]["role"], "user");
        assert_eq!(json[0]["content"][0]["type"], "text");
        assert_eq!(json[1]["role"], "assistant");
        assert_eq!(json[1]["content"][0]["type"], "tool_use");
        assert_eq!(json[1]["content"][0]["id"], "toolu_1");
        assert_eq!(json[1]["content"][0]["input"]["meter_number"], "UP7284651023");
        assert_eq!(json[2]["role"], "user");
        assert_eq!(json[2]["content"][0]["type"], "tool_result");
        assert_eq!(json[2]["content"][0]["tool_use_id"], "toolu_1");
        assert_eq!(json[2]["content"][0]["content"][0]["text"], "status: Pending");
    }

    #[test]
    fn request_body_carries_system_tools_and_config() {
        let request = ModelRequest {
            model: "claude-sonnet-4-20250514".into(),
            messages: vec![Turn::user("hi")],
            tools: vec![billing_tool()],
            system_prompt: "You are a call centre assistant.".into(),
            config: InferenceConfig {
                max_output_tokens: 1000,
                temperature: 0.0,
            },
        };

        let body = AnthropicProvider::request_body(&request);
        assert_eq!(body["system"], "You are a call centre assistant.");
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["tools"][0]["name"], "check_billing_status");
        assert_eq!(body["tools"][0]["input_schema"]["type"], "object");
        assert_eq!(body["tools"][0]["input_schema"]["required"][0], "meter_number");
        assert_eq!(body["tool_choice"]["type"], "auto");
    }

    #[test]
    fn request_body_without_tools_omits_tool_choice() {
        let request = ModelRequest {
            model: "m".into(),
            messages: vec![Turn::user("hi")],
            tools: vec![],
            system_prompt: String::new(),
            config: InferenceConfig::default(),
        };
        let body = AnthropicProvider::request_body(&request);
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
        assert!(body.get("system").is_none());
    }

    #[test]
    fn parse_text_response() {
        let resp: AnthropicResponse = serde_json::from_str(
            r#"{
                "id": "msg_01",
                "model": "claude-sonnet-4-20250514",
                "content": [{"type": "text", "text": "Hello!"}],
                "usage": {"input_tokens": 10, "output_tokens": 5},
                "stop_reason": "end_turn"
            }"#,
        )
        .unwrap();

        let response = AnthropicProvider::to_model_response(resp);
        assert_eq!(response.stop_reason, StopReason::End);
        assert_eq!(response.text_content(), "Hello!");
        assert!(response.tool_requests().is_empty());
        assert_eq!(response.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn parse_tool_use_response() {
        let resp: AnthropicResponse = serde_json::from_str(
            r#"{
                "id": "msg_02",
                "model": "claude-sonnet-4-20250514",
                "content": [
                    {"type": "text", "text": "Let me check"},
                    {"type": "tool_use", "id": "toolu_abc", "name": "check_outage", "input": {"area": "Sector 18"}}
                ],
                "usage": {"input_tokens": 20, "output_tokens": 10},
                "stop_reason": "tool_use"
            }"#,
        )
        .unwrap();

        let response = AnthropicProvider::to_model_response(resp);
        assert_eq!(response.stop_reason, StopReason::ToolUse);
        let requests = response.tool_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].tool_use_id, "toolu_abc");
        assert_eq!(requests[0].input["area"], "Sector 18");
    }

    #[test]
    fn unknown_blocks_are_skipped() {
        let resp: AnthropicResponse = serde_json::from_str(
            r#"{
                "model": "claude-sonnet-4-20250514",
                "content": [
                    {"type": "thinking", "thinking": "hmm", "signature": "x"},
                    {"type": "text", "text": "Answer."}
                ],
                "usage": {"input_tokens": 1, "output_tokens": 1}
            }"#,
        )
        .unwrap();

        let response = AnthropicProvider::to_model_response(resp);
        assert_eq!(response.message.content.len(), 1);
        assert_eq!(response.text_content(), "Answer.");
    }
}
