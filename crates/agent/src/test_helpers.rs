//! Shared scripted providers and spy channels for agent tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use gridline_core::error::{ConnectionError, ProviderError, ToolError};
use gridline_core::provider::{ModelRequest, ModelResponse, Provider, Usage};
use gridline_core::tool::{Tool, ToolCallRequest, ToolChannel, ToolRegistry};
use serde_json::{Value, json};

/// A provider that replays a fixed script, one response per call, and
/// records every request it receives.
pub struct ScriptedProvider {
    script: Mutex<Vec<Result<ModelResponse, ProviderError>>>,
    repeat_last: bool,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<ModelResponse, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script),
            repeat_last: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn responses(responses: Vec<ModelResponse>) -> Self {
        Self::new(responses.into_iter().map(Ok).collect())
    }

    /// Answer every call with the same response.
    pub fn always(response: ModelResponse) -> Self {
        Self {
            repeat_last: true,
            ..Self::responses(vec![response])
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let mut script = self.script.lock().unwrap();
        if self.repeat_last && script.len() == 1 {
            return script[0].clone();
        }
        assert!(!script.is_empty(), "ScriptedProvider: script exhausted");
        script.remove(0)
    }
}

/// A tool channel that counts invocations and answers from a table.
pub struct SpyChannel {
    tools: Vec<Tool>,
    replies: HashMap<String, Result<Vec<String>, ToolError>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl SpyChannel {
    pub fn new() -> Self {
        Self {
            tools: electricity_tools(),
            replies: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = tools;
        self
    }

    pub fn respond(mut self, tool: &str, fragments: &[&str]) -> Self {
        self.replies.insert(
            tool.to_string(),
            Ok(fragments.iter().map(|s| s.to_string()).collect()),
        );
        self
    }

    pub fn fail(mut self, tool: &str, error: ToolError) -> Self {
        self.replies.insert(tool.to_string(), Err(error));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolChannel for SpyChannel {
    fn name(&self) -> &str {
        "spy"
    }

    async fn list_tools(&self) -> Result<Vec<Tool>, ConnectionError> {
        Ok(self.tools.clone())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Vec<String>, ToolError> {
        self.calls.lock().unwrap().push((name.to_string(), arguments));
        self.replies
            .get(name)
            .cloned()
            .unwrap_or_else(|| Ok(vec![String::new()]))
    }
}

pub fn electricity_tools() -> Vec<Tool> {
    vec![
        Tool {
            name: "check_outage".into(),
            description: "Check electricity outage status for a given area or locality".into(),
            input_schema: json!({
                "type": "object",
                "properties": { "area": { "type": "string" } },
                "required": ["area"]
            }),
        },
        Tool {
            name: "check_billing_status".into(),
            description: "Check billing status for a meter number".into(),
            input_schema: json!({
                "type": "object",
                "properties": { "meter_number": { "type": "string" } },
                "required": ["meter_number"]
            }),
        },
    ]
}

pub fn electricity_registry() -> ToolRegistry {
    ToolRegistry::from_tools(electricity_tools())
}

pub fn call(id: &str, name: &str, input: Value) -> ToolCallRequest {
    ToolCallRequest {
        tool_use_id: id.into(),
        name: name.into(),
        input,
    }
}

/// A text answer carrying usage data.
pub fn answer(text: &str) -> ModelResponse {
    ModelResponse {
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "scripted-model".into(),
        ..ModelResponse::text(text)
    }
}
