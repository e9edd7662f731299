//! Tools, tool calls, and the tool-provider channel.
//!
//! Tools are not implemented in-process: a [`ToolChannel`] lists them once
//! at connect time and executes them by name. The [`ToolRegistry`] is the
//! session's immutable snapshot of that listing.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConnectionError, ToolError};
use crate::message::ContentBlock;

/// A callable tool as advertised by the tool provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Unique name within the registry
    pub name: String,

    /// Description of what the tool does (sent to the model)
    #[serde(default)]
    pub description: String,

    /// JSON Schema with `properties` and `required`
    pub input_schema: serde_json::Value,
}

impl Tool {
    /// The schema as `{type: object, properties, required}`, filling in
    /// an empty object / list for whichever of the two is missing.
    pub fn object_schema(&self) -> serde_json::Value {
        let properties = self
            .input_schema
            .get("properties")
            .cloned()
            .unwrap_or_else(|| serde_json::json!({}));
        let required = self
            .input_schema
            .get("required")
            .cloned()
            .unwrap_or_else(|| serde_json::json!([]));
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Matches the model's tool_use id
    pub tool_use_id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub input: serde_json::Value,
}

impl From<ToolCallRequest> for ContentBlock {
    fn from(request: ToolCallRequest) -> Self {
        ContentBlock::ToolUse {
            tool_use_id: request.tool_use_id,
            name: request.name,
            input: request.input,
        }
    }
}

/// The result (or error message) for exactly one [`ToolCallRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallOutcome {
    /// The call ID this outcome answers
    pub tool_use_id: String,

    /// Human-readable result or failure text
    pub text: String,

    /// Whether the tool actually ran and succeeded
    pub success: bool,
}

impl ToolCallOutcome {
    pub fn success(tool_use_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tool_use_id: tool_use_id.into(),
            text: text.into(),
            success: true,
        }
    }

    pub fn failure(tool_use_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tool_use_id: tool_use_id.into(),
            text: text.into(),
            success: false,
        }
    }
}

impl From<ToolCallOutcome> for ContentBlock {
    fn from(outcome: ToolCallOutcome) -> Self {
        ContentBlock::ToolResult {
            tool_use_id: outcome.tool_use_id,
            content: vec![outcome.text],
        }
    }
}

/// The tool-provider channel.
///
/// A long-lived session opened once at connect time. Implementations own
/// their transport; timeouts on `call_tool` are theirs to enforce.
#[async_trait]
pub trait ToolChannel: Send + Sync {
    /// A human-readable name for the provider behind this channel.
    fn name(&self) -> &str;

    /// List every tool the provider exposes.
    async fn list_tools(&self) -> std::result::Result<Vec<Tool>, ConnectionError>;

    /// Invoke a tool and return its text fragments in order.
    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> std::result::Result<Vec<String>, ToolError>;

    /// Close the channel. Called once, outside any active query.
    async fn shutdown(&self) {}
}

/// An immutable snapshot of the provider's tool listing.
///
/// Catalog order follows the listing. Duplicate names are resolved
/// last-write-wins, keeping the position of the first occurrence.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a tool listing.
    pub fn from_tools(tools: Vec<Tool>) -> Self {
        let mut registry = Self::new();
        for tool in tools {
            match registry.index.get(&tool.name) {
                Some(&position) => {
                    warn!(tool = %tool.name, "Duplicate tool name from provider, keeping the later definition");
                    registry.tools[position] = tool;
                }
                None => {
                    registry.index.insert(tool.name.clone(), registry.tools.len());
                    registry.tools.push(tool);
                }
            }
        }
        registry
    }

    /// Fetch a fresh snapshot from the channel.
    pub async fn refresh(channel: &dyn ToolChannel) -> std::result::Result<Self, ConnectionError> {
        let tools = channel.list_tools().await?;
        Ok(Self::from_tools(tools))
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// The tool catalog, in listing order.
    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(name: &str, description: &str) -> Tool {
        Tool {
            name: name.into(),
            description: description.into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": { "area": { "type": "string" } },
                "required": ["area"]
            }),
        }
    }

    /// A channel that only knows how to list a fixed catalog.
    struct ListingChannel {
        tools: Vec<Tool>,
    }

    #[async_trait]
    impl ToolChannel for ListingChannel {
        fn name(&self) -> &str {
            "listing"
        }

        async fn list_tools(&self) -> std::result::Result<Vec<Tool>, ConnectionError> {
            Ok(self.tools.clone())
        }

        async fn call_tool(
            &self,
            name: &str,
            _arguments: serde_json::Value,
        ) -> std::result::Result<Vec<String>, ToolError> {
            Err(ToolError::NotFound(name.into()))
        }
    }

    #[test]
    fn registry_lookup() {
        let registry = ToolRegistry::from_tools(vec![tool("check_outage", "Outages")]);
        assert!(registry.get("check_outage").is_some());
        assert!(registry.get("nonexistent").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn duplicate_names_last_write_wins() {
        let registry = ToolRegistry::from_tools(vec![
            tool("check_outage", "first"),
            tool("check_billing_status", "billing"),
            tool("check_outage", "second"),
        ]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["check_outage", "check_billing_status"]);
        assert_eq!(registry.get("check_outage").unwrap().description, "second");
    }

    #[test]
    fn object_schema_fills_missing_fields() {
        let bare = Tool {
            name: "ping".into(),
            description: String::new(),
            input_schema: serde_json::json!({}),
        };
        let schema = bare.object_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"], serde_json::json!({}));
        assert_eq!(schema["required"], serde_json::json!([]));
    }

    #[test]
    fn outcome_becomes_tool_result_block() {
        let block: ContentBlock = ToolCallOutcome::success("t1", "No outage").into();
        assert_eq!(
            block,
            ContentBlock::ToolResult {
                tool_use_id: "t1".into(),
                content: vec!["No outage".into()],
            }
        );
    }

    #[tokio::test]
    async fn refresh_replaces_snapshot() {
        let channel = ListingChannel {
            tools: vec![tool("check_outage", "Outages"), tool("check_billing_status", "Bills")],
        };
        let registry = ToolRegistry::refresh(&channel).await.unwrap();
        assert_eq!(registry.names(), vec!["check_outage", "check_billing_status"]);
    }
}
