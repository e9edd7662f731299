//! Sequential tool dispatch.
//!
//! Every request yields exactly one outcome, in request order. Lookup
//! misses, invalid arguments, and channel failures all become outcome text
//! for the model to read; nothing here returns an error.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use gridline_core::event::{DomainEvent, EventBus};
use gridline_core::tool::{ToolCallOutcome, ToolCallRequest, ToolChannel, ToolRegistry};
use tracing::{info, warn};

use crate::validator;

pub struct ToolDispatcher {
    channel: Arc<dyn ToolChannel>,
    event_bus: Arc<EventBus>,
}

impl ToolDispatcher {
    pub fn new(channel: Arc<dyn ToolChannel>, event_bus: Arc<EventBus>) -> Self {
        Self { channel, event_bus }
    }

    /// Run each request against `registry`, one at a time.
    pub async fn dispatch(
        &self,
        registry: &ToolRegistry,
        requests: &[ToolCallRequest],
    ) -> Vec<ToolCallOutcome> {
        let mut outcomes = Vec::with_capacity(requests.len());
        for request in requests {
            outcomes.push(self.dispatch_one(registry, request).await);
        }
        outcomes
    }

    async fn dispatch_one(
        &self,
        registry: &ToolRegistry,
        request: &ToolCallRequest,
    ) -> ToolCallOutcome {
        let name = request.name.as_str();

        let Some(tool) = registry.get(name) else {
            warn!(tool = %name, "Model requested an unknown tool");
            self.record(name, false, 0);
            return ToolCallOutcome::failure(
                &request.tool_use_id,
                format!("Tool '{name}' is not available."),
            );
        };

        if let Err(e) = validator::validate(&tool.object_schema(), &request.input) {
            warn!(tool = %name, error = %e, "Rejected tool arguments");
            self.record(name, false, 0);
            return ToolCallOutcome::failure(
                &request.tool_use_id,
                format!("Invalid input for tool '{name}': {e}"),
            );
        }

        info!(tool = %name, args = %request.input, "Calling tool");
        let start = Instant::now();
        let result = self.channel.call_tool(name, request.input.clone()).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(fragments) => {
                self.record(name, true, duration_ms);
                ToolCallOutcome::success(&request.tool_use_id, fragments.join(" ").trim())
            }
            Err(e) => {
                warn!(tool = %name, error = %e, "Tool call failed");
                self.record(name, false, duration_ms);
                ToolCallOutcome::failure(
                    &request.tool_use_id,
                    format!("Tool '{name}' failed: {e}"),
                )
            }
        }
    }

    fn record(&self, tool_name: &str, success: bool, duration_ms: u64) {
        self.event_bus.publish(DomainEvent::ToolDispatched {
            tool_name: tool_name.to_string(),
            success,
            duration_ms,
            timestamp: Utc::now(),
        });
    }
}
