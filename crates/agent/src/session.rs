//! One interactive session: tool channel, catalog snapshot, conversation.

use std::sync::Arc;

use chrono::Utc;
use gridline_config::{AppConfig, GreetingConfig};
use gridline_core::error::ConnectionError;
use gridline_core::event::{DomainEvent, EventBus};
use gridline_core::message::{Conversation, Role};
use gridline_core::provider::Provider;
use gridline_core::tool::{ToolChannel, ToolRegistry};
use tracing::{info, warn};

use crate::dispatcher::ToolDispatcher;
use crate::loop_runner::AgentLoop;

/// Session state for the lifetime of one conversation.
///
/// Queries take `&mut self`, so one query fully resolves before the next
/// can start.
pub struct Session {
    channel: Arc<dyn ToolChannel>,
    registry: ToolRegistry,
    conversation: Conversation,
    agent: AgentLoop,
    greeting: GreetingConfig,
    event_bus: Arc<EventBus>,
}

impl Session {
    /// Fetch the tool catalog and assemble the session.
    pub async fn connect(
        provider: Arc<dyn Provider>,
        channel: Arc<dyn ToolChannel>,
        config: &AppConfig,
        event_bus: Arc<EventBus>,
    ) -> Result<Self, ConnectionError> {
        let registry = ToolRegistry::refresh(channel.as_ref()).await?;
        info!(server = %channel.name(), tools = ?registry.names(), "Connected to tool server");
        event_bus.publish(DomainEvent::ToolsLoaded {
            count: registry.len(),
            timestamp: Utc::now(),
        });

        let dispatcher = ToolDispatcher::new(channel.clone(), event_bus.clone());
        let agent = AgentLoop::new(provider, &config.model, dispatcher, event_bus.clone())
            .with_system_prompt(&config.system_prompt)
            .with_inference_config(config.inference())
            .with_max_tool_rounds(config.max_tool_rounds);

        Ok(Self {
            channel,
            registry,
            conversation: Conversation::new(),
            agent,
            greeting: config.greeting.clone(),
            event_bus,
        })
    }

    /// Run one query against the current catalog.
    pub async fn ask(&mut self, query: &str) -> Result<String, gridline_core::Error> {
        self.agent
            .process(&mut self.conversation, &self.registry, query)
            .await
    }

    /// Ask the model to open the conversation. Falls back to the static
    /// greeting when disabled, on failure, or when the model itself wrote
    /// no text (tool-outcome fallbacks are not a greeting).
    pub async fn greet(&mut self) -> String {
        if !self.greeting.enabled {
            return self.greeting.fallback.clone();
        }

        let prompt = self.greeting.prompt.clone();
        match self.ask(&prompt).await {
            Ok(text) if self.ends_with_assistant_text() => text,
            Ok(_) => {
                warn!("Model returned no greeting, using fallback");
                self.greeting.fallback.clone()
            }
            Err(e) => {
                warn!(error = %e, "Greeting failed, using fallback");
                self.greeting.fallback.clone()
            }
        }
    }

    fn ends_with_assistant_text(&self) -> bool {
        self.conversation
            .turns()
            .last()
            .is_some_and(|turn| turn.role == Role::Assistant && !turn.text().is_empty())
    }

    /// Start over with an empty conversation.
    pub fn clear(&mut self) {
        let previous = self.conversation.id.to_string();
        self.conversation.clear();
        info!(conversation_id = %previous, "Conversation cleared");
        self.event_bus.publish(DomainEvent::ConversationCleared {
            conversation_id: previous,
            timestamp: Utc::now(),
        });
    }

    /// Replace the catalog snapshot wholesale.
    pub async fn refresh_tools(&mut self) -> Result<(), ConnectionError> {
        self.registry = ToolRegistry::refresh(self.channel.as_ref()).await?;
        self.event_bus.publish(DomainEvent::ToolsLoaded {
            count: self.registry.len(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn server_name(&self) -> &str {
        self.channel.name()
    }

    /// Close the tool channel.
    pub async fn shutdown(self) {
        info!(server = %self.channel.name(), "Shutting down session");
        self.channel.shutdown().await;
    }
}
