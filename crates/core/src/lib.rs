//! # Gridline Core
//!
//! Domain types, traits, and error definitions for the Gridline runtime.
//! This crate has no framework dependencies. It defines the conversation
//! model and the two collaborator boundaries every other crate implements
//! against:
//!
//! - [`Provider`]: the model-call boundary (messages + tools in, a
//!   structured completion out)
//! - [`ToolChannel`]: the tool-provider channel (list tools, call a tool)
//!
//! Implementations live in `gridline-providers` and `gridline-mcp`; tests
//! substitute scripted stubs.

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{ConnectionError, Error, ProviderError, Result, ToolError};
pub use event::{DomainEvent, EventBus};
pub use message::{ContentBlock, Conversation, ConversationId, Role, Turn};
pub use provider::{InferenceConfig, ModelRequest, ModelResponse, Provider, StopReason, Usage};
pub use tool::{Tool, ToolCallOutcome, ToolCallRequest, ToolChannel, ToolRegistry};
