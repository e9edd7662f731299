//! Error types for the Gridline domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator boundary has its own error enum; only `ProviderError`
//! and `ConnectionError` ever escape a query; `ToolError` is always folded
//! back into the conversation by the dispatcher.

use thiserror::Error;

/// The top-level error type for all Gridline operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Model-call boundary ---
    #[error("Model invocation failed: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool-provider channel setup ---
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Boundary errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum ConnectionError {
    #[error("Failed to start tool server `{command}`: {reason}")]
    Spawn { command: String, reason: String },

    #[error("Tool server handshake failed: {0}")]
    Handshake(String),

    #[error("Server script must be a .py or .js file: {0}")]
    UnsupportedServer(String),

    #[error("No tool server configured: {0}")]
    NotConfigured(String),

    #[error("Failed to list tools: {0}")]
    ToolListing(String),

    #[error("Tool channel closed: {0}")]
    Closed(String),
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("Tool channel closed")]
    ChannelClosed,

    #[error("Protocol error: {0}")]
    Protocol(String),
}
