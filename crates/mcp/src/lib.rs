//! # Gridline MCP
//!
//! Tool-provider channel speaking the Model Context Protocol over a
//! spawned server's stdio.

pub mod channel;
pub mod connection;
pub mod protocol;

pub use channel::{McpToolChannel, ServerCommand};
pub use connection::McpConnection;
