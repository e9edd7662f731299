//! Stdio-spawned MCP tool server exposed as a [`ToolChannel`].

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use gridline_config::ServerConfig;
use gridline_core::error::{ConnectionError, ToolError};
use gridline_core::tool::{Tool, ToolChannel};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::connection::McpConnection;

const CLIENT_NAME: &str = "gridline";

/// The program and arguments used to launch a tool server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ServerCommand {
    /// Pick the interpreter from the script extension: `.py` runs under
    /// `python`, `.js` under `node`.
    pub fn from_script_path(path: &str) -> Result<Self, ConnectionError> {
        let program = match Path::new(path).extension().and_then(|e| e.to_str()) {
            Some("py") => "python",
            Some("js") => "node",
            _ => return Err(ConnectionError::UnsupportedServer(path.to_string())),
        };
        Ok(Self {
            program: program.to_string(),
            args: vec![path.to_string()],
        })
    }

    /// An explicit `command` wins over `script_path`.
    pub fn from_config(config: &ServerConfig) -> Result<Self, ConnectionError> {
        if let Some(command) = config.command.as_deref().filter(|c| !c.trim().is_empty()) {
            return Ok(Self {
                program: command.to_string(),
                args: config.args.clone(),
            });
        }

        match config.script_path.as_deref().filter(|p| !p.trim().is_empty()) {
            Some(path) => Self::from_script_path(path),
            None => Err(ConnectionError::NotConfigured(
                "set server.script_path, server.command, or MCP_SERVER_PATH".into(),
            )),
        }
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A tool channel backed by an MCP server.
pub struct McpToolChannel {
    name: String,
    connection: McpConnection,
    child: Mutex<Option<Child>>,
}

impl McpToolChannel {
    /// Use an already-established connection. The handshake is the
    /// caller's responsibility.
    pub fn from_connection(name: impl Into<String>, connection: McpConnection) -> Self {
        Self {
            name: name.into(),
            connection,
            child: Mutex::new(None),
        }
    }

    /// Launch the server as a child process, speak MCP over its stdio,
    /// and complete the handshake.
    pub async fn spawn(
        command: &ServerCommand,
        request_timeout: Duration,
    ) -> Result<Self, ConnectionError> {
        let shown = command.command_line();
        info!(command = %shown, "Starting tool server");

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ConnectionError::Spawn {
                command: shown.clone(),
                reason: e.to_string(),
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(ConnectionError::Spawn {
                command: shown,
                reason: "stdio pipes unavailable".into(),
            });
        };

        let connection = McpConnection::new(stdout, stdin, request_timeout);
        let init = match connection
            .initialize(CLIENT_NAME, env!("CARGO_PKG_VERSION"))
            .await
        {
            Ok(init) => init,
            Err(e) => {
                let _ = child.kill().await;
                return Err(ConnectionError::Handshake(e.to_string()));
            }
        };

        let name = init
            .server_info
            .map(|info| info.name)
            .unwrap_or_else(|| shown.clone());
        debug!(server = %name, protocol = %init.protocol_version, "Tool server initialized");

        Ok(Self {
            name,
            connection,
            child: Mutex::new(Some(child)),
        })
    }

    /// Build the command from config and spawn it.
    pub async fn connect(config: &ServerConfig) -> Result<Self, ConnectionError> {
        let command = ServerCommand::from_config(config)?;
        Self::spawn(&command, Duration::from_secs(config.request_timeout_secs)).await
    }
}

#[async_trait]
impl ToolChannel for McpToolChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<Tool>, ConnectionError> {
        self.connection.list_tools().await.map_err(|e| match e {
            ToolError::ChannelClosed => ConnectionError::Closed(self.name.clone()),
            other => ConnectionError::ToolListing(other.to_string()),
        })
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<Vec<String>, ToolError> {
        let result = self.connection.call_tool(name, arguments).await?;
        result.into_fragments(name)
    }

    async fn shutdown(&self) {
        let Some(mut child) = self.child.lock().await.take() else {
            return;
        };
        if let Err(e) = child.kill().await {
            warn!(server = %self.name, error = %e, "Failed to stop tool server");
        } else {
            debug!(server = %self.name, "Tool server stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    #[test]
    fn script_extension_selects_interpreter() {
        let py = ServerCommand::from_script_path("servers/electricity.py").unwrap();
        assert_eq!(py.program, "python");
        assert_eq!(py.args, vec!["servers/electricity.py"]);

        let js = ServerCommand::from_script_path("server.js").unwrap();
        assert_eq!(js.program, "node");
    }

    #[test]
    fn unsupported_extension_rejected() {
        let err = ServerCommand::from_script_path("server.rb").unwrap_err();
        assert!(matches!(err, ConnectionError::UnsupportedServer(p) if p == "server.rb"));
        assert!(ServerCommand::from_script_path("server").is_err());
    }

    #[test]
    fn explicit_command_wins_over_script() {
        let config = ServerConfig {
            script_path: Some("server.py".into()),
            command: Some("uvx".into()),
            args: vec!["electricity-mcp".into()],
            ..ServerConfig::default()
        };
        let command = ServerCommand::from_config(&config).unwrap();
        assert_eq!(command.program, "uvx");
        assert_eq!(command.args, vec!["electricity-mcp"]);
    }

    #[test]
    fn missing_server_is_not_configured() {
        let err = ServerCommand::from_config(&ServerConfig::default()).unwrap_err();
        assert!(matches!(err, ConnectionError::NotConfigured(_)));
    }

    #[test]
    fn command_line_joins_program_and_args() {
        let command = ServerCommand::from_script_path("servers/electricity.py").unwrap();
        assert_eq!(command.command_line(), "python servers/electricity.py");
    }

    #[tokio::test]
    async fn spawn_failure_reports_command() {
        let command = ServerCommand {
            program: "gridline-no-such-binary".into(),
            args: vec![],
        };
        let err = McpToolChannel::spawn(&command, Duration::from_secs(1))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ConnectionError::Spawn { command, .. } if command == "gridline-no-such-binary"));
    }

    /// Answers tools/list and tools/call from an in-memory server.
    fn serve(stream: tokio::io::DuplexStream) {
        tokio::spawn(async move {
            let (read, mut write) = tokio::io::split(stream);
            let mut lines = BufReader::new(read).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let msg: Value = serde_json::from_str(&line).unwrap();
                let result = match msg["method"].as_str() {
                    Some("tools/list") => json!({"tools": [
                        {"name": "check_outage", "description": "Outages",
                         "inputSchema": {"type": "object", "properties": {"area": {"type": "string"}}}}
                    ]}),
                    Some("tools/call") if msg["params"]["name"] == "check_outage" => json!({
                        "content": [{"type": "text", "text": "No outage"}, {"type": "text", "text": "in Sector 18"}]
                    }),
                    Some("tools/call") => json!({
                        "content": [{"type": "text", "text": "area is required"}],
                        "isError": true
                    }),
                    _ => continue,
                };
                let mut out =
                    serde_json::to_string(&json!({"jsonrpc": "2.0", "id": msg["id"], "result": result}))
                        .unwrap();
                out.push('\n');
                write.write_all(out.as_bytes()).await.unwrap();
            }
        });
    }

    fn channel() -> McpToolChannel {
        let (client_side, server_side) = tokio::io::duplex(8192);
        serve(server_side);
        let (read, write) = tokio::io::split(client_side);
        McpToolChannel::from_connection(
            "electricity-info-checker",
            McpConnection::new(read, write, Duration::from_secs(5)),
        )
    }

    #[tokio::test]
    async fn lists_and_calls_tools() {
        let channel = channel();
        let tools = channel.list_tools().await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].description, "Outages");

        let fragments = channel
            .call_tool("check_outage", json!({"area": "Sector 18"}))
            .await
            .unwrap();
        assert_eq!(fragments, vec!["No outage", "in Sector 18"]);
    }

    #[tokio::test]
    async fn error_flag_becomes_execution_failure() {
        let channel = channel();
        let err = channel
            .call_tool("check_billing_status", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { reason, .. } if reason == "area is required"));
    }

    #[tokio::test]
    async fn shutdown_without_child_is_noop() {
        let channel = channel();
        channel.shutdown().await;
        channel.shutdown().await;
    }
}
