//! MCP connection over any byte stream pair.
//!
//! Messages are newline-delimited JSON-RPC. A background task reads the
//! server's output and routes each response to the caller waiting on its
//! id; callers time out independently.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use gridline_core::error::ToolError;
use gridline_core::tool::Tool;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::protocol::{
    CallToolResult, IncomingMessage, InitializeResult, ListToolsResult, PROTOCOL_VERSION,
    RpcOutcome, RpcRequest,
};

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<RpcOutcome>>>>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// A JSON-RPC session with one MCP server.
pub struct McpConnection {
    writer: Mutex<Writer>,
    pending: Pending,
    next_id: AtomicU64,
    closed: Arc<AtomicBool>,
    request_timeout: Duration,
    reader_task: JoinHandle<()>,
}

impl McpConnection {
    /// Wrap a server's output (`reader`) and input (`writer`).
    pub fn new<R, W>(reader: R, writer: W, request_timeout: Duration) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));

        let reader_task = tokio::spawn(Self::handle_messages(
            reader,
            pending.clone(),
            closed.clone(),
        ));

        Self {
            writer: Mutex::new(Box::new(writer)),
            pending,
            next_id: AtomicU64::new(1),
            closed,
            request_timeout,
            reader_task,
        }
    }

    async fn handle_messages<R>(reader: R, pending: Pending, closed: Arc<AtomicBool>)
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let mut lines = BufReader::new(reader).lines();

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "MCP server stream read failed");
                    break;
                }
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let message: IncomingMessage = match serde_json::from_str(line) {
                Ok(message) => message,
                Err(e) => {
                    trace!(error = %e, line, "Ignoring non-JSON-RPC output from MCP server");
                    continue;
                }
            };

            if let Some(id) = message.response_id() {
                match pending.lock().await.remove(&id) {
                    Some(waiter) => {
                        let _ = waiter.send(message.into_outcome());
                    }
                    None => warn!(id, "Received response for unknown request ID"),
                }
                continue;
            }

            match (&message.method, &message.id) {
                (Some(method), None) => debug!(method = %method, "Received MCP notification"),
                (Some(method), Some(_)) => {
                    warn!(method = %method, "Ignoring request from MCP server")
                }
                _ => trace!("Ignoring MCP message without id or method"),
            }
        }

        closed.store(true, Ordering::SeqCst);
        // Dropping the senders wakes every waiter with a closed-channel error.
        pending.lock().await.clear();
        debug!("MCP server stream ended");
    }

    async fn write_message(&self, request: &RpcRequest<'_>) -> Result<(), ToolError> {
        let mut line = serde_json::to_string(request)
            .map_err(|e| ToolError::Protocol(format!("failed to serialize request: {e}")))?;
        line.push('\n');

        let mut writer = self.writer.lock().await;
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|_| ToolError::ChannelClosed)?;
        writer.flush().await.map_err(|_| ToolError::ChannelClosed)
    }

    /// Send a request and wait for its result.
    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, ToolError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ToolError::ChannelClosed);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        // The reader may have drained `pending` between the check above and the insert.
        if self.closed.load(Ordering::SeqCst) {
            self.pending.lock().await.remove(&id);
            return Err(ToolError::ChannelClosed);
        }

        if let Err(e) = self.write_message(&RpcRequest::request(id, method, params)).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(Ok(result))) => Ok(result),
            Ok(Ok(Err(rpc_error))) => Err(ToolError::Protocol(format!(
                "{method}: {} (code {})",
                rpc_error.message, rpc_error.code
            ))),
            Ok(Err(_)) => Err(ToolError::ChannelClosed),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(ToolError::Timeout {
                    tool_name: method.to_string(),
                    timeout_secs: self.request_timeout.as_secs(),
                })
            }
        }
    }

    async fn request_as<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<T, ToolError> {
        let value = self.request(method, params).await?;
        serde_json::from_value(value)
            .map_err(|e| ToolError::Protocol(format!("{method}: unexpected result shape: {e}")))
    }

    /// Send a notification (no response expected).
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), ToolError> {
        self.write_message(&RpcRequest::notification(method, params)).await
    }

    /// Perform the `initialize` handshake and confirm with
    /// `notifications/initialized`.
    pub async fn initialize(
        &self,
        client_name: &str,
        client_version: &str,
    ) -> Result<InitializeResult, ToolError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": { "name": client_name, "version": client_version },
        });
        let result: InitializeResult = self.request_as("initialize", Some(params)).await?;
        self.notify("notifications/initialized", None).await?;
        Ok(result)
    }

    /// List every tool, following pagination cursors.
    pub async fn list_tools(&self) -> Result<Vec<Tool>, ToolError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = cursor.as_ref().map(|c| json!({ "cursor": c }));
            let page: ListToolsResult = self.request_as("tools/list", params).await?;
            tools.extend(page.tools.into_iter().map(Tool::from));

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        Ok(tools)
    }

    /// Invoke a tool by name.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, ToolError> {
        let params = json!({ "name": name, "arguments": arguments });
        self.request_as("tools/call", Some(params))
            .await
            .map_err(|e| match e {
                ToolError::Timeout { timeout_secs, .. } => ToolError::Timeout {
                    tool_name: name.to_string(),
                    timeout_secs,
                },
                other => other,
            })
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for McpConnection {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}
