use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::Transport;
use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{Tool, ToolOutput};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcMessage {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListToolsResult {
    #[serde(default)]
    tools: Vec<Tool>,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallToolResult {
    #[serde(default)]
    content: Vec<Value>,
    #[serde(default)]
    is_error: bool,
    #[serde(default)]
    structured_content: Option<Value>,
}

impl CallToolResult {
    fn has_text(&self) -> bool {
        self.content
            .iter()
            .any(|item| item.get("type").and_then(Value::as_str) == Some("text"))
    }

    fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(|item| match item.get("text").and_then(Value::as_str) {
                Some(text) if item.get("type").and_then(Value::as_str) == Some("text") => {
                    text.to_string()
                }
                _ => item.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn io_unreachable(error: std::io::Error) -> AgentError {
    AgentError::ToolUnreachable(error.to_string())
}

struct Session {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl Session {
    async fn send(&mut self, message: &JsonRpcRequest<'_>) -> AgentResult<()> {
        let mut line =
            serde_json::to_string(message).map_err(|e| AgentError::Internal(e.to_string()))?;
        line.push('\n');
        self.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(io_unreachable)?;
        self.stdin.flush().await.map_err(io_unreachable)
    }

    /// Read until the response for `id` arrives, skipping notifications and stray output
    async fn receive(&mut self, id: u64) -> AgentResult<Value> {
        loop {
            let line = self
                .stdout
                .next_line()
                .await
                .map_err(io_unreachable)?
                .ok_or_else(|| {
                    AgentError::ToolUnreachable("tool server closed its output".to_string())
                })?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let message: JsonRpcMessage = match serde_json::from_str(line) {
                Ok(message) => message,
                Err(_) => {
                    debug!("ignoring non JSON-RPC output from tool server: {}", line);
                    continue;
                }
            };
            if message.id.as_ref().and_then(Value::as_u64) != Some(id) {
                debug!("skipping tool server message: {}", line);
                continue;
            }

            if let Some(error) = message.error {
                return Err(AgentError::ToolError(format!(
                    "{} (code {})",
                    error.message, error.code
                )));
            }
            return message.result.ok_or_else(|| {
                AgentError::MalformedToolResponse(
                    "response carries neither result nor error".to_string(),
                )
            });
        }
    }
}

/// Stdio binding: newline-delimited JSON-RPC 2.0 with a child process.
///
/// Requests are serialised through one lock, so each exchange sees only its own
/// response. The child is killed when the transport is shut down or dropped.
pub struct StdioTransport {
    session: Mutex<Option<Session>>,
    next_id: AtomicU64,
    timeout: Duration,
    label: String,
}

impl StdioTransport {
    /// Launch `program` and complete the initialize handshake
    pub async fn spawn(program: &str, args: &[String], timeout: Duration) -> AgentResult<Self> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                AgentError::ToolUnreachable(format!("failed to launch {}: {}", program, e))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AgentError::Internal("child stdin was not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AgentError::Internal("child stdout was not captured".to_string()))?;

        let label = std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");

        let transport = Self {
            session: Mutex::new(Some(Session {
                child,
                stdin,
                stdout: BufReader::new(stdout).lines(),
            })),
            next_id: AtomicU64::new(1),
            timeout,
            label,
        };
        transport.initialize().await?;
        Ok(transport)
    }

    async fn initialize(&self) -> AgentResult<()> {
        let handshake = async {
            let result = self
                .request(
                    "initialize",
                    json!({
                        "protocolVersion": PROTOCOL_VERSION,
                        "capabilities": {},
                        "clientInfo": {
                            "name": "relay",
                            "version": env!("CARGO_PKG_VERSION"),
                        }
                    }),
                )
                .await?;
            debug!("tool server info: {}", result["serverInfo"]);
            self.notify("notifications/initialized").await
        };

        handshake.await.map_err(|e| {
            AgentError::ToolUnreachable(format!("handshake with {} failed: {}", self.label, e))
        })
    }

    fn closed(&self) -> AgentError {
        AgentError::ToolUnreachable(format!("session with {} is closed", self.label))
    }

    async fn request(&self, method: &str, params: Value) -> AgentResult<Value> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or_else(|| self.closed())?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: Some(id),
            method,
            params: Some(params),
        };

        let exchange = async {
            session.send(&request).await?;
            session.receive(id).await
        };
        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(AgentError::ToolUnreachable(format!(
                "{} did not answer {} within {}s",
                self.label,
                method,
                self.timeout.as_secs()
            ))),
        }
    }

    async fn notify(&self, method: &str) -> AgentResult<()> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or_else(|| self.closed())?;
        session
            .send(&JsonRpcRequest {
                jsonrpc: "2.0",
                id: None,
                method,
                params: None,
            })
            .await
    }
}

#[async_trait]
impl Transport for StdioTransport {
    fn describe(&self) -> String {
        self.label.clone()
    }

    async fn list_tools(&self) -> AgentResult<Vec<Tool>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = match &cursor {
                Some(cursor) => json!({ "cursor": cursor }),
                None => json!({}),
            };
            let result = self.request("tools/list", params).await?;
            let page: ListToolsResult = serde_json::from_value(result)
                .map_err(|e| AgentError::MalformedToolResponse(e.to_string()))?;
            tools.extend(page.tools);

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(tools),
            }
        }
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> AgentResult<ToolOutput> {
        let result = self
            .request(
                "tools/call",
                json!({ "name": name, "arguments": arguments }),
            )
            .await?;
        let result: CallToolResult = serde_json::from_value(result)
            .map_err(|e| AgentError::MalformedToolResponse(e.to_string()))?;

        if result.is_error {
            return Err(AgentError::ToolError(result.joined_text()));
        }
        match result.structured_content {
            Some(structured) if !result.has_text() => Ok(ToolOutput::Json(structured)),
            _ => Ok(ToolOutput::Text(result.joined_text())),
        }
    }

    async fn shutdown(&self) {
        let mut guard = self.session.lock().await;
        if let Some(mut session) = guard.take() {
            if let Err(e) = session.child.kill().await {
                warn!("failed to stop tool server {}: {}", self.label, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    const INIT_REPLY: &str = r#"{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":"2024-11-05","capabilities":{},"serverInfo":{"name":"scripted","version":"0.1"}}}"#;

    /// Start a shell script that answers each request line with the next canned reply.
    /// A reply holding several lines is written out in full before the next read.
    async fn scripted(replies: &[&str]) -> AgentResult<StdioTransport> {
        let mut script = String::from("read line\n");
        script.push_str(&format!("echo '{}'\n", INIT_REPLY));
        // the initialized notification
        script.push_str("read line\n");
        for reply in replies {
            script.push_str("read line\n");
            for output in reply.lines() {
                script.push_str(&format!("echo '{}'\n", output));
            }
        }
        script.push_str("read line\n");

        StdioTransport::spawn(
            "sh",
            &["-c".to_string(), script],
            Duration::from_secs(5),
        )
        .await
    }

    #[tokio::test]
    async fn test_list_tools_follows_cursor() {
        let transport = scripted(&[
            r#"{"jsonrpc":"2.0","id":2,"result":{"tools":[{"name":"echo"}],"nextCursor":"page-2"}}"#,
            r#"{"jsonrpc":"2.0","id":3,"result":{"tools":[{"name":"add","description":"Add two numbers","inputSchema":{"type":"object"}}]}}"#,
        ])
        .await
        .unwrap();

        let tools = transport.list_tools().await.unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].name, "echo");
        assert_eq!(tools[0].input_schema, json!({}));
        assert_eq!(tools[1].description, "Add two numbers");
        transport.shutdown().await;
    }

    #[tokio::test]
    async fn test_call_tool_skips_unrelated_output() {
        let reply = [
            r#"{"jsonrpc":"2.0","method":"notifications/message","params":{"level":"info"}}"#,
            "not json at all",
            r#"{"jsonrpc":"2.0","id":2,"result":{"content":[{"type":"text","text":"hello"},{"type":"text","text":"world"}]}}"#,
        ]
        .join("\n");
        let transport = scripted(&[&reply]).await.unwrap();

        // The notification and the stray line arrive first and are skipped
        let output = transport.call_tool("echo", json!({"msg": "hi"})).await;
        assert_eq!(output, Ok(ToolOutput::text("hello\nworld")));
        transport.shutdown().await;
    }

    #[tokio::test]
    async fn test_call_tool_structured_and_is_error() {
        let transport = scripted(&[
            r#"{"jsonrpc":"2.0","id":2,"result":{"content":[],"structuredContent":{"result":"42"}}}"#,
            r#"{"jsonrpc":"2.0","id":3,"result":{"content":[{"type":"text","text":"licence not found"}],"isError":true}}"#,
            r#"{"jsonrpc":"2.0","id":4,"error":{"code":-32602,"message":"Unknown tool"}}"#,
        ])
        .await
        .unwrap();

        assert_eq!(
            transport.call_tool("calc", json!({})).await,
            Ok(ToolOutput::Json(json!({"result": "42"})))
        );
        assert_eq!(
            transport.call_tool("renew_license", json!({})).await,
            Err(AgentError::ToolError("licence not found".to_string()))
        );
        assert_eq!(
            transport.call_tool("nope", json!({})).await,
            Err(AgentError::ToolError("Unknown tool (code -32602)".to_string()))
        );
        transport.shutdown().await;
    }

    #[tokio::test]
    async fn test_calls_fail_after_shutdown() {
        let transport = scripted(&[]).await.unwrap();
        transport.shutdown().await;
        let err = transport.call_tool("echo", json!({})).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolUnreachable(_)));
    }

    #[tokio::test]
    async fn test_server_exiting_during_handshake() {
        let script = indoc! {"
            read line
            exit 0
        "};
        let result =
            StdioTransport::spawn("sh", &["-c".to_string(), script.to_string()], Duration::from_secs(5))
                .await;
        assert!(matches!(result, Err(AgentError::ToolUnreachable(_))));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let result = StdioTransport::spawn(
            "/nonexistent/relay-tool-server",
            &[],
            Duration::from_secs(1),
        )
        .await;
        assert!(matches!(result, Err(AgentError::ToolUnreachable(_))));
    }
}
