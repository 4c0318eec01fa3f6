//! Bindings to the tool server.
//!
//! A session connects once, through either the REST binding or the stdio binding,
//! and keeps that binding for its whole lifetime. Callers only see [`Transport`].
pub mod http;
pub mod stdio;

use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{Tool, ToolOutput};

pub use http::HttpTransport;
pub use stdio::StdioTransport;

/// A connection to a tool server
#[async_trait]
pub trait Transport: Send + Sync {
    /// A short label for logs, such as the base url or the launched command
    fn describe(&self) -> String;

    /// Fetch the tool descriptors the server currently offers
    async fn list_tools(&self) -> AgentResult<Vec<Tool>>;

    /// Run one tool on the server
    async fn call_tool(&self, name: &str, arguments: Value) -> AgentResult<ToolOutput>;

    /// Release the connection; calls made afterwards fail with `ToolUnreachable`
    async fn shutdown(&self) {}
}

/// Open a session for a server location.
///
/// `http://` and `https://` locations use the REST binding. Anything else is a local
/// script launched over stdio: `.py` runs with python, `.js` with node, `.sh` with sh,
/// and any other path is executed directly.
pub async fn connect(location: &str, timeout: Duration) -> AgentResult<Box<dyn Transport>> {
    if location.starts_with("http://") || location.starts_with("https://") {
        let transport = HttpTransport::new(location, timeout)?;
        // Test the connection by listing tools once
        transport.list_tools().await.map_err(|e| {
            AgentError::ToolUnreachable(format!(
                "failed to connect to tool server {}: {}",
                location, e
            ))
        })?;
        info!("connected to tool server at {}", location);
        return Ok(Box::new(transport));
    }

    let (program, args) = launch_command(location);
    let transport = StdioTransport::spawn(&program, &args, timeout).await?;
    info!("connected to tool server {}", transport.describe());
    Ok(Box::new(transport))
}

/// Pick an interpreter for a local server script by its extension
pub fn launch_command(path: &str) -> (String, Vec<String>) {
    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("py") => ("python".to_string(), vec![path.to_string()]),
        Some("js") => ("node".to_string(), vec![path.to_string()]),
        Some("sh") => ("sh".to_string(), vec![path.to_string()]),
        _ => (path.to_string(), Vec::new()),
    }
}
