use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use url::Url;

use super::Transport;
use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{Tool, ToolOutput};

#[derive(Debug, Deserialize)]
struct ToolListing {
    #[serde(default)]
    tools: Vec<Tool>,
}

/// REST binding: `GET {base}/tools` lists, `POST {base}/tools/{name}` calls
pub struct HttpTransport {
    client: Client,
    base_url: String,
    closed: AtomicBool,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> AgentResult<Self> {
        Url::parse(base_url)
            .map_err(|e| AgentError::ToolUnreachable(format!("invalid url {}: {}", base_url, e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_open(&self) -> AgentResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AgentError::ToolUnreachable(format!(
                "session with {} is closed",
                self.base_url
            )));
        }
        Ok(())
    }

    fn tool_url(&self, name: &str) -> String {
        format!("{}/tools/{}", self.base_url, urlencoding::encode(name))
    }
}

fn unreachable(error: reqwest::Error) -> AgentError {
    AgentError::ToolUnreachable(error.to_string())
}

fn http_error(status: StatusCode, body: &str) -> AgentError {
    AgentError::ToolError(format!("HTTP {}: {}", status.as_u16(), body))
}

#[async_trait]
impl Transport for HttpTransport {
    fn describe(&self) -> String {
        self.base_url.clone()
    }

    async fn list_tools(&self) -> AgentResult<Vec<Tool>> {
        self.ensure_open()?;
        let response = self
            .client
            .get(format!("{}/tools", self.base_url))
            .send()
            .await
            .map_err(unreachable)?;

        let status = response.status();
        let body = response.text().await.map_err(unreachable)?;
        if !status.is_success() {
            return Err(http_error(status, &body));
        }

        let listing: ToolListing = serde_json::from_str(&body)
            .map_err(|e| AgentError::MalformedToolResponse(e.to_string()))?;
        Ok(listing.tools)
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> AgentResult<ToolOutput> {
        self.ensure_open()?;
        let response = self
            .client
            .post(self.tool_url(name))
            .json(&json!({ "arguments": arguments }))
            .send()
            .await
            .map_err(unreachable)?;

        let status = response.status();
        let body = response.text().await.map_err(unreachable)?;
        if !status.is_success() {
            return Err(http_error(status, &body));
        }
        Ok(ToolOutput::from_body(&body))
    }

    async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
