use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::errors::{AgentError, AgentResult};
use crate::models::tool::{Tool, ToolCall, ToolCallResult};
use crate::transport::Transport;

pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Dispatches tool calls over the session's transport, one call at a time
pub struct ToolInvoker {
    transport: Arc<dyn Transport>,
    timeout: Duration,
}

impl ToolInvoker {
    pub fn new(transport: Arc<dyn Transport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub async fn list_tools(&self) -> AgentResult<Vec<Tool>> {
        match tokio::time::timeout(self.timeout, self.transport.list_tools()).await {
            Ok(result) => result,
            Err(_) => Err(AgentError::ToolUnreachable(format!(
                "listing tools on {} timed out",
                self.transport.describe()
            ))),
        }
    }

    /// Invoke one tool. Failures are captured in the result rather than returned,
    /// so one bad call never stops the rest of the round.
    pub async fn invoke(&self, call_id: &str, call: ToolCall) -> ToolCallResult {
        info!("calling tool {} with {}", call.name, call.arguments);

        let output = match tokio::time::timeout(
            self.timeout,
            self.transport.call_tool(&call.name, call.arguments),
        )
        .await
        {
            Ok(output) => output,
            Err(_) => Err(AgentError::ToolUnreachable(format!(
                "tool {} did not answer within {}s",
                call.name,
                self.timeout.as_secs()
            ))),
        };

        if let Err(e) = &output {
            warn!("tool {} failed: {}", call.name, e);
        }
        ToolCallResult::new(call_id, call.name, output)
    }

    pub async fn shutdown(&self) {
        self.transport.shutdown().await;
    }
}
