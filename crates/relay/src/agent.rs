use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::errors::{AgentError, AgentResult};
use crate::invoker::ToolInvoker;
use crate::models::conversation::Conversation;
use crate::models::message::{Message, ToolRequest};
use crate::models::tool::{Tool, ToolCall, ToolCallResult};
use crate::prompt_template::system_prompt;
use crate::providers::base::Provider;
use crate::sanitize::{clean_formatting, strip_reasoning};

/// Shown when a query produced nothing to say
pub const EMPTY_ANSWER: &str = "No response received from the model";

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// How many batches of tool calls one query may dispatch before the model must answer
    pub max_tool_rounds: usize,
    /// Upper bound on each model backend call
    pub backend_timeout: Duration,
    /// A Tera template replacing the bundled persona
    pub system_prompt: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: 1,
            backend_timeout: Duration::from_secs(600),
            system_prompt: None,
        }
    }
}

/// Lets a caller stop a running query between steps
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> AgentResult<()> {
        if self.is_cancelled() {
            Err(AgentError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// The answer to one query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalAnswer {
    /// The cleaned text shown to the user
    pub text: String,
    /// Model text and formatted tool output, in the order they were produced
    pub fragments: Vec<String>,
    pub tool_calls: Vec<ToolCallResult>,
}

impl FinalAnswer {
    fn from_fragments(fragments: Vec<String>, tool_calls: Vec<ToolCallResult>) -> Self {
        let joined = if fragments.is_empty() {
            EMPTY_ANSWER.to_string()
        } else {
            fragments.join("\n")
        };
        Self {
            text: clean_formatting(&joined),
            fragments,
            tool_calls,
        }
    }
}

/// Agent answers queries with a model that can call the tools of one tool server
pub struct Agent {
    provider: Box<dyn Provider>,
    invoker: ToolInvoker,
    config: AgentConfig,
}

impl Agent {
    pub fn new(provider: Box<dyn Provider>, invoker: ToolInvoker) -> Self {
        Self::with_config(provider, invoker, AgentConfig::default())
    }

    pub fn with_config(provider: Box<dyn Provider>, invoker: ToolInvoker, config: AgentConfig) -> Self {
        Self {
            provider,
            invoker,
            config,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// The tools the connected server currently offers
    pub async fn tools(&self) -> AgentResult<Vec<Tool>> {
        self.invoker.list_tools().await
    }

    /// Answer a query with the server's current tools and the configured persona
    pub async fn reply(&self, query: &str) -> AgentResult<FinalAnswer> {
        self.reply_with_cancel(query, &CancelToken::default()).await
    }

    pub async fn reply_with_cancel(
        &self,
        query: &str,
        cancel: &CancelToken,
    ) -> AgentResult<FinalAnswer> {
        let tools = self.tools().await?;
        let prompt = system_prompt(self.config.system_prompt.as_ref(), &tools)
            .map_err(|e| AgentError::Internal(format!("failed to render system prompt: {}", e)))?;
        self.run_with_cancel(query, &prompt, &tools, cancel).await
    }

    pub async fn run(
        &self,
        query: &str,
        system_prompt: &str,
        tools: &[Tool],
    ) -> AgentResult<FinalAnswer> {
        self.run_with_cancel(query, system_prompt, tools, &CancelToken::default())
            .await
    }

    /// Drive one query to its final answer.
    ///
    /// Only a failure of the first model call is returned as an error. Tool failures and
    /// a failed follow-up call become visible fragments of the answer instead.
    pub async fn run_with_cancel(
        &self,
        query: &str,
        system_prompt: &str,
        tools: &[Tool],
        cancel: &CancelToken,
    ) -> AgentResult<FinalAnswer> {
        let mut conversation = Conversation::new(system_prompt, query);
        let mut fragments = Vec::new();
        let mut tool_calls = Vec::new();
        let mut rounds = 0;

        cancel.check()?;
        let mut response = self.complete(&conversation, tools).await?;

        loop {
            let requests: Vec<ToolRequest> =
                response.tool_requests().into_iter().cloned().collect();
            if requests.is_empty() {
                push_model_text(&mut fragments, &response);
                break;
            }

            if rounds >= self.config.max_tool_rounds {
                warn!(
                    "ignoring {} tool call(s) requested after {} round(s)",
                    requests.len(),
                    rounds
                );
                push_model_text(&mut fragments, &response);
                break;
            }
            rounds += 1;

            // Text that accompanies tool calls is a preamble and stays out of the answer
            conversation.push(response)?;
            for request in &requests {
                cancel.check()?;
                let result = self.dispatch(request).await;
                conversation
                    .push(Message::user().with_tool_response(&request.id, result.output.clone()))?;
                fragments.push(result.display_fragment());
                tool_calls.push(result);
            }

            cancel.check()?;
            response = match self.complete(&conversation, tools).await {
                Ok(response) => response,
                Err(e) => {
                    warn!("follow-up completion failed: {}", e);
                    fragments.push(format!("Error in follow-up response: {}", e));
                    break;
                }
            };
        }

        info!(
            "answered query with {} tool call(s) over {} round(s)",
            tool_calls.len(),
            rounds
        );
        Ok(FinalAnswer::from_fragments(fragments, tool_calls))
    }

    async fn dispatch(&self, request: &ToolRequest) -> ToolCallResult {
        let arguments = request.parse_arguments().unwrap_or_else(|e| {
            warn!("{}; calling {} with empty arguments", e, request.name);
            json!({})
        });
        self.invoker
            .invoke(&request.id, ToolCall::new(&request.name, arguments))
            .await
    }

    async fn complete(&self, conversation: &Conversation, tools: &[Tool]) -> AgentResult<Message> {
        let completion = self.provider.complete(conversation.messages(), tools);
        match tokio::time::timeout(self.config.backend_timeout, completion).await {
            Ok(Ok((message, usage))) => {
                debug!("model usage: {:?}", usage);
                Ok(message)
            }
            Ok(Err(e)) => Err(AgentError::BackendUnavailable(e.to_string())),
            Err(_) => Err(AgentError::BackendUnavailable(format!(
                "no response within {}s",
                self.config.backend_timeout.as_secs()
            ))),
        }
    }

    /// Close the tool server session
    pub async fn shutdown(&self) {
        self.invoker.shutdown().await;
    }
}

fn push_model_text(fragments: &mut Vec<String>, message: &Message) {
    let text = strip_reasoning(&message.text());
    if !text.trim().is_empty() {
        fragments.push(text);
    }
}
