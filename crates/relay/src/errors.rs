use serde::{Deserialize, Serialize};
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AgentError {
    #[error("Model backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Tool server unreachable: {0}")]
    ToolUnreachable(String),

    #[error("Tool reported an error: {0}")]
    ToolError(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Malformed tool arguments: {0}")]
    MalformedToolArguments(String),

    #[error("Malformed tool response: {0}")]
    MalformedToolResponse(String),

    #[error("Conversation order violated: {0}")]
    ConversationOrder(String),

    #[error("Query cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgentResult<T> = Result<T, AgentError>;
