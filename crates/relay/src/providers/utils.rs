use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use tracing::warn;

use crate::models::message::{Message, MessageContent};
use crate::models::role::Role;
use crate::models::tool::Tool;

/// One tool as the chat completions API expects it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendToolSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Convert internal Message format to OpenAI's API message specification
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    let mut messages_spec = Vec::new();

    for message in messages {
        let mut converted = json!({
            "role": message.role
        });

        let mut output = Vec::new();

        for content in &message.content {
            match content {
                MessageContent::Text(text) => {
                    if !text.text.is_empty() {
                        converted["content"] = json!(text.text);
                    }
                }
                MessageContent::ToolRequest(request) => {
                    if let Some(object) = converted.as_object_mut() {
                        let tool_calls = object.entry("tool_calls").or_insert(json!([]));
                        if let Some(calls) = tool_calls.as_array_mut() {
                            calls.push(json!({
                                "id": request.id,
                                "type": "function",
                                "function": {
                                    "name": request.name,
                                    "arguments": request.arguments,
                                }
                            }));
                        }
                    }
                }
                MessageContent::ToolResponse(response) => {
                    let content = match &response.tool_result {
                        Ok(result) => result.as_model_text(),
                        // A tool error is shown as output so the model can interpret the error message
                        Err(e) => format!("The tool call returned the following error:\n{}", e),
                    };
                    output.push(json!({
                        "role": "tool",
                        "tool_call_id": response.id,
                        "content": content,
                    }));
                }
            }
        }

        if converted.get("tool_calls").is_some() && converted.get("content").is_none() {
            converted["content"] = Value::Null;
        }
        if converted.get("content").is_some() || converted.get("tool_calls").is_some() {
            output.insert(0, converted);
        }
        messages_spec.extend(output);
    }

    messages_spec
}

/// Convert tool descriptors to OpenAI's API tool specification.
///
/// Tool names must be unique; a repeated name keeps its first descriptor.
pub fn tools_to_openai_spec(tools: &[Tool]) -> Vec<BackendToolSpec> {
    let mut tool_names = HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(tool.name.as_str()) {
            warn!("Skipping duplicate tool name: {}", tool.name);
            continue;
        }

        result.push(BackendToolSpec {
            kind: "function".to_string(),
            function: FunctionSpec {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.input_schema.clone(),
            },
        });
    }

    result
}

/// Convert OpenAI's API response to internal Message format
pub fn openai_response_to_message(response: Value) -> Result<Message> {
    let original = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| anyhow!("No response choices received from the model"))?;

    let mut message = Message::assistant();

    if let Some(text) = original.get("content").and_then(|t| t.as_str()) {
        if !text.is_empty() {
            message = message.with_text(text);
        }
    }

    if let Some(tool_calls) = original.get("tool_calls").and_then(|t| t.as_array()) {
        for tool_call in tool_calls {
            let kind = tool_call.get("type").and_then(|t| t.as_str());
            if kind.is_some_and(|kind| kind != "function") {
                warn!("Ignoring tool call of unsupported type {:?}", kind);
                continue;
            }

            let id = tool_call["id"]
                .as_str()
                .filter(|id| !id.is_empty())
                .map(String::from)
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let name = tool_call["function"]["name"]
                .as_str()
                .unwrap_or_default()
                .to_string();
            // Some compatible backends send the arguments as an object instead of a string
            let arguments = match &tool_call["function"]["arguments"] {
                Value::String(raw) => raw.clone(),
                Value::Null => "{}".to_string(),
                other => other.to_string(),
            };

            message = message.with_tool_request(id, name, arguments);
        }
    }

    Ok(message)
}

#[derive(Debug, thiserror::Error)]
#[error("Context length exceeded. Message: {0}")]
pub struct ContextLengthExceededError(String);

pub fn check_openai_context_length_error(error: &Value) -> Option<ContextLengthExceededError> {
    let code = error.get("code")?.as_str()?;
    if code == "context_length_exceeded" || code == "string_above_max_length" {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        Some(ContextLengthExceededError(message))
    } else {
        None
    }
}
