use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AgentResult;

/// A tool that can be used by a model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    /// The name of the tool, unique within one tool server
    pub name: String,
    /// A description of what the tool does
    #[serde(default)]
    pub description: String,
    /// A JSON schema object describing the parameters the tool accepts
    #[serde(default = "empty_schema")]
    pub input_schema: Value,
}

fn empty_schema() -> Value {
    Value::Object(Default::default())
}

impl Tool {
    /// Create a new tool with the given name and description
    pub fn new<N, D>(name: N, description: D, input_schema: Value) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Tool {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// A tool call ready to be dispatched to the tool server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// The name of the tool to execute
    pub name: String,
    /// The arguments for the execution, always a JSON object
    pub arguments: Value,
}

impl ToolCall {
    /// Create a new ToolCall with the given name and arguments
    pub fn new<S: Into<String>>(name: S, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// The payload a tool returned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ToolOutput {
    Text(String),
    Json(Value),
}

impl ToolOutput {
    pub fn text<S: Into<String>>(text: S) -> Self {
        ToolOutput::Text(text.into())
    }

    /// Interpret a raw response body: a JSON string becomes text, any other JSON
    /// stays structured, and a body that is not JSON at all passes through as text
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str::<Value>(body) {
            Ok(Value::String(text)) => ToolOutput::Text(text),
            Ok(value) => ToolOutput::Json(value),
            Err(_) => ToolOutput::Text(body.to_string()),
        }
    }

    /// The raw payload as sent back to the model
    pub fn as_model_text(&self) -> String {
        match self {
            ToolOutput::Text(text) => text.clone(),
            ToolOutput::Json(value) => value.to_string(),
        }
    }

    /// The payload as shown to a person: JSON is pretty printed, anything else is verbatim
    pub fn formatted(&self) -> String {
        match self {
            ToolOutput::Text(text) => match serde_json::from_str::<Value>(text) {
                Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| text.clone()),
                Err(_) => text.clone(),
            },
            ToolOutput::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}

/// The outcome of one dispatched tool call, kept for the length of a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub call_id: String,
    pub tool_name: String,
    pub output: AgentResult<ToolOutput>,
}

impl ToolCallResult {
    pub fn new<I, N>(call_id: I, tool_name: N, output: AgentResult<ToolOutput>) -> Self
    where
        I: Into<String>,
        N: Into<String>,
    {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            output,
        }
    }

    /// The fragment this result contributes to the final answer
    pub fn display_fragment(&self) -> String {
        match &self.output {
            Ok(output) => output.formatted(),
            Err(err) => format!("Error calling tool {}: {}", self.tool_name, err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AgentError;
    use serde_json::json;

    #[test]
    fn test_tool_deserialize_defaults() {
        let tool: Tool = serde_json::from_value(json!({"name": "pay_summons"})).unwrap();
        assert_eq!(tool.description, "");
        assert_eq!(tool.input_schema, json!({}));

        let tool: Tool = serde_json::from_value(json!({
            "name": "echo",
            "description": "Echo it",
            "inputSchema": {"type": "object"}
        }))
        .unwrap();
        assert_eq!(tool.input_schema, json!({"type": "object"}));
    }

    #[test]
    fn test_from_body() {
        assert_eq!(ToolOutput::from_body("\"plain\""), ToolOutput::text("plain"));
        assert_eq!(
            ToolOutput::from_body(r#"{"result": "42"}"#),
            ToolOutput::Json(json!({"result": "42"}))
        );
        assert_eq!(ToolOutput::from_body("not json {"), ToolOutput::text("not json {"));
    }

    #[test]
    fn test_formatted_pretty_prints_json_text() {
        let output = ToolOutput::text(r#"{"result": "42"}"#);
        assert_eq!(output.formatted(), "{\n  \"result\": \"42\"\n}");

        let output = ToolOutput::text("Visit the nearest office.");
        assert_eq!(output.formatted(), "Visit the nearest office.");
    }

    #[test]
    fn test_display_fragment_for_error() {
        let result = ToolCallResult::new(
            "call_1",
            "renew_license",
            Err(AgentError::ToolUnreachable("connection refused".into())),
        );
        assert_eq!(
            result.display_fragment(),
            "Error calling tool renew_license: Tool server unreachable: connection refused"
        );
    }
}
