use std::sync::Arc;
use std::time::Duration;

use indoc::indoc;
use relay::agent::Agent;
use relay::errors::AgentError;
use relay::invoker::ToolInvoker;
use relay::models::tool::ToolOutput;
use relay::providers::configs::OpenAiProviderConfig;
use relay::providers::openai::OpenAiProvider;
use relay::transport::{connect, Transport};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn tool_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tools"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tools": [{
                "name": "calc",
                "description": "Evaluate an expression",
                "inputSchema": {"type": "object", "properties": {"expr": {"type": "string"}}}
            }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/tools/calc"))
        .and(body_json(json!({"arguments": {"expr": "6*7"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "42"})))
        .expect(1)
        .mount(&server)
        .await;
    server
}

async fn model_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "calc", "arguments": "{\"expr\": \"6*7\"}"}
                    }]
                }
            }],
            "usage": {"prompt_tokens": 40, "completion_tokens": 12, "total_tokens": 52}
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {"role": "assistant", "content": "<think>easy</think>\nThe answer is 42."}
            }]
        })))
        .mount(&server)
        .await;
    server
}

fn provider_for(server: &MockServer) -> OpenAiProvider {
    OpenAiProvider::new(OpenAiProviderConfig {
        host: server.uri(),
        api_key: Some("test-key".to_string()),
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_http_session_answers_query() {
    let tools = tool_server().await;
    let model = model_server().await;

    let transport = connect(&tools.uri(), Duration::from_secs(5)).await.unwrap();
    let invoker = ToolInvoker::new(Arc::from(transport), Duration::from_secs(5));
    let agent = Agent::new(Box::new(provider_for(&model)), invoker);

    let answer = agent.reply("What is 6 times 7?").await.unwrap();
    assert_eq!(answer.text, "{\n \"result\": \"42\"\n}\nThe answer is 42.");
    assert_eq!(answer.tool_calls.len(), 1);
    assert_eq!(
        answer.tool_calls[0].output,
        Ok(ToolOutput::Json(json!({"result": "42"})))
    );

    let requests = model.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let first: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(first["tools"][0]["function"]["name"], "calc");
    assert_eq!(first["tool_choice"], "auto");
    let follow_up: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
    let messages = follow_up["messages"].as_array().unwrap();
    assert_eq!(messages.last().unwrap()["role"], "tool");
    assert_eq!(messages.last().unwrap()["tool_call_id"], "call_1");
}

#[tokio::test]
async fn test_unreachable_model_fails_query() {
    let tools = tool_server().await;
    let transport = connect(&tools.uri(), Duration::from_secs(5)).await.unwrap();
    let invoker = ToolInvoker::new(Arc::from(transport), Duration::from_secs(5));

    let model = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&model)
        .await;
    let agent = Agent::new(Box::new(provider_for(&model)), invoker);

    let err = agent.reply("anything").await.unwrap_err();
    assert!(matches!(err, AgentError::BackendUnavailable(_)));
}

#[tokio::test]
async fn test_stdio_script_session() {
    let script = indoc! {r#"
        read line
        echo '{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":"2024-11-05","capabilities":{},"serverInfo":{"name":"script","version":"0.1"}}}'
        read line
        read line
        echo '{"jsonrpc":"2.0","id":2,"result":{"tools":[{"name":"echo","description":"Echo text"}]}}'
        read line
        echo '{"jsonrpc":"2.0","id":3,"result":{"content":[{"type":"text","text":"hello back"}]}}'
        read line
    "#};
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("server.sh");
    std::fs::write(&path, script).unwrap();

    let transport = connect(path.to_str().unwrap(), Duration::from_secs(5))
        .await
        .unwrap();
    let tools = transport.list_tools().await.unwrap();
    assert_eq!(tools[0].name, "echo");
    assert_eq!(
        transport.call_tool("echo", json!({"text": "hello"})).await,
        Ok(ToolOutput::text("hello back"))
    );
    transport.shutdown().await;
}
