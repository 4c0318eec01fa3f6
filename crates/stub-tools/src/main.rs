use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use warp::http::StatusCode;
use warp::Filter;

const PAY_SUMMONS: &str = "To pay your traffic summons, visit https://www.myeg.com.my/services/jpj, \
use the MyEG app, or go to the nearest JPJ office.";
const RENEW_LICENSE: &str = "Visit the nearest JPJ office or use the MyJPJ app to renew your \
driving licence. You can also renew at https://www.myeg.com.my/services/jpj";

#[derive(Serialize)]
struct ToolDescriptor {
    name: &'static str,
    description: &'static str,
    #[serde(rename = "inputSchema")]
    input_schema: Value,
}

#[derive(Deserialize)]
struct CallRequest {
    #[serde(default)]
    arguments: Value,
}

fn catalogue() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: "echo",
            description: "Return the given text unchanged",
            input_schema: json!({
                "type": "object",
                "properties": {"text": {"type": "string"}},
                "required": ["text"]
            }),
        },
        ToolDescriptor {
            name: "pay_summons",
            description: "Get information about how to pay traffic summons online",
            input_schema: json!({"type": "object", "properties": {}}),
        },
        ToolDescriptor {
            name: "renew_license",
            description: "Get information about renewing a Malaysian driving licence",
            input_schema: json!({"type": "object", "properties": {}}),
        },
    ]
}

fn call_tool(name: &str, arguments: &Value) -> Option<Value> {
    match name {
        "echo" => Some(json!(arguments
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default())),
        "pay_summons" => Some(json!(PAY_SUMMONS)),
        "renew_license" => Some(json!(RENEW_LICENSE)),
        _ => None,
    }
}

fn routes() -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let list = warp::path!("tools")
        .and(warp::get())
        .map(|| warp::reply::json(&json!({ "tools": catalogue() })));

    let call = warp::path!("tools" / String)
        .and(warp::post())
        .and(warp::body::json())
        .map(|name: String, request: CallRequest| {
            match call_tool(&name, &request.arguments) {
                Some(result) => warp::reply::with_status(warp::reply::json(&result), StatusCode::OK),
                None => warp::reply::with_status(
                    warp::reply::json(&format!("Unknown tool: {}", name)),
                    StatusCode::NOT_FOUND,
                ),
            }
        });

    list.or(call)
}

#[tokio::main]
async fn main() {
    let port = std::env::var("STUB_TOOLS_PORT")
        .ok()
        .and_then(|port| port.parse().ok())
        .unwrap_or(8000);

    println!("Stub tool server running at http://127.0.0.1:{}", port);
    warp::serve(routes()).run(([127, 0, 0, 1], port)).await;
}
