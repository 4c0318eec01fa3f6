mod input;
mod session;

use anyhow::{Context, Result};
use clap::Parser;
use relay::agent::{Agent, AgentConfig};
use relay::invoker::ToolInvoker;
use relay::providers::configs::OpenAiProviderConfig;
use relay::providers::openai::OpenAiProvider;
use relay::transport::{connect, Transport};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Tool server: an http(s) url, or a .py, .js or .sh script to launch
    #[arg(env = "MCP_SERVER_URL")]
    server: String,

    /// Answer a single query and exit instead of starting the chat loop
    #[arg(short, long)]
    query: Option<String>,

    /// Model to use (can also be set via OPENAI_MODEL environment variable)
    #[arg(short, long)]
    model: Option<String>,

    /// Chat completions host (can also be set via OPENAI_HOST environment variable)
    #[arg(long)]
    host: Option<String>,

    /// API key (can also be set via OPENAI_API_KEY environment variable)
    #[arg(long)]
    api_key: Option<String>,

    /// Rounds of tool calls allowed per query
    #[arg(long, default_value_t = 1)]
    max_tool_rounds: usize,

    /// Seconds to wait for a single tool call
    #[arg(long, default_value_t = 30)]
    tool_timeout: u64,

    /// Tera template replacing the built-in system prompt
    #[arg(long)]
    system_prompt: Option<PathBuf>,
}

impl Cli {
    fn provider_config(&self) -> Result<OpenAiProviderConfig> {
        let mut config = OpenAiProviderConfig::from_env()?;
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(api_key) = &self.api_key {
            config.api_key = Some(api_key.clone());
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let provider_config = cli.provider_config()?;
    let backend_timeout = provider_config.timeout;
    let provider = OpenAiProvider::new(provider_config)?;

    let tool_timeout = Duration::from_secs(cli.tool_timeout);
    let transport = connect(&cli.server, tool_timeout)
        .await
        .with_context(|| format!("could not connect to tool server {}", cli.server))?;
    let tools = transport.list_tools().await?;
    println!(
        "Connected to server with tools: {}",
        tools
            .iter()
            .map(|tool| tool.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let agent = Agent::with_config(
        Box::new(provider),
        ToolInvoker::new(Arc::from(transport), tool_timeout),
        AgentConfig {
            max_tool_rounds: cli.max_tool_rounds,
            backend_timeout,
            system_prompt: cli.system_prompt.clone(),
        },
    );

    let result = match &cli.query {
        Some(query) => {
            session::ask(&agent, query).await;
            Ok(())
        }
        None => session::chat_loop(&agent).await,
    };

    agent.shutdown().await;
    result
}
