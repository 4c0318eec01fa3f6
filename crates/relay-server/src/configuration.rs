use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment};
use relay::agent::AgentConfig;
use relay::providers::configs::{
    OpenAiProviderConfig, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECS,
    OPENAI_HOST, OPENAI_MODEL,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Older deployments point at the tool server with this variable
pub const TOOL_SERVER_OVERRIDE: &str = "MCP_SERVER_URL";

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::InvalidAddress(addr))
    }
}

#[derive(Debug, Deserialize)]
pub struct ProviderSettings {
    pub host: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: i32,
    pub timeout_secs: u64,
}

impl ProviderSettings {
    pub fn to_config(&self) -> OpenAiProviderConfig {
        OpenAiProviderConfig {
            host: self.host.clone(),
            api_key: self.api_key.clone().filter(|key| !key.is_empty()),
            model: self.model.clone(),
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ToolSettings {
    /// An http(s) url, or the path of a local server script
    pub server: String,
    pub timeout_secs: u64,
}

impl ToolSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize)]
pub struct AgentSettings {
    pub max_tool_rounds: usize,
    #[serde(default)]
    pub system_prompt: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub provider: ProviderSettings,
    pub tools: ToolSettings,
    pub agent: AgentSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    /// The agent settings combined with the provider's timeout
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            max_tool_rounds: self.agent.max_tool_rounds,
            backend_timeout: Duration::from_secs(self.provider.timeout_secs),
            system_prompt: self.agent.system_prompt.clone(),
        }
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Server defaults
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            // Provider defaults
            .set_default("provider.host", OPENAI_HOST)?
            .set_default("provider.model", OPENAI_MODEL)?
            .set_default("provider.temperature", DEFAULT_TEMPERATURE as f64)?
            .set_default("provider.max_tokens", DEFAULT_MAX_TOKENS as i64)?
            .set_default("provider.timeout_secs", DEFAULT_TIMEOUT_SECS)?
            // Tool server defaults
            .set_default("tools.server", "http://localhost:8000")?
            .set_default("tools.timeout_secs", 30)?
            .set_default("agent.max_tool_rounds", 1)?
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix("RELAY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("tools.server", std::env::var(TOOL_SERVER_OVERRIDE).ok())?
            .build()?;

        match config.try_deserialize::<Self>() {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                let error_str = err.to_string();
                if error_str.starts_with("missing field") {
                    // "missing field `port`"
                    let field = error_str
                        .trim_start_matches("missing field `")
                        .trim_end_matches('`');
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else if let config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}
