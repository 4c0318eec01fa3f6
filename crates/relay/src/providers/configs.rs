use anyhow::{anyhow, Result};
use std::env;
use std::time::Duration;

pub const OPENAI_HOST: &str = "https://api.openai.com";
pub const OPENAI_MODEL: &str = "gpt-4o";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: i32 = 1000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Settings for any OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct OpenAiProviderConfig {
    pub host: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
    pub timeout: Duration,
}

impl Default for OpenAiProviderConfig {
    fn default() -> Self {
        Self {
            host: OPENAI_HOST.to_string(),
            api_key: None,
            model: OPENAI_MODEL.to_string(),
            temperature: Some(DEFAULT_TEMPERATURE),
            max_tokens: Some(DEFAULT_MAX_TOKENS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl OpenAiProviderConfig {
    /// Read OPENAI_HOST, OPENAI_API_KEY, OPENAI_MODEL, OPENAI_TEMPERATURE and
    /// OPENAI_MAX_TOKENS, falling back to defaults for anything unset
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let temperature = match env::var("OPENAI_TEMPERATURE") {
            Ok(raw) => Some(
                raw.parse::<f32>()
                    .map_err(|e| anyhow!("OPENAI_TEMPERATURE is not a number: {}", e))?,
            ),
            Err(_) => defaults.temperature,
        };
        let max_tokens = match env::var("OPENAI_MAX_TOKENS") {
            Ok(raw) => Some(
                raw.parse::<i32>()
                    .map_err(|e| anyhow!("OPENAI_MAX_TOKENS is not an integer: {}", e))?,
            ),
            Err(_) => defaults.max_tokens,
        };

        Ok(Self {
            host: env::var("OPENAI_HOST").unwrap_or(defaults.host),
            api_key: env::var("OPENAI_API_KEY").ok(),
            model: env::var("OPENAI_MODEL").unwrap_or(defaults.model),
            temperature,
            max_tokens,
            timeout: defaults.timeout,
        })
    }
}
