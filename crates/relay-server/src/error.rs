use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {env_var}")]
    MissingEnvVar { env_var: String },
    #[error("Invalid listen address {0}")]
    InvalidAddress(String),
    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Map a settings key such as `provider.api_key` to the variable that sets it
pub fn to_env_var(field_path: &str) -> String {
    format!("RELAY_{}", field_path.replace('.', "__").to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_env_var() {
        assert_eq!(to_env_var("provider.api_key"), "RELAY_PROVIDER__API_KEY");
        assert_eq!(to_env_var("port"), "RELAY_PORT");
    }

    #[test]
    fn test_missing_env_var_message() {
        let err = ConfigError::MissingEnvVar {
            env_var: to_env_var("tools.server"),
        };
        assert_eq!(
            err.to_string(),
            "Missing required environment variable: RELAY_TOOLS__SERVER"
        );
    }
}
