//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development. Vendor secrets are optional here: a
//! missing key is reported per request by the proxy, not at startup.

use std::net::SocketAddr;
use std::str::FromStr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which upstream LLM provider the proxy forwards to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Vendor {
    Bedrock,
    WorkersAi,
    Anthropic,
    OpenAi,
}

impl FromStr for Vendor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bedrock" | "aws-bedrock" => Ok(Vendor::Bedrock),
            "workers-ai" | "workers_ai" | "cloudflare" => Ok(Vendor::WorkersAi),
            "anthropic" => Ok(Vendor::Anthropic),
            "openai" => Ok(Vendor::OpenAi),
            other => Err(format!(
                "'{}' is not one of bedrock, workers-ai, anthropic, openai",
                other
            )),
        }
    }
}

#[derive(Clone, Debug)]
pub struct BedrockSettings {
    pub api_key: Option<String>,
    pub region: String,
    pub model_id: String,
}

#[derive(Clone, Debug)]
pub struct WorkersAiSettings {
    pub account_id: Option<String>,
    pub api_token: Option<String>,
    pub model: String,
}

#[derive(Clone, Debug)]
pub struct AnthropicSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Clone, Debug)]
pub struct OpenAiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub max_upload_bytes: usize,
    pub vendor: Vendor,
    pub bedrock: BedrockSettings,
    pub workers_ai: WorkersAiSettings,
    pub anthropic: AnthropicSettings,
    pub openai: OpenAiSettings,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let secret = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // --- Load Server and Database Settings ---
        let bind_address_str = var_or("BIND_ADDRESS", "0.0.0.0:8787");
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = var_or("DATABASE_URL", "sqlite://legal_analyzer.db?mode=rwc");

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let max_upload_str = var_or("MAX_UPLOAD_BYTES", "10485760");
        let max_upload_bytes = max_upload_str.parse::<usize>().map_err(|e| {
            ConfigError::InvalidValue("MAX_UPLOAD_BYTES".to_string(), e.to_string())
        })?;

        // --- Load Vendor Settings ---
        let vendor = var_or("LLM_VENDOR", "bedrock")
            .parse::<Vendor>()
            .map_err(|e| ConfigError::InvalidValue("LLM_VENDOR".to_string(), e))?;

        let bedrock = BedrockSettings {
            api_key: secret("AWS_BEDROCK_API_KEY"),
            region: var_or("AWS_REGION", "us-east-1"),
            model_id: var_or("BEDROCK_MODEL_ID", "amazon.nova-lite-v1:0"),
        };
        let workers_ai = WorkersAiSettings {
            account_id: secret("CLOUDFLARE_ACCOUNT_ID"),
            api_token: secret("CLOUDFLARE_API_TOKEN"),
            model: var_or("WORKERS_AI_MODEL", "@cf/meta/llama-3.1-8b-instruct"),
        };
        let anthropic = AnthropicSettings {
            api_key: secret("ANTHROPIC_API_KEY"),
            model: var_or("ANTHROPIC_MODEL", "claude-3-5-haiku-latest"),
            base_url: var_or("ANTHROPIC_BASE_URL", "https://api.anthropic.com"),
        };
        let openai = OpenAiSettings {
            api_key: secret("OPENAI_API_KEY"),
            model: var_or("OPENAI_MODEL", "gpt-4o-mini"),
            base_url: var_or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
        };

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            max_upload_bytes,
            vendor,
            bedrock,
            workers_ai,
            anthropic,
            openai,
        })
    }
}
