use std::path::PathBuf;

use anyhow::{Context, Result};

/// Server configuration loaded from environment variables at startup.
/// Fails fast if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of the knowledge-base directory tree notes are written into.
    pub vault_root: PathBuf,
    /// Bearer token the capture surface must present on every submission.
    pub api_token: String,
    pub anthropic_api_key: String,
    /// Known folder paths offered to the classifier for folder placement.
    /// Comma-separated in `VAULT_FOLDERS`; may be empty.
    pub folders: Vec<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            vault_root: PathBuf::from(require_env("VAULT_ROOT")?),
            api_token: require_env("SHELFMARK_API_TOKEN")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            folders: std::env::var("VAULT_FOLDERS")
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "5001".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// Client-side configuration for submitting captures to the gateway.
///
/// Read from the environment on every submission, not cached, so a token or
/// gateway change takes effect on the next capture without a restart.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub gateway_url: String,
    pub token: String,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(ClientConfig {
            gateway_url: std::env::var("SHELFMARK_GATEWAY_URL")
                .unwrap_or_else(|_| "http://localhost:5001".to_string()),
            token: require_env("SHELFMARK_API_TOKEN")?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
