use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // LINE channel
    pub channel_secret: String,
    pub channel_access_token: String,
    pub line_api_base: String,

    // Storage. `None` runs against the in-memory document store.
    pub database_url: Option<String>,

    // Web server
    pub web_host: String,
    pub web_port: u16,

    // Dispatch
    pub handler_timeout: Duration,
    pub drain_timeout: Duration,

    pub profile_cache_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            channel_secret: required_env("LINE_CHANNEL_SECRET")?,
            channel_access_token: required_env("LINE_CHANNEL_ACCESS_TOKEN")?,
            line_api_base: env::var("LINE_API_BASE")
                .unwrap_or_else(|_| "https://api.line.me".to_string()),
            database_url: env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: parsed_env("WEB_PORT", 3000)?,
            handler_timeout: Duration::from_secs(parsed_env("HANDLER_TIMEOUT_SECS", 30)?),
            drain_timeout: Duration::from_secs(parsed_env("DRAIN_TIMEOUT_SECS", 10)?),
            profile_cache_enabled: env::var("PROFILE_CACHE")
                .map(|v| !matches!(v.trim().to_lowercase().as_str(), "off" | "false" | "0"))
                .unwrap_or(true),
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.web_host, self.web_port)
    }
}

fn required_env(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} environment variable is required"))
}

fn parsed_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a number")),
        Err(_) => Ok(default),
    }
}
