use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Where assembled payloads get POSTed, e.g. a workflow-automation
    /// webhook endpoint
    pub webhook_url: String,
    /// Ceiling on one delivery attempt; there is no retry here
    pub request_timeout: Duration,
    /// Optional bearer token added to every request
    pub auth_token: Option<String>,
    /// How often delivery counters are logged
    pub stats_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let webhook_url = env::var("WEBHOOK_URL")
            .context("WEBHOOK_URL must be set (full https endpoint for notifications)")?;

        let request_timeout =
            Duration::from_secs(parse_u64_env("WEBHOOK_TIMEOUT_SECS", 10));

        let auth_token = env::var("WEBHOOK_AUTH_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());

        let stats_interval = Duration::from_secs(parse_u64_env("STATS_INTERVAL_SECS", 60));

        Ok(Self {
            webhook_url,
            request_timeout,
            auth_token,
            stats_interval,
        })
    }
}

fn parse_u64_env(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
