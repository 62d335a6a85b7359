use anyhow::{Context, Result};
use std::time::Duration;
use url::Url;

pub const DEFAULT_STATS_URL: &str =
    "https://www.binance.com/bapi/margin/v1/public/margin/statistics/24h-borrow-and-repay";
pub const DEFAULT_POLL_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct Config {
    /// Upstream borrow/repay statistics endpoint
    pub stats_url: String,
    /// Directory holding one JSON record per asset
    pub data_dir: String,
    pub bind_addr: String,
    pub poll_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            stats_url: std::env::var("STATS_URL").unwrap_or_else(|_| DEFAULT_STATS_URL.to_string()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "coinsJson".to_string()),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8081".to_string()),
            poll_secs: std::env::var("POLL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|s| *s > 0)
                .unwrap_or(DEFAULT_POLL_SECS),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_secs)
    }

    /// Rejects settings that would only fail later, after startup side effects.
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.stats_url)
            .with_context(|| format!("invalid STATS_URL {:?}", self.stats_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("STATS_URL must be http(s), got {}", url.scheme());
        }
        if self.data_dir.trim().is_empty() {
            anyhow::bail!("DATA_DIR must not be empty");
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stats_url: DEFAULT_STATS_URL.to_string(),
            data_dir: "coinsJson".to_string(),
            bind_addr: "0.0.0.0:8081".to_string(),
            poll_secs: DEFAULT_POLL_SECS,
        }
    }
}
