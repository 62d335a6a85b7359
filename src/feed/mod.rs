//! Upstream margin statistics feed.

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

pub mod snapshot;

pub use snapshot::{CoinStat, Snapshot};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for FeedError {
    fn from(e: reqwest::Error) -> Self {
        FeedError::Transport(e.to_string())
    }
}

/// Source of raw snapshot bodies. One call is one upstream request.
#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    async fn fetch(&self) -> Result<String, FeedError>;

    async fn fetch_snapshot(&self) -> Result<Snapshot, FeedError> {
        let body = self.fetch().await?;
        Snapshot::parse(&body)
    }
}

/// Plain GET against the statistics endpoint. No retry and no timeout beyond
/// the client defaults.
pub struct HttpFetcher {
    client: Client,
    endpoint: String,
}

impl HttpFetcher {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SnapshotFetcher for HttpFetcher {
    async fn fetch(&self) -> Result<String, FeedError> {
        let resp = self.client.get(&self.endpoint).send().await?;
        let resp = resp.error_for_status()?;
        Ok(resp.text().await?)
    }
}
