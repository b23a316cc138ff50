//! arXiv HTTP transport.

use async_trait::async_trait;
use std::sync::Arc;

use crate::sources::{FeedFetcher, HarvestError};
use crate::utils::HttpClient;

/// Base URL for arXiv API
pub const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";

/// Fetches arXiv Atom feeds over HTTP
///
/// One GET per call, no retries. Non-success statuses, connection failures
/// and timeouts all surface as [`HarvestError::Transport`].
#[derive(Debug, Clone)]
pub struct ArxivFetcher {
    client: Arc<HttpClient>,
}

impl ArxivFetcher {
    /// Create a new arXiv fetcher with the default client
    pub fn new() -> Result<Self, HarvestError> {
        Ok(Self {
            client: Arc::new(HttpClient::new()?),
        })
    }

    /// Create with a custom HTTP client
    pub fn with_client(client: Arc<HttpClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FeedFetcher for ArxivFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, HarvestError> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .client()
            .get(url)
            .header("Accept", "application/atom+xml")
            .send()
            .await
            .map_err(|e| HarvestError::Transport(format!("Failed to fetch arXiv results: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Transport(format!(
                "arXiv API returned status: {}",
                status
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| HarvestError::Transport(format!("Failed to read response: {}", e)))?;

        tracing::debug!("Received {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }
}
