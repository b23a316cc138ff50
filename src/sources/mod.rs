//! Feed transport seam and the harvest error taxonomy.
//!
//! This module defines the [`FeedFetcher`] trait, the only place where the
//! harvester touches the network. [`ArxivFetcher`] performs real HTTP requests;
//! [`MockFetcher`] serves queued fixtures so the paging logic can be tested
//! without a server.
//!
//! # Implementing a New Transport
//!
//! 1. Create a struct that implements `FeedFetcher`
//! 2. Return the raw response body from `fetch`, or a [`HarvestError::Transport`]
//! 3. Hand it to [`crate::harvest::Harvester::new`]
//!
//! Transports must not retry; the harvester decides what happens on failure.

mod arxiv;
pub mod mock;

pub use arxiv::{ArxivFetcher, ARXIV_API_URL};
pub use mock::MockFetcher;

use async_trait::async_trait;

/// A transport that performs one GET request per call and returns the body.
#[async_trait]
pub trait FeedFetcher: Send + Sync + std::fmt::Debug {
    /// Fetch the raw feed document at `url`
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, HarvestError>;
}

/// Errors that can occur while harvesting
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    /// Bad caller input, raised before any network access
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Connection failure, non-success status or timeout
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response is not a usable feed document
    #[error("Malformed feed: {0}")]
    MalformedFeed(String),

    /// An entry's identifier could not be extracted
    #[error("Malformed entry: {0}")]
    MalformedEntry(String),

    /// The run was cancelled between pages
    #[error("Harvest cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for HarvestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            HarvestError::Transport(format!("request timed out: {}", err))
        } else {
            HarvestError::Transport(err.to_string())
        }
    }
}

impl From<quick_xml::Error> for HarvestError {
    fn from(err: quick_xml::Error) -> Self {
        HarvestError::MalformedFeed(format!("XML: {}", err))
    }
}
