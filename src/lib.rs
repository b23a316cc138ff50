//! # arXiv Harvest
//!
//! Harvests bibliographic metadata from the arXiv query API page by page,
//! honouring the fair-use delay between requests, and assembles every entry
//! into one ordered [`ResultCollection`].
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Search query construction, Record and ResultCollection
//! - [`sources`]: The [`FeedFetcher`] transport seam and the error taxonomy
//! - [`feed`]: Atom/OpenSearch/arXiv feed parsing and entry normalization
//! - [`harvest`]: The paging state machine
//! - [`utils`]: HTTP client and cancellation
//! - [`config`]: Configuration management

pub mod config;
pub mod feed;
pub mod harvest;
pub mod models;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use harvest::{HarvestFailure, HarvestRequest, Harvester};
pub use models::{Record, ResultCollection};
pub use sources::{FeedFetcher, HarvestError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
