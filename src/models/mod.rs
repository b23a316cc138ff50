//! Core data models for harvest queries and results.

mod record;
mod search;

pub use record::{Record, ResultCollection};
pub use search::{build_query, join_or, SearchQuery};
