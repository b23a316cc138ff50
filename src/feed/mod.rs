//! Feed parsing and entry normalization.

mod normalize;
mod parser;

pub use normalize::{EntryNormalizer, ABS_MARKER};
pub use parser::{
    EntryLink, FeedEnvelope, FeedNamespaces, FeedParser, ParsedFeed, RawEntry, ARXIV_NS, ATOM_NS,
    OPENSEARCH_NS,
};
