//! Utility modules supporting harvest operations.
//!
//! - [`HttpClient`]: shared reqwest client with timeouts and a crate user agent
//! - [`CancelToken`]: cooperative cancellation checked between pages

mod cancel;
mod http;

pub use cancel::CancelToken;
pub use http::{HttpClient, DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
