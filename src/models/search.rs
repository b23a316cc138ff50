//! Search query model and request query-string construction.

use crate::sources::HarvestError;

/// Operator placed between keyword terms in the `search_query` expression
const OR_OPERATOR: &str = "+OR+";

/// One page request against the arXiv query API
///
/// The offset and page size describe the half-open range
/// `[start, start + max_results)` over the remote result ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Keyword terms, combined with OR
    keywords: Vec<String>,

    /// Number of results already skipped
    start: usize,

    /// Number of results requested by this call
    max_results: usize,
}

impl SearchQuery {
    /// Create a validated query.
    ///
    /// Fails with [`HarvestError::InvalidQuery`] if `keywords` is empty,
    /// `max_results` is not positive, or `start` is negative.
    pub fn new(keywords: &[String], start: i64, max_results: i64) -> Result<Self, HarvestError> {
        if keywords.is_empty() {
            return Err(HarvestError::InvalidQuery(
                "keyword set must not be empty".to_string(),
            ));
        }
        if max_results <= 0 {
            return Err(HarvestError::InvalidQuery(format!(
                "page size must be positive, got {}",
                max_results
            )));
        }
        if start < 0 {
            return Err(HarvestError::InvalidQuery(format!(
                "start offset must not be negative, got {}",
                start
            )));
        }

        Ok(Self {
            keywords: keywords.to_vec(),
            start: start as usize,
            max_results: max_results as usize,
        })
    }

    /// Keyword terms of this query
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Offset of the first requested result
    pub fn start(&self) -> usize {
        self.start
    }

    /// Number of results requested
    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// The `search_query` expression, e.g. `all:TFET+OR+all:Tunnel%20FET`
    pub fn search_expression(&self) -> String {
        // Non-empty is guaranteed by `new`
        join_or(&self.keywords).unwrap_or_default()
    }

    /// Full query string: `search_query=..&start=..&max_results=..`
    pub fn to_query_string(&self) -> String {
        format!(
            "search_query={}&start={}&max_results={}",
            self.search_expression(),
            self.start,
            self.max_results
        )
    }

    /// Request URL against `base_url`
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}?{}", base_url.trim_end_matches('?'), self.to_query_string())
    }
}

/// Build the query string for one page request.
pub fn build_query(keywords: &[String], start: i64, max_results: i64) -> Result<String, HarvestError> {
    SearchQuery::new(keywords, start, max_results).map(|q| q.to_query_string())
}

/// Join keyword terms with the OR operator, percent-encoding whitespace.
///
/// A single term is returned without any operator. An empty slice is an
/// [`HarvestError::InvalidQuery`].
pub fn join_or(keywords: &[String]) -> Result<String, HarvestError> {
    if keywords.is_empty() {
        return Err(HarvestError::InvalidQuery(
            "cannot OR-join an empty keyword set".to_string(),
        ));
    }

    Ok(keywords
        .iter()
        .map(|term| encode_whitespace(term))
        .collect::<Vec<_>>()
        .join(OR_OPERATOR))
}

/// Percent-encode whitespace characters and leave everything else untouched.
///
/// Field prefixes such as `all:` must reach the API unescaped.
fn encode_whitespace(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    let mut buf = [0u8; 4];
    for c in term.chars() {
        if c.is_whitespace() {
            out.push_str(&urlencoding::encode(c.encode_utf8(&mut buf)));
        } else {
            out.push(c);
        }
    }
    out
}
