//! Paginated harvesting engine.
//!
//! A [`Harvester`] walks a search result set page by page:
//!
//! ```text
//! Init -> DiscoveringTotal -> Paging { offset, total } -> ... -> Done
//!   \            \                       \
//!    `------------`-----------------------`--> Err(HarvestFailure)
//! ```
//!
//! Each page goes through fetch, parse and normalize before the next one is
//! requested, and every request is followed by the fair-use delay. Failures
//! are never retried; they are returned as a [`HarvestFailure`] that still
//! carries the records collected so far.
//!
//! ```rust,no_run
//! use arxiv_harvest::harvest::{HarvestRequest, Harvester};
//! use arxiv_harvest::sources::ArxivFetcher;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let harvester = Harvester::new(Arc::new(ArxivFetcher::new()?));
//! let request = HarvestRequest::new(vec!["all:TFET".to_string()]).page_size(500);
//! let collection = harvester.harvest(&request).await?;
//! println!("{} records", collection.len());
//! # Ok(())
//! # }
//! ```

mod failure;

pub use failure::HarvestFailure;

use std::sync::Arc;
use std::time::Duration;

use crate::config::HarvestConfig;
use crate::feed::{EntryNormalizer, FeedParser, ParsedFeed};
use crate::models::{Record, ResultCollection, SearchQuery};
use crate::sources::{ArxivFetcher, FeedFetcher, HarvestError, ARXIV_API_URL};
use crate::utils::{CancelToken, HttpClient};

/// Default number of results per page
pub const DEFAULT_PAGE_SIZE: i64 = 1000;

/// Default fair-use delay between requests
pub const DEFAULT_DELAY: Duration = Duration::from_secs(3);

/// What one harvest run should fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestRequest {
    pub keywords: Vec<String>,
    pub page_size: i64,
    pub start: i64,
    /// Explicit total; when `None` it is discovered from the feed
    pub total: Option<i64>,
}

impl HarvestRequest {
    pub fn new(keywords: Vec<String>) -> Self {
        Self {
            keywords,
            page_size: DEFAULT_PAGE_SIZE,
            start: 0,
            total: None,
        }
    }

    /// Build a request from configuration
    pub fn from_config(config: &HarvestConfig) -> Self {
        Self {
            keywords: config.keywords.clone(),
            page_size: config.page_size,
            start: config.start,
            total: config.total,
        }
    }

    pub fn page_size(mut self, page_size: i64) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn start(mut self, start: i64) -> Self {
        self.start = start;
        self
    }

    pub fn total(mut self, total: i64) -> Self {
        self.total = Some(total);
        self
    }
}

/// Position of a run in the paging state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestState {
    Init,
    DiscoveringTotal,
    Paging { offset: usize, total: usize },
    Done,
}

/// Drives a paginated harvest against one [`FeedFetcher`]
#[derive(Debug, Clone)]
pub struct Harvester {
    fetcher: Arc<dyn FeedFetcher>,
    parser: FeedParser,
    normalizer: EntryNormalizer,
    base_url: String,
    delay: Duration,
    cancel: CancelToken,
}

impl Harvester {
    /// Create a harvester for the public arXiv endpoint with the default delay
    pub fn new(fetcher: Arc<dyn FeedFetcher>) -> Self {
        Self {
            fetcher,
            parser: FeedParser::new(),
            normalizer: EntryNormalizer::new(),
            base_url: ARXIV_API_URL.to_string(),
            delay: DEFAULT_DELAY,
            cancel: CancelToken::new(),
        }
    }

    /// Create a harvester backed by HTTP, configured from `config`
    pub fn from_config(config: &HarvestConfig) -> Result<Self, HarvestError> {
        url::Url::parse(&config.base_url).map_err(|e| {
            HarvestError::InvalidQuery(format!("invalid base URL {:?}: {}", config.base_url, e))
        })?;

        let client = HttpClient::with_settings(
            &config.user_agent,
            config.timeout(),
            config.connect_timeout(),
        )?;
        let fetcher = ArxivFetcher::with_client(Arc::new(client));

        Ok(Self::new(Arc::new(fetcher))
            .base_url(config.base_url.clone())
            .delay(config.delay()))
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the fair-use delay applied after every request
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn parser(mut self, parser: FeedParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn normalizer(mut self, normalizer: EntryNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Use an externally owned cancellation token
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels this harvester's runs between pages
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run one harvest to completion.
    ///
    /// On failure the returned [`HarvestFailure`] holds the error, the state
    /// it happened in and every record collected from earlier pages.
    pub async fn harvest(&self, request: &HarvestRequest) -> Result<ResultCollection, HarvestFailure> {
        let start = usize::try_from(request.start).unwrap_or(0);
        let mut collection = ResultCollection::new(request.keywords.clone(), start);
        let mut state = HarvestState::Init;

        loop {
            tracing::trace!(?state, "harvest step");
            state = match self.step(state, request, &mut collection).await {
                Ok(HarvestState::Done) => break,
                Ok(next) => next,
                Err(error) => {
                    tracing::warn!(?state, "Harvest failed: {}", error);
                    return Err(HarvestFailure::new(error, state, collection));
                }
            };
        }

        if !collection.is_complete() {
            tracing::warn!(
                "Harvest returned {} records but the feed declared {} for this run",
                collection.len(),
                collection.expected_len()
            );
        }
        tracing::info!("Harvest complete: {} records", collection.len());
        Ok(collection)
    }

    async fn step(
        &self,
        state: HarvestState,
        request: &HarvestRequest,
        collection: &mut ResultCollection,
    ) -> Result<HarvestState, HarvestError> {
        match state {
            HarvestState::Init => {
                let query = SearchQuery::new(&request.keywords, request.start, request.page_size)?;
                tracing::info!("Searching arXiv for {}", query.search_expression());

                match request.total {
                    Some(total) => {
                        let total = usize::try_from(total).map_err(|_| {
                            HarvestError::InvalidQuery(format!(
                                "total must not be negative, got {}",
                                total
                            ))
                        })?;
                        collection.total = total;
                        Ok(HarvestState::Paging {
                            offset: query.start(),
                            total,
                        })
                    }
                    None => Ok(HarvestState::DiscoveringTotal),
                }
            }
            HarvestState::DiscoveringTotal => {
                self.ensure_not_cancelled()?;

                let query = SearchQuery::new(&request.keywords, request.start, 1)?;
                let feed = self.fetch_page(&query).await?;
                tracing::info!("Feed title: {}", feed.envelope.title);
                tracing::info!("Feed last updated: {}", feed.envelope.updated);
                tracing::info!("totalResults for this query: {}", feed.envelope.total_results);

                collection.total = feed.envelope.total_results;
                self.pause().await;

                Ok(HarvestState::Paging {
                    offset: query.start(),
                    total: collection.total,
                })
            }
            HarvestState::Paging { offset, total } if offset >= total => Ok(HarvestState::Done),
            HarvestState::Paging { offset, total } => {
                self.ensure_not_cancelled()?;

                let query = SearchQuery::new(&request.keywords, offset as i64, request.page_size)?;
                tracing::info!(
                    "Results {} - {}",
                    offset,
                    offset.saturating_add(query.max_results())
                );

                let feed = self.fetch_page(&query).await?;
                if feed.entries.is_empty() {
                    tracing::warn!("Page at offset {} returned no entries", offset);
                }

                let records = feed
                    .entries
                    .iter()
                    .map(|entry| self.normalizer.normalize(entry))
                    .collect::<Result<Vec<Record>, _>>()?;
                tracing::debug!("Page at offset {} yielded {} records", offset, records.len());
                collection.records.extend(records);

                self.pause().await;

                Ok(HarvestState::Paging {
                    offset: offset.saturating_add(query.max_results()),
                    total,
                })
            }
            HarvestState::Done => Ok(HarvestState::Done),
        }
    }

    async fn fetch_page(&self, query: &SearchQuery) -> Result<ParsedFeed, HarvestError> {
        let url = query.to_url(&self.base_url);
        tracing::debug!("Requesting {}", url);
        let body = self.fetcher.fetch(&url).await?;
        self.parser.parse(&body)
    }

    fn ensure_not_cancelled(&self) -> Result<(), HarvestError> {
        if self.cancel.is_cancelled() {
            tracing::warn!("Harvest cancelled before next request");
            return Err(HarvestError::Cancelled);
        }
        Ok(())
    }

    /// Fair-use delay; cut short by cancellation
    async fn pause(&self) {
        if self.delay.is_zero() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(self.delay) => {}
            _ = self.cancel.cancelled() => {
                tracing::debug!("Fair-use delay interrupted by cancellation");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::mock::{fixture_entry, fixture_feed};
    use crate::sources::MockFetcher;

    fn keywords() -> Vec<String> {
        vec!["all:TFET".to_string(), "all:Tunnel FET".to_string()]
    }

    fn page(total: usize, ids: std::ops::Range<usize>) -> String {
        let entries: Vec<String> = ids
            .map(|i| fixture_entry(&format!("0704.{:04}v1", i), &format!("Paper {}", i)))
            .collect();
        fixture_feed(total, &entries)
    }

    fn harvester(fetcher: &Arc<MockFetcher>) -> Harvester {
        Harvester::new(fetcher.clone() as Arc<dyn FeedFetcher>)
            .base_url("http://api.test/query")
            .delay(Duration::ZERO)
    }

    #[tokio::test]
    async fn test_explicit_total_page_offsets() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.push_response(page(2500, 0..3));
        fetcher.push_response(page(2500, 3..6));
        fetcher.push_response(page(2500, 6..7));

        let request = HarvestRequest::new(keywords()).page_size(1000).total(2500);
        let collection = harvester(&fetcher).harvest(&request).await.unwrap();

        assert_eq!(fetcher.requested_offsets(), vec![0, 1000, 2000]);
        assert_eq!(collection.total, 2500);
        assert_eq!(collection.len(), 7);
        assert_eq!(collection.records[0].id, "0704.0000v1");
        assert_eq!(collection.records[6].id, "0704.0006v1");
    }

    #[tokio::test]
    async fn test_discovers_total_with_single_item_request() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.push_response(page(3, 0..1));
        fetcher.push_response(page(3, 0..2));
        fetcher.push_response(page(3, 2..3));

        let request = HarvestRequest::new(keywords()).page_size(2);
        let collection = harvester(&fetcher).harvest(&request).await.unwrap();

        let requests = fetcher.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests[0].ends_with("&start=0&max_results=1"));
        assert!(requests[1].ends_with("&start=0&max_results=2"));
        assert!(requests[2].ends_with("&start=2&max_results=2"));
        assert_eq!(
            requests[0],
            "http://api.test/query?search_query=all:TFET+OR+all:Tunnel%20FET&start=0&max_results=1"
        );
        assert_eq!(collection.total, 3);
        assert!(collection.is_complete());
    }

    #[tokio::test]
    async fn test_start_offset_is_respected() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.push_response(page(30, 10..20));
        fetcher.push_response(page(30, 20..30));

        let request = HarvestRequest::new(keywords())
            .page_size(10)
            .start(10)
            .total(30);
        let collection = harvester(&fetcher).harvest(&request).await.unwrap();

        assert_eq!(fetcher.requested_offsets(), vec![10, 20]);
        assert_eq!(collection.start, 10);
        assert!(collection.is_complete());
    }

    #[tokio::test]
    async fn test_zero_total_makes_no_page_requests() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.push_response(page(0, 0..0));

        let collection = harvester(&fetcher)
            .harvest(&HarvestRequest::new(keywords()))
            .await
            .unwrap();

        assert_eq!(fetcher.requests().len(), 1);
        assert!(collection.is_empty());
        assert!(collection.is_complete());
    }

    #[tokio::test]
    async fn test_invalid_request_fails_before_network() {
        let fetcher = Arc::new(MockFetcher::new());
        let h = harvester(&fetcher);

        for request in [
            HarvestRequest::new(Vec::new()),
            HarvestRequest::new(keywords()).page_size(0),
            HarvestRequest::new(keywords()).start(-5),
            HarvestRequest::new(keywords()).total(-1),
        ] {
            let failure = h.harvest(&request).await.unwrap_err();
            assert!(matches!(failure.error, HarvestError::InvalidQuery(_)));
            assert_eq!(failure.state, HarvestState::Init);
            assert_eq!(failure.offset(), None);
        }
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_partial_results() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.push_response(page(30, 0..10));
        fetcher.push_error(HarvestError::Transport("connection reset".to_string()));

        let request = HarvestRequest::new(keywords()).page_size(10).total(30);
        let failure = harvester(&fetcher).harvest(&request).await.unwrap_err();

        assert!(matches!(failure.error, HarvestError::Transport(_)));
        assert_eq!(failure.offset(), Some(10));
        assert_eq!(failure.partial.len(), 10);
        assert_eq!(fetcher.requested_offsets(), vec![0, 10]);
    }

    #[tokio::test]
    async fn test_malformed_entry_discards_only_failing_page() {
        let bad = fixture_feed(
            4,
            &[
                fixture_entry("0704.0002v1", "ok"),
                "<entry><id>http://arxiv.org/api/errors#bad</id></entry>".to_string(),
            ],
        );
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.push_response(page(4, 0..2));
        fetcher.push_response(bad);

        let request = HarvestRequest::new(keywords()).page_size(2).total(4);
        let failure = harvester(&fetcher).harvest(&request).await.unwrap_err();

        assert!(matches!(failure.error, HarvestError::MalformedEntry(_)));
        assert_eq!(failure.offset(), Some(2));
        assert_eq!(failure.into_partial().len(), 2);
    }

    #[tokio::test]
    async fn test_discovery_malformed_feed() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.push_response("<html>rate limited</html>");

        let failure = harvester(&fetcher)
            .harvest(&HarvestRequest::new(keywords()))
            .await
            .unwrap_err();

        assert!(matches!(failure.error, HarvestError::MalformedFeed(_)));
        assert_eq!(failure.state, HarvestState::DiscoveringTotal);
        assert_eq!(failure.offset(), Some(0));
    }

    #[tokio::test]
    async fn test_short_run_is_returned_not_padded() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.push_response(page(5, 0..3));
        fetcher.push_response(page(5, 0..0));

        let request = HarvestRequest::new(keywords()).page_size(3).total(5);
        let collection = harvester(&fetcher).harvest(&request).await.unwrap();

        assert_eq!(collection.len(), 3);
        assert!(!collection.is_complete());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_after_every_request() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.push_response(page(3, 0..1));
        fetcher.push_response(page(3, 0..2));
        fetcher.push_response(page(3, 2..3));

        let h = harvester(&fetcher).delay(Duration::from_secs(3));
        let started = tokio::time::Instant::now();
        h.harvest(&HarvestRequest::new(keywords()).page_size(2))
            .await
            .unwrap();

        // discovery + two pages, each followed by the delay
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(9), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(10), "elapsed {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_cancel_before_run() {
        let fetcher = Arc::new(MockFetcher::new());
        let h = harvester(&fetcher);
        h.cancel_token().cancel();

        let failure = h
            .harvest(&HarvestRequest::new(keywords()).total(10))
            .await
            .unwrap_err();

        assert!(matches!(failure.error, HarvestError::Cancelled));
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_delay_stops_before_next_page() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.push_response(page(20, 0..10));
        fetcher.push_response(page(20, 10..20));

        let token = CancelToken::new();
        let h = harvester(&fetcher)
            .delay(Duration::from_secs(60))
            .with_cancel_token(token.clone());

        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            token.cancel();
        });

        let request = HarvestRequest::new(keywords()).page_size(10).total(20);
        let failure = h.harvest(&request).await.unwrap_err();
        canceller.await.unwrap();

        assert!(matches!(failure.error, HarvestError::Cancelled));
        assert_eq!(failure.offset(), Some(10));
        assert_eq!(failure.partial.len(), 10);
        assert_eq!(fetcher.requested_offsets(), vec![0]);
    }

    #[test]
    fn test_from_config_rejects_bad_base_url() {
        let config = HarvestConfig {
            base_url: "not a url".to_string(),
            ..HarvestConfig::default()
        };
        assert!(matches!(
            Harvester::from_config(&config),
            Err(HarvestError::InvalidQuery(_))
        ));
    }
}
