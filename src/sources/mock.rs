//! Mock transport for testing purposes.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::sources::{FeedFetcher, HarvestError};

/// A fetcher that serves queued responses in order and records every URL.
///
/// When the queue is empty, `fetch` fails with a transport error.
#[derive(Debug, Default)]
pub struct MockFetcher {
    responses: Mutex<VecDeque<Result<Vec<u8>, HarvestError>>>,
    requests: Mutex<Vec<String>>,
}

impl MockFetcher {
    /// Create a new mock fetcher with an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response body.
    pub fn push_response(&self, body: impl Into<Vec<u8>>) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Ok(body.into()));
    }

    /// Queue a failure.
    pub fn push_error(&self, error: HarvestError) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Err(error));
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Value of the `start` parameter of every request so far.
    pub fn requested_offsets(&self) -> Vec<usize> {
        self.requests()
            .iter()
            .filter_map(|url| query_param(url, "start"))
            .filter_map(|v| v.parse().ok())
            .collect()
    }
}

#[async_trait]
impl FeedFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, HarvestError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());

        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| {
                Err(HarvestError::Transport(format!(
                    "no mock response queued for {}",
                    url
                )))
            })
    }
}

fn query_param<'a>(url: &'a str, key: &str) -> Option<&'a str> {
    let (_, query) = url.split_once('?')?;
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key).then_some(v)
    })
}

/// Helper to build one arXiv-style Atom entry for tests.
pub fn fixture_entry(arxiv_id: &str, title: &str) -> String {
    format!(
        r#"<entry>
    <id>http://arxiv.org/abs/{id}</id>
    <published>2007-02-27T16:02:02-05:00</published>
    <title>{title}</title>
    <summary>Abstract of {id}</summary>
    <author><name>Ada Lovelace</name></author>
    <author><name>Alan Turing</name></author>
    <arxiv:journal_ref>J. Test. 1 (2007)</arxiv:journal_ref>
    <link href="http://arxiv.org/abs/{id}" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/{id}" rel="related" type="application/pdf"/>
  </entry>"#,
        id = arxiv_id,
        title = title
    )
}

/// Helper to wrap entries in an arXiv-style Atom feed reporting `total` results.
pub fn fixture_feed(total: usize, entries: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title type="html">ArXiv Query: search_query=all:TFET</title>
  <id>http://arxiv.org/api/fixture</id>
  <updated>2007-10-08T00:00:00-04:00</updated>
  <opensearch:totalResults>{total}</opensearch:totalResults>
  <opensearch:startIndex>0</opensearch:startIndex>
  <opensearch:itemsPerPage>{count}</opensearch:itemsPerPage>
  {entries}
</feed>"#,
        total = total,
        count = entries.len(),
        entries = entries.join("\n  ")
    )
}
