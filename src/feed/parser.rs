//! Atom feed parser with OpenSearch and arXiv namespace support.
//!
//! Elements are matched by namespace URI, never by prefix, so a feed that
//! binds `opensearch` or `arxiv` to a different prefix still parses. The
//! URI table lives in [`FeedNamespaces`], owned by each [`FeedParser`].

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;

use crate::sources::HarvestError;

/// Atom syndication namespace
pub const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
/// OpenSearch 1.1 namespace (pagination metadata)
pub const OPENSEARCH_NS: &str = "http://a9.com/-/spec/opensearch/1.1/";
/// arXiv extension namespace (journal_ref, doi, comment, ...)
pub const ARXIV_NS: &str = "http://arxiv.org/schemas/atom";

/// Relation assumed for a link without a `rel` attribute (RFC 4287 §4.2.7.2)
const DEFAULT_LINK_REL: &str = "alternate";

/// Namespace URIs the parser resolves elements against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedNamespaces {
    pub atom: String,
    pub opensearch: String,
    pub arxiv: String,
}

impl Default for FeedNamespaces {
    fn default() -> Self {
        Self {
            atom: ATOM_NS.to_string(),
            opensearch: OPENSEARCH_NS.to_string(),
            arxiv: ARXIV_NS.to_string(),
        }
    }
}

impl FeedNamespaces {
    fn classify(&self, resolved: &ResolveResult<'_>) -> Ns {
        match resolved {
            ResolveResult::Bound(Namespace(uri)) => {
                let uri = *uri;
                if uri == self.atom.as_bytes() {
                    Ns::Atom
                } else if uri == self.opensearch.as_bytes() {
                    Ns::OpenSearch
                } else if uri == self.arxiv.as_bytes() {
                    Ns::Arxiv
                } else {
                    Ns::Other
                }
            }
            _ => Ns::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ns {
    Atom,
    OpenSearch,
    Arxiv,
    Other,
}

/// Feed-level metadata of one response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEnvelope {
    pub title: String,
    pub updated: String,
    /// OpenSearch totalResults
    pub total_results: usize,
    /// OpenSearch startIndex, if reported
    pub start_index: Option<usize>,
    /// OpenSearch itemsPerPage, if reported
    pub items_per_page: Option<usize>,
}

/// A link element of an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryLink {
    pub rel: String,
    pub href: String,
}

/// One entry as found in the feed; every field may be absent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub id: Option<String>,
    pub title: Option<String>,
    /// `None` when the entry has no author elements at all
    pub authors: Option<Vec<String>>,
    pub summary: Option<String>,
    pub links: Vec<EntryLink>,
    pub journal_ref: Option<String>,
    pub published: Option<String>,
}

/// A parsed response: envelope plus entries in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFeed {
    pub envelope: FeedEnvelope,
    pub entries: Vec<RawEntry>,
}

/// Parser for arXiv API responses
#[derive(Debug, Clone, Default)]
pub struct FeedParser {
    namespaces: FeedNamespaces,
}

impl FeedParser {
    /// Create a parser for the standard arXiv namespaces
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser with a custom namespace table
    pub fn with_namespaces(namespaces: FeedNamespaces) -> Self {
        Self { namespaces }
    }

    pub fn namespaces(&self) -> &FeedNamespaces {
        &self.namespaces
    }

    /// Parse a raw response body.
    ///
    /// Fails with [`HarvestError::MalformedFeed`] if the document is not a
    /// well-formed Atom feed or has no usable `opensearch:totalResults`.
    pub fn parse(&self, bytes: &[u8]) -> Result<ParsedFeed, HarvestError> {
        let mut reader = NsReader::from_reader(bytes);
        reader.config_mut().trim_text(true);

        let mut state = ParseState::default();
        let mut buf = Vec::new();

        loop {
            let done = {
                let (resolved, event) = reader.read_resolved_event_into(&mut buf)?;
                let ns = self.namespaces.classify(&resolved);
                state.handle(ns, event)?
            };
            buf.clear();
            if done {
                break;
            }
        }

        state.finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    FeedTitle,
    FeedUpdated,
    TotalResults,
    StartIndex,
    ItemsPerPage,
    Id,
    Title,
    Summary,
    Published,
    JournalRef,
    AuthorName,
}

#[derive(Debug)]
struct Capture {
    field: Field,
    depth: usize,
    text: String,
}

#[derive(Debug, Default)]
struct ParseState {
    depth: usize,
    saw_root: bool,
    envelope_title: Option<String>,
    envelope_updated: Option<String>,
    total_results: Option<String>,
    start_index: Option<String>,
    items_per_page: Option<String>,
    entries: Vec<RawEntry>,
    entry: Option<RawEntry>,
    in_author: bool,
    capture: Option<Capture>,
}

impl ParseState {
    /// Returns `true` at end of document
    fn handle(&mut self, ns: Ns, event: Event<'_>) -> Result<bool, HarvestError> {
        match event {
            Event::Start(e) => {
                self.depth += 1;
                self.open(ns, &e)?;
            }
            Event::Empty(e) => {
                self.depth += 1;
                self.open(ns, &e)?;
                self.close(ns, e.local_name().as_ref());
                self.depth -= 1;
            }
            Event::End(e) => {
                self.close(ns, e.local_name().as_ref());
                self.depth = self.depth.saturating_sub(1);
            }
            Event::Text(e) => {
                if let Some(capture) = self.capture.as_mut() {
                    capture.text.push_str(&e.unescape().map_err(malformed)?);
                }
            }
            Event::CData(e) => {
                if let Some(capture) = self.capture.as_mut() {
                    capture.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::Eof => return Ok(true),
            _ => {}
        }
        Ok(false)
    }

    fn open(&mut self, ns: Ns, e: &BytesStart<'_>) -> Result<(), HarvestError> {
        let local = e.local_name();
        let local = local.as_ref();

        if self.depth == 1 {
            if ns == Ns::Atom && local == b"feed" {
                self.saw_root = true;
                return Ok(());
            }
            return Err(HarvestError::MalformedFeed(format!(
                "root element <{}> is not an Atom feed",
                String::from_utf8_lossy(e.name().as_ref())
            )));
        }

        // Markup nested inside a captured field only contributes its text
        if self.capture.is_some() {
            return Ok(());
        }

        let field = match (self.entry.is_some(), self.depth, ns, local) {
            (false, 2, Ns::Atom, b"entry") => {
                self.entry = Some(RawEntry::default());
                None
            }
            (false, 2, Ns::Atom, b"title") => Some(Field::FeedTitle),
            (false, 2, Ns::Atom, b"updated") => Some(Field::FeedUpdated),
            (false, 2, Ns::OpenSearch, b"totalResults") => Some(Field::TotalResults),
            (false, 2, Ns::OpenSearch, b"startIndex") => Some(Field::StartIndex),
            (false, 2, Ns::OpenSearch, b"itemsPerPage") => Some(Field::ItemsPerPage),
            (true, 3, Ns::Atom, b"id") => Some(Field::Id),
            (true, 3, Ns::Atom, b"title") => Some(Field::Title),
            (true, 3, Ns::Atom, b"summary") => Some(Field::Summary),
            (true, 3, Ns::Atom, b"published") => Some(Field::Published),
            (true, 3, Ns::Arxiv, b"journal_ref") => Some(Field::JournalRef),
            (true, 3, Ns::Atom, b"author") => {
                self.in_author = true;
                if let Some(entry) = self.entry.as_mut() {
                    entry.authors.get_or_insert_with(Vec::new);
                }
                None
            }
            (true, 4, Ns::Atom, b"name") if self.in_author => Some(Field::AuthorName),
            (true, 3, Ns::Atom, b"link") => {
                let link = read_link(e)?;
                if let (Some(entry), Some(link)) = (self.entry.as_mut(), link) {
                    entry.links.push(link);
                }
                None
            }
            _ => None,
        };

        if let Some(field) = field {
            self.capture = Some(Capture {
                field,
                depth: self.depth,
                text: String::new(),
            });
        }
        Ok(())
    }

    fn close(&mut self, ns: Ns, local: &[u8]) {
        if let Some(capture) = self.capture.take() {
            if capture.depth == self.depth {
                self.store(capture.field, capture.text.trim().to_string());
                return;
            }
            self.capture = Some(capture);
            return;
        }

        match (self.depth, ns, local) {
            (2, Ns::Atom, b"entry") => {
                if let Some(entry) = self.entry.take() {
                    self.entries.push(entry);
                }
            }
            (3, Ns::Atom, b"author") => self.in_author = false,
            _ => {}
        }
    }

    fn store(&mut self, field: Field, value: String) {
        match field {
            Field::FeedTitle => self.envelope_title = Some(value),
            Field::FeedUpdated => self.envelope_updated = Some(value),
            Field::TotalResults => self.total_results = Some(value),
            Field::StartIndex => self.start_index = Some(value),
            Field::ItemsPerPage => self.items_per_page = Some(value),
            _ => {
                let Some(entry) = self.entry.as_mut() else {
                    return;
                };
                match field {
                    Field::Id => entry.id = Some(value),
                    Field::Title => entry.title = Some(value),
                    Field::Summary => entry.summary = Some(value),
                    Field::Published => entry.published = Some(value),
                    Field::JournalRef => entry.journal_ref = Some(value),
                    Field::AuthorName => entry.authors.get_or_insert_with(Vec::new).push(value),
                    _ => {}
                }
            }
        }
    }

    fn finish(self) -> Result<ParsedFeed, HarvestError> {
        if !self.saw_root {
            return Err(HarvestError::MalformedFeed(
                "document contains no Atom feed element".to_string(),
            ));
        }
        if self.depth != 0 {
            return Err(HarvestError::MalformedFeed(
                "document ended inside an element".to_string(),
            ));
        }

        let total = self.total_results.ok_or_else(|| {
            HarvestError::MalformedFeed("missing opensearch:totalResults".to_string())
        })?;
        let total_results = total.parse::<usize>().map_err(|_| {
            HarvestError::MalformedFeed(format!(
                "opensearch:totalResults is not a non-negative integer: {:?}",
                total
            ))
        })?;

        Ok(ParsedFeed {
            envelope: FeedEnvelope {
                title: self.envelope_title.unwrap_or_default(),
                updated: self.envelope_updated.unwrap_or_default(),
                total_results,
                start_index: self.start_index.and_then(|v| v.parse().ok()),
                items_per_page: self.items_per_page.and_then(|v| v.parse().ok()),
            },
            entries: self.entries,
        })
    }
}

fn malformed(err: impl std::fmt::Display) -> HarvestError {
    HarvestError::MalformedFeed(format!("XML: {}", err))
}

fn read_link(e: &BytesStart<'_>) -> Result<Option<EntryLink>, HarvestError> {
    let mut rel = None;
    let mut href = None;
    for attr in e.attributes() {
        let attr = attr.map_err(malformed)?;
        match attr.key.local_name().as_ref() {
            b"rel" => rel = Some(attr.unescape_value().map_err(malformed)?.into_owned()),
            b"href" => href = Some(attr.unescape_value().map_err(malformed)?.into_owned()),
            _ => {}
        }
    }

    Ok(href.map(|href| EntryLink {
        rel: rel.unwrap_or_else(|| DEFAULT_LINK_REL.to_string()),
        href,
    }))
}
