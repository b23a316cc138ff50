//! Mapping of parsed feed entries onto canonical [`Record`]s.

use crate::feed::parser::RawEntry;
use crate::models::Record;
use crate::sources::HarvestError;

/// Path marker preceding the arXiv identifier in an entry id URL
pub const ABS_MARKER: &str = "/abs/";

/// Relation of the link pointing at the abstract page
const ABSTRACT_LINK_REL: &str = "alternate";

/// Turns [`RawEntry`] values into [`Record`]s.
///
/// Only a missing identifier marker is fatal; every other absent field
/// becomes an empty string.
#[derive(Debug, Clone)]
pub struct EntryNormalizer {
    id_marker: String,
}

impl Default for EntryNormalizer {
    fn default() -> Self {
        Self {
            id_marker: ABS_MARKER.to_string(),
        }
    }
}

impl EntryNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different identifier marker, e.g. for a mirror with another URL layout
    pub fn with_id_marker(marker: impl Into<String>) -> Self {
        Self {
            id_marker: marker.into(),
        }
    }

    /// Normalize one entry
    pub fn normalize(&self, entry: &RawEntry) -> Result<Record, HarvestError> {
        let id = self.extract_id(entry.id.as_deref())?;

        let authors = entry
            .authors
            .as_ref()
            .map(|names| names.join(", "))
            .unwrap_or_default();

        // Last matching link wins
        let abs_link = entry
            .links
            .iter()
            .rev()
            .find(|link| link.rel == ABSTRACT_LINK_REL)
            .map(|link| link.href.clone())
            .unwrap_or_default();

        Ok(Record {
            id,
            title: entry.title.clone().unwrap_or_default(),
            authors,
            r#abstract: entry.summary.clone().unwrap_or_default(),
            abs_link,
            journal_ref: entry.journal_ref.clone().unwrap_or_default(),
            published_date: entry.published.clone().unwrap_or_default(),
        })
    }

    /// Keep the segment after the first occurrence of the marker
    fn extract_id(&self, source: Option<&str>) -> Result<String, HarvestError> {
        let source = source.ok_or_else(|| {
            HarvestError::MalformedEntry("entry has no id element".to_string())
        })?;

        source
            .split_once(self.id_marker.as_str())
            .map(|(_, id)| id.to_string())
            .ok_or_else(|| {
                HarvestError::MalformedEntry(format!(
                    "entry id {:?} does not contain {:?}",
                    source, self.id_marker
                ))
            })
    }
}
