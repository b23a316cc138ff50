//! Harvested record and result collection models.

use serde::{Deserialize, Serialize};

/// One normalized arXiv entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// arXiv identifier, e.g. "1234.5678v1"
    pub id: String,

    /// Paper title
    pub title: String,

    /// Author names joined with ", " (empty if none were listed)
    pub authors: String,

    /// Abstract text
    #[serde(rename = "abstract")]
    pub r#abstract: String,

    /// Link to the abstract page (the entry's "alternate" link)
    pub abs_link: String,

    /// Journal reference
    pub journal_ref: String,

    /// Publication date as reported by the feed
    pub published_date: String,
}

impl Record {
    /// Create a record with the required fields; optional fields start empty
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            authors: String::new(),
            r#abstract: String::new(),
            abs_link: String::new(),
            journal_ref: String::new(),
            published_date: String::new(),
        }
    }
}

/// All records produced by one harvest run, in arrival order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultCollection {
    /// Keyword terms the run was started with
    pub keywords: Vec<String>,

    /// Total result count that bounded the run
    pub total: usize,

    /// Offset the run started from
    pub start: usize,

    /// Harvested records
    pub records: Vec<Record>,
}

impl ResultCollection {
    /// Create an empty collection for a run
    pub fn new(keywords: Vec<String>, start: usize) -> Self {
        Self {
            keywords,
            total: 0,
            start,
            records: Vec::new(),
        }
    }

    /// Number of records the run should produce
    pub fn expected_len(&self) -> usize {
        self.total.saturating_sub(self.start)
    }

    /// Whether the number of records matches the declared total
    pub fn is_complete(&self) -> bool {
        self.records.len() == self.expected_len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a ResultCollection {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_serializes_abstract_field_name() {
        let mut record = Record::new("1234.5678", "Tunnel FETs");
        record.r#abstract = "Band-to-band tunneling".to_string();

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["abstract"], "Band-to-band tunneling");
        assert_eq!(json["authors"], "");
        assert!(json.get("r#abstract").is_none());
    }

    #[test]
    fn test_collection_completeness() {
        let mut collection = ResultCollection::new(vec!["all:TFET".to_string()], 2);
        collection.total = 4;
        assert_eq!(collection.expected_len(), 2);
        assert!(!collection.is_complete());

        collection.records.push(Record::new("a", "A"));
        collection.records.push(Record::new("b", "B"));
        assert!(collection.is_complete());
        assert_eq!(collection.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn test_expected_len_saturates() {
        let mut collection = ResultCollection::new(Vec::new(), 10);
        collection.total = 3;
        assert_eq!(collection.expected_len(), 0);
        assert!(collection.is_complete());
    }
}
