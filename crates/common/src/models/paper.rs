//! Paper record

use serde::{Deserialize, Serialize};

/// A paper discovered during a collection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperRecord {
    /// Source-assigned identifier, unique within a bank
    pub paper_id: String,

    /// Paper title
    pub title: String,

    /// Publication year
    #[serde(default)]
    pub year: Option<i32>,

    /// Citation count at retrieval time
    #[serde(default)]
    pub citation_count: Option<u64>,

    /// Abstract text
    #[serde(rename = "abstract", default)]
    pub abstract_text: Option<String>,

    /// Short AI-generated summary
    #[serde(default)]
    pub tldr: Option<String>,

    /// Relevance score (1-10 once scored, 0 until then)
    #[serde(default)]
    pub score: u8,
}

impl PaperRecord {
    /// Create an unscored record with only the required fields
    pub fn new(paper_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            paper_id: paper_id.into(),
            title: title.into(),
            year: None,
            citation_count: None,
            abstract_text: None,
            tldr: None,
            score: 0,
        }
    }

    pub fn with_abstract(mut self, abstract_text: impl Into<String>) -> Self {
        self.abstract_text = Some(abstract_text.into());
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_score(mut self, score: u8) -> Self {
        self.score = score;
        self
    }

    /// Number of whitespace-separated words in the abstract
    pub fn abstract_word_count(&self) -> usize {
        self.abstract_text
            .as_deref()
            .map_or(0, |a| a.split_whitespace().count())
    }

    /// Title key used for duplicate detection
    pub fn title_key(&self) -> String {
        normalize_title(&self.title)
    }
}

/// Lowercase a title and drop all whitespace
pub fn normalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<String>()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_normalization() {
        assert_eq!(
            normalize_title("  Attention Is\tAll  You Need "),
            normalize_title("attention is all you need")
        );
    }

    #[test]
    fn test_serialized_keys() {
        let paper = PaperRecord::new("p1", "Foo")
            .with_abstract("An abstract")
            .with_year(2023)
            .with_score(7);

        let json = serde_json::to_value(&paper).unwrap();
        assert_eq!(json["paperId"], "p1");
        assert_eq!(json["abstract"], "An abstract");
        assert_eq!(json["citationCount"], serde_json::Value::Null);
        assert_eq!(json["score"], 7);
    }

    #[test]
    fn test_abstract_word_count() {
        let paper = PaperRecord::new("p1", "Foo").with_abstract("one two  three\nfour");
        assert_eq!(paper.abstract_word_count(), 4);
        assert_eq!(PaperRecord::new("p2", "Bar").abstract_word_count(), 0);
    }
}
