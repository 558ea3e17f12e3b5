//! Content filter applied to every batch of search results

use crate::models::PaperRecord;

/// Title fragments that mark a paper as non-empirical
const EXCLUDED_TITLE_TERMS: &[&str] = &["survey", "review", "position paper"];

/// Drops surveys, reviews, position papers, and papers without a usable abstract
#[derive(Debug, Clone)]
pub struct ContentFilter {
    /// Minimum abstract length in words (0 keeps papers without abstracts)
    pub min_abstract_words: usize,
}

impl Default for ContentFilter {
    fn default() -> Self {
        Self {
            min_abstract_words: 50,
        }
    }
}

impl ContentFilter {
    pub fn new(min_abstract_words: usize) -> Self {
        Self { min_abstract_words }
    }

    /// Whether a single paper survives the filter
    pub fn accepts(&self, paper: &PaperRecord) -> bool {
        let title = paper.title.to_lowercase();
        if EXCLUDED_TITLE_TERMS.iter().any(|term| title.contains(term)) {
            return false;
        }

        self.min_abstract_words == 0 || paper.abstract_word_count() >= self.min_abstract_words
    }

    /// Keep accepted papers, preserving order
    pub fn apply(&self, papers: Vec<PaperRecord>) -> Vec<PaperRecord> {
        papers.into_iter().filter(|p| self.accepts(p)).collect()
    }
}
