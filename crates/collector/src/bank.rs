//! Paper bank
//!
//! The mutable collection a run builds up: identifier → record, with
//! insertion order remembered so ranking ties resolve deterministically.

use ideaforge_common::models::PaperRecord;
use std::collections::HashMap;

/// Papers discovered during one collection run
#[derive(Debug, Clone, Default)]
pub struct PaperBank {
    papers: Vec<PaperRecord>,
    index: HashMap<String, usize>,
}

impl PaperBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    pub fn contains(&self, paper_id: &str) -> bool {
        self.index.contains_key(paper_id)
    }

    pub fn get(&self, paper_id: &str) -> Option<&PaperRecord> {
        self.index.get(paper_id).map(|&i| &self.papers[i])
    }

    /// Papers whose identifiers are not in the bank yet
    pub fn novel(&self, candidates: Vec<PaperRecord>) -> Vec<PaperRecord> {
        candidates
            .into_iter()
            .filter(|p| !self.contains(&p.paper_id))
            .collect()
    }

    /// Insert unseen papers with score 0 and return the inserted records.
    ///
    /// Identifiers already present keep their record and score; within one
    /// batch the first occurrence of an identifier wins.
    pub fn merge(&mut self, incoming: Vec<PaperRecord>) -> Vec<PaperRecord> {
        let mut inserted = Vec::new();

        for mut paper in incoming {
            if self.contains(&paper.paper_id) {
                continue;
            }
            paper.score = 0;
            self.index.insert(paper.paper_id.clone(), self.papers.len());
            inserted.push(paper.clone());
            self.papers.push(paper);
        }

        inserted
    }

    /// Overwrite scores for known identifiers; unknown identifiers are ignored.
    /// Returns how many records were updated.
    pub fn apply_scores(&mut self, scores: &HashMap<String, u8>) -> usize {
        let mut applied = 0;
        for (paper_id, &score) in scores {
            if let Some(&i) = self.index.get(paper_id) {
                self.papers[i].score = score;
                applied += 1;
            }
        }
        applied
    }

    /// All records, highest score first, ties in insertion order
    pub fn ranked(&self) -> Vec<PaperRecord> {
        let mut ranked = self.papers.clone();
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked
    }

    /// The `k` highest-scoring records
    pub fn top_k(&self, k: usize) -> Vec<PaperRecord> {
        let mut ranked = self.ranked();
        ranked.truncate(k);
        ranked
    }

    /// Ranked and deduplicated records, ready to hand back to the caller
    pub fn finalize(&self) -> Vec<PaperRecord> {
        dedup(self.ranked())
    }
}

fn is_duplicate(a: &PaperRecord, b: &PaperRecord) -> bool {
    if a.paper_id.trim() == b.paper_id.trim() {
        return true;
    }
    if a.title_key() == b.title_key() {
        return true;
    }
    match (a.abstract_text.as_deref(), b.abstract_text.as_deref()) {
        (Some(x), Some(y)) => !x.trim().is_empty() && x == y,
        _ => false,
    }
}

/// Remove duplicates from a score-sorted sequence.
///
/// Two records are duplicates when their identifiers, normalized titles, or
/// abstracts match. Scanning from the tail, any record that duplicates an
/// earlier (higher-ranked) one is dropped, so the best-scored copy survives.
pub fn dedup(ranked: Vec<PaperRecord>) -> Vec<PaperRecord> {
    let mut remove = vec![false; ranked.len()];

    for i in (0..ranked.len()).rev() {
        if (0..i).any(|j| is_duplicate(&ranked[i], &ranked[j])) {
            remove[i] = true;
        }
    }

    ranked
        .into_iter()
        .zip(remove)
        .filter_map(|(paper, removed)| (!removed).then_some(paper))
        .collect()
}
