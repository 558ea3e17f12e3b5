//! In-memory paper source for tests

use super::PaperSource;
use crate::errors::{AppError, Result};
use crate::models::{PaperRecord, Query};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Answers queries from fixed tables and logs every call it receives
#[derive(Default)]
pub struct InMemoryPaperSource {
    keyword: HashMap<String, Vec<PaperRecord>>,
    similar: HashMap<String, Vec<PaperRecord>>,
    references: HashMap<String, Vec<PaperRecord>>,
    failing: HashSet<Query>,
    calls: Mutex<Vec<Query>>,
}

impl InMemoryPaperSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keyword(mut self, keyword: &str, papers: Vec<PaperRecord>) -> Self {
        self.keyword.insert(keyword.to_string(), papers);
        self
    }

    pub fn with_similar(mut self, paper_id: &str, papers: Vec<PaperRecord>) -> Self {
        self.similar.insert(paper_id.to_string(), papers);
        self
    }

    pub fn with_references(mut self, paper_id: &str, papers: Vec<PaperRecord>) -> Self {
        self.references.insert(paper_id.to_string(), papers);
        self
    }

    /// Make a query fail with an upstream error
    pub fn with_failure(mut self, query: Query) -> Self {
        self.failing.insert(query);
        self
    }

    /// Queries received so far, in order
    pub fn calls(&self) -> Vec<Query> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn lookup(&self, query: Query) -> Result<Vec<PaperRecord>> {
        let failing = self.failing.contains(&query);
        let table = match &query {
            Query::KeywordQuery(_) => &self.keyword,
            Query::PaperQuery(_) => &self.similar,
            Query::GetReferences(_) => &self.references,
        };
        let papers = table.get(query.argument()).cloned().unwrap_or_default();

        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(query);

        if failing {
            return Err(AppError::upstream("in_memory", Some(503), "simulated failure"));
        }
        Ok(papers)
    }
}

#[async_trait]
impl PaperSource for InMemoryPaperSource {
    async fn keyword_search(&self, keyword: &str) -> Result<Vec<PaperRecord>> {
        self.lookup(Query::KeywordQuery(keyword.to_string()))
    }

    async fn similar_papers(&self, paper_id: &str) -> Result<Vec<PaperRecord>> {
        self.lookup(Query::PaperQuery(paper_id.to_string()))
    }

    async fn references(&self, paper_id: &str) -> Result<Vec<PaperRecord>> {
        self.lookup(Query::GetReferences(paper_id.to_string()))
    }

    fn name(&self) -> &str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_calls_logged_in_order() {
        let source = InMemoryPaperSource::new()
            .with_keyword("rag", vec![PaperRecord::new("p1", "Retrieval")]);

        assert_eq!(source.keyword_search("rag").await.unwrap().len(), 1);
        assert!(source.references("p1").await.unwrap().is_empty());

        assert_eq!(
            source.calls(),
            vec![
                Query::KeywordQuery("rag".into()),
                Query::GetReferences("p1".into()),
            ]
        );
    }
}
