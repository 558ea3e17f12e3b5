//! Paper source abstraction
//!
//! Provides:
//! - `PaperSource`: the three raw lookups against a bibliographic service
//! - `SourceAdapter`: query dispatch, content filtering, and truncation
//! - `SemanticScholarClient`: the production source
//! - `InMemoryPaperSource`: a deterministic source for tests

mod filter;
mod memory;
mod semantic_scholar;

pub use filter::ContentFilter;
pub use memory::InMemoryPaperSource;
pub use semantic_scholar::SemanticScholarClient;

use crate::config::ScholarConfig;
use crate::errors::Result;
use crate::metrics;
use crate::models::{PaperRecord, Query};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Raw lookups against a bibliographic service
#[async_trait]
pub trait PaperSource: Send + Sync {
    /// Papers matching a keyword
    async fn keyword_search(&self, keyword: &str) -> Result<Vec<PaperRecord>>;

    /// Papers recommended as similar to the given paper
    async fn similar_papers(&self, paper_id: &str) -> Result<Vec<PaperRecord>>;

    /// Papers cited by the given paper
    async fn references(&self, paper_id: &str) -> Result<Vec<PaperRecord>>;

    /// Source name for logs
    fn name(&self) -> &str;
}

/// Executes planner queries against a `PaperSource`.
///
/// Errors and empty responses both come back as `None`; callers treat that
/// as "no results this round".
pub struct SourceAdapter {
    source: Arc<dyn PaperSource>,
    filter: ContentFilter,
    page_size: usize,
    reference_keep_limit: usize,
}

impl SourceAdapter {
    pub fn new(source: Arc<dyn PaperSource>, filter: ContentFilter) -> Self {
        Self {
            source,
            filter,
            page_size: 20,
            reference_keep_limit: 20,
        }
    }

    pub fn from_config(source: Arc<dyn PaperSource>, config: &ScholarConfig) -> Self {
        Self {
            source,
            filter: ContentFilter::new(config.min_abstract_words),
            page_size: config.page_size,
            reference_keep_limit: config.reference_keep_limit,
        }
    }

    /// Run a query, then filter and truncate the results
    pub async fn search(&self, query: &Query) -> Option<Vec<PaperRecord>> {
        let start = Instant::now();
        let kind = query.kind();

        let result = match query {
            Query::KeywordQuery(keyword) => self.source.keyword_search(keyword).await,
            Query::PaperQuery(paper_id) => self.source.similar_papers(paper_id).await,
            Query::GetReferences(paper_id) => self.source.references(paper_id).await,
        };
        let elapsed = start.elapsed().as_secs_f64();

        let papers = match result {
            Ok(papers) if papers.is_empty() => {
                info!(source = self.source.name(), %query, "No results");
                metrics::record_source_request(kind, "empty", elapsed);
                return None;
            }
            Ok(papers) => papers,
            Err(e) => {
                warn!(source = self.source.name(), %query, error = %e, "Search failed");
                metrics::record_source_request(kind, "error", elapsed);
                return None;
            }
        };

        let fetched = papers.len();
        let limit = match query {
            Query::GetReferences(_) => self.reference_keep_limit,
            _ => self.page_size,
        };

        let mut kept = self.filter.apply(papers);
        kept.truncate(limit);

        debug!(%query, fetched, kept = kept.len(), "Search results filtered");
        metrics::record_source_request(kind, "hit", elapsed);

        Some(kept)
    }
}
