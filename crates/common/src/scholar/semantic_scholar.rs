//! Semantic Scholar API client
//!
//! Endpoints:
//! - `GET /graph/v1/paper/search` for keyword search
//! - `GET /recommendations/v1/papers/forpaper/{id}` for similar papers
//! - `GET /graph/v1/paper/{id}/references` for reference expansion
//!
//! Requests are paced with a token bucket instead of being retried.

use super::PaperSource;
use crate::config::ScholarConfig;
use crate::errors::{AppError, Result};
use crate::models::PaperRecord;
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::num::NonZeroU32;
use tracing::debug;

const SERVICE: &str = "semantic_scholar";

/// Fields requested for every paper
const PAPER_FIELDS: &str = "paperId,title,year,citationCount,abstract,tldr";

#[derive(Debug, Deserialize)]
struct SSPaper {
    #[serde(rename = "paperId")]
    paper_id: Option<String>,
    title: Option<String>,
    year: Option<i32>,
    #[serde(rename = "citationCount")]
    citation_count: Option<u64>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    tldr: Option<SSTldr>,
}

#[derive(Debug, Deserialize)]
struct SSTldr {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    data: Option<Vec<SSPaper>>,
}

#[derive(Debug, Deserialize)]
struct RecommendationResponse {
    #[serde(rename = "recommendedPapers", default)]
    recommended_papers: Vec<SSPaper>,
}

#[derive(Debug, Deserialize)]
struct ReferenceResponse {
    #[serde(default)]
    data: Option<Vec<SSReference>>,
}

#[derive(Debug, Deserialize)]
struct SSReference {
    #[serde(rename = "citedPaper")]
    cited_paper: Option<SSPaper>,
}

impl SSPaper {
    /// Papers without an identifier or title cannot be banked
    fn into_record(self) -> Option<PaperRecord> {
        let paper_id = self.paper_id.filter(|id| !id.trim().is_empty())?;
        let title = self.title.filter(|t| !t.trim().is_empty())?;

        Some(PaperRecord {
            paper_id,
            title,
            year: self.year,
            citation_count: self.citation_count,
            abstract_text: self.abstract_text,
            tldr: self.tldr.and_then(|t| t.text),
            score: 0,
        })
    }
}

fn into_records(papers: Vec<SSPaper>) -> Vec<PaperRecord> {
    papers.into_iter().filter_map(SSPaper::into_record).collect()
}

/// Semantic Scholar client
pub struct SemanticScholarClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    limiter: DefaultDirectRateLimiter,
    page_size: usize,
    reference_fetch_limit: usize,
}

impl SemanticScholarClient {
    /// Create a client from configuration
    pub fn new(config: &ScholarConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            limiter: RateLimiter::direct(Quota::per_second(per_second)),
            page_size: config.page_size,
            reference_fetch_limit: config.reference_fetch_limit,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, params: &[(&str, String)]) -> Result<T> {
        self.limiter.until_ready().await;

        let mut request = self.client.get(url).query(params);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::upstream(
                SERVICE,
                Some(status.as_u16()),
                format!("API error {}: {}", status, body),
            ));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl PaperSource for SemanticScholarClient {
    async fn keyword_search(&self, keyword: &str) -> Result<Vec<PaperRecord>> {
        let url = format!("{}/graph/v1/paper/search", self.base_url);
        let params = [
            ("query", keyword.to_string()),
            ("limit", self.page_size.to_string()),
            ("fields", PAPER_FIELDS.to_string()),
        ];

        let response: SearchResponse = self.get_json(&url, &params).await?;
        debug!(keyword, total = response.total, "Keyword search completed");

        if response.total == 0 {
            return Ok(Vec::new());
        }
        Ok(into_records(response.data.unwrap_or_default()))
    }

    async fn similar_papers(&self, paper_id: &str) -> Result<Vec<PaperRecord>> {
        let url = format!(
            "{}/recommendations/v1/papers/forpaper/{}",
            self.base_url, paper_id
        );
        let params = [
            ("limit", self.page_size.to_string()),
            ("fields", PAPER_FIELDS.to_string()),
        ];

        let response: RecommendationResponse = self.get_json(&url, &params).await?;
        debug!(paper_id, count = response.recommended_papers.len(), "Recommendations fetched");

        Ok(into_records(response.recommended_papers))
    }

    async fn references(&self, paper_id: &str) -> Result<Vec<PaperRecord>> {
        let url = format!("{}/graph/v1/paper/{}/references", self.base_url, paper_id);
        let params = [
            ("limit", self.reference_fetch_limit.to_string()),
            ("fields", PAPER_FIELDS.to_string()),
        ];

        let response: ReferenceResponse = self.get_json(&url, &params).await?;
        let cited: Vec<SSPaper> = response
            .data
            .unwrap_or_default()
            .into_iter()
            .filter_map(|r| r.cited_paper)
            .collect();
        debug!(paper_id, count = cited.len(), "References fetched");

        Ok(into_records(cited))
    }

    fn name(&self) -> &str {
        SERVICE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_response_parsing() {
        let body = r#"{
            "total": 2,
            "offset": 0,
            "data": [
                {"paperId": "a1", "title": "Paper A", "year": 2022, "citationCount": 10,
                 "abstract": "Some abstract", "tldr": {"model": "tldr@v2.0.0", "text": "Short."}},
                {"paperId": null, "title": "Orphan"}
            ]
        }"#;

        let response: SearchResponse = serde_json::from_str(body).unwrap();
        let records = into_records(response.data.unwrap());

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].paper_id, "a1");
        assert_eq!(records[0].tldr.as_deref(), Some("Short."));
        assert_eq!(records[0].score, 0);
    }

    #[test]
    fn test_reference_response_with_null_data() {
        let body = r#"{"offset": 0, "data": null}"#;
        let response: ReferenceResponse = serde_json::from_str(body).unwrap();
        assert!(response.data.is_none());
    }

    #[test]
    fn test_reference_response_unwraps_cited_paper() {
        let body = r#"{"data": [
            {"citedPaper": {"paperId": "r1", "title": "Ref One", "abstract": null}},
            {"citedPaper": null}
        ]}"#;
        let response: ReferenceResponse = serde_json::from_str(body).unwrap();
        let cited: Vec<SSPaper> = response
            .data
            .unwrap()
            .into_iter()
            .filter_map(|r| r.cited_paper)
            .collect();

        let records = into_records(cited);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Ref One");
    }

    #[test]
    fn test_client_creation() {
        let client = SemanticScholarClient::new(&ScholarConfig::default()).unwrap();
        assert_eq!(client.name(), "semantic_scholar");
        assert!(client.api_key.is_none());
    }
}
