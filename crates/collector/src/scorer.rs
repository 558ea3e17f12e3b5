//! Relevance scorer
//!
//! Scores a batch of papers 1-10 against the research context with one
//! oracle call. Output is parsed defensively: entries that are not numbers
//! are dropped, and a batch whose output never parses scores nothing.

use crate::prompts;
use async_trait::async_trait;
use ideaforge_common::errors::{AppError, Result};
use ideaforge_common::llm::{CostMeter, Oracle};
use ideaforge_common::metrics;
use ideaforge_common::models::{PaperRecord, ResearchContext};
use ideaforge_common::retry::{retry_or_give_up, RetryPolicy};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Scores returned for one batch, plus what the batch cost
#[derive(Debug, Clone, Default)]
pub struct ScoreOutcome {
    /// paperId → score in 1..=10; absent identifiers count as unscored
    pub scores: HashMap<String, u8>,
    pub cost: f64,
}

/// Trait for relevance scoring
#[async_trait]
pub trait RelevanceScorer: Send + Sync {
    /// Score every paper in the batch against the context
    async fn score(&self, papers: &[PaperRecord], context: &ResearchContext) -> Result<ScoreOutcome>;
}

/// Oracle-backed scorer
pub struct LlmRelevanceScorer {
    oracle: Arc<dyn Oracle>,
    retry: RetryPolicy,
}

impl LlmRelevanceScorer {
    pub fn new(oracle: Arc<dyn Oracle>, retry: RetryPolicy) -> Self {
        Self { oracle, retry }
    }
}

#[async_trait]
impl RelevanceScorer for LlmRelevanceScorer {
    async fn score(&self, papers: &[PaperRecord], context: &ResearchContext) -> Result<ScoreOutcome> {
        if papers.is_empty() {
            return Ok(ScoreOutcome::default());
        }

        let prompt = prompts::scoring_prompt(context, papers);
        let meter = CostMeter::new();

        let oracle = &self.oracle;
        let prompt = &prompt;
        let cost = &meter;
        let parsed = retry_or_give_up(&self.retry, "score_papers", |_| async move {
            let completion = match oracle.generate(prompt).await {
                Ok(c) => c,
                Err(e) => {
                    metrics::record_oracle_call("scorer", false, 0.0);
                    return Err(e);
                }
            };
            cost.add(completion.cost_usd);
            metrics::record_oracle_call("scorer", true, completion.cost_usd);
            parse_scores(&completion.text)
        })
        .await?;

        let scores = match parsed {
            Some(scores) => scores,
            None => {
                warn!(papers = papers.len(), "Scoring abandoned, batch stays unscored");
                HashMap::new()
            }
        };

        debug!(requested = papers.len(), returned = scores.len(), "Batch scored");

        Ok(ScoreOutcome {
            scores,
            cost: meter.total(),
        })
    }
}

/// Extract the `{paperId: score}` object from free-form oracle output.
///
/// Scores are rounded and clamped into 1..=10; numeric strings are accepted.
pub fn parse_scores(text: &str) -> Result<HashMap<String, u8>> {
    let start = text
        .find('{')
        .ok_or_else(|| AppError::parse("no JSON object in scorer output"))?;
    let end = text
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| AppError::parse("unterminated JSON object in scorer output"))?;

    let object: serde_json::Map<String, Value> = serde_json::from_str(&text[start..=end])
        .map_err(|e| AppError::parse(format!("invalid scorer JSON: {}", e)))?;

    let mut scores = HashMap::with_capacity(object.len());
    for (paper_id, value) in object {
        let raw = match &value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        if let Some(raw) = raw.filter(|r| r.is_finite()) {
            scores.insert(paper_id, raw.round().clamp(1.0, 10.0) as u8);
        }
    }

    Ok(scores)
}
