//! Novelty check
//!
//! Collects literature around an exact idea, then asks a judge oracle,
//! paper by paper in rank order, whether any high-scoring paper already
//! proposes it. Stops at the first match.

use crate::collector::Collector;
use crate::output::CollectionOutput;
use crate::prompts;
use ideaforge_common::errors::{AppError, Result};
use ideaforge_common::llm::{CostMeter, Oracle};
use ideaforge_common::metrics;
use ideaforge_common::models::{PaperRecord, ResearchContext};
use ideaforge_common::retry::{retry_or_give_up, RetryPolicy};
use regex_lite::Regex;
use serde::Serialize;
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

/// Result of a novelty check
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoveltyReport {
    /// True when no judged paper was ruled a match
    pub novel: bool,
    pub overlapping_papers: Vec<PaperRecord>,
    pub judged_count: usize,
    /// Collection plus judging cost in USD
    pub total_cost: f64,
    pub collection: CollectionOutput,
}

/// Runs a novelty-mode collection and judges the best papers against the idea
pub struct NoveltyChecker {
    collector: Collector,
    judge: Arc<dyn Oracle>,
    retry: RetryPolicy,
    /// Minimum relevance score for a paper to be judged
    threshold: u8,
    /// Maximum papers judged
    max_judged: usize,
}

impl NoveltyChecker {
    pub fn new(collector: Collector, judge: Arc<dyn Oracle>, retry: RetryPolicy) -> Self {
        Self {
            collector,
            judge,
            retry,
            threshold: 8,
            max_judged: 10,
        }
    }

    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_max_judged(mut self, max_judged: usize) -> Self {
        self.max_judged = max_judged;
        self
    }

    pub async fn check(&self, idea: &str) -> Result<NoveltyReport> {
        let context = ResearchContext::novelty(idea);
        let outcome = self.collector.run(&context).await?;

        let candidates: Vec<&PaperRecord> = outcome
            .papers
            .iter()
            .filter(|p| p.score >= self.threshold)
            .take(self.max_judged)
            .collect();

        info!(
            candidates = candidates.len(),
            threshold = self.threshold,
            "Judging papers for overlap"
        );

        let meter = CostMeter::new();
        let mut overlapping_papers = Vec::new();
        let mut judged_count = 0;

        for paper in candidates {
            judged_count += 1;
            let matched = self.judge_paper(idea, paper, &meter).await?;
            if matched {
                info!(paper_id = %paper.paper_id, title = %paper.title, "Existing paper matches the idea");
                overlapping_papers.push(paper.clone());
                break;
            }
        }

        let novel = overlapping_papers.is_empty();
        let total_cost = outcome.total_cost + meter.total();
        info!(novel, judged_count, total_cost, "Novelty check complete");

        Ok(NoveltyReport {
            novel,
            overlapping_papers,
            judged_count,
            total_cost,
            collection: outcome.to_output(),
        })
    }

    /// One judgement; exhausted retries count as "no match"
    async fn judge_paper(&self, idea: &str, paper: &PaperRecord, meter: &CostMeter) -> Result<bool> {
        let prompt = prompts::novelty_judge_prompt(idea, paper);

        let judge = &self.judge;
        let prompt = &prompt;
        let decision = retry_or_give_up(&self.retry, "judge_novelty", |_| async move {
            let completion = match judge.generate(prompt).await {
                Ok(c) => c,
                Err(e) => {
                    metrics::record_oracle_call("judge", false, 0.0);
                    return Err(e);
                }
            };
            meter.add(completion.cost_usd);
            metrics::record_oracle_call("judge", true, completion.cost_usd);
            parse_decision(&completion.text)
        })
        .await?;

        Ok(decision.unwrap_or_else(|| {
            warn!(paper_id = %paper.paper_id, "No usable judgement, counting as no match");
            false
        }))
    }
}

fn decision_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^(?:decision\s*:\s*)?(yes|no)\W*$").expect("decision pattern is valid")
    })
}

/// Read the Yes/No verdict from the last non-empty line of a judge answer
pub fn parse_decision(text: &str) -> Result<bool> {
    let last = text
        .lines()
        .map(|l| l.trim().trim_matches(|c| c == '*' || c == '#' || c == '`').trim())
        .filter(|l| !l.is_empty())
        .last()
        .ok_or_else(|| AppError::parse("empty judge answer"))?;

    let caps = decision_pattern()
        .captures(last)
        .ok_or_else(|| AppError::parse(format!("no Yes/No decision in {:?}", last)))?;

    Ok(caps[1].eq_ignore_ascii_case("yes"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::CollectionParams;
    use crate::planner::LlmQueryPlanner;
    use crate::scorer::LlmRelevanceScorer;
    use ideaforge_common::llm::{ScriptedOracle, ScriptedReply};
    use ideaforge_common::scholar::{ContentFilter, InMemoryPaperSource, SourceAdapter};

    fn collector() -> Collector {
        let source = InMemoryPaperSource::new().with_keyword(
            "sparse retrieval",
            vec![
                PaperRecord::new("p1", "Learned Sparse Retrieval"),
                PaperRecord::new("p2", "Sparse Retrieval with Expansion"),
                PaperRecord::new("p3", "Dense Passage Retrieval"),
            ],
        );
        let adapter = SourceAdapter::new(Arc::new(source), ContentFilter::new(0));

        let planner_oracle = Arc::new(ScriptedOracle::from_texts(["KeywordQuery(\"sparse retrieval\")"]));
        let scorer_oracle = Arc::new(
            ScriptedOracle::from_texts([r#"{"p1": 9, "p2": 8, "p3": 3}"#]).with_cost_per_call(0.01),
        );

        Collector::new(
            adapter,
            Arc::new(LlmRelevanceScorer::new(scorer_oracle, RetryPolicy::immediate(1))),
            Arc::new(LlmQueryPlanner::new(planner_oracle, RetryPolicy::immediate(1), 1)),
            CollectionParams {
                target_size: 60,
                max_iterations: 0,
                grounding_k: 10,
            },
        )
    }

    #[test]
    fn test_parse_decision() {
        assert!(parse_decision("Same problem and method.\nDecision: Yes").unwrap());
        assert!(!parse_decision("Different method.\n\n**Decision: No**\n").unwrap());
        assert!(parse_decision("yes.").unwrap());
        assert!(parse_decision("The answer is yes").is_err());
        assert!(parse_decision("   \n").is_err());
    }

    #[tokio::test]
    async fn test_first_match_stops_judging() {
        let judge = Arc::new(ScriptedOracle::from_texts([
            "The method differs.\nDecision: No",
            "This is the same idea.\nDecision: Yes",
            "Decision: No",
        ]));
        let checker = NoveltyChecker::new(collector(), judge.clone(), RetryPolicy::immediate(2));

        let report = checker.check("expand sparse queries with a learned model").await.unwrap();

        assert!(!report.novel);
        assert_eq!(report.judged_count, 2);
        assert_eq!(report.overlapping_papers[0].paper_id, "p2");
        assert_eq!(judge.remaining(), 1);
        assert!((report.total_cost - 0.01).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unusable_judgement_counts_as_no() {
        let judge = Arc::new(ScriptedOracle::new(vec![
            ScriptedReply::Text("I am not sure".into()),
            ScriptedReply::Fail("timeout".into()),
            ScriptedReply::Text("Decision: No".into()),
        ]));
        let checker = NoveltyChecker::new(collector(), judge.clone(), RetryPolicy::immediate(2));

        let report = checker.check("expand sparse queries with a learned model").await.unwrap();

        assert!(report.novel);
        assert_eq!(report.judged_count, 2);
        assert!(report.overlapping_papers.is_empty());
        assert_eq!(report.collection.paper_bank.len(), 3);
    }

    #[tokio::test]
    async fn test_threshold_limits_candidates() {
        let judge = Arc::new(ScriptedOracle::from_texts(["Decision: No"]));
        let checker = NoveltyChecker::new(collector(), judge.clone(), RetryPolicy::immediate(1))
            .with_threshold(9)
            .with_max_judged(5);

        let report = checker.check("idea").await.unwrap();

        assert!(report.novel);
        assert_eq!(report.judged_count, 1);
        assert_eq!(judge.prompts().len(), 1);
    }
}
