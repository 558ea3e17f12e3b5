//! Query planner
//!
//! Proposes the next search. Round 0 is keyword-only and depends on the
//! context alone; later rounds see the current best papers (shuffled with a
//! seeded RNG) and every query issued so far.

use crate::prompts;
use async_trait::async_trait;
use ideaforge_common::errors::{AppError, Result};
use ideaforge_common::llm::{CostMeter, Oracle};
use ideaforge_common::metrics;
use ideaforge_common::models::{PaperRecord, Query, QueryHistory, ResearchContext};
use ideaforge_common::retry::{retry_or_give_up, RetryPolicy};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Arc;
use tracing::{debug, warn};

/// A planning result; `query` is `None` when the oracle never produced a usable query
#[derive(Debug, Clone, Default)]
pub struct PlannedQuery {
    pub query: Option<Query>,
    pub cost: f64,
}

/// Trait for query planning
#[async_trait]
pub trait QueryPlanner: Send + Sync {
    /// Opening keyword query for a run
    async fn initial_query(&self, context: &ResearchContext) -> Result<PlannedQuery>;

    /// Next query given the best papers so far and the query history
    async fn next_query(
        &self,
        context: &ResearchContext,
        top_papers: &[PaperRecord],
        history: &QueryHistory,
    ) -> Result<PlannedQuery>;
}

/// Oracle-backed planner
pub struct LlmQueryPlanner {
    oracle: Arc<dyn Oracle>,
    retry: RetryPolicy,
    seed: u64,
}

impl LlmQueryPlanner {
    pub fn new(oracle: Arc<dyn Oracle>, retry: RetryPolicy, seed: u64) -> Self {
        Self { oracle, retry, seed }
    }

    /// Deterministic per-round shuffle of the grounding papers
    fn shuffled(&self, papers: &[PaperRecord], round: usize) -> Vec<PaperRecord> {
        let mut grounding = papers.to_vec();
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(round as u64));
        grounding.shuffle(&mut rng);
        grounding
    }

    async fn plan(&self, prompt: String, keyword_only: bool) -> Result<PlannedQuery> {
        let meter = CostMeter::new();

        let oracle = &self.oracle;
        let prompt = &prompt;
        let cost = &meter;
        let query = retry_or_give_up(&self.retry, "plan_query", |_| async move {
            let completion = match oracle.generate(prompt).await {
                Ok(c) => c,
                Err(e) => {
                    metrics::record_oracle_call("planner", false, 0.0);
                    return Err(e);
                }
            };
            cost.add(completion.cost_usd);
            metrics::record_oracle_call("planner", true, completion.cost_usd);

            let query = Query::parse(&completion.text)?;
            if keyword_only && !query.is_keyword() {
                return Err(AppError::parse(format!("expected a KeywordQuery, got {}", query)));
            }
            Ok(query)
        })
        .await?;

        match &query {
            Some(q) => debug!(query = %q, "Query planned"),
            None => warn!("Planner produced no usable query"),
        }

        Ok(PlannedQuery {
            query,
            cost: meter.total(),
        })
    }
}

#[async_trait]
impl QueryPlanner for LlmQueryPlanner {
    async fn initial_query(&self, context: &ResearchContext) -> Result<PlannedQuery> {
        self.plan(prompts::initial_query_prompt(context), true).await
    }

    async fn next_query(
        &self,
        context: &ResearchContext,
        top_papers: &[PaperRecord],
        history: &QueryHistory,
    ) -> Result<PlannedQuery> {
        let grounding = self.shuffled(top_papers, history.len());
        self.plan(prompts::next_query_prompt(context, &grounding, history), false)
            .await
    }
}
