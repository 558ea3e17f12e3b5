//! Collection loop
//!
//! Drives the planner, the paper source, and the scorer through a bounded
//! expansion process:
//!
//! ```text
//! INIT ──initial query──▶ EXPANDING ──size target or iteration cap──▶ CONVERGED
//!                          ▲      │
//!                          └──────┘ plan → search → novelty filter → merge → score
//! ```
//!
//! Each run owns its bank and history. Rounds that yield nothing (no query,
//! no results, nothing new) still count towards the iteration cap.

use crate::bank::PaperBank;
use crate::output::CollectionOutput;
use crate::planner::QueryPlanner;
use crate::scorer::RelevanceScorer;
use ideaforge_common::config::CollectionConfig;
use ideaforge_common::errors::Result;
use ideaforge_common::metrics;
use ideaforge_common::models::{PaperRecord, Query, QueryHistory, ResearchContext};
use ideaforge_common::scholar::SourceAdapter;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Loop bounds
#[derive(Debug, Clone)]
pub struct CollectionParams {
    /// Stop expanding once the bank holds this many papers
    pub target_size: usize,
    /// Maximum expansion rounds after the initial query
    pub max_iterations: usize,
    /// Top papers shown to the planner each round
    pub grounding_k: usize,
}

impl Default for CollectionParams {
    fn default() -> Self {
        Self {
            target_size: 60,
            max_iterations: 10,
            grounding_k: 10,
        }
    }
}

impl From<&CollectionConfig> for CollectionParams {
    fn from(config: &CollectionConfig) -> Self {
        Self {
            target_size: config.target_size,
            max_iterations: config.max_iterations,
            grounding_k: config.grounding_k,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    Expanding,
    Converged,
}

/// What a finished run hands back
#[derive(Debug, Clone)]
pub struct CollectionOutcome {
    pub context: ResearchContext,
    /// Ranked by score, deduplicated
    pub papers: Vec<PaperRecord>,
    pub query_history: QueryHistory,
    /// USD spent on oracle calls
    pub total_cost: f64,
    /// Expansion rounds performed (the initial query is not counted)
    pub rounds: usize,
    /// Bank size before deduplication
    pub bank_size: usize,
    pub duplicates_removed: usize,
}

impl CollectionOutcome {
    /// Highest-ranked papers
    pub fn top(&self, n: usize) -> &[PaperRecord] {
        &self.papers[..n.min(self.papers.len())]
    }

    pub fn to_output(&self) -> CollectionOutput {
        CollectionOutput {
            topic_or_idea_context: self.context.description.clone(),
            query_history: self.query_history.clone(),
            paper_bank: self.papers.clone(),
        }
    }
}

/// Per-round bookkeeping, for logs and metrics
#[derive(Debug, Clone, Copy)]
struct RoundReport {
    outcome: &'static str,
    new_papers: usize,
    scored: usize,
}

impl RoundReport {
    fn idle(outcome: &'static str) -> Self {
        Self {
            outcome,
            new_papers: 0,
            scored: 0,
        }
    }
}

/// Turn a failed planner or scorer call into "no new information" unless the
/// error must stop the run
fn give_up_unless_fatal<T: Default>(result: Result<T>, step: &str) -> Result<T> {
    match result {
        Err(e) if !e.aborts_run() => {
            warn!(step, error = %e, "Step abandoned, continuing with what was collected");
            Ok(T::default())
        }
        other => other,
    }
}

/// Iterative literature collector
pub struct Collector {
    source: SourceAdapter,
    scorer: Arc<dyn RelevanceScorer>,
    planner: Arc<dyn QueryPlanner>,
    params: CollectionParams,
}

impl Collector {
    pub fn new(
        source: SourceAdapter,
        scorer: Arc<dyn RelevanceScorer>,
        planner: Arc<dyn QueryPlanner>,
        params: CollectionParams,
    ) -> Self {
        Self {
            source,
            scorer,
            planner,
            params,
        }
    }

    /// Run one collection to convergence
    #[instrument(name = "collection_run", skip_all, fields(run_id = %Uuid::new_v4(), mode = %context.mode))]
    pub async fn run(&self, context: &ResearchContext) -> Result<CollectionOutcome> {
        let mut bank = PaperBank::new();
        let mut history = QueryHistory::new();
        let mut total_cost = 0.0;
        let mut rounds = 0;
        let mut state = State::Init;

        info!(
            target_size = self.params.target_size,
            max_iterations = self.params.max_iterations,
            "Collection started"
        );

        while state != State::Converged {
            state = match state {
                State::Init => {
                    let planned = give_up_unless_fatal(self.planner.initial_query(context).await, "plan")?;
                    total_cost += planned.cost;

                    let report = self
                        .round(context, planned.query, &mut bank, &mut history, &mut total_cost)
                        .await?;
                    self.log_round(context, 0, report, bank.len());

                    State::Expanding
                }
                State::Expanding => {
                    if bank.len() >= self.params.target_size || rounds >= self.params.max_iterations {
                        State::Converged
                    } else {
                        rounds += 1;

                        let grounding = bank.top_k(self.params.grounding_k);
                        let planned = give_up_unless_fatal(
                            self.planner.next_query(context, &grounding, &history).await,
                            "plan",
                        )?;
                        total_cost += planned.cost;

                        let report = self
                            .round(context, planned.query, &mut bank, &mut history, &mut total_cost)
                            .await?;
                        self.log_round(context, rounds, report, bank.len());

                        State::Expanding
                    }
                }
                State::Converged => State::Converged,
            };
        }

        let bank_size = bank.len();
        let papers = bank.finalize();
        let duplicates_removed = bank_size - papers.len();

        info!(
            rounds,
            bank_size,
            kept = papers.len(),
            duplicates_removed,
            queries = history.len(),
            total_cost,
            "Collection converged"
        );

        Ok(CollectionOutcome {
            context: context.clone(),
            papers,
            query_history: history,
            total_cost,
            rounds,
            bank_size,
            duplicates_removed,
        })
    }

    /// Execute one planned query: search, keep unseen papers, merge, score
    async fn round(
        &self,
        context: &ResearchContext,
        query: Option<Query>,
        bank: &mut PaperBank,
        history: &mut QueryHistory,
        total_cost: &mut f64,
    ) -> Result<RoundReport> {
        let Some(query) = query else {
            return Ok(RoundReport::idle("no_query"));
        };
        history.record(query.clone());

        let Some(results) = self.source.search(&query).await else {
            return Ok(RoundReport::idle("empty"));
        };

        let novel = bank.novel(results);
        if novel.is_empty() {
            debug!(%query, "Nothing new");
            return Ok(RoundReport::idle("no_novel"));
        }

        let inserted = bank.merge(novel);
        let outcome = give_up_unless_fatal(self.scorer.score(&inserted, context).await, "score")?;
        *total_cost += outcome.cost;
        let scored = bank.apply_scores(&outcome.scores);

        debug!(%query, new_papers = inserted.len(), scored, "Round merged");

        Ok(RoundReport {
            outcome: "merged",
            new_papers: inserted.len(),
            scored,
        })
    }

    fn log_round(&self, context: &ResearchContext, round: usize, report: RoundReport, bank_size: usize) {
        match report.outcome {
            "merged" => info!(
                round,
                bank_size,
                new_papers = report.new_papers,
                scored = report.scored,
                "Round complete"
            ),
            "no_query" => warn!(round, bank_size, "Planner gave no usable query, round skipped"),
            outcome => info!(round, bank_size, outcome, "Round added no papers"),
        }
        metrics::record_round(context.mode.as_str(), report.outcome, bank_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::PlannedQuery;
    use crate::scorer::{LlmRelevanceScorer, ScoreOutcome};
    use async_trait::async_trait;
    use ideaforge_common::errors::AppError;
    use ideaforge_common::llm::{ScriptedOracle, ScriptedReply};
    use ideaforge_common::RetryPolicy;
    use ideaforge_common::scholar::{ContentFilter, InMemoryPaperSource};
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// Replays planned queries; `None` entries simulate unparseable answers
    struct StubPlanner {
        initial: Option<Query>,
        next: Mutex<VecDeque<Option<Query>>>,
        /// Fallback once `next` runs dry
        repeat: Option<Query>,
        grounding_seen: Mutex<Vec<Vec<String>>>,
    }

    impl StubPlanner {
        fn new(initial: Query, next: Vec<Option<Query>>) -> Self {
            Self {
                initial: Some(initial),
                next: Mutex::new(next.into()),
                repeat: None,
                grounding_seen: Mutex::new(Vec::new()),
            }
        }

        fn repeating(initial: Query, repeat: Query) -> Self {
            Self {
                repeat: Some(repeat),
                ..Self::new(initial, Vec::new())
            }
        }

        fn grounding_seen(&self) -> Vec<Vec<String>> {
            self.grounding_seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QueryPlanner for StubPlanner {
        async fn initial_query(&self, _context: &ResearchContext) -> Result<PlannedQuery> {
            Ok(PlannedQuery {
                query: self.initial.clone(),
                cost: 0.01,
            })
        }

        async fn next_query(
            &self,
            _context: &ResearchContext,
            top_papers: &[PaperRecord],
            _history: &QueryHistory,
        ) -> Result<PlannedQuery> {
            self.grounding_seen
                .lock()
                .unwrap()
                .push(top_papers.iter().map(|p| p.paper_id.clone()).collect());

            let query = self
                .next
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.repeat.clone());
            Ok(PlannedQuery { query, cost: 0.01 })
        }
    }

    /// Scores from a fixed table; papers missing from the table stay unscored
    struct TableScorer {
        table: HashMap<String, u8>,
        batches: Mutex<Vec<Vec<String>>>,
        fail: bool,
    }

    impl TableScorer {
        fn new(pairs: &[(&str, u8)]) -> Self {
            Self {
                table: pairs.iter().map(|(id, s)| (id.to_string(), *s)).collect(),
                batches: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn batches(&self) -> Vec<Vec<String>> {
            self.batches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RelevanceScorer for TableScorer {
        async fn score(&self, papers: &[PaperRecord], _context: &ResearchContext) -> Result<ScoreOutcome> {
            if self.fail {
                return Err(AppError::Configuration {
                    message: "llm.api_key rejected".into(),
                });
            }
            self.batches
                .lock()
                .unwrap()
                .push(papers.iter().map(|p| p.paper_id.clone()).collect());

            let scores = papers
                .iter()
                .filter_map(|p| self.table.get(&p.paper_id).map(|s| (p.paper_id.clone(), *s)))
                .collect();
            Ok(ScoreOutcome { scores, cost: 0.1 })
        }
    }

    fn paper(id: &str, title: &str) -> PaperRecord {
        PaperRecord::new(id, title)
    }

    fn keyword(k: &str) -> Query {
        Query::KeywordQuery(k.into())
    }

    fn collector(
        source: InMemoryPaperSource,
        scorer: Arc<dyn RelevanceScorer>,
        planner: Arc<StubPlanner>,
        params: CollectionParams,
    ) -> Collector {
        let adapter = SourceAdapter::new(Arc::new(source), ContentFilter::new(0));
        Collector::new(adapter, scorer, planner, params)
    }

    fn params(target_size: usize, max_iterations: usize) -> CollectionParams {
        CollectionParams {
            target_size,
            max_iterations,
            grounding_k: 10,
        }
    }

    fn ids(papers: &[PaperRecord]) -> Vec<&str> {
        papers.iter().map(|p| p.paper_id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_terminates_within_iteration_cap() {
        let source = InMemoryPaperSource::new().with_keyword("seed", vec![paper("p1", "Foo")]);
        let planner = Arc::new(StubPlanner::repeating(keyword("seed"), keyword("nothing here")));
        let scorer = Arc::new(TableScorer::new(&[("p1", 5)]));
        let collector = collector(source, scorer, planner.clone(), params(60, 4));

        let outcome = collector.run(&ResearchContext::topic("t")).await.unwrap();

        assert_eq!(outcome.rounds, 4);
        assert_eq!(planner.grounding_seen().len(), 4);
        assert_eq!(outcome.query_history.len(), 5);
        assert_eq!(ids(&outcome.papers), vec!["p1"]);
    }

    #[tokio::test]
    async fn test_empty_initial_search() {
        let source = InMemoryPaperSource::new().with_keyword("later", vec![paper("p1", "Foo")]);
        let planner = Arc::new(StubPlanner::new(keyword("nothing"), vec![Some(keyword("later"))]));
        let scorer = Arc::new(TableScorer::new(&[("p1", 6)]));
        let collector = collector(source, scorer.clone(), planner.clone(), params(60, 2));

        let outcome = collector.run(&ResearchContext::topic("t")).await.unwrap();

        let grounding = planner.grounding_seen();
        assert!(grounding[0].is_empty());
        assert_eq!(grounding[1], vec!["p1"]);
        assert_eq!(scorer.batches(), vec![vec!["p1".to_string()]]);
        assert_eq!(outcome.papers[0].score, 6);
    }

    #[tokio::test]
    async fn test_duplicate_across_rounds_keeps_first_score() {
        let source = InMemoryPaperSource::new()
            .with_keyword("seed", vec![paper("p1", "Foo"), paper("p2", "Bar")])
            .with_keyword("other", vec![paper("p4", "Qux")])
            .with_similar("p1", vec![paper("p1", "Foo"), paper("p3", "Baz")]);
        let planner = Arc::new(StubPlanner::new(
            keyword("seed"),
            vec![Some(keyword("other")), Some(Query::PaperQuery("p1".into()))],
        ));
        let scorer = Arc::new(TableScorer::new(&[("p1", 7), ("p2", 4), ("p3", 5), ("p4", 2)]));
        let collector = collector(source, scorer.clone(), planner, params(60, 2));

        let outcome = collector.run(&ResearchContext::topic("t")).await.unwrap();

        let batches = scorer.batches();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[2], vec!["p3".to_string()]);

        assert_eq!(ids(&outcome.papers), vec!["p1", "p3", "p2", "p4"]);
        assert_eq!(outcome.papers[0].score, 7);
        assert_eq!(outcome.bank_size, 4);
    }

    #[tokio::test]
    async fn test_target_size_reached_by_initial_query() {
        let seed: Vec<PaperRecord> = (0..6).map(|i| paper(&format!("p{}", i), &format!("Paper {}", i))).collect();
        let source = InMemoryPaperSource::new().with_keyword("seed", seed);
        let planner = Arc::new(StubPlanner::repeating(keyword("seed"), keyword("more")));
        let scorer = Arc::new(TableScorer::new(&[("p0", 2), ("p3", 9), ("p5", 5)]));
        let collector = collector(source, scorer, planner.clone(), params(5, 10));

        let outcome = collector.run(&ResearchContext::topic("t")).await.unwrap();

        assert_eq!(outcome.rounds, 0);
        assert!(planner.grounding_seen().is_empty());
        assert_eq!(ids(&outcome.papers), vec!["p3", "p5", "p0", "p1", "p2", "p4"]);
    }

    #[tokio::test]
    async fn test_unscored_papers_stay_at_zero() {
        let source = InMemoryPaperSource::new().with_keyword("seed", vec![paper("p1", "Foo"), paper("p2", "Bar")]);
        let planner = Arc::new(StubPlanner::new(keyword("seed"), Vec::new()));
        let scorer = Arc::new(TableScorer::new(&[("p1", 8), ("ghost", 10)]));
        let collector = collector(source, scorer, planner, params(60, 1));

        let outcome = collector.run(&ResearchContext::topic("t")).await.unwrap();

        assert_eq!(outcome.papers.len(), 2);
        assert_eq!(outcome.papers[1].paper_id, "p2");
        assert_eq!(outcome.papers[1].score, 0);
    }

    #[tokio::test]
    async fn test_unparseable_plan_adds_nothing() {
        let source = InMemoryPaperSource::new().with_keyword("seed", vec![paper("p1", "Foo")]);
        let planner = Arc::new(StubPlanner::new(keyword("seed"), vec![None, None]));
        let scorer = Arc::new(TableScorer::new(&[("p1", 3)]));
        let collector = collector(source, scorer, planner, params(60, 2));

        let outcome = collector.run(&ResearchContext::topic("t")).await.unwrap();

        assert_eq!(outcome.rounds, 2);
        assert_eq!(outcome.query_history.len(), 1);
        assert_eq!(outcome.papers.len(), 1);
        assert!((outcome.total_cost - 0.13).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_final_list_is_deduplicated() {
        let source = InMemoryPaperSource::new().with_keyword(
            "seed",
            vec![paper("low", "Sparse Attention"), paper("high", "sparse  attention")],
        );
        let planner = Arc::new(StubPlanner::new(keyword("seed"), Vec::new()));
        let scorer = Arc::new(TableScorer::new(&[("low", 3), ("high", 8)]));
        let collector = collector(source, scorer, planner, params(60, 0));

        let outcome = collector.run(&ResearchContext::topic("t")).await.unwrap();

        assert_eq!(ids(&outcome.papers), vec!["high"]);
        assert_eq!(outcome.duplicates_removed, 1);

        let output = outcome.to_output();
        assert_eq!(output.topic_or_idea_context, "t");
        assert_eq!(output.paper_bank.len(), 1);
    }

    #[tokio::test]
    async fn test_fatal_scorer_error_aborts_run() {
        let source = InMemoryPaperSource::new().with_keyword("seed", vec![paper("p1", "Foo")]);
        let planner = Arc::new(StubPlanner::new(keyword("seed"), Vec::new()));
        let scorer = Arc::new(TableScorer {
            fail: true,
            ..TableScorer::new(&[])
        });
        let collector = collector(source, scorer, planner, params(60, 3));

        let result = collector.run(&ResearchContext::topic("t")).await;
        assert!(matches!(result, Err(AppError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_client_error_while_scoring_keeps_papers() {
        let source = InMemoryPaperSource::new().with_keyword("seed", vec![paper("p1", "Foo")]);
        let planner = Arc::new(StubPlanner::new(keyword("seed"), Vec::new()));
        let oracle = Arc::new(ScriptedOracle::new(vec![ScriptedReply::Status(
            400,
            "context_length_exceeded".into(),
        )]));
        let scorer = Arc::new(LlmRelevanceScorer::new(oracle.clone(), RetryPolicy::immediate(2)));
        let collector = collector(source, scorer, planner, params(60, 0));

        let outcome = collector.run(&ResearchContext::topic("t")).await.unwrap();

        assert_eq!(ids(&outcome.papers), vec!["p1"]);
        assert_eq!(outcome.papers[0].score, 0);
        assert_eq!(oracle.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_scorer_aborts_run() {
        let source = InMemoryPaperSource::new().with_keyword("seed", vec![paper("p1", "Foo")]);
        let planner = Arc::new(StubPlanner::new(keyword("seed"), Vec::new()));
        let oracle = Arc::new(ScriptedOracle::new(vec![ScriptedReply::Status(401, "bad key".into())]));
        let scorer = Arc::new(LlmRelevanceScorer::new(oracle, RetryPolicy::immediate(2)));
        let collector = collector(source, scorer, planner, params(60, 0));

        let result = collector.run(&ResearchContext::topic("t")).await;
        assert!(matches!(result, Err(AppError::Upstream { status: Some(401), .. })));
    }
}
