//! IdeaForge Collector
//!
//! Iterative literature collection for grounded idea generation:
//! - `PaperBank`: merge, scoring, ranking, and deduplication
//! - `RelevanceScorer` / `QueryPlanner`: oracle-backed capabilities
//! - `Collector`: the bounded expansion loop
//! - `NoveltyChecker`: collection plus per-paper overlap judging
//! - `CollectionOutput`: the persisted result document

pub mod bank;
pub mod collector;
pub mod novelty;
pub mod output;
pub mod planner;
pub mod prompts;
pub mod scorer;

pub use bank::PaperBank;
pub use collector::{CollectionOutcome, CollectionParams, Collector};
pub use novelty::{NoveltyChecker, NoveltyReport};
pub use output::CollectionOutput;
pub use planner::{LlmQueryPlanner, PlannedQuery, QueryPlanner};
pub use scorer::{LlmRelevanceScorer, RelevanceScorer, ScoreOutcome};
