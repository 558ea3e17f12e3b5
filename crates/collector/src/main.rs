//! IdeaForge Collector
//!
//! Runs one literature collection (topic or idea mode) or a novelty check
//! against Semantic Scholar and writes the result as JSON.
//!
//! Usage: `collector [CONTEXT | @FILE]`. Everything else comes from
//! `config/*` and `APP__` environment variables.

use anyhow::Context;
use ideaforge_common::config::{AppConfig, CollectionConfig, ObservabilityConfig};
use ideaforge_common::errors::{AppError, Result};
use ideaforge_common::llm::create_oracle;
use ideaforge_common::metrics::{self, METRICS_PREFIX, SOURCE_BUCKETS};
use ideaforge_common::models::{CollectionMode, PaperRecord, ResearchContext};
use ideaforge_common::scholar::{SemanticScholarClient, SourceAdapter};
use ideaforge_common::{RetryPolicy, VERSION};
use ideaforge_collector::output::{default_output_path, novelty_report_path, save_json};
use ideaforge_collector::{
    CollectionParams, Collector, LlmQueryPlanner, LlmRelevanceScorer, NoveltyChecker,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    init_tracing(&config.observability);
    info!(service = %config.observability.service_name, "Starting IdeaForge Collector v{}", VERSION);

    if let Err(e) = run(config).await {
        error!(code = e.code().as_code(), error = %e, "Collection failed");
        return Err(e.into());
    }

    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

fn init_metrics(config: &ObservabilityConfig) -> Result<()> {
    metrics::register_metrics();

    if config.metrics_port == 0 {
        return Ok(());
    }

    let addr: SocketAddr = ([0, 0, 0, 0], config.metrics_port).into();
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_source_duration_seconds", METRICS_PREFIX)),
            SOURCE_BUCKETS,
        )
        .and_then(|builder| builder.install())
        .map_err(|e| AppError::Configuration {
            message: format!("Failed to start metrics exporter: {}", e),
        })?;

    info!(port = config.metrics_port, "Prometheus exporter listening");
    Ok(())
}

/// Context from the first argument (or `@file`), falling back to config
async fn resolve_context(config: &CollectionConfig) -> Result<String> {
    let raw = std::env::args().nth(1).or_else(|| config.context.clone());

    let text = match raw {
        Some(arg) => match arg.strip_prefix('@') {
            Some(path) => tokio::fs::read_to_string(path).await?,
            None => arg,
        },
        None => String::new(),
    };

    let text = text.trim().to_string();
    if text.is_empty() {
        return Err(AppError::Validation {
            message: "a topic or idea description is required".to_string(),
            field: Some("collection.context".to_string()),
        });
    }
    Ok(text)
}

fn log_top_papers<'a>(papers: impl IntoIterator<Item = &'a PaperRecord>) {
    for (rank, paper) in papers.into_iter().enumerate() {
        info!(
            rank = rank + 1,
            score = paper.score,
            paper_id = %paper.paper_id,
            year = paper.year,
            title = %paper.title,
            "Top paper"
        );
    }
}

async fn run(config: AppConfig) -> Result<()> {
    config.validate()?;
    init_metrics(&config.observability)?;

    let collection = &config.collection;
    let description = resolve_context(collection).await?;
    let mode = collection.mode;

    let retry = RetryPolicy::new(collection.retry_attempts, collection.retry_delay());

    let source = Arc::new(SemanticScholarClient::new(&config.scholar)?);
    let adapter = SourceAdapter::from_config(source, &config.scholar);

    let oracle = create_oracle(&config.llm)?;
    info!(model = oracle.model_name(), "Oracle ready");

    let collector = Collector::new(
        adapter,
        Arc::new(LlmRelevanceScorer::new(oracle.clone(), retry.clone())),
        Arc::new(LlmQueryPlanner::new(oracle.clone(), retry.clone(), collection.seed)),
        CollectionParams::from(collection),
    );

    let output_path = collection
        .output_path
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| default_output_path(mode, &description));

    match mode {
        CollectionMode::Novelty => {
            let checker = NoveltyChecker::new(collector, oracle, retry)
                .with_threshold(collection.novelty_threshold)
                .with_max_judged(collection.novelty_max_judged);

            let report = checker.check(&description).await?;
            log_top_papers(report.collection.paper_bank.iter().take(10));
            info!(
                novel = report.novel,
                judged = report.judged_count,
                total_cost = report.total_cost,
                "Novelty verdict"
            );

            report.collection.save(&output_path).await?;
            save_json(&report, novelty_report_path(&output_path)).await?;
        }
        CollectionMode::Topic | CollectionMode::Idea => {
            let outcome = collector.run(&ResearchContext::new(mode, description)).await?;
            log_top_papers(outcome.top(10));
            info!(
                papers = outcome.papers.len(),
                rounds = outcome.rounds,
                total_cost = outcome.total_cost,
                "Collection finished"
            );

            outcome.to_output().save(&output_path).await?;
        }
    }

    Ok(())
}
