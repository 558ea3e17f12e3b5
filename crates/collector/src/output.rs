//! Persisted collection output
//!
//! Provides:
//! - `CollectionOutput`: `{topicOrIdeaContext, queryHistory, paperBank}`
//! - `save_json` / `load_output` for writing and reading it back
//! - Default file naming derived from the mode and a hash of the context

use ideaforge_common::errors::Result;
use ideaforge_common::models::{CollectionMode, PaperRecord, QueryHistory};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::info;

/// Directory used when no output path is configured
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// The document a collection run leaves behind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionOutput {
    pub topic_or_idea_context: String,
    /// Issued queries, rendered in the planner grammar
    pub query_history: QueryHistory,
    /// Final ranked, deduplicated papers
    pub paper_bank: Vec<PaperRecord>,
}

impl CollectionOutput {
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_json(self, path).await
    }
}

/// Pretty-print `value` to `path`, creating parent directories
pub async fn save_json<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let body = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(path, body).await?;

    info!(path = %path.display(), "Output written");
    Ok(())
}

/// Read a previously saved collection output
pub async fn load_output(path: impl AsRef<Path>) -> Result<CollectionOutput> {
    let body = tokio::fs::read(path.as_ref()).await?;
    Ok(serde_json::from_slice(&body)?)
}

/// `output/{mode}_{12 hex chars of sha256(context)}.json`
pub fn default_output_path(mode: CollectionMode, context: &str) -> PathBuf {
    let digest = Sha256::digest(context.trim().as_bytes());
    let short = &hex::encode(digest)[..12];
    Path::new(DEFAULT_OUTPUT_DIR).join(format!("{}_{}.json", mode, short))
}

/// Sibling path for the novelty report: `{stem}.novelty.json`
pub fn novelty_report_path(output_path: &Path) -> PathBuf {
    let stem = output_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "collection".to_string());
    output_path.with_file_name(format!("{}.novelty.json", stem))
}
