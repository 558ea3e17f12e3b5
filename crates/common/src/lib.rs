//! IdeaForge Common Library
//!
//! Shared code for the IdeaForge collector including:
//! - Paper and query data model
//! - Paper source adapter (Semantic Scholar)
//! - Language-model oracle abstraction
//! - Error types and bounded retry
//! - Configuration management
//! - Metrics

pub mod config;
pub mod errors;
pub mod llm;
pub mod metrics;
pub mod models;
pub mod retry;
pub mod scholar;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use llm::{Completion, CostMeter, Oracle};
pub use models::{CollectionMode, PaperRecord, Query, QueryHistory, ResearchContext};
pub use retry::RetryPolicy;
pub use scholar::{PaperSource, SourceAdapter};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
