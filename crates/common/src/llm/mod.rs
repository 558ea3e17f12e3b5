//! Language-model oracle abstraction
//!
//! The collection loop treats the model as a black box that turns a prompt
//! into text. Implementations:
//! - `OpenAiChatOracle` for OpenAI-compatible chat completion endpoints
//! - `ScriptedOracle` replaying canned answers, for tests

mod openai;
mod scripted;

pub use openai::OpenAiChatOracle;
pub use scripted::{ScriptedOracle, ScriptedReply};

use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Text produced by one oracle call, with its estimated cost
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub cost_usd: f64,
}

/// Trait for prompt-in, text-out model calls
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Generate a completion for a single prompt
    async fn generate(&self, prompt: &str) -> Result<Completion>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Thread-safe USD accumulator so every attempt of a retried call is charged
#[derive(Debug, Default)]
pub struct CostMeter {
    nano_usd: AtomicU64,
}

impl CostMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, cost_usd: f64) {
        if cost_usd > 0.0 {
            let nanos = (cost_usd * 1e9).round() as u64;
            self.nano_usd.fetch_add(nanos, Ordering::Relaxed);
        }
    }

    pub fn total(&self) -> f64 {
        self.nano_usd.load(Ordering::Relaxed) as f64 / 1e9
    }
}

/// Create an oracle based on configuration
pub fn create_oracle(config: &LlmConfig) -> Result<Arc<dyn Oracle>> {
    match config.provider.as_str() {
        "openai" => {
            let key = config
                .api_key
                .clone()
                .filter(|k| !k.is_empty())
                .ok_or_else(|| AppError::Configuration {
                    message: "llm.api_key is required for the openai provider".to_string(),
                })?;
            Ok(Arc::new(OpenAiChatOracle::new(config, key)?))
        }
        other => Err(AppError::Configuration {
            message: format!("Unknown oracle provider: {}", other),
        }),
    }
}
