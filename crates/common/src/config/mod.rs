//! Configuration management for IdeaForge
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml)
//! - Default values

use crate::errors::Result;
use crate::models::CollectionMode;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Bibliographic search service configuration
    #[serde(default)]
    pub scholar: ScholarConfig,

    /// Language-model oracle configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Collection loop configuration
    #[serde(default)]
    pub collection: CollectionConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScholarConfig {
    /// API base URL
    #[serde(default = "default_scholar_base_url")]
    pub base_url: String,

    /// API key (raises the rate limit when present)
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_scholar_timeout")]
    pub timeout_secs: u64,

    /// Outgoing requests per second
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// Results per keyword / recommendation page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// References fetched per reference lookup
    #[serde(default = "default_reference_fetch_limit")]
    pub reference_fetch_limit: usize,

    /// References kept after filtering
    #[serde(default = "default_reference_keep_limit")]
    pub reference_keep_limit: usize,

    /// Minimum abstract length in words (0 disables the check)
    #[serde(default = "default_min_abstract_words")]
    pub min_abstract_words: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Oracle provider: openai
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// API key for the provider
    pub api_key: Option<String>,

    /// API base URL (for OpenAI-compatible endpoints)
    #[serde(default = "default_llm_api_base")]
    pub api_base: String,

    /// Model to use
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Maximum completion tokens
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: usize,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,

    /// USD per million prompt tokens
    #[serde(default = "default_input_cost")]
    pub input_cost_per_million: f64,

    /// USD per million completion tokens
    #[serde(default = "default_output_cost")]
    pub output_cost_per_million: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CollectionConfig {
    /// What the loop is grounded against
    #[serde(default)]
    pub mode: CollectionMode,

    /// Topic or idea description
    pub context: Option<String>,

    /// Stop once the bank holds this many papers
    #[serde(default = "default_target_size")]
    #[validate(range(min = 1))]
    pub target_size: usize,

    /// Maximum expansion rounds
    #[serde(default = "default_max_iterations")]
    #[validate(range(max = 100))]
    pub max_iterations: usize,

    /// Top papers shown to the planner each round
    #[serde(default = "default_grounding_k")]
    #[validate(range(min = 1))]
    pub grounding_k: usize,

    /// Seed for the grounding shuffle
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Attempts per oracle call that needs structured output
    #[serde(default = "default_retry_attempts")]
    #[validate(range(min = 1, max = 10))]
    pub retry_attempts: u32,

    /// Base delay between attempts in milliseconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// Minimum score for a paper to be judged during a novelty check
    #[serde(default = "default_novelty_threshold")]
    #[validate(range(min = 1, max = 10))]
    pub novelty_threshold: u8,

    /// Maximum papers judged during a novelty check
    #[serde(default = "default_novelty_max_judged")]
    pub novelty_max_judged: usize,

    /// Where to write the collection output
    pub output_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Prometheus exporter port (0 to disable)
    #[serde(default)]
    pub metrics_port: u16,

    /// Service name for logs
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_scholar_base_url() -> String { "https://api.semanticscholar.org".to_string() }
fn default_scholar_timeout() -> u64 { 30 }
fn default_requests_per_second() -> u32 { 1 }
fn default_page_size() -> usize { 20 }
fn default_reference_fetch_limit() -> usize { 100 }
fn default_reference_keep_limit() -> usize { 20 }
fn default_min_abstract_words() -> usize { 50 }
fn default_llm_provider() -> String { "openai".to_string() }
fn default_llm_api_base() -> String { "https://api.openai.com/v1".to_string() }
fn default_llm_model() -> String { "gpt-4o-mini".to_string() }
fn default_llm_timeout() -> u64 { 60 }
fn default_llm_max_tokens() -> usize { 2000 }
fn default_input_cost() -> f64 { 0.15 }
fn default_output_cost() -> f64 { 0.60 }
fn default_target_size() -> usize { 60 }
fn default_max_iterations() -> usize { 10 }
fn default_grounding_k() -> usize { 10 }
fn default_seed() -> u64 { 2024 }
fn default_retry_attempts() -> u32 { 3 }
fn default_retry_delay() -> u64 { 1000 }
fn default_novelty_threshold() -> u8 { 8 }
fn default_novelty_max_judged() -> usize { 10 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_service_name() -> String { "ideaforge-collector".to_string() }

impl Default for ScholarConfig {
    fn default() -> Self {
        Self {
            base_url: default_scholar_base_url(),
            api_key: None,
            timeout_secs: default_scholar_timeout(),
            requests_per_second: default_requests_per_second(),
            page_size: default_page_size(),
            reference_fetch_limit: default_reference_fetch_limit(),
            reference_keep_limit: default_reference_keep_limit(),
            min_abstract_words: default_min_abstract_words(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            api_key: None,
            api_base: default_llm_api_base(),
            model: default_llm_model(),
            timeout_secs: default_llm_timeout(),
            max_tokens: default_llm_max_tokens(),
            temperature: 0.0,
            input_cost_per_million: default_input_cost(),
            output_cost_per_million: default_output_cost(),
        }
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            mode: CollectionMode::default(),
            context: None,
            target_size: default_target_size(),
            max_iterations: default_max_iterations(),
            grounding_k: default_grounding_k(),
            seed: default_seed(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay(),
            novelty_threshold: default_novelty_threshold(),
            novelty_max_judged: default_novelty_max_judged(),
            output_path: None,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: 0,
            service_name: default_service_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> std::result::Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__COLLECTION__TARGET_SIZE=40
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> std::result::Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        self.collection.validate()?;
        Ok(())
    }
}

impl ScholarConfig {
    /// Request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl CollectionConfig {
    /// Base retry delay as Duration
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}
