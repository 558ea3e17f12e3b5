//! OpenAI-compatible chat completion client

use super::{Completion, Oracle};
use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const SERVICE: &str = "llm";

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

/// Chat completion oracle
pub struct OpenAiChatOracle {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    max_tokens: usize,
    temperature: f32,
    input_cost_per_million: f64,
    output_cost_per_million: f64,
}

impl OpenAiChatOracle {
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            input_cost_per_million: config.input_cost_per_million,
            output_cost_per_million: config.output_cost_per_million,
        })
    }

    fn cost_of(&self, usage: &Usage) -> f64 {
        usage.prompt_tokens as f64 * self.input_cost_per_million / 1e6
            + usage.completion_tokens as f64 * self.output_cost_per_million / 1e6
    }
}

#[async_trait]
impl Oracle for OpenAiChatOracle {
    async fn generate(&self, prompt: &str) -> Result<Completion> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You are a helpful research assistant.",
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::upstream(
                SERVICE,
                Some(status.as_u16()),
                format!("LLM API error {}: {}", status, body),
            ));
        }

        let chat_response: ChatResponse = response.json().await?;
        let cost_usd = chat_response
            .usage
            .as_ref()
            .map_or(0.0, |usage| self.cost_of(usage));

        let text = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AppError::Oracle {
                message: "Empty response from LLM".to_string(),
            })?;

        debug!(model = %self.model, chars = text.len(), cost_usd, "Completion received");

        Ok(Completion { text, cost_usd })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_from_usage() {
        let oracle = OpenAiChatOracle::new(&LlmConfig::default(), "sk-test".into()).unwrap();
        let usage = Usage {
            prompt_tokens: 1_000_000,
            completion_tokens: 500_000,
        };
        assert!((oracle.cost_of(&usage) - (0.15 + 0.30)).abs() < 1e-9);
    }

    #[test]
    fn test_endpoint_joined_without_double_slash() {
        let config = LlmConfig {
            api_base: "http://localhost:8000/v1/".to_string(),
            ..LlmConfig::default()
        };
        let oracle = OpenAiChatOracle::new(&config, "sk-test".into()).unwrap();
        assert_eq!(oracle.endpoint, "http://localhost:8000/v1/chat/completions");
    }

    #[test]
    fn test_response_without_usage() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "KeywordQuery(\"x\")"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.usage.is_none());
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("KeywordQuery(\"x\")"));
    }
}
