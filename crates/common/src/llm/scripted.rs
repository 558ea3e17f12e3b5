//! Scripted oracle for tests

use super::{Completion, Oracle};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One canned answer
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Return this text
    Text(String),
    /// Fail with a transient oracle error
    Fail(String),
    /// Fail with an upstream HTTP status
    Status(u16, String),
}

/// Replays canned replies in order and records every prompt.
/// Once the script runs out every call fails with a transient error.
pub struct ScriptedOracle {
    replies: Mutex<VecDeque<ScriptedReply>>,
    prompts: Mutex<Vec<String>>,
    cost_per_call: f64,
}

impl ScriptedOracle {
    pub fn new(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
            cost_per_call: 0.0,
        }
    }

    /// Script made only of successful text replies
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(texts.into_iter().map(|t| ScriptedReply::Text(t.into())))
    }

    pub fn with_cost_per_call(mut self, cost_usd: f64) -> Self {
        self.cost_per_call = cost_usd;
        self
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replies not yet consumed
    pub fn remaining(&self) -> usize {
        self.replies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn generate(&self, prompt: &str) -> Result<Completion> {
        self.prompts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(prompt.to_string());

        let reply = self
            .replies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();

        match reply {
            Some(ScriptedReply::Text(text)) => Ok(Completion {
                text,
                cost_usd: self.cost_per_call,
            }),
            Some(ScriptedReply::Fail(message)) => Err(AppError::Oracle { message }),
            Some(ScriptedReply::Status(status, message)) => {
                Err(AppError::upstream("scripted", Some(status), message))
            }
            None => Err(AppError::Oracle {
                message: "script exhausted".to_string(),
            }),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
