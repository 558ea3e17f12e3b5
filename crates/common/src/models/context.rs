//! Research context a collection run is grounded against

use serde::{Deserialize, Serialize};
use std::fmt;

/// Collection mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionMode {
    /// Survey the literature around a research topic
    #[default]
    Topic,
    /// Find papers that help develop a specific idea
    Idea,
    /// Look for existing work that already proposes a specific idea
    Novelty,
}

impl CollectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionMode::Topic => "topic",
            CollectionMode::Idea => "idea",
            CollectionMode::Novelty => "novelty",
        }
    }
}

impl fmt::Display for CollectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-text description plus the mode it should be read in.
/// Read-only for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchContext {
    pub mode: CollectionMode,
    pub description: String,
}

impl ResearchContext {
    pub fn new(mode: CollectionMode, description: impl Into<String>) -> Self {
        Self {
            mode,
            description: description.into(),
        }
    }

    pub fn topic(description: impl Into<String>) -> Self {
        Self::new(CollectionMode::Topic, description)
    }

    pub fn idea(description: impl Into<String>) -> Self {
        Self::new(CollectionMode::Idea, description)
    }

    pub fn novelty(idea: impl Into<String>) -> Self {
        Self::new(CollectionMode::Novelty, idea)
    }
}
