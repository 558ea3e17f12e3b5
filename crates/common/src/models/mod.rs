//! Core data model
//!
//! - `PaperRecord`: a paper as returned by the search service, plus its relevance score
//! - `Query`: the three query shapes the planner may issue
//! - `ResearchContext`: the topic or idea a collection run is grounded against

mod context;
mod paper;
mod query;

pub use context::{CollectionMode, ResearchContext};
pub use paper::{normalize_title, PaperRecord};
pub use query::{Query, QueryHistory};
