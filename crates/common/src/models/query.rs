//! Query grammar
//!
//! The planner answers with a single function-call style line:
//! - `KeywordQuery("keyword")`
//! - `PaperQuery("paperId")`
//! - `GetReferences("paperId")`

use crate::errors::{AppError, Result};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// A query against the paper source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Query {
    /// Keyword search over the index
    KeywordQuery(String),
    /// Papers similar to the given paper
    PaperQuery(String),
    /// Reference list of the given paper
    GetReferences(String),
}

fn query_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"(KeywordQuery|PaperQuery|GetReferences)\(\s*(?:"([^"]*)"|'([^']*)'|`([^`]*)`|([^)"'`]*))\s*\)"#,
        )
        .expect("query pattern is valid")
    })
}

impl Query {
    /// Name of the query shape, used as a metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            Query::KeywordQuery(_) => "keyword",
            Query::PaperQuery(_) => "similar",
            Query::GetReferences(_) => "references",
        }
    }

    /// The keyword or paper identifier
    pub fn argument(&self) -> &str {
        match self {
            Query::KeywordQuery(arg) | Query::PaperQuery(arg) | Query::GetReferences(arg) => arg,
        }
    }

    pub fn is_keyword(&self) -> bool {
        matches!(self, Query::KeywordQuery(_))
    }

    /// Find the first query call anywhere in free-form oracle output
    pub fn parse(text: &str) -> Result<Self> {
        let caps = query_pattern()
            .captures(text)
            .ok_or_else(|| AppError::parse(format!("no query call in {:?}", truncate(text))))?;

        // Quoted forms first, then the bare fallback
        let argument = (2..=5)
            .find_map(|i| caps.get(i))
            .map_or("", |m| m.as_str().trim());

        if argument.is_empty() {
            return Err(AppError::parse(format!("empty argument in {:?}", &caps[0])));
        }

        let argument = argument.to_string();
        Ok(match &caps[1] {
            "KeywordQuery" => Query::KeywordQuery(argument),
            "PaperQuery" => Query::PaperQuery(argument),
            _ => Query::GetReferences(argument),
        })
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(120).collect()
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::KeywordQuery(k) => write!(f, "KeywordQuery(\"{}\")", k),
            Query::PaperQuery(id) => write!(f, "PaperQuery(\"{}\")", id),
            Query::GetReferences(id) => write!(f, "GetReferences(\"{}\")", id),
        }
    }
}

impl FromStr for Query {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Query::parse(s)
    }
}

impl TryFrom<String> for Query {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self> {
        Query::parse(&value)
    }
}

impl From<Query> for String {
    fn from(query: Query) -> Self {
        query.to_string()
    }
}

/// Append-only record of every query issued during a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryHistory(Vec<Query>);

impl QueryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, query: Query) {
        self.0.push(query);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, query: &Query) -> bool {
        self.0.contains(query)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Query> {
        self.0.iter()
    }

    /// Rendered queries in issue order
    pub fn rendered(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_each_shape() {
        assert_eq!(
            Query::parse("KeywordQuery(\"prompt tuning\")").unwrap(),
            Query::KeywordQuery("prompt tuning".into())
        );
        assert_eq!(
            Query::parse("PaperQuery(\"abc123\")").unwrap(),
            Query::PaperQuery("abc123".into())
        );
        assert_eq!(
            Query::parse("GetReferences('abc123')").unwrap(),
            Query::GetReferences("abc123".into())
        );
    }

    #[test]
    fn test_parse_embedded_in_prose() {
        let text = "Next I would look at references.\n```\nGetReferences(\"f00d\")\n```";
        assert_eq!(Query::parse(text).unwrap(), Query::GetReferences("f00d".into()));
    }

    #[test]
    fn test_parse_stops_at_closing_quote() {
        assert_eq!(
            Query::parse("KeywordQuery(\"sparse attention\") (a different angle)").unwrap(),
            Query::KeywordQuery("sparse attention".into())
        );
        assert_eq!(
            Query::parse("KeywordQuery(\"retrieval (dense)\")").unwrap(),
            Query::KeywordQuery("retrieval (dense)".into())
        );
    }

    #[test]
    fn test_parse_takes_first_of_several_calls() {
        assert_eq!(
            Query::parse("PaperQuery(\"abc123\"), then GetReferences(\"def\")").unwrap(),
            Query::PaperQuery("abc123".into())
        );
        assert_eq!(
            Query::parse("GetReferences(f00d) and later KeywordQuery(\"x\")").unwrap(),
            Query::GetReferences("f00d".into())
        );
    }

    #[test]
    fn test_parse_failures() {
        assert!(Query::parse("Search for more papers on calibration").is_err());
        assert!(Query::parse("KeywordQuery(\"\")").is_err());
        assert!(Query::parse("AuthorQuery(\"Hinton\")").is_err());
    }

    #[test]
    fn test_display_parses_back() {
        let query = Query::KeywordQuery("chain of thought".into());
        assert_eq!(query.to_string(), "KeywordQuery(\"chain of thought\")");
        assert_eq!(query.to_string().parse::<Query>().unwrap(), query);
    }

    #[test]
    fn test_history_serializes_as_strings() {
        let mut history = QueryHistory::new();
        history.record(Query::KeywordQuery("a".into()));
        history.record(Query::PaperQuery("p1".into()));

        let json = serde_json::to_value(&history).unwrap();
        assert_eq!(json, serde_json::json!(["KeywordQuery(\"a\")", "PaperQuery(\"p1\")"]));
    }
}
