use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::types::KnowledgeKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchKind {
    Exact,
    Partial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeMatch {
    pub key: KnowledgeKey,
    pub value: Value,
    pub kind: MatchKind,
    /// Share of the key's tokens found in the query, 1.0 for exact matches.
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryResult {
    Found(KnowledgeMatch),
    NotFound { query: String },
}

impl QueryResult {
    pub fn is_found(&self) -> bool {
        matches!(self, QueryResult::Found(_))
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            QueryResult::Found(found) => Some(&found.value),
            QueryResult::NotFound { .. } => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            QueryResult::Found(found) => format!("{} = {}", found.key, found.value),
            QueryResult::NotFound { query } => format!("not yet known: {}", query),
        }
    }
}

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[a-z0-9]+").expect("token pattern compiles"))
}

fn tokens(text: &str) -> Vec<String> {
    token_pattern()
        .find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

fn normalize(text: &str) -> String {
    text.trim()
        .trim_end_matches(['?', '!', '.'])
        .trim()
        .to_lowercase()
}

fn score_key(key: &KnowledgeKey, normalized: &str, query_tokens: &HashSet<String>) -> f64 {
    let key_tokens = tokens(&key.to_string());
    if key_tokens.is_empty() {
        return 0.0;
    }
    let matched = key_tokens
        .iter()
        .filter(|t| query_tokens.contains(*t) || (t.len() >= 3 && normalized.contains(t.as_str())))
        .count();
    matched as f64 / key_tokens.len() as f64
}

/// Picks the best entry for a free-text query. Exact key matches win outright; otherwise
/// keys are scored by how many of their tokens appear in the query, and nothing below
/// `min_score` is returned.
pub fn best_match<'a, I>(text: &str, entries: I, min_score: f64) -> QueryResult
where
    I: IntoIterator<Item = (&'a KnowledgeKey, &'a Value)>,
{
    let normalized = normalize(text);
    let query_tokens: HashSet<String> = tokens(&normalized).into_iter().collect();
    let mut best: Option<KnowledgeMatch> = None;

    for (key, value) in entries {
        if key.to_string() == normalized {
            return QueryResult::Found(KnowledgeMatch {
                key: key.clone(),
                value: value.clone(),
                kind: MatchKind::Exact,
                score: 1.0,
            });
        }

        let score = score_key(key, &normalized, &query_tokens);
        if score <= 0.0 || score < min_score {
            continue;
        }
        // Entries arrive in key order, so ties keep the smallest key.
        if best.as_ref().map_or(true, |b| score > b.score) {
            best = Some(KnowledgeMatch {
                key: key.clone(),
                value: value.clone(),
                kind: MatchKind::Partial,
                score,
            });
        }
    }

    match best {
        Some(found) => QueryResult::Found(found),
        None => QueryResult::NotFound {
            query: text.to_string(),
        },
    }
}
