// Matcher module: scores the query against extracted facts.

pub mod fuzzy;

use crate::config::MatchConfig;
use crate::model::{Fact, IdentifierType};
use crate::normalizer::{normalize_identifier, normalize_name};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    Exact,
    Fuzzy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scorer {
    TokenSet,
    Partial,
    Ratio,
}

/// A fact that reached the threshold, with its score in percent.
#[derive(Debug, Clone, Copy)]
pub struct ScoredFact<'a> {
    pub fact: &'a Fact,
    pub score: f64,
    pub exact: bool,
}

/// Query prepared once per screening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreparedQuery {
    Name(String),
    Identifier(String),
}

impl PreparedQuery {
    pub fn new(identifier: &str, identifier_type: IdentifierType) -> Self {
        if identifier_type.is_name() {
            PreparedQuery::Name(normalize_name(identifier))
        } else {
            PreparedQuery::Identifier(normalize_identifier(identifier))
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            PreparedQuery::Name(s) | PreparedQuery::Identifier(s) => s.is_empty(),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PreparedQuery::Name(s) | PreparedQuery::Identifier(s) => s,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NameMatcher {
    mode: MatchMode,
    scorer: Scorer,
    threshold: f64,
}

impl NameMatcher {
    pub fn new(config: &MatchConfig) -> Self {
        Self {
            mode: config.mode,
            scorer: config.scorer,
            threshold: config.threshold,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Returns a copy of this matcher using `mode` instead of the configured one.
    pub fn with_mode(&self, mode: MatchMode) -> Self {
        Self {
            mode,
            ..self.clone()
        }
    }

    /// Score of two normalized names.
    pub fn score(&self, query: &str, candidate: &str) -> f64 {
        if query.is_empty() || candidate.is_empty() {
            return 0.0;
        }
        if query == candidate {
            return 100.0;
        }
        match self.mode {
            MatchMode::Exact => 0.0,
            // A lone token on either side would hit every name sharing it under
            // token-set or partial scoring.
            MatchMode::Fuzzy if !query.contains(' ') || !candidate.contains(' ') => {
                fuzzy::ratio(query, candidate)
            }
            MatchMode::Fuzzy => match self.scorer {
                Scorer::TokenSet => fuzzy::token_set_ratio(query, candidate),
                Scorer::Partial => fuzzy::partial_ratio(query, candidate),
                Scorer::Ratio => fuzzy::ratio(query, candidate),
            },
        }
    }

    /// All facts at or above the threshold, best first.
    pub fn find_matches<'a>(&self, query: &PreparedQuery, facts: &'a [Fact]) -> Vec<ScoredFact<'a>> {
        let mut hits: Vec<ScoredFact<'a>> = facts
            .iter()
            .filter_map(|fact| {
                let (score, exact) = match query {
                    PreparedQuery::Name(q) => {
                        let score = self.score(q, &fact.normalized_name);
                        (score, q == &fact.normalized_name)
                    }
                    PreparedQuery::Identifier(id) => {
                        let found = !id.is_empty() && fact.identifiers.iter().any(|f| f == id);
                        (if found { 100.0 } else { 0.0 }, found)
                    }
                };
                if score >= self.threshold {
                    debug!("match '{}' -> '{}' ({:.1})", query.as_str(), fact.name, score);
                    Some(ScoredFact { fact, score, exact })
                } else {
                    None
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits
    }
}
