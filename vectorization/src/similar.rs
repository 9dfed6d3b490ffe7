//! Post-processing of raw similarity matches.

use std::collections::HashMap;

use dreamweaver_vector_store::VectorMatch;
use serde::{Deserialize, Serialize};

/// Number of matches returned when the caller does not say.
pub const DEFAULT_LIMIT: usize = 5;

/// A "dreams like this one" request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityRequest {
    /// Text to compare against.
    pub text: String,

    /// Whose private namespace is searched.
    pub owner_id: String,

    /// Maximum number of matches.
    pub limit: usize,

    /// Also search other users' public dreams.
    pub include_public: bool,

    /// Dream that must not appear in its own results.
    pub exclude_id: Option<String>,
}

impl SimilarityRequest {
    pub fn new(text: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            owner_id: owner_id.into(),
            limit: DEFAULT_LIMIT,
            include_public: false,
            exclude_id: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn including_public(mut self) -> Self {
        self.include_public = true;
        self
    }

    /// Exclude a dream id, typically the dream the text came from.
    pub fn excluding(mut self, dream_id: impl Into<String>) -> Self {
        self.exclude_id = Some(dream_id.into());
        self
    }
}

/// Turn the concatenated user and public matches into a ranked list.
///
/// Drops `exclude_id`, keeps the best-scoring match per id (a user's own
/// public dream matches in both namespaces), sorts by descending score and
/// truncates to `limit`. Equal scores keep their input order.
pub fn rank_matches(
    matches: Vec<VectorMatch>,
    exclude_id: Option<&str>,
    limit: usize,
) -> Vec<VectorMatch> {
    let mut ranked: Vec<VectorMatch> = Vec::with_capacity(matches.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for m in matches {
        if exclude_id == Some(m.id.as_str()) {
            continue;
        }
        match positions.get(&m.id) {
            Some(&pos) => {
                if m.score > ranked[pos].score {
                    ranked[pos] = m;
                }
            }
            None => {
                positions.insert(m.id.clone(), ranked.len());
                ranked.push(m);
            }
        }
    }

    // Stable sort, score descending
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ids(matches: &[VectorMatch]) -> Vec<&str> {
        matches.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn test_merge_sorts_across_namespaces() {
        let raw = vec![
            VectorMatch::new("1", 0.9),
            VectorMatch::new("2", 0.95),
            VectorMatch::new("3", 0.5),
        ];
        assert_eq!(ids(&rank_matches(raw, None, 2)), vec!["2", "1"]);
    }

    #[test]
    fn test_excludes_self() {
        let raw = vec![
            VectorMatch::new("self", 1.0),
            VectorMatch::new("a", 0.8),
            VectorMatch::new("b", 0.7),
        ];
        assert_eq!(ids(&rank_matches(raw, Some("self"), 5)), vec!["a", "b"]);
    }

    #[test]
    fn test_dedupes_keeping_best_score() {
        let raw = vec![
            VectorMatch::new("a", 0.6),
            VectorMatch::new("b", 0.7),
            VectorMatch::new("a", 0.9),
        ];
        let ranked = rank_matches(raw, None, 5);
        assert_eq!(ids(&ranked), vec!["a", "b"]);
        assert_eq!(ranked[0].score, 0.9);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let raw = vec![VectorMatch::new("x", 0.5), VectorMatch::new("y", 0.5)];
        assert_eq!(ids(&rank_matches(raw, None, 5)), vec!["x", "y"]);
    }

    #[test]
    fn test_zero_limit() {
        assert!(rank_matches(vec![VectorMatch::new("a", 0.5)], None, 0).is_empty());
    }

    #[test]
    fn test_request_builder() {
        let request = SimilarityRequest::new("text", "u1")
            .with_limit(3)
            .including_public()
            .excluding("d1");
        assert_eq!(request.limit, 3);
        assert!(request.include_public);
        assert_eq!(request.exclude_id.as_deref(), Some("d1"));
        assert_eq!(SimilarityRequest::new("t", "u").limit, DEFAULT_LIMIT);
    }
}
