//! Council value objects - immutable result types carried by stage events.
//!
//! These types mirror what the council server reports for each stage:
//! - [`CandidateResponse`] - one member's independent answer (stage 1)
//! - [`PeerEvaluation`] - one member's ranking of the anonymized answers (stage 2)
//! - [`StageMetadata`] - label mapping and aggregate rankings (stage 2)
//! - [`FinalSynthesis`] - the chairman's final answer (stage 3)
//!
//! Field names match the server's JSON so the types decode directly.

use super::label_map::LabelMap;
use crate::core::model::ModelId;
use serde::{Deserialize, Serialize};

/// Independent answer from one council member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResponse {
    /// The model that answered
    pub model: ModelId,
    /// Raw response text, possibly embedding a reasoning segment
    pub response: String,
}

impl CandidateResponse {
    pub fn new(model: ModelId, response: impl Into<String>) -> Self {
        Self {
            model,
            response: response.into(),
        }
    }
}

/// Blind peer ranking produced by one council member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerEvaluation {
    /// The evaluating model
    pub model: ModelId,
    /// Raw ranking text referring to peers by anonymized labels
    pub ranking: String,
    /// Labels in ranked order, as extracted by the server
    #[serde(default)]
    pub parsed_ranking: Vec<String>,
}

impl PeerEvaluation {
    pub fn new(model: ModelId, ranking: impl Into<String>) -> Self {
        Self {
            model,
            ranking: ranking.into(),
            parsed_ranking: Vec::new(),
        }
    }

    pub fn with_parsed_ranking(mut self, labels: Vec<String>) -> Self {
        self.parsed_ranking = labels;
        self
    }
}

/// Average position of one model across all peer evaluations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRanking {
    pub model: ModelId,
    pub average_rank: f64,
    pub rankings_count: u32,
}

/// Data attached to an assistant turn when stage 2 completes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageMetadata {
    #[serde(default)]
    pub label_to_model: LabelMap,
    /// Rendered in the order supplied, never re-sorted
    #[serde(default)]
    pub aggregate_rankings: Vec<AggregateRanking>,
}

/// Final answer synthesized by the chairman
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalSynthesis {
    /// The chairman model
    pub model: ModelId,
    /// Synthesized answer, possibly embedding a reasoning segment
    #[serde(default)]
    pub response: String,
}

impl FinalSynthesis {
    pub fn new(model: ModelId, response: impl Into<String>) -> Self {
        Self {
            model,
            response: response.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage2_payload_decodes() {
        let json = r#"{
            "model": "a/x",
            "ranking": "Response B is best.\nFINAL RANKING:\n1. Response B\n2. Response A",
            "parsed_ranking": ["Response B", "Response A"]
        }"#;
        let evaluation: PeerEvaluation = serde_json::from_str(json).unwrap();
        assert_eq!(evaluation.model.as_str(), "a/x");
        assert_eq!(evaluation.parsed_ranking, vec!["Response B", "Response A"]);
    }

    #[test]
    fn test_parsed_ranking_defaults_to_empty() {
        let evaluation: PeerEvaluation =
            serde_json::from_str(r#"{"model": "a/x", "ranking": "text"}"#).unwrap();
        assert!(evaluation.parsed_ranking.is_empty());
    }

    #[test]
    fn test_metadata_keeps_aggregate_order() {
        let json = r#"{
            "label_to_model": {"Response A": "b/y", "Response B": "a/x"},
            "aggregate_rankings": [
                {"model": "b/y", "average_rank": 1.5, "rankings_count": 2},
                {"model": "a/x", "average_rank": 2.0, "rankings_count": 2}
            ]
        }"#;
        let metadata: StageMetadata = serde_json::from_str(json).unwrap();
        let order: Vec<_> = metadata
            .aggregate_rankings
            .iter()
            .map(|r| r.model.as_str())
            .collect();
        assert_eq!(order, vec!["b/y", "a/x"]);
    }
}
