//! Progress events of a streamed consultation.
//!
//! [`CouncilEvent`] is the closed set of events the council server emits
//! while it works through the three stages. Event names the client does not
//! know yet decode to [`CouncilEvent::Unknown`] so the protocol can grow
//! without breaking older clients.

use crate::core::error::DomainError;
use crate::council::stage::Stage;
use crate::council::value_objects::{
    CandidateResponse, FinalSynthesis, PeerEvaluation, StageMetadata,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One event of a consultation stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CouncilEvent {
    Stage1Start,
    Stage1Complete {
        data: Vec<CandidateResponse>,
    },
    Stage2Start,
    Stage2Complete {
        data: Vec<PeerEvaluation>,
        #[serde(default)]
        metadata: StageMetadata,
    },
    Stage3Start,
    Stage3Complete {
        data: FinalSynthesis,
    },
    /// Side channel: the server generated a title for the conversation
    TitleComplete {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<TitlePayload>,
    },
    /// Terminal success
    Complete,
    /// Terminal failure reported by the server
    Error {
        #[serde(default = "default_error_message")]
        message: String,
    },
    /// An event name this client does not understand
    #[serde(skip)]
    Unknown { event_type: String },
}

/// Payload of `title_complete`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitlePayload {
    pub title: String,
}

fn default_error_message() -> String {
    "Unknown error".to_string()
}

const KNOWN_EVENTS: [&str; 9] = [
    "stage1_start",
    "stage1_complete",
    "stage2_start",
    "stage2_complete",
    "stage3_start",
    "stage3_complete",
    "title_complete",
    "complete",
    "error",
];

impl CouncilEvent {
    /// Decode one event object (the JSON carried by an SSE `data:` line).
    ///
    /// Unknown `type` values decode to [`CouncilEvent::Unknown`]; a known
    /// type with a malformed payload is an error.
    pub fn from_json(value: Value) -> Result<Self, DomainError> {
        let event_type = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| DomainError::MalformedEvent {
                event: "<untyped>".to_string(),
                reason: "missing string field `type`".to_string(),
            })?
            .to_string();

        if !KNOWN_EVENTS.contains(&event_type.as_str()) {
            return Ok(CouncilEvent::Unknown { event_type });
        }

        serde_json::from_value(value).map_err(|e| DomainError::MalformedEvent {
            event: event_type,
            reason: e.to_string(),
        })
    }

    /// Decode an event from its raw JSON text.
    pub fn from_json_str(raw: &str) -> Result<Self, DomainError> {
        let value: Value = serde_json::from_str(raw).map_err(|e| DomainError::MalformedEvent {
            event: "<unparsed>".to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(value)
    }

    /// Wire name of the event
    pub fn name(&self) -> &str {
        match self {
            CouncilEvent::Stage1Start => "stage1_start",
            CouncilEvent::Stage1Complete { .. } => "stage1_complete",
            CouncilEvent::Stage2Start => "stage2_start",
            CouncilEvent::Stage2Complete { .. } => "stage2_complete",
            CouncilEvent::Stage3Start => "stage3_start",
            CouncilEvent::Stage3Complete { .. } => "stage3_complete",
            CouncilEvent::TitleComplete { .. } => "title_complete",
            CouncilEvent::Complete => "complete",
            CouncilEvent::Error { .. } => "error",
            CouncilEvent::Unknown { event_type } => event_type,
        }
    }

    /// Stage this event belongs to, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            CouncilEvent::Stage1Start | CouncilEvent::Stage1Complete { .. } => Some(Stage::Stage1),
            CouncilEvent::Stage2Start | CouncilEvent::Stage2Complete { .. } => Some(Stage::Stage2),
            CouncilEvent::Stage3Start | CouncilEvent::Stage3Complete { .. } => Some(Stage::Stage3),
            _ => None,
        }
    }

    /// Returns true if this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CouncilEvent::Complete | CouncilEvent::Error { .. })
    }

    /// JSON form used by the transcript logger.
    pub fn to_json(&self) -> Value {
        match self {
            CouncilEvent::Unknown { event_type } => serde_json::json!({ "type": event_type }),
            known => serde_json::to_value(known).unwrap_or(Value::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decodes_stage_start() {
        let event = CouncilEvent::from_json(json!({"type": "stage2_start"})).unwrap();
        assert_eq!(event, CouncilEvent::Stage2Start);
        assert_eq!(event.stage(), Some(Stage::Stage2));
        assert!(!event.is_terminal());
    }

    #[test]
    fn test_decodes_stage2_complete_with_metadata() {
        let event = CouncilEvent::from_json(json!({
            "type": "stage2_complete",
            "data": [{"model": "a/x", "ranking": "Response B > Response A", "parsed_ranking": ["Response B", "Response A"]}],
            "metadata": {
                "label_to_model": {"Response A": "b/y", "Response B": "a/x"},
                "aggregate_rankings": [{"model": "a/x", "average_rank": 1.0, "rankings_count": 1}]
            }
        }))
        .unwrap();
        let CouncilEvent::Stage2Complete { data, metadata } = event else {
            panic!("expected stage2_complete");
        };
        assert_eq!(data.len(), 1);
        assert_eq!(metadata.label_to_model.len(), 2);
        assert_eq!(metadata.aggregate_rankings[0].rankings_count, 1);
    }

    #[test]
    fn test_unknown_event_is_tolerated() {
        let event = CouncilEvent::from_json(json!({"type": "stage4_start", "data": 1})).unwrap();
        assert_eq!(
            event,
            CouncilEvent::Unknown {
                event_type: "stage4_start".to_string()
            }
        );
        assert_eq!(event.name(), "stage4_start");
    }

    #[test]
    fn test_known_event_with_bad_payload_is_error() {
        let err = CouncilEvent::from_json(json!({"type": "stage1_complete", "data": "nope"}))
            .unwrap_err();
        assert!(err.is_protocol());
    }

    #[test]
    fn test_missing_type_is_error() {
        assert!(CouncilEvent::from_json(json!({"data": []})).is_err());
        assert!(CouncilEvent::from_json_str("not json").is_err());
    }

    #[test]
    fn test_error_without_message_gets_default() {
        let event = CouncilEvent::from_json(json!({"type": "error"})).unwrap();
        assert_eq!(
            event,
            CouncilEvent::Error {
                message: "Unknown error".to_string()
            }
        );
        assert!(event.is_terminal());
    }

    #[test]
    fn test_title_complete_payload_is_optional() {
        let bare = CouncilEvent::from_json(json!({"type": "title_complete"})).unwrap();
        assert_eq!(bare, CouncilEvent::TitleComplete { data: None });

        let titled = CouncilEvent::from_json(json!({
            "type": "title_complete",
            "data": {"title": "Rust errors"}
        }))
        .unwrap();
        assert_eq!(
            titled,
            CouncilEvent::TitleComplete {
                data: Some(TitlePayload {
                    title: "Rust errors".to_string()
                })
            }
        );
    }

    #[test]
    fn test_to_json_carries_type() {
        assert_eq!(CouncilEvent::Complete.to_json(), json!({"type": "complete"}));
        let unknown = CouncilEvent::Unknown {
            event_type: "ping".to_string(),
        };
        assert_eq!(unknown.to_json(), json!({"type": "ping"}));
    }
}
