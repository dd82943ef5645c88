//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid conversation id: {0:?}")]
    InvalidConversationId(String),

    #[error("Invalid model identifier: {0:?}")]
    InvalidModel(String),

    #[error("Unknown conversation: {0}")]
    UnknownConversation(String),

    #[error("Conversation has no assistant placeholder to update")]
    NoPlaceholder,

    #[error("Cannot drop {requested} turns, conversation only has {available}")]
    NotEnoughTurns { requested: usize, available: usize },

    #[error("A consultation is already in flight for this conversation")]
    ConsultationInFlight,

    #[error("Nothing to regenerate: the conversation does not end with a user turn")]
    NothingToRegenerate,

    #[error("Malformed event payload for {event}: {reason}")]
    MalformedEvent { event: String, reason: String },
}

impl DomainError {
    /// Whether this error comes from decoding the event protocol.
    pub fn is_protocol(&self) -> bool {
        matches!(self, DomainError::MalformedEvent { .. })
    }

    /// Whether this error is a caller violating an operation's precondition.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            DomainError::ConsultationInFlight | DomainError::NothingToRegenerate
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_enough_turns_display() {
        let error = DomainError::NotEnoughTurns {
            requested: 2,
            available: 1,
        };
        assert_eq!(
            error.to_string(),
            "Cannot drop 2 turns, conversation only has 1"
        );
    }

    #[test]
    fn test_is_protocol_check() {
        let malformed = DomainError::MalformedEvent {
            event: "stage1_complete".to_string(),
            reason: "missing field `data`".to_string(),
        };
        assert!(malformed.is_protocol());
        assert!(!DomainError::NoPlaceholder.is_protocol());
    }

    #[test]
    fn test_is_precondition_check() {
        assert!(DomainError::ConsultationInFlight.is_precondition());
        assert!(DomainError::NothingToRegenerate.is_precondition());
        assert!(!DomainError::NoPlaceholder.is_precondition());
    }
}
