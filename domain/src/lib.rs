//! Domain layer for llm-council
//!
//! This crate contains the core business logic, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Council
//!
//! A council consultation runs one question through three stages on the
//! server:
//!
//! - **Stage 1**: every council model answers independently
//! - **Stage 2**: every model ranks the anonymized answers of its peers
//! - **Stage 3**: the chairman model synthesizes the final answer
//!
//! ## Consultation
//!
//! The client observes a consultation as a stream of [`CouncilEvent`]s and
//! folds them into the trailing assistant turn of a [`Conversation`] through
//! the [`ConsultationSession`] state machine.

pub mod config;
pub mod consultation;
pub mod conversation;
pub mod core;
pub mod council;
pub mod text;

// Re-export commonly used types
pub use config::OutputFormat;
pub use consultation::{
    event::{CouncilEvent, TitlePayload},
    machine::{ConsultationEffect, ConsultationPhase, ConsultationSession},
};
pub use conversation::{
    command::{StageField, TurnCommand},
    entities::{
        Conversation, ConversationId, ConversationSummary, PartialResult, StageLoading, Turn,
    },
    store::ConversationStore,
};
pub use core::{
    error::DomainError,
    model::{ModelId, short_model_name},
};
pub use council::{
    label_map::LabelMap,
    stage::Stage,
    value_objects::{
        AggregateRanking, CandidateResponse, FinalSynthesis, PeerEvaluation, StageMetadata,
    },
};
pub use text::{
    labels::{resolve_label, resolve_peer_labels},
    reasoning::{ReasoningSplit, extract_reasoning},
};
