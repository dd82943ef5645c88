//! Application layer for llm-council
//!
//! This crate contains use cases and port definitions.
//! It depends only on the domain layer.

pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use ports::{
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    conversation_repository::{ConversationRepository, RepositoryError},
    council_client::{ClientError, CouncilClient, EventStream},
    council_settings::{CouncilSettings, CouncilSettingsPort, HealthStatus, SettingsUpdate},
    progress::{ConsultationObserver, NoProgress},
};
pub use use_cases::chat::{ChatController, ChatError, ConsultationOutcome};
pub use use_cases::manage_council::{ManageCouncilError, ManageCouncilUseCase};
