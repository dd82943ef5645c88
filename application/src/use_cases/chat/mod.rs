//! Chat controller
//!
//! Owns the conversation store and the consultation session of the selected
//! conversation. Conversation management lives here; driving a consultation
//! stream lives in [`consult`].

mod consult;

use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::conversation_repository::{ConversationRepository, RepositoryError};
use crate::ports::council_client::{ClientError, CouncilClient, EventStream};
use council_domain::{
    Conversation, ConversationId, ConversationStore, ConsultationPhase, ConsultationSession,
    DomainError,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub use consult::ConsultationOutcome;

/// Errors surfaced by the chat controller
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("No conversation selected")]
    NoConversationSelected,

    #[error("No consultation in flight")]
    NoConsultationInFlight,

    /// The server reported a failure through an `error` event
    #[error("Council failed: {0}")]
    Stream(String),

    #[error("Transport error: {0}")]
    Transport(#[from] ClientError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl ChatError {
    /// Whether the caller invoked an operation in the wrong state.
    pub fn is_precondition(&self) -> bool {
        match self {
            ChatError::NoConversationSelected | ChatError::NoConsultationInFlight => true,
            ChatError::Domain(e) => e.is_precondition(),
            _ => false,
        }
    }
}

/// The stream of the consultation currently in flight
struct InFlight {
    stream: EventStream,
    cancellation: CancellationToken,
}

/// Chat controller managing conversations and consultations
///
/// This controller lives in the application layer and handles:
/// - Conversation management (list, select, create, delete)
/// - Starting, driving, cancelling and regenerating consultations
/// - Recording a transcript through the [`ConversationLogger`] port
///
/// All state is owned; `&mut self` on every mutating operation keeps at most
/// one consultation in flight.
pub struct ChatController<C: CouncilClient + 'static, R: ConversationRepository + 'static> {
    client: Arc<C>,
    repository: Arc<R>,
    store: ConversationStore,
    session: Option<ConsultationSession>,
    in_flight: Option<InFlight>,
    conversation_logger: Arc<dyn ConversationLogger>,
}

impl<C: CouncilClient + 'static, R: ConversationRepository + 'static> ChatController<C, R> {
    pub fn new(client: Arc<C>, repository: Arc<R>) -> Self {
        Self {
            client,
            repository,
            store: ConversationStore::new(),
            session: None,
            in_flight: None,
            conversation_logger: Arc::new(NoConversationLogger),
        }
    }

    /// Set the transcript logger
    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    // ==================== Accessors ====================

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// The selected conversation
    pub fn active(&self) -> Option<&Conversation> {
        self.store.active()
    }

    pub fn selected_id(&self) -> Option<&ConversationId> {
        self.store.selected_id()
    }

    pub fn phase(&self) -> ConsultationPhase {
        self.session
            .as_ref()
            .map(|s| s.phase())
            .unwrap_or(ConsultationPhase::Idle)
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    // ==================== Conversation management ====================

    /// Replace the conversation list with the server's
    pub async fn refresh_conversations(&mut self) -> Result<(), ChatError> {
        let summaries = self.repository.list_conversations().await?;
        info!("Loaded {} conversations", summaries.len());
        self.store.set_summaries(summaries);
        Ok(())
    }

    /// Fetch a conversation's canonical state and select it
    pub async fn select_conversation(&mut self, id: &ConversationId) -> Result<(), ChatError> {
        self.ensure_idle()?;
        let conversation = self.repository.get_conversation(id).await?;
        self.store.load(conversation);
        self.store.select(id)?;
        self.session = Some(ConsultationSession::new(id.clone()));
        info!("Selected conversation {}", id);
        Ok(())
    }

    /// Create a conversation on the server, refresh the list and select it
    pub async fn create_conversation(&mut self) -> Result<ConversationId, ChatError> {
        self.ensure_idle()?;
        let conversation = self.repository.create_conversation().await?;
        let id = conversation.id.clone();
        info!("Created conversation {}", id);
        self.store.load(conversation);
        self.store.select(&id)?;
        self.session = Some(ConsultationSession::new(id.clone()));
        if let Err(e) = self.refresh_conversations().await {
            warn!("Failed to refresh conversation list: {}", e);
        }
        Ok(id)
    }

    /// Delete a conversation.
    ///
    /// On success the conversation is dropped from the list right away. On
    /// failure the list is reloaded from the server and the error returned.
    pub async fn delete_conversation(&mut self, id: &ConversationId) -> Result<(), ChatError> {
        if self.is_in_flight() && self.selected_id() == Some(id) {
            return Err(self.reject(DomainError::ConsultationInFlight.into()));
        }
        match self.repository.delete_conversation(id).await {
            Ok(()) => {
                if self.store.remove_conversation(id) {
                    self.session = None;
                }
                info!("Deleted conversation {}", id);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to delete conversation {}: {}", id, e);
                if let Err(reload) = self.refresh_conversations().await {
                    warn!("Failed to reload conversation list: {}", reload);
                }
                Err(e.into())
            }
        }
    }

    // ==================== Helpers ====================

    fn ensure_idle(&self) -> Result<(), ChatError> {
        if self.is_in_flight() {
            return Err(self.reject(DomainError::ConsultationInFlight.into()));
        }
        Ok(())
    }

    fn require_selection(&self) -> Result<ConversationId, ChatError> {
        self.store
            .selected_id()
            .cloned()
            .ok_or_else(|| self.reject(ChatError::NoConversationSelected))
    }

    /// Log a precondition violation and hand the error back
    fn reject(&self, error: ChatError) -> ChatError {
        error!("Rejected chat operation: {}", error);
        error
    }

    /// Session for `id`; one that belongs to another conversation is dropped
    fn take_session(&mut self, id: &ConversationId) -> ConsultationSession {
        match self.session.take() {
            Some(session) if session.conversation_id() == id => session,
            _ => ConsultationSession::new(id.clone()),
        }
    }

    fn log(&self, event_type: &'static str, payload: serde_json::Value) {
        self.conversation_logger
            .log(ConversationEvent::new(event_type, payload));
    }

    fn log_rollback(&self, id: &ConversationId, reason: &str, error: Option<&ClientError>) {
        self.log(
            "rollback",
            json!({
                "conversation_id": id.as_str(),
                "reason": reason,
                "error": error.map(|e| e.to_string()),
            }),
        );
    }
}
