//! Conversation repository port
//!
//! The server owns conversation persistence; this port lists, fetches,
//! creates and deletes conversations on its behalf.

use async_trait::async_trait;
use council_domain::{Conversation, ConversationId, ConversationSummary};
use thiserror::Error;

/// Errors from repository and settings calls
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    #[error("Conversation not found: {0}")]
    NotFound(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Summaries of every conversation, in server order
    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, RepositoryError>;

    /// Canonical state of one conversation
    async fn get_conversation(&self, id: &ConversationId)
    -> Result<Conversation, RepositoryError>;

    async fn create_conversation(&self) -> Result<Conversation, RepositoryError>;

    async fn delete_conversation(&self, id: &ConversationId) -> Result<(), RepositoryError>;
}
