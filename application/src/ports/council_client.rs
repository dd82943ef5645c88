//! Council client port
//!
//! Defines the boundary to the server that runs consultations and streams
//! their progress back.

use async_trait::async_trait;
use council_domain::{ConversationId, CouncilEvent, DomainError};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Errors that can occur while a consultation stream is open
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Server returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Consultation cancelled")]
    Cancelled,

    #[error("Event stream closed before a terminal event")]
    StreamClosed,
}

impl ClientError {
    /// Whether the failure was caused by the caller cancelling
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClientError::Cancelled)
    }
}

impl From<DomainError> for ClientError {
    fn from(error: DomainError) -> Self {
        ClientError::Protocol(error.to_string())
    }
}

/// Ordered events of one consultation.
///
/// Wraps an `mpsc::Receiver`; the adapter feeding it stops on the first
/// error or when the cancellation token fires.
pub struct EventStream {
    pub receiver: mpsc::Receiver<Result<CouncilEvent, ClientError>>,
}

impl EventStream {
    pub fn new(receiver: mpsc::Receiver<Result<CouncilEvent, ClientError>>) -> Self {
        Self { receiver }
    }

    /// Build a stream that yields the given items and then closes.
    ///
    /// Used by in-memory clients; the channel is sized to hold every item.
    pub fn from_items(items: Vec<Result<CouncilEvent, ClientError>>) -> Self {
        let (tx, rx) = mpsc::channel(items.len().max(1));
        for item in items {
            // Capacity covers every item, so this never fails
            let _ = tx.try_send(item);
        }
        Self::new(rx)
    }

    /// Next item, or `None` once the producer is gone
    pub async fn next(&mut self) -> Option<Result<CouncilEvent, ClientError>> {
        self.receiver.recv().await
    }
}

/// Client for the council consultation endpoint
///
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait CouncilClient: Send + Sync {
    /// Submit `content` to a conversation and stream the consultation.
    ///
    /// Cancelling `cancellation` aborts the request; the stream then ends
    /// with [`ClientError::Cancelled`] or simply closes.
    async fn open(
        &self,
        conversation_id: &ConversationId,
        content: &str,
        cancellation: CancellationToken,
    ) -> Result<EventStream, ClientError>;
}
