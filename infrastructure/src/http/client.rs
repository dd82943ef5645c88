//! HTTP adapter for the council server
//!
//! One [`HttpCouncilClient`] implements every server-facing port: the
//! streaming consultation endpoint, the conversation store and the council
//! settings.

use super::error::{check_status, client_error, error_body, repository_error};
use super::sse::SseDecoder;
use async_trait::async_trait;
use council_application::{
    ClientError, ConversationRepository, CouncilClient, CouncilSettings, CouncilSettingsPort,
    EventStream, HealthStatus, RepositoryError, SettingsUpdate,
};
use council_domain::{Conversation, ConversationId, ConversationSummary, CouncilEvent, ModelId};
use futures::StreamExt;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Events buffered between the body reader and the controller
const EVENT_BUFFER: usize = 64;

type EventSender = mpsc::Sender<Result<CouncilEvent, ClientError>>;

/// `GET /api/config` response
#[derive(Debug, Deserialize)]
struct ConfigResponse {
    config: ServerCouncilConfig,
    #[serde(default)]
    available_providers: Vec<String>,
}

/// `POST /api/config` response
#[derive(Debug, Deserialize)]
struct UpdateResponse {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    message: String,
    config: ServerCouncilConfig,
}

fn default_success() -> bool {
    true
}

/// Council part of the server configuration; other keys are ignored
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServerCouncilConfig {
    council_models: Vec<ModelId>,
    chairman_model: Option<ModelId>,
}

impl ServerCouncilConfig {
    fn into_settings(self, available_providers: Vec<String>) -> CouncilSettings {
        CouncilSettings {
            council_models: self.council_models,
            // The server reports an unset chairman as an empty string
            chairman_model: self
                .chairman_model
                .filter(|m| !m.as_str().trim().is_empty()),
            available_providers,
        }
    }
}

/// Council server client over HTTP + server-sent events
pub struct HttpCouncilClient {
    http: reqwest::Client,
    base_url: String,
    /// Applies to every call except the consultation stream
    request_timeout: Duration,
}

impl HttpCouncilClient {
    pub fn new(
        base_url: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(request_timeout)
            .build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        info!("Council server: {}", base_url);
        Ok(Self {
            http,
            base_url,
            request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn conversation_url(&self, id: &ConversationId) -> String {
        self.url(&format!("/api/conversations/{}", id.as_str()))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: String,
        resource: &str,
    ) -> Result<T, RepositoryError> {
        debug!("GET {}", url);
        let response = self
            .http
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(repository_error)?;
        let response = check_status(response, resource).await?;
        response.json().await.map_err(repository_error)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        url: String,
        body: serde_json::Value,
        resource: &str,
    ) -> Result<T, RepositoryError> {
        debug!("POST {}", url);
        let response = self
            .http
            .post(&url)
            .timeout(self.request_timeout)
            .json(&body)
            .send()
            .await
            .map_err(repository_error)?;
        let response = check_status(response, resource).await?;
        response.json().await.map_err(repository_error)
    }
}

#[async_trait]
impl CouncilClient for HttpCouncilClient {
    async fn open(
        &self,
        conversation_id: &ConversationId,
        content: &str,
        cancellation: CancellationToken,
    ) -> Result<EventStream, ClientError> {
        let url = format!("{}/message/stream", self.conversation_url(conversation_id));
        debug!("POST {}", url);
        let request = self
            .http
            .post(&url)
            .header(ACCEPT, "text/event-stream")
            .json(&json!({ "content": content }))
            .send();

        let response = tokio::select! {
            biased;
            _ = cancellation.cancelled() => return Err(ClientError::Cancelled),
            result = request => result.map_err(client_error)?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            return Err(ClientError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(pump_events(response, tx, cancellation));
        Ok(EventStream::new(rx))
    }
}

/// Read the response body, decode its events and forward them until a
/// terminal event, an error or cancellation.
async fn pump_events(
    response: reqwest::Response,
    tx: EventSender,
    cancellation: CancellationToken,
) {
    let mut body = response.bytes_stream();
    let mut decoder = SseDecoder::new();

    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancellation.cancelled() => {
                debug!("Consultation stream cancelled");
                let _ = tx.send(Err(ClientError::Cancelled)).await;
                return;
            }
            chunk = body.next() => chunk,
        };

        match chunk {
            Some(Ok(bytes)) => {
                for payload in decoder.push(&bytes) {
                    if !forward(&tx, &payload).await {
                        return;
                    }
                }
            }
            Some(Err(e)) => {
                warn!("Consultation stream failed: {}", e);
                let _ = tx.send(Err(ClientError::Connection(e.to_string()))).await;
                return;
            }
            None => break,
        }
    }

    if let Some(payload) = decoder.finish() {
        forward(&tx, &payload).await;
    }
    // Dropping `tx` closes the stream; the controller treats a close without
    // a terminal event as a transport failure.
}

/// Decode and send one payload. Returns whether pumping should continue.
async fn forward(tx: &EventSender, payload: &str) -> bool {
    match CouncilEvent::from_json_str(payload) {
        Ok(event) => {
            let terminal = event.is_terminal();
            tx.send(Ok(event)).await.is_ok() && !terminal
        }
        Err(e) => {
            warn!("Undecodable council event: {}", e);
            let _ = tx.send(Err(e.into())).await;
            false
        }
    }
}

#[async_trait]
impl ConversationRepository for HttpCouncilClient {
    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, RepositoryError> {
        self.get_json(self.url("/api/conversations"), "conversations")
            .await
    }

    async fn get_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<Conversation, RepositoryError> {
        self.get_json(self.conversation_url(id), id.as_str()).await
    }

    async fn create_conversation(&self) -> Result<Conversation, RepositoryError> {
        let conversation: Conversation = self
            .post_json(self.url("/api/conversations"), json!({}), "conversations")
            .await?;
        info!("Created conversation {}", conversation.id);
        Ok(conversation)
    }

    async fn delete_conversation(&self, id: &ConversationId) -> Result<(), RepositoryError> {
        let url = self.conversation_url(id);
        debug!("DELETE {}", url);
        let response = self
            .http
            .delete(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(repository_error)?;
        check_status(response, id.as_str()).await?;
        Ok(())
    }
}

#[async_trait]
impl CouncilSettingsPort for HttpCouncilClient {
    async fn get_settings(&self) -> Result<CouncilSettings, RepositoryError> {
        let response: ConfigResponse = self.get_json(self.url("/api/config"), "config").await?;
        Ok(response.config.into_settings(response.available_providers))
    }

    async fn update_settings(
        &self,
        update: &SettingsUpdate,
    ) -> Result<CouncilSettings, RepositoryError> {
        let body =
            serde_json::to_value(update).map_err(|e| RepositoryError::Request(e.to_string()))?;
        let response: UpdateResponse = self
            .post_json(self.url("/api/config"), body, "config")
            .await?;
        if !response.success {
            return Err(RepositoryError::Request(response.message));
        }
        // The update response does not repeat the provider list
        Ok(response.config.into_settings(Vec::new()))
    }

    async fn health(&self) -> Result<HealthStatus, RepositoryError> {
        self.get_json(self.url("/"), "health").await
    }
}
