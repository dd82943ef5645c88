//! Consultation driving: start, drive, cancel, regenerate.

use super::{ChatController, ChatError, InFlight};
use crate::ports::conversation_logger::ConversationEvent;
use crate::ports::conversation_repository::{ConversationRepository, RepositoryError};
use crate::ports::council_client::{ClientError, CouncilClient};
use crate::ports::progress::ConsultationObserver;
use council_domain::{ConsultationEffect, Conversation, ConversationId, CouncilEvent};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How a consultation ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsultationOutcome {
    Completed,
    Cancelled,
}

/// What the drive loop does after one stream item
enum Step {
    Continue,
    Done(Result<ConsultationOutcome, ChatError>),
}

impl<C: CouncilClient + 'static, R: ConversationRepository + 'static> ChatController<C, R> {
    /// Submit `text` to the selected conversation and drive the consultation
    /// to its end.
    ///
    /// Cancelling `cancellation` from another task rolls the consultation
    /// back and returns [`ConsultationOutcome::Cancelled`]. An `error` event
    /// is returned as [`ChatError::Stream`], a broken stream as
    /// [`ChatError::Transport`].
    pub async fn send_message(
        &mut self,
        text: &str,
        cancellation: CancellationToken,
        observer: &dyn ConsultationObserver,
    ) -> Result<ConsultationOutcome, ChatError> {
        match self.start(text, cancellation).await {
            Ok(()) => self.drive(observer).await,
            Err(ChatError::Transport(e)) if e.is_cancelled() => Ok(ConsultationOutcome::Cancelled),
            Err(e) => Err(e),
        }
    }

    /// Replay the unanswered trailing user turn and drive it to its end.
    pub async fn regenerate(
        &mut self,
        cancellation: CancellationToken,
        observer: &dyn ConsultationObserver,
    ) -> Result<ConsultationOutcome, ChatError> {
        match self.start_regenerate(cancellation).await {
            Ok(()) => self.drive(observer).await,
            Err(ChatError::Transport(e)) if e.is_cancelled() => Ok(ConsultationOutcome::Cancelled),
            Err(e) => Err(e),
        }
    }

    /// Append the user turn and placeholder, then open the stream.
    ///
    /// The consultation stays in flight until [`drive`](Self::drive) or
    /// [`cancel`](Self::cancel) ends it.
    pub async fn start(
        &mut self,
        text: &str,
        cancellation: CancellationToken,
    ) -> Result<(), ChatError> {
        let id = self.require_selection()?;
        self.ensure_idle()?;
        let mut session = self.take_session(&id);
        let started = session.start(&mut self.store, text);
        self.session = Some(session);
        if let Err(e) = started {
            return Err(self.reject(e.into()));
        }
        self.log(
            "user_message",
            json!({ "conversation_id": id.as_str(), "content": text, "regenerate": false }),
        );
        self.open(&id, text, cancellation).await
    }

    /// Append a placeholder for the trailing user turn and re-open the
    /// stream with the last submitted text.
    pub async fn start_regenerate(&mut self, cancellation: CancellationToken) -> Result<(), ChatError> {
        let id = self.require_selection()?;
        self.ensure_idle()?;
        let mut session = self.take_session(&id);
        let regenerated = session.regenerate(&mut self.store);
        self.session = Some(session);
        let text = match regenerated {
            Ok(text) => text,
            Err(e) => return Err(self.reject(e.into())),
        };
        self.log(
            "user_message",
            json!({ "conversation_id": id.as_str(), "content": text, "regenerate": true }),
        );
        self.open(&id, &text, cancellation).await
    }

    /// Apply stream events until the consultation ends.
    pub async fn drive(
        &mut self,
        observer: &dyn ConsultationObserver,
    ) -> Result<ConsultationOutcome, ChatError> {
        let Some(mut in_flight) = self.in_flight.take() else {
            return Err(self.reject(ChatError::NoConsultationInFlight));
        };

        let result = loop {
            let next = tokio::select! {
                biased;
                _ = in_flight.cancellation.cancelled() => None,
                item = in_flight.stream.next() => Some(item),
            };

            let step = match next {
                None => {
                    self.roll_back_cancelled(observer);
                    Step::Done(Ok(ConsultationOutcome::Cancelled))
                }
                Some(Some(Ok(event))) => self.apply(event, observer).await,
                Some(Some(Err(e))) => self.fail_transport(e, observer),
                Some(None) => self.fail_transport(ClientError::StreamClosed, observer),
            };

            if let Step::Done(result) = step {
                break result;
            }
        };

        if let Some(session) = self.session.as_mut() {
            session.settle();
        }
        observer.on_finished();
        result
    }

    /// Cancel the consultation in flight.
    ///
    /// Signals the stream's cancellation token and drops the placeholder
    /// right away; the user turn stays for [`regenerate`](Self::regenerate).
    /// Returns `false` when nothing was in flight.
    pub fn cancel(&mut self) -> bool {
        let Some(in_flight) = self.in_flight.take() else {
            debug!("Cancel requested with no consultation in flight");
            return false;
        };
        in_flight.cancellation.cancel();
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let rolled_back = session.cancel(&mut self.store);
        session.settle();
        let id = session.conversation_id().clone();
        self.log_rollback(&id, "cancelled", None);
        rolled_back
    }

    // ==================== Helpers ====================

    async fn open(
        &mut self,
        id: &ConversationId,
        text: &str,
        cancellation: CancellationToken,
    ) -> Result<(), ChatError> {
        match self.client.open(id, text, cancellation.clone()).await {
            Ok(stream) => {
                debug!("Consultation stream opened for {}", id);
                self.in_flight = Some(InFlight {
                    stream,
                    cancellation,
                });
                Ok(())
            }
            Err(e) => {
                self.roll_back_transport(id, &e);
                if let Some(session) = self.session.as_mut() {
                    session.settle();
                }
                Err(e.into())
            }
        }
    }

    async fn apply(&mut self, event: CouncilEvent, observer: &dyn ConsultationObserver) -> Step {
        let Some(session) = self.session.as_mut() else {
            warn!("Dropping {} with no consultation session", event.name());
            return Step::Continue;
        };
        let id = session.conversation_id().clone();

        self.conversation_logger.log(ConversationEvent::new(
            "council_event",
            json!({ "conversation_id": id.as_str(), "event": event.to_json() }),
        ));

        let stage = event.stage();
        let is_stage_start = matches!(
            event,
            CouncilEvent::Stage1Start | CouncilEvent::Stage2Start | CouncilEvent::Stage3Start
        );
        let is_title = matches!(event, CouncilEvent::TitleComplete { .. });

        let effects = session.apply_event(&mut self.store, event);

        if let Some(stage) = stage {
            if is_stage_start {
                observer.on_stage_start(stage);
            } else if let Some(result) = self.store.conversation(&id).and_then(|c| c.placeholder())
            {
                observer.on_stage_complete(stage, result);
            }
        }
        if is_title && let Some(conversation) = self.store.conversation(&id) {
            observer.on_title(&id, &conversation.title);
        }

        self.run_effects(effects).await
    }

    async fn run_effects(&mut self, effects: Vec<ConsultationEffect>) -> Step {
        let mut refresh = false;
        let mut reload = None;
        let mut outcome = None;
        for effect in effects {
            match effect {
                ConsultationEffect::RefreshConversations => refresh = true,
                ConsultationEffect::ReloadConversation(id) => reload = Some(id),
                ConsultationEffect::Completed => outcome = Some(Ok(ConsultationOutcome::Completed)),
                ConsultationEffect::Failed(message) => {
                    outcome = Some(Err(ChatError::Stream(message)));
                }
            }
        }

        match (refresh, reload) {
            (true, Some(id)) => {
                let repository = self.repository.clone();
                let (list, conversation) = futures::join!(
                    repository.list_conversations(),
                    repository.get_conversation(&id)
                );
                match list {
                    Ok(summaries) => self.store.set_summaries(summaries),
                    Err(e) => warn!("Failed to refresh conversation list: {}", e),
                }
                self.replace_with_canonical(&id, conversation);
            }
            (false, Some(id)) => {
                let conversation = self.repository.get_conversation(&id).await;
                self.replace_with_canonical(&id, conversation);
            }
            (true, None) => {
                if let Err(e) = self.refresh_conversations().await {
                    warn!("Failed to refresh conversation list: {}", e);
                }
            }
            (false, None) => {}
        }

        match outcome {
            Some(result) => {
                if let Err(ChatError::Stream(message)) = &result
                    && let Some(session) = self.session.as_ref()
                {
                    self.log(
                        "consultation_failed",
                        json!({
                            "conversation_id": session.conversation_id().as_str(),
                            "message": message,
                        }),
                    );
                }
                Step::Done(result)
            }
            None => Step::Continue,
        }
    }

    fn replace_with_canonical(
        &mut self,
        id: &ConversationId,
        fetched: Result<Conversation, RepositoryError>,
    ) {
        let conversation = match fetched {
            Ok(conversation) => conversation,
            Err(e) => {
                warn!("Keeping local state of {}; reload failed: {}", id, e);
                return;
            }
        };
        let title = conversation.title;
        if let Err(e) = self.store.replace_turns(id, conversation.turns) {
            warn!("Failed to replace turns of {}: {}", id, e);
            return;
        }
        if !title.is_empty() {
            self.store.set_title(id, title);
        }
        info!("Conversation {} synchronized with server state", id);
    }

    fn roll_back_cancelled(&mut self, observer: &dyn ConsultationObserver) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.cancel(&mut self.store) {
            let id = session.conversation_id().clone();
            self.log_rollback(&id, "cancelled", None);
            observer.on_cancelled();
        }
    }

    fn fail_transport(&mut self, error: ClientError, observer: &dyn ConsultationObserver) -> Step {
        if error.is_cancelled() {
            self.roll_back_cancelled(observer);
            return Step::Done(Ok(ConsultationOutcome::Cancelled));
        }
        if let Some(id) = self.session.as_ref().map(|s| s.conversation_id().clone()) {
            self.roll_back_transport(&id, &error);
        }
        Step::Done(Err(ChatError::Transport(error)))
    }

    fn roll_back_transport(&mut self, id: &ConversationId, error: &ClientError) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let cancelled = error.is_cancelled();
        if session.transport_failed(&mut self.store, cancelled) || cancelled {
            let reason = if cancelled { "cancelled" } else { "transport" };
            self.log_rollback(id, reason, Some(error));
        }
    }
}
