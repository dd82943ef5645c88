//! Consultation state machine.
//!
//! A [`ConsultationSession`] belongs to one conversation and drives one
//! consultation at a time through its stages:
//!
//! ```text
//! Idle -> Stage1Pending -> Stage1Done -> Stage2Pending -> Stage2Done
//!      -> Stage3Pending -> Stage3Done -> Finalizing -> Idle
//! ```
//!
//! `Cancelled` and `Failed` are reachable from every stage phase and settle
//! back to `Idle`. The session never performs I/O: it mutates the
//! [`ConversationStore`] through [`TurnCommand`]s and reports the follow-up
//! work the caller has to do as [`ConsultationEffect`]s.
//!
//! # Rollback rules
//!
//! | trigger | turns removed |
//! |---|---|
//! | [`cancel`](ConsultationSession::cancel) | placeholder only, user turn kept for regeneration |
//! | [`transport_failed`](ConsultationSession::transport_failed) | placeholder and user turn |
//! | `error` event | nothing, partial results stay visible |

use super::event::CouncilEvent;
use crate::conversation::command::{StageField, TurnCommand};
use crate::conversation::entities::{ConversationId, Turn};
use crate::conversation::store::ConversationStore;
use crate::core::error::DomainError;
use crate::council::stage::Stage;
use crate::council::value_objects::StageMetadata;
use tracing::{debug, info, warn};

/// Where a consultation currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsultationPhase {
    Idle,
    Stage1Pending,
    Stage1Done,
    Stage2Pending,
    Stage2Done,
    Stage3Pending,
    Stage3Done,
    /// `complete` received, canonical state is being fetched
    Finalizing,
    Cancelled,
    Failed,
}

impl ConsultationPhase {
    /// A consultation owns the conversation's trailing placeholder.
    pub fn is_in_flight(&self) -> bool {
        !matches!(
            self,
            ConsultationPhase::Idle | ConsultationPhase::Cancelled | ConsultationPhase::Failed
        )
    }

    /// Stream events are only applied while a stage phase is active.
    pub fn accepts_events(&self) -> bool {
        self.stage().is_some()
    }

    /// Stage the phase belongs to
    pub fn stage(&self) -> Option<Stage> {
        match self {
            ConsultationPhase::Stage1Pending | ConsultationPhase::Stage1Done => Some(Stage::Stage1),
            ConsultationPhase::Stage2Pending | ConsultationPhase::Stage2Done => Some(Stage::Stage2),
            ConsultationPhase::Stage3Pending | ConsultationPhase::Stage3Done => Some(Stage::Stage3),
            _ => None,
        }
    }

    fn pending(stage: Stage) -> Self {
        match stage {
            Stage::Stage1 => ConsultationPhase::Stage1Pending,
            Stage::Stage2 => ConsultationPhase::Stage2Pending,
            Stage::Stage3 => ConsultationPhase::Stage3Pending,
        }
    }

    fn done(stage: Stage) -> Self {
        match stage {
            Stage::Stage1 => ConsultationPhase::Stage1Done,
            Stage::Stage2 => ConsultationPhase::Stage2Done,
            Stage::Stage3 => ConsultationPhase::Stage3Done,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultationPhase::Idle => "idle",
            ConsultationPhase::Stage1Pending => "stage1_pending",
            ConsultationPhase::Stage1Done => "stage1_done",
            ConsultationPhase::Stage2Pending => "stage2_pending",
            ConsultationPhase::Stage2Done => "stage2_done",
            ConsultationPhase::Stage3Pending => "stage3_pending",
            ConsultationPhase::Stage3Done => "stage3_done",
            ConsultationPhase::Finalizing => "finalizing",
            ConsultationPhase::Cancelled => "cancelled",
            ConsultationPhase::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ConsultationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Follow-up work requested by the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum ConsultationEffect {
    /// Re-fetch the conversation list
    RefreshConversations,
    /// Re-fetch one conversation and replace its local turns
    ReloadConversation(ConversationId),
    /// The consultation finished successfully
    Completed,
    /// The server reported a failure; surface the message to the user
    Failed(String),
}

/// Consultation state of one conversation
#[derive(Debug, Clone)]
pub struct ConsultationSession {
    conversation_id: ConversationId,
    phase: ConsultationPhase,
    last_submitted_text: Option<String>,
}

impl ConsultationSession {
    pub fn new(conversation_id: ConversationId) -> Self {
        Self {
            conversation_id,
            phase: ConsultationPhase::Idle,
            last_submitted_text: None,
        }
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    pub fn phase(&self) -> ConsultationPhase {
        self.phase
    }

    pub fn is_in_flight(&self) -> bool {
        self.phase.is_in_flight()
    }

    /// Text of the most recent `start` or `regenerate`
    pub fn last_submitted_text(&self) -> Option<&str> {
        self.last_submitted_text.as_deref()
    }

    // ==================== Operations ====================

    /// Append the user turn and an empty placeholder, then move to
    /// `Stage1Pending`. The caller opens the stream right after.
    pub fn start(&mut self, store: &mut ConversationStore, text: &str) -> Result<(), DomainError> {
        if self.is_in_flight() {
            return Err(DomainError::ConsultationInFlight);
        }
        store.append_turn(&self.conversation_id, Turn::user(text))?;
        store.append_turn(&self.conversation_id, Turn::placeholder())?;
        self.last_submitted_text = Some(text.to_string());
        self.phase = ConsultationPhase::Stage1Pending;
        info!("Consultation started in conversation {}", self.conversation_id);
        Ok(())
    }

    /// Prepare a replay of the unanswered trailing user turn.
    ///
    /// Appends only a placeholder (never a second user turn) and returns
    /// the trailing user turn's text, which is what gets sent.
    pub fn regenerate(&mut self, store: &mut ConversationStore) -> Result<String, DomainError> {
        if self.is_in_flight() {
            return Err(DomainError::ConsultationInFlight);
        }
        let conversation = store
            .conversation(&self.conversation_id)
            .ok_or_else(|| DomainError::UnknownConversation(self.conversation_id.to_string()))?;
        let trailing = conversation
            .trailing_user_text()
            .ok_or(DomainError::NothingToRegenerate)?;
        let text = trailing.to_string();
        if self.last_submitted_text.as_deref().is_some_and(|last| last != text) {
            debug!(
                "Regenerating trailing turn of {} instead of last submitted text",
                self.conversation_id
            );
        }

        store.append_turn(&self.conversation_id, Turn::placeholder())?;
        self.last_submitted_text = Some(text.clone());
        self.phase = ConsultationPhase::Stage1Pending;
        info!(
            "Consultation regenerated in conversation {}",
            self.conversation_id
        );
        Ok(text)
    }

    /// Apply one stream event to the placeholder turn.
    ///
    /// Events outside a stage phase (after `complete`, `error` or `cancel`)
    /// are ignored. Out-of-order events are applied as they come.
    pub fn apply_event(
        &mut self,
        store: &mut ConversationStore,
        event: CouncilEvent,
    ) -> Vec<ConsultationEffect> {
        if !self.phase.accepts_events() {
            debug!(
                "Ignoring {} for conversation {} in phase {}",
                event.name(),
                self.conversation_id,
                self.phase
            );
            return Vec::new();
        }
        self.note_ordering(&event);

        match event {
            CouncilEvent::Stage1Start => {
                self.begin_stage(store, Stage::Stage1);
                Vec::new()
            }
            CouncilEvent::Stage2Start => {
                self.begin_stage(store, Stage::Stage2);
                Vec::new()
            }
            CouncilEvent::Stage3Start => {
                self.begin_stage(store, Stage::Stage3);
                Vec::new()
            }
            CouncilEvent::Stage1Complete { data } => {
                self.complete_stage(store, StageField::Stage1(Some(data)));
                Vec::new()
            }
            CouncilEvent::Stage2Complete { data, metadata } => {
                let metadata = self.stable_metadata(store, metadata);
                self.complete_stage(
                    store,
                    StageField::Stage2 {
                        data: Some(data),
                        metadata: Some(metadata),
                    },
                );
                Vec::new()
            }
            CouncilEvent::Stage3Complete { data } => {
                self.complete_stage(store, StageField::Stage3(Some(data)));
                Vec::new()
            }
            CouncilEvent::TitleComplete { data } => {
                if let Some(payload) = data {
                    store.set_title(&self.conversation_id, payload.title);
                }
                vec![ConsultationEffect::RefreshConversations]
            }
            CouncilEvent::Complete => {
                let missing = store
                    .conversation(&self.conversation_id)
                    .and_then(|c| c.placeholder())
                    .map(|p| p.missing_stages())
                    .unwrap_or_default();
                if !missing.is_empty() {
                    warn!(
                        "Consultation in {} completed without {:?}; using server state",
                        self.conversation_id, missing
                    );
                }
                self.phase = ConsultationPhase::Finalizing;
                vec![
                    ConsultationEffect::RefreshConversations,
                    ConsultationEffect::ReloadConversation(self.conversation_id.clone()),
                    ConsultationEffect::Completed,
                ]
            }
            CouncilEvent::Error { message } => {
                warn!(
                    "Consultation in {} failed: {}",
                    self.conversation_id, message
                );
                self.clear_loading(store);
                self.phase = ConsultationPhase::Failed;
                vec![ConsultationEffect::Failed(message)]
            }
            CouncilEvent::Unknown { event_type } => {
                info!("Ignoring unknown consultation event: {}", event_type);
                Vec::new()
            }
        }
    }

    /// Roll back a cancelled consultation: drop the placeholder, keep the
    /// user turn. Returns `false` if nothing was in flight.
    pub fn cancel(&mut self, store: &mut ConversationStore) -> bool {
        if !self.phase.accepts_events() {
            debug!(
                "Cancel ignored for conversation {} in phase {}",
                self.conversation_id, self.phase
            );
            return false;
        }
        if self.trailing_placeholder(store) {
            self.mutate(store, TurnCommand::DropLastTurns(1));
        }
        self.phase = ConsultationPhase::Cancelled;
        info!("Consultation cancelled in conversation {}", self.conversation_id);
        true
    }

    /// Roll back after the transport failed.
    ///
    /// A failure caused by cancellation behaves like [`cancel`](Self::cancel)
    /// (a no-op when cancel already ran). Any other failure drops both the
    /// placeholder and the user turn before it. Returns `true` if a
    /// non-cancellation rollback was performed.
    pub fn transport_failed(&mut self, store: &mut ConversationStore, cancelled: bool) -> bool {
        if cancelled {
            self.cancel(store);
            return false;
        }
        if !self.phase.accepts_events() {
            debug!(
                "Transport failure ignored for conversation {} in phase {}",
                self.conversation_id, self.phase
            );
            return false;
        }

        let turns = store.turns(&self.conversation_id).unwrap_or_default();
        let mut count = 0;
        if turns.last().is_some_and(|t| !t.is_user()) {
            count += 1;
        }
        let drops_user = turns.len() > count && turns[turns.len() - count - 1].is_user();
        if drops_user {
            count += 1;
        }
        if count > 0 {
            self.mutate(store, TurnCommand::DropLastTurns(count));
        }
        if drops_user {
            // The submitted text no longer has a turn to replay.
            self.last_submitted_text = None;
        }
        self.phase = ConsultationPhase::Failed;
        warn!(
            "Consultation transport failed in conversation {}; dropped {} turns",
            self.conversation_id, count
        );
        true
    }

    /// Return to `Idle` once a terminal phase has been handled.
    pub fn settle(&mut self) {
        if matches!(
            self.phase,
            ConsultationPhase::Finalizing | ConsultationPhase::Cancelled | ConsultationPhase::Failed
        ) {
            debug!(
                "Consultation in {} settled from {}",
                self.conversation_id, self.phase
            );
            self.phase = ConsultationPhase::Idle;
        }
    }

    // ==================== Helpers ====================

    fn begin_stage(&mut self, store: &mut ConversationStore, stage: Stage) {
        self.mutate(store, TurnCommand::SetLoading { stage, loading: true });
        self.phase = ConsultationPhase::pending(stage);
    }

    fn complete_stage(&mut self, store: &mut ConversationStore, field: StageField) {
        let stage = field.stage();
        self.mutate(
            store,
            TurnCommand::SetStageField {
                field,
                loading: false,
            },
        );
        self.phase = ConsultationPhase::done(stage);
    }

    /// Label mappings are attached once; a repeated `stage2_complete` keeps
    /// the mapping already on the turn.
    fn stable_metadata(&self, store: &ConversationStore, incoming: StageMetadata) -> StageMetadata {
        let attached = store
            .conversation(&self.conversation_id)
            .and_then(|c| c.placeholder())
            .and_then(|p| p.metadata.as_ref());
        match attached {
            Some(existing) if !existing.label_to_model.is_empty() => {
                debug!(
                    "Stage 2 completed again in {}; keeping attached label mapping",
                    self.conversation_id
                );
                StageMetadata {
                    label_to_model: existing.label_to_model.clone(),
                    aggregate_rankings: incoming.aggregate_rankings,
                }
            }
            _ => incoming,
        }
    }

    fn clear_loading(&self, store: &mut ConversationStore) {
        let active = store
            .conversation(&self.conversation_id)
            .and_then(|c| c.placeholder())
            .map(|p| p.loading.active())
            .unwrap_or_default();
        for stage in active {
            self.mutate(
                store,
                TurnCommand::SetLoading {
                    stage,
                    loading: false,
                },
            );
        }
    }

    fn trailing_placeholder(&self, store: &ConversationStore) -> bool {
        store
            .conversation(&self.conversation_id)
            .and_then(|c| c.placeholder())
            .is_some()
    }

    fn mutate(&self, store: &mut ConversationStore, command: TurnCommand) {
        let name = command.name();
        if let Err(e) = store.execute(&self.conversation_id, command) {
            warn!(
                "Skipping {} on conversation {}: {}",
                name, self.conversation_id, e
            );
        }
    }

    fn note_ordering(&self, event: &CouncilEvent) {
        let (Some(event_stage), Some(current)) = (event.stage(), self.phase.stage()) else {
            return;
        };
        let regresses = event_stage.number() < current.number();
        let skips = event_stage.number() > current.number() + 1;
        let completes_unstarted = matches!(
            event,
            CouncilEvent::Stage1Complete { .. }
                | CouncilEvent::Stage2Complete { .. }
                | CouncilEvent::Stage3Complete { .. }
        ) && event_stage != current;
        if regresses || skips || completes_unstarted {
            debug!(
                "Out-of-order event {} in phase {} for conversation {}",
                event.name(),
                self.phase,
                self.conversation_id
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::entities::Conversation;
    use crate::core::model::ModelId;
    use crate::council::label_map::LabelMap;
    use crate::council::value_objects::{
        AggregateRanking, CandidateResponse, FinalSynthesis, PeerEvaluation,
    };

    fn model(id: &str) -> ModelId {
        ModelId::new(id).unwrap()
    }

    fn setup() -> (ConversationStore, ConsultationSession) {
        let id = ConversationId::new("c1").unwrap();
        let mut store = ConversationStore::new();
        store.load(Conversation::new(id.clone()));
        store.select(&id).unwrap();
        (store, ConsultationSession::new(id))
    }

    fn turns(store: &ConversationStore) -> &[Turn] {
        store.active().map(|c| c.turns.as_slice()).unwrap_or_default()
    }

    fn stage1() -> Vec<CandidateResponse> {
        vec![CandidateResponse::new(model("a/x"), "hi")]
    }

    fn metadata(pairs: &[(&str, &str)]) -> StageMetadata {
        StageMetadata {
            label_to_model: pairs
                .iter()
                .map(|(l, m)| (*l, model(m)))
                .collect::<LabelMap>(),
            aggregate_rankings: vec![
                AggregateRanking {
                    model: model("a/x"),
                    average_rank: 1.5,
                    rankings_count: 2,
                },
                AggregateRanking {
                    model: model("b/y"),
                    average_rank: 2.0,
                    rankings_count: 2,
                },
            ],
        }
    }

    fn full_stream() -> Vec<CouncilEvent> {
        vec![
            CouncilEvent::Stage1Start,
            CouncilEvent::Stage1Complete { data: stage1() },
            CouncilEvent::Stage2Start,
            CouncilEvent::Stage2Complete {
                data: vec![PeerEvaluation::new(model("a/x"), "Response B > Response A")],
                metadata: metadata(&[("Response A", "a/x"), ("Response B", "b/y")]),
            },
            CouncilEvent::Stage3Start,
            CouncilEvent::Stage3Complete {
                data: FinalSynthesis::new(model("c/z"), "final"),
            },
        ]
    }

    #[test]
    fn test_start_appends_user_and_placeholder() {
        let (mut store, mut session) = setup();
        session.start(&mut store, "Hello").unwrap();
        assert_eq!(turns(&store), &[Turn::user("Hello"), Turn::placeholder()]);
        assert_eq!(session.phase(), ConsultationPhase::Stage1Pending);
        assert_eq!(session.last_submitted_text(), Some("Hello"));
    }

    #[test]
    fn test_start_while_in_flight_is_rejected_without_mutation() {
        let (mut store, mut session) = setup();
        session.start(&mut store, "Hello").unwrap();
        let err = session.start(&mut store, "Again").unwrap_err();
        assert_eq!(err, DomainError::ConsultationInFlight);
        assert_eq!(turns(&store).len(), 2);
    }

    #[test]
    fn test_stage_start_sets_loading() {
        let (mut store, mut session) = setup();
        session.start(&mut store, "Hello").unwrap();
        session.apply_event(&mut store, CouncilEvent::Stage1Start);
        let placeholder = store.active().unwrap().placeholder().unwrap();
        assert!(placeholder.loading.stage1);
        assert!(!placeholder.loading.stage2);
    }

    #[test]
    fn test_full_stream_then_complete() {
        let (mut store, mut session) = setup();
        session.start(&mut store, "Hello").unwrap();
        for event in full_stream() {
            assert!(session.apply_event(&mut store, event).is_empty());
        }
        assert_eq!(session.phase(), ConsultationPhase::Stage3Done);

        let effects = session.apply_event(&mut store, CouncilEvent::Complete);
        assert_eq!(
            effects,
            vec![
                ConsultationEffect::RefreshConversations,
                ConsultationEffect::ReloadConversation(ConversationId::new("c1").unwrap()),
                ConsultationEffect::Completed,
            ]
        );
        assert_eq!(session.phase(), ConsultationPhase::Finalizing);

        let placeholder = store.active().unwrap().placeholder().unwrap();
        assert!(!placeholder.is_loading());
        assert_eq!(placeholder.stage1.as_ref(), Some(&stage1()));
        assert_eq!(placeholder.stage3.as_ref().unwrap().response, "final");
        let aggregate: Vec<_> = placeholder
            .metadata
            .as_ref()
            .unwrap()
            .aggregate_rankings
            .iter()
            .map(|r| r.model.as_str())
            .collect();
        assert_eq!(aggregate, vec!["a/x", "b/y"]);

        session.settle();
        assert_eq!(session.phase(), ConsultationPhase::Idle);
    }

    #[test]
    fn test_last_complete_payload_wins() {
        let (mut store, mut session) = setup();
        session.start(&mut store, "Hello").unwrap();
        session.apply_event(&mut store, CouncilEvent::Stage1Start);
        session.apply_event(&mut store, CouncilEvent::Stage1Complete { data: stage1() });
        let second = vec![CandidateResponse::new(model("b/y"), "hello again")];
        session.apply_event(
            &mut store,
            CouncilEvent::Stage1Complete {
                data: second.clone(),
            },
        );
        let placeholder = store.active().unwrap().placeholder().unwrap();
        assert_eq!(placeholder.stage1.as_ref(), Some(&second));
    }

    #[test]
    fn test_repeated_stage2_keeps_label_mapping() {
        let (mut store, mut session) = setup();
        session.start(&mut store, "Hello").unwrap();
        session.apply_event(
            &mut store,
            CouncilEvent::Stage2Complete {
                data: vec![],
                metadata: metadata(&[("Response A", "a/x")]),
            },
        );
        session.apply_event(
            &mut store,
            CouncilEvent::Stage2Complete {
                data: vec![],
                metadata: metadata(&[("Response A", "z/other")]),
            },
        );
        let placeholder = store.active().unwrap().placeholder().unwrap();
        let mapping = placeholder.label_to_model().unwrap();
        assert_eq!(mapping.get("Response A").unwrap().as_str(), "a/x");
    }

    #[test]
    fn test_out_of_order_stream_is_applied_best_effort() {
        let (mut store, mut session) = setup();
        session.start(&mut store, "Hello").unwrap();
        session.apply_event(
            &mut store,
            CouncilEvent::Stage3Complete {
                data: FinalSynthesis::new(model("c/z"), "early"),
            },
        );
        session.apply_event(&mut store, CouncilEvent::Stage1Start);
        let placeholder = store.active().unwrap().placeholder().unwrap();
        assert!(placeholder.stage3.is_some());
        assert!(placeholder.loading.stage1);
        assert_eq!(session.phase(), ConsultationPhase::Stage1Pending);
    }

    #[test]
    fn test_complete_without_stage3_is_success() {
        let (mut store, mut session) = setup();
        session.start(&mut store, "Hello").unwrap();
        session.apply_event(&mut store, CouncilEvent::Stage1Complete { data: stage1() });
        let effects = session.apply_event(&mut store, CouncilEvent::Complete);
        assert!(effects.contains(&ConsultationEffect::Completed));
        assert_eq!(session.phase(), ConsultationPhase::Finalizing);
    }

    #[test]
    fn test_error_event_keeps_partial_turn_and_surfaces_message() {
        let (mut store, mut session) = setup();
        session.start(&mut store, "Hello").unwrap();
        session.apply_event(&mut store, CouncilEvent::Stage1Complete { data: stage1() });
        session.apply_event(&mut store, CouncilEvent::Stage2Start);
        let effects = session.apply_event(
            &mut store,
            CouncilEvent::Error {
                message: "chairman unavailable".to_string(),
            },
        );
        assert_eq!(
            effects,
            vec![ConsultationEffect::Failed("chairman unavailable".to_string())]
        );
        assert_eq!(session.phase(), ConsultationPhase::Failed);
        assert_eq!(turns(&store).len(), 2);
        let placeholder = store.active().unwrap().placeholder().unwrap();
        assert!(placeholder.stage1.is_some());
        assert!(!placeholder.is_loading());

        // Nothing after a terminal event is applied.
        assert!(
            session
                .apply_event(&mut store, CouncilEvent::Complete)
                .is_empty()
        );
    }

    #[test]
    fn test_title_complete_updates_title_without_touching_turns() {
        let (mut store, mut session) = setup();
        session.start(&mut store, "Hello").unwrap();
        let before = turns(&store).to_vec();
        let effects = session.apply_event(
            &mut store,
            CouncilEvent::TitleComplete {
                data: Some(crate::consultation::event::TitlePayload {
                    title: "Greetings".to_string(),
                }),
            },
        );
        assert_eq!(effects, vec![ConsultationEffect::RefreshConversations]);
        assert_eq!(store.active().unwrap().title, "Greetings");
        assert_eq!(turns(&store), before.as_slice());
    }

    #[test]
    fn test_unknown_event_is_ignored() {
        let (mut store, mut session) = setup();
        session.start(&mut store, "Hello").unwrap();
        let effects = session.apply_event(
            &mut store,
            CouncilEvent::Unknown {
                event_type: "heartbeat".to_string(),
            },
        );
        assert!(effects.is_empty());
        assert_eq!(session.phase(), ConsultationPhase::Stage1Pending);
    }

    #[test]
    fn test_cancel_scenario_keeps_only_user_turn() {
        let (mut store, mut session) = setup();
        session.start(&mut store, "Hello").unwrap();
        session.apply_event(&mut store, CouncilEvent::Stage1Start);
        session.apply_event(&mut store, CouncilEvent::Stage1Complete { data: stage1() });
        assert!(session.cancel(&mut store));
        assert_eq!(turns(&store), &[Turn::user("Hello")]);
        assert_eq!(session.phase(), ConsultationPhase::Cancelled);
    }

    #[test]
    fn test_events_after_cancel_are_ignored() {
        let (mut store, mut session) = setup();
        session.start(&mut store, "Hello").unwrap();
        session.cancel(&mut store);
        session.apply_event(&mut store, CouncilEvent::Stage1Start);
        session.apply_event(&mut store, CouncilEvent::Stage1Complete { data: stage1() });
        assert_eq!(turns(&store), &[Turn::user("Hello")]);
    }

    #[test]
    fn test_second_cancel_is_noop() {
        let (mut store, mut session) = setup();
        session.start(&mut store, "Hello").unwrap();
        assert!(session.cancel(&mut store));
        assert!(!session.cancel(&mut store));
        assert_eq!(turns(&store).len(), 1);
    }

    #[test]
    fn test_transport_failure_drops_both_turns() {
        let (mut store, mut session) = setup();
        store
            .append_turn(session.conversation_id(), Turn::user("earlier"))
            .unwrap();
        session.start(&mut store, "Hello").unwrap();
        let after_start = turns(&store).len();
        session.apply_event(&mut store, CouncilEvent::Stage1Start);
        assert!(session.transport_failed(&mut store, false));
        assert_eq!(turns(&store).len(), after_start - 2);
        assert_eq!(turns(&store), &[Turn::user("earlier")]);
        assert_eq!(session.phase(), ConsultationPhase::Failed);
    }

    #[test]
    fn test_cancellation_failure_after_cancel_is_noop() {
        let (mut store, mut session) = setup();
        session.start(&mut store, "Hello").unwrap();
        session.cancel(&mut store);
        assert!(!session.transport_failed(&mut store, true));
        assert!(!session.transport_failed(&mut store, false));
        assert_eq!(turns(&store), &[Turn::user("Hello")]);
    }

    #[test]
    fn test_cancellation_failure_without_cancel_rolls_back_placeholder() {
        let (mut store, mut session) = setup();
        session.start(&mut store, "Hello").unwrap();
        assert!(!session.transport_failed(&mut store, true));
        assert_eq!(turns(&store), &[Turn::user("Hello")]);
        assert_eq!(session.phase(), ConsultationPhase::Cancelled);
    }

    #[test]
    fn test_regenerate_after_cancel_appends_placeholder_only() {
        let (mut store, mut session) = setup();
        session.start(&mut store, "Hello").unwrap();
        session.cancel(&mut store);
        session.settle();
        let before = turns(&store).len();

        let text = session.regenerate(&mut store).unwrap();
        assert_eq!(text, "Hello");
        assert_eq!(turns(&store).len(), before + 1);
        assert_eq!(turns(&store), &[Turn::user("Hello"), Turn::placeholder()]);
        assert_eq!(session.phase(), ConsultationPhase::Stage1Pending);
    }

    #[test]
    fn test_regenerate_requires_trailing_user_turn() {
        let (mut store, mut session) = setup();
        assert_eq!(
            session.regenerate(&mut store),
            Err(DomainError::NothingToRegenerate)
        );
        session.start(&mut store, "Hello").unwrap();
        assert_eq!(
            session.regenerate(&mut store),
            Err(DomainError::ConsultationInFlight)
        );
    }

    #[test]
    fn test_regenerate_falls_back_to_trailing_user_text() {
        let (mut store, mut session) = setup();
        store
            .append_turn(session.conversation_id(), Turn::user("Loaded from server"))
            .unwrap();
        assert_eq!(session.regenerate(&mut store).unwrap(), "Loaded from server");
    }

    #[test]
    fn test_regenerate_after_transport_failure_replays_remaining_user_turn() {
        let (mut store, mut session) = setup();
        store
            .append_turn(session.conversation_id(), Turn::user("X"))
            .unwrap();
        session.start(&mut store, "A").unwrap();
        assert!(session.transport_failed(&mut store, false));
        session.settle();
        assert_eq!(turns(&store), &[Turn::user("X")]);
        assert_eq!(session.last_submitted_text(), None);

        assert_eq!(session.regenerate(&mut store).unwrap(), "X");
        assert_eq!(turns(&store), &[Turn::user("X"), Turn::placeholder()]);
        assert_eq!(session.last_submitted_text(), Some("X"));
    }

    #[test]
    fn test_regenerate_sends_trailing_text_over_stale_submission() {
        let (mut store, mut session) = setup();
        session.start(&mut store, "Hello").unwrap();
        session.cancel(&mut store);
        session.settle();
        store
            .replace_turns(session.conversation_id(), vec![Turn::user("Edited on server")])
            .unwrap();
        assert_eq!(session.regenerate(&mut store).unwrap(), "Edited on server");
    }

    #[test]
    fn test_stage_start_without_placeholder_changes_nothing() {
        let (mut store, mut session) = setup();
        session.start(&mut store, "Hello").unwrap();
        store
            .replace_turns(session.conversation_id(), vec![Turn::user("Hello")])
            .unwrap();
        for event in [
            CouncilEvent::Stage1Start,
            CouncilEvent::Stage2Start,
            CouncilEvent::Stage3Start,
        ] {
            assert!(session.apply_event(&mut store, event).is_empty());
        }
        assert_eq!(turns(&store), &[Turn::user("Hello")]);
    }

    #[test]
    fn test_cancel_during_finalizing_is_noop() {
        let (mut store, mut session) = setup();
        session.start(&mut store, "Hello").unwrap();
        session.apply_event(&mut store, CouncilEvent::Complete);
        assert!(!session.cancel(&mut store));
        assert_eq!(turns(&store).len(), 2);
    }
}
