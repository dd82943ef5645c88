//! Progress notification port
//!
//! Defines the interface for reporting progress while a consultation streams.

use council_domain::{ConversationId, PartialResult, Stage};

/// Callback for progress updates during a consultation
///
/// Implementations live in the presentation layer and can display
/// progress in various ways (spinners, live rendering, etc.)
pub trait ConsultationObserver: Send + Sync {
    /// Called when the server starts working on a stage
    fn on_stage_start(&self, stage: Stage);

    /// Called when a stage result has been applied to the turn
    fn on_stage_complete(&self, stage: Stage, result: &PartialResult);

    /// Called when the consultation ends, successfully or not
    fn on_finished(&self);

    // ==================== Side channel ====================

    /// Called when the server names the conversation
    fn on_title(&self, _conversation_id: &ConversationId, _title: &str) {}

    /// Called after a cancellation has been rolled back
    fn on_cancelled(&self) {}
}

/// No-op progress observer for when progress reporting is not needed
pub struct NoProgress;

impl ConsultationObserver for NoProgress {
    fn on_stage_start(&self, _stage: Stage) {}
    fn on_stage_complete(&self, _stage: Stage, _result: &PartialResult) {}
    fn on_finished(&self) {}
}
