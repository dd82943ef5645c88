//! Consultation domain
//!
//! The event protocol of a streamed consultation and the state machine that
//! applies it to a conversation.

pub mod event;
pub mod machine;
