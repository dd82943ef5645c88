//! Conversation domain
//!
//! Conversations, their turns, the commands that mutate turns, and the
//! in-memory store the presentation layer renders from.

pub mod command;
pub mod entities;
pub mod store;
