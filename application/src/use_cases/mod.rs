//! Use cases (application services)

pub mod chat;
pub mod manage_council;
