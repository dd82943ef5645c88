//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod conversation_logger;
pub mod conversation_repository;
pub mod council_client;
pub mod council_settings;
pub mod progress;
