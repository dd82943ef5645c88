//! HTTP adapter for the council server
//!
//! - [`HttpCouncilClient`]: JSON endpoints and the streaming consultation
//! - [`SseDecoder`]: incremental `text/event-stream` decoding

mod client;
mod error;
pub mod sse;

pub use client::HttpCouncilClient;
pub use sse::SseDecoder;
