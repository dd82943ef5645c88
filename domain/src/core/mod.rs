//! Core domain concepts shared across all subdomains.
//!
//! - [`model::ModelId`]: identifier of a council member
//! - [`error::DomainError`]: domain-level errors

pub mod error;
pub mod model;
