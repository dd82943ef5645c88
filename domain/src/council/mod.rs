//! Council result types
//!
//! Everything a consultation reports back: the stages, each stage's
//! payload, and the anonymized label mapping used during peer ranking.

pub mod label_map;
pub mod stage;
pub mod value_objects;
