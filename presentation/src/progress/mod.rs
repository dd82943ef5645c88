//! Progress reporting while a consultation streams

pub mod reporter;
