//! Output formatting for consultation results

pub mod console;
pub mod formatter;
