//! Pure text transforms applied to model output before display.

pub mod labels;
pub mod reasoning;
