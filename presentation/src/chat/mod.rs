//! Interactive chat module
//!
//! Provides a line-editor based interactive chat interface for the council.

mod repl;

pub use repl::{ChatRepl, ReplCommand, cancel_on_ctrl_c, last_exchange};
