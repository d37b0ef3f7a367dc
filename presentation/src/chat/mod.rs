//! Interactive chat module
//!
//! Startup forms for missing fields, then a readline-based chat loop.

mod repl;
pub mod setup;

pub use repl::{ChatRepl, ReplCommand};
pub use setup::{LinePrompt, app_form, correct_identity, identity_form};
