//! Presentation layer for chat-playground
//!
//! This crate contains the CLI definition, startup forms, the chat REPL,
//! transcript formatting and live stream rendering.

pub mod chat;
pub mod cli;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use chat::{
    ChatRepl, LinePrompt, ReplCommand, app_form, correct_identity, identity_form,
};
pub use cli::commands::Cli;
pub use output::console::ConsoleFormatter;
pub use progress::reporter::StreamPrinter;
