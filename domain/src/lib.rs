//! Domain layer for chat-playground
//!
//! This crate contains the conversation model and has no dependencies on
//! infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Conversation Log
//!
//! An append-only, order-preserving sequence of [`Message`]s. Each user turn
//! adds one entry and each completed assistant reply adds one more.
//!
//! ## Streaming Accumulator
//!
//! A transient buffer that collects [`StreamEvent::Delta`] tokens for live
//! display while a reply is in flight. The text committed to the log is the
//! server's final result, not the accumulated buffer.
//!
//! ## Session Handle
//!
//! The opaque continuation token returned by the first turn and threaded into
//! every later turn of the same conversation.

pub mod core;
pub mod session;

// Re-export commonly used types
pub use core::{error::DomainError, string::truncate};
pub use session::{
    accumulator::StreamingAccumulator,
    config::{ConfigField, SessionConfig},
    entities::{Message, Role, SessionHandle},
    log::{ConversationLog, DisplayRecord, Position},
    stream::StreamEvent,
};
