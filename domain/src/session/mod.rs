//! Chat session domain.
//!
//! - [`entities::Message`]: a single message within the conversation
//! - [`log::ConversationLog`]: the append-only message sequence
//! - [`accumulator::StreamingAccumulator`]: live buffer for an in-flight reply
//! - [`stream::StreamEvent`]: one event of a streaming reply
//! - [`config::SessionConfig`]: identity and application fields for a session

pub mod accumulator;
pub mod config;
pub mod entities;
pub mod log;
pub mod stream;
