//! Conversation transcript adapters

pub mod jsonl_logger;

pub use jsonl_logger::JsonlTranscriptLogger;
