//! Streaming progress display

pub mod reporter;
