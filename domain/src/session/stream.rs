//! Streaming events for a chat turn.
//!
//! [`StreamEvent`] represents individual events in a streaming assistant reply,
//! enabling live display of the reply while it is generated.

/// An event in a streaming chat reply.
///
/// A well-formed stream is zero or more `Delta` events followed by exactly one
/// terminal event (`Completed` or `Error`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// An incremental token of the reply.
    Delta(String),
    /// The authoritative final text of the reply (signals stream end).
    ///
    /// May differ from the concatenation of the deltas.
    Completed(String),
    /// The remote side failed the turn; carries its message text.
    Error(String),
}

impl StreamEvent {
    /// Returns true if this event signals the end of the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Completed(_) | StreamEvent::Error(_))
    }
}
