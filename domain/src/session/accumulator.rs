//! Live buffer for the assistant reply currently in flight.
//!
//! ```text
//!          begin()                     reset() / discard()
//!   Idle ───────────▶ Streaming ───────────────────────────▶ Idle
//!                      │  ▲
//!                      └──┘ on_token()
//! ```
//!
//! The buffer is for display only. [`on_complete`](StreamingAccumulator::on_complete)
//! hands back the server's final text, which is what gets committed to the
//! conversation log; the caller then calls [`reset`](StreamingAccumulator::reset).

use crate::core::error::DomainError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum AccumulatorState {
    #[default]
    Idle,
    Streaming {
        buffer: String,
    },
}

/// Collects streamed tokens of one assistant reply.
#[derive(Debug, Clone, Default)]
pub struct StreamingAccumulator {
    state: AccumulatorState,
}

impl StreamingAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new reply. Only one reply may stream at a time.
    pub fn begin(&mut self) -> Result<(), DomainError> {
        if self.is_streaming() {
            return Err(DomainError::AlreadyStreaming);
        }
        self.state = AccumulatorState::Streaming {
            buffer: String::new(),
        };
        Ok(())
    }

    /// Append a token in delivery order.
    pub fn on_token(&mut self, token: &str) -> Result<(), DomainError> {
        match &mut self.state {
            AccumulatorState::Streaming { buffer } => {
                buffer.push_str(token);
                Ok(())
            }
            AccumulatorState::Idle => Err(DomainError::NotStreaming),
        }
    }

    /// Accept the authoritative final text for the reply.
    ///
    /// The returned value is `final_text` unchanged, whatever the buffer holds.
    /// The buffer stays visible until [`reset`](Self::reset).
    pub fn on_complete(&mut self, final_text: impl Into<String>) -> Result<String, DomainError> {
        match self.state {
            AccumulatorState::Streaming { .. } => Ok(final_text.into()),
            AccumulatorState::Idle => Err(DomainError::NotStreaming),
        }
    }

    /// Clear the buffer after the final text has been committed.
    pub fn reset(&mut self) {
        self.state = AccumulatorState::Idle;
    }

    /// Drop an unfinished reply without committing anything.
    ///
    /// Returns the text that had been streamed so far, if a reply was active.
    pub fn discard(&mut self) -> Option<String> {
        match std::mem::take(&mut self.state) {
            AccumulatorState::Streaming { buffer } => Some(buffer),
            AccumulatorState::Idle => None,
        }
    }

    /// Text streamed so far; empty when idle.
    pub fn live_text(&self) -> &str {
        match &self.state {
            AccumulatorState::Streaming { buffer } => buffer,
            AccumulatorState::Idle => "",
        }
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self.state, AccumulatorState::Streaming { .. })
    }
}
