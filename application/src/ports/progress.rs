//! Turn progress port
//!
//! Defines the callbacks a presenter uses to draw a reply while it streams.

/// Callback for progress updates during a chat turn
///
/// Implementations live in the presentation layer. Callbacks run on the
/// turn's task between stream events, so they should return quickly.
pub trait TurnProgressNotifier: Send + Sync {
    /// Called after the user message is logged, before the remote call
    fn on_turn_start(&self, _message: &str) {}

    /// Called for each streamed token with the live text so far
    fn on_token(&self, _token: &str, _live_text: &str) {}

    /// Called once the server-final text has been committed
    fn on_turn_complete(&self, _final_text: &str) {}

    /// Called when the turn fails; the streamed text has been discarded
    fn on_turn_failed(&self, _error: &str) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoTurnProgress;

impl TurnProgressNotifier for NoTurnProgress {}
