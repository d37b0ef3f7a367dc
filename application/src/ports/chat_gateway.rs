//! Chat Gateway port
//!
//! Defines the interface for talking to the remote chat SDK: a one-shot
//! `identify` that yields a client, and streaming chat turns on that client.

use async_trait::async_trait;
use playground_domain::{SessionConfig, SessionHandle, StreamEvent};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Default capacity of a turn's event channel
pub const DEFAULT_STREAM_CAPACITY: usize = 64;

/// Errors raised by the identify step
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("{0} is required")]
    MissingField(playground_domain::ConfigField),

    /// The SDK rejected the identity; carries its message text verbatim.
    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    Transport(String),
}

impl IdentityError {
    /// Whether editing the identity fields and retrying can help.
    ///
    /// A transport failure means the SDK is unreachable, so it cannot.
    pub fn is_correctable(&self) -> bool {
        !matches!(self, IdentityError::Transport(_))
    }
}

/// Errors raised by a chat turn, before or during streaming
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// The SDK failed the turn; carries its message text verbatim.
    #[error("{0}")]
    Remote(String),

    #[error("{0}")]
    Transport(String),

    #[error("Stream ended before completion")]
    StreamClosed,
}

/// Input for one chat turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub app_id: String,
    pub message: String,
    /// Continuation handle from an earlier turn, absent on the first one
    pub session_id: Option<SessionHandle>,
}

impl ChatRequest {
    pub fn new(app_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            message: message.into(),
            session_id: None,
        }
    }

    pub fn with_session(mut self, session_id: Option<SessionHandle>) -> Self {
        self.session_id = session_id;
        self
    }
}

/// Handle for receiving streaming events of one chat turn.
///
/// Wraps a bounded `mpsc::Receiver<StreamEvent>`. The sender side emits zero
/// or more `Delta` events followed by one terminal event.
pub struct StreamHandle {
    pub receiver: mpsc::Receiver<StreamEvent>,
}

impl StreamHandle {
    pub fn new(receiver: mpsc::Receiver<StreamEvent>) -> Self {
        Self { receiver }
    }

    /// Create a bounded channel and return its sender with the wrapping handle
    pub fn channel(capacity: usize) -> (mpsc::Sender<StreamEvent>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self::new(rx))
    }

    /// Receive the next event; `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.receiver.recv().await
    }

    /// Consume the stream and return the final text, ignoring deltas.
    pub async fn final_text(mut self) -> Result<String, ChatError> {
        while let Some(event) = self.receiver.recv().await {
            match event {
                StreamEvent::Delta(_) => {}
                StreamEvent::Completed(text) => return Ok(text),
                StreamEvent::Error(e) => return Err(ChatError::Remote(e)),
            }
        }
        Err(ChatError::StreamClosed)
    }
}

/// Result of starting a chat turn
pub struct ChatStream {
    /// Session handle to thread into the next turn
    pub session_id: SessionHandle,
    pub events: StreamHandle,
}

/// Gateway to the chat SDK
///
/// This port defines how the application layer reaches the SDK.
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Identify the user and return a client bound to that identity
    async fn identify(&self, config: &SessionConfig) -> Result<Arc<dyn ChatClient>, IdentityError>;
}

/// An identified SDK client
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Start one chat turn and return its event stream
    async fn chat_turn(&self, request: ChatRequest) -> Result<ChatStream, ChatError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn final_text_skips_deltas() {
        let (tx, handle) = StreamHandle::channel(4);
        tx.send(StreamEvent::Delta("Hel".into())).await.unwrap();
        tx.send(StreamEvent::Delta("lo".into())).await.unwrap();
        tx.send(StreamEvent::Completed("Hello!".into())).await.unwrap();
        drop(tx);

        assert_eq!(handle.final_text().await.unwrap(), "Hello!");
    }

    #[tokio::test]
    async fn final_text_surfaces_remote_error() {
        let (tx, handle) = StreamHandle::channel(1);
        tx.send(StreamEvent::Error("quota exceeded".into()))
            .await
            .unwrap();
        drop(tx);

        let err = handle.final_text().await.unwrap_err();
        assert_eq!(err.to_string(), "quota exceeded");
    }

    #[tokio::test]
    async fn closed_channel_without_terminal_event() {
        let (tx, handle) = StreamHandle::channel(1);
        drop(tx);
        assert_eq!(handle.final_text().await, Err(ChatError::StreamClosed));
    }

    #[test]
    fn only_transport_failures_are_uncorrectable() {
        assert!(IdentityError::Rejected("Invalid hashed user id".into()).is_correctable());
        assert!(IdentityError::MissingField(playground_domain::ConfigField::UserId).is_correctable());
        assert!(!IdentityError::Transport("bridge exited".into()).is_correctable());
    }

    #[test]
    fn chat_request_builder() {
        let request =
            ChatRequest::new("app-1", "hi").with_session(Some(SessionHandle::from("abc123")));
        assert_eq!(request.app_id, "app-1");
        assert_eq!(request.session_id.as_ref().map(|s| s.as_str()), Some("abc123"));
    }
}
