//! Echo gateway
//!
//! Streams the user's message back word by word, the way the SDK streams a
//! real reply. Session ids are issued on the first turn and must be threaded
//! back on later turns, so the continuation path is exercised end to end.
//! The completed text carries a suffix that was never streamed, the way a
//! server can post-process its final reply.

use async_trait::async_trait;
use playground_application::{
    ChatClient, ChatError, ChatGateway, ChatRequest, ChatStream, DEFAULT_STREAM_CAPACITY,
    IdentityError, StreamHandle,
};
use playground_domain::{SessionConfig, SessionHandle, StreamEvent};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Offline [`ChatGateway`] that accepts any identity
#[derive(Debug, Clone)]
pub struct EchoGateway {
    reply_prefix: String,
    final_suffix: String,
    token_delay: Duration,
    channel_capacity: usize,
}

/// Appended to the completed text only
pub const DEFAULT_FINAL_SUFFIX: &str = " (offline)";

impl Default for EchoGateway {
    fn default() -> Self {
        Self {
            reply_prefix: "Echo: ".to_string(),
            final_suffix: DEFAULT_FINAL_SUFFIX.to_string(),
            token_delay: Duration::from_millis(30),
            channel_capacity: DEFAULT_STREAM_CAPACITY,
        }
    }
}

impl EchoGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.reply_prefix = prefix.into();
        self
    }

    pub fn with_final_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.final_suffix = suffix.into();
        self
    }

    pub fn with_token_delay(mut self, delay: Duration) -> Self {
        self.token_delay = delay;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }
}

#[async_trait]
impl ChatGateway for EchoGateway {
    async fn identify(&self, config: &SessionConfig) -> Result<Arc<dyn ChatClient>, IdentityError> {
        debug!("Offline identify for {}", config.user_id);
        Ok(Arc::new(EchoClient {
            settings: self.clone(),
            sessions: Mutex::new(HashSet::new()),
            next_session: AtomicU64::new(1),
        }))
    }
}

/// Client returned by [`EchoGateway::identify`]
pub struct EchoClient {
    settings: EchoGateway,
    sessions: Mutex<HashSet<SessionHandle>>,
    next_session: AtomicU64,
}

impl EchoClient {
    fn resolve_session(&self, requested: Option<SessionHandle>) -> Result<SessionHandle, ChatError> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        match requested {
            Some(handle) if sessions.contains(&handle) => Ok(handle),
            Some(handle) => Err(ChatError::Remote(format!("Unknown session: {}", handle))),
            None => {
                let n = self.next_session.fetch_add(1, Ordering::SeqCst);
                let handle = SessionHandle::new(format!("offline-session-{}", n));
                sessions.insert(handle.clone());
                Ok(handle)
            }
        }
    }
}

/// Split text into tokens that each keep their trailing whitespace.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut pending = String::new();
    for ch in text.chars() {
        pending.push(ch);
        if ch.is_whitespace() {
            tokens.push(std::mem::take(&mut pending));
        }
    }
    if !pending.is_empty() {
        tokens.push(pending);
    }
    tokens
}

async fn stream_reply(tx: mpsc::Sender<StreamEvent>, reply: String, suffix: String, delay: Duration) {
    for token in tokenize(&reply) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if tx.send(StreamEvent::Delta(token)).await.is_err() {
            debug!("Offline stream receiver dropped");
            return;
        }
    }
    let _ = tx.send(StreamEvent::Completed(reply + &suffix)).await;
}

#[async_trait]
impl ChatClient for EchoClient {
    async fn chat_turn(&self, request: ChatRequest) -> Result<ChatStream, ChatError> {
        let session_id = self.resolve_session(request.session_id)?;
        let reply = format!("{}{}", self.settings.reply_prefix, request.message);

        let (tx, events) = StreamHandle::channel(self.settings.channel_capacity);
        tokio::spawn(stream_reply(
            tx,
            reply,
            self.settings.final_suffix.clone(),
            self.settings.token_delay,
        ));

        Ok(ChatStream { session_id, events })
    }
}
