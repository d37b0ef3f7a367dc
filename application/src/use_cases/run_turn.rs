//! Run Turn use case.
//!
//! [`TurnOrchestrator`] owns one chat session: the conversation log, the
//! streaming accumulator and the session handle. Each call to
//! [`execute`](TurnOrchestrator::execute) runs one turn:
//!
//! 1. Append the user message to the log
//! 2. Start the remote turn with the current session handle, if any
//! 3. Feed `Delta` events into the accumulator for live display
//! 4. On `Completed`, commit the server-final text and store the new handle
//! 5. On failure, discard the streamed text and record the error message
//!
//! Only one turn may be in flight. A second call made while a turn is
//! outstanding fails fast with [`TurnError::Busy`].

use crate::ports::chat_gateway::{ChatClient, ChatError, ChatRequest, ChatStream};
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::progress::TurnProgressNotifier;
use playground_domain::{
    ConversationLog, DomainError, Message, Role, SessionConfig, SessionHandle, StreamEvent,
    StreamingAccumulator, truncate,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur while running a turn.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TurnError {
    #[error("A turn is already in progress")]
    Busy,

    #[error("Message is empty")]
    EmptyMessage,

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error(transparent)]
    Session(#[from] DomainError),
}

/// Result of a successful turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Text committed to the log (server-final)
    pub reply: String,
    /// Text that was streamed live before completion
    pub streamed: String,
    /// Handle to use for the next turn
    pub session_id: SessionHandle,
}

#[derive(Default)]
struct SessionState {
    log: ConversationLog,
    accumulator: StreamingAccumulator,
    session_id: Option<SessionHandle>,
    last_error: Option<String>,
}

/// Holds the busy flag for the duration of a turn.
///
/// Dropping it clears the flag. If the turn future was dropped mid-stream,
/// it also discards the dangling buffer so the next turn starts from Idle.
struct TurnGuard<'a> {
    busy: &'a AtomicBool,
    state: &'a Mutex<SessionState>,
}

impl<'a> TurnGuard<'a> {
    fn acquire(busy: &'a AtomicBool, state: &'a Mutex<SessionState>) -> Option<Self> {
        busy.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { busy, state })
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(partial) = state.accumulator.discard() {
            warn!("Turn abandoned mid-stream, dropped {} bytes", partial.len());
        }
        drop(state);
        self.busy.store(false, Ordering::Release);
    }
}

/// Orchestrates chat turns for one identified session.
pub struct TurnOrchestrator {
    client: Arc<dyn ChatClient>,
    app_id: String,
    state: Mutex<SessionState>,
    busy: AtomicBool,
    conversation_logger: Arc<dyn ConversationLogger>,
}

impl TurnOrchestrator {
    pub fn new(client: Arc<dyn ChatClient>, app_id: impl Into<String>) -> Self {
        Self {
            client,
            app_id: app_id.into(),
            state: Mutex::new(SessionState::default()),
            busy: AtomicBool::new(false),
            conversation_logger: Arc::new(NoConversationLogger),
        }
    }

    /// Create an orchestrator for `config`, which must name an application.
    pub fn for_session(
        client: Arc<dyn ChatClient>,
        config: &SessionConfig,
    ) -> Result<Self, DomainError> {
        config.validate_app()?;
        Ok(Self::new(client, config.app_id.trim()))
    }

    /// Create with a conversation logger.
    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Whether a turn is currently in flight
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn session_id(&self) -> Option<SessionHandle> {
        self.lock_state().session_id.clone()
    }

    /// Message of the most recent failed turn, cleared when a new turn starts
    pub fn last_error(&self) -> Option<String> {
        self.lock_state().last_error.clone()
    }

    /// Text streamed so far for the in-flight reply; empty when idle
    pub fn live_text(&self) -> String {
        self.lock_state().accumulator.live_text().to_string()
    }

    /// Snapshot of the conversation log
    pub fn messages(&self) -> Vec<Message> {
        self.lock_state().log.messages().to_vec()
    }

    /// Run `f` against the conversation log without copying it.
    ///
    /// `f` must not call back into this orchestrator.
    pub fn with_log<R>(&self, f: impl FnOnce(&ConversationLog) -> R) -> R {
        f(&self.lock_state().log)
    }

    /// Run one turn for `message`.
    pub async fn execute(
        &self,
        message: &str,
        progress: &dyn TurnProgressNotifier,
    ) -> Result<TurnOutcome, TurnError> {
        if message.trim().is_empty() {
            return Err(TurnError::EmptyMessage);
        }

        let _guard = TurnGuard::acquire(&self.busy, &self.state).ok_or_else(|| {
            debug!("Rejecting turn: another turn is in flight");
            TurnError::Busy
        })?;

        let session_id = {
            let mut state = self.lock_state();
            state.last_error = None;
            state.log.append(Role::User, message);
            state.accumulator.begin()?;
            state.session_id.clone()
        };

        info!("Starting turn: {}", truncate(message, 80));
        self.conversation_logger.log(ConversationEvent::new(
            "turn_started",
            serde_json::json!({
                "app_id": self.app_id,
                "session_id": session_id.as_ref().map(SessionHandle::as_str),
                "message": message,
            }),
        ));
        progress.on_turn_start(message);

        let request = ChatRequest::new(&self.app_id, message).with_session(session_id);
        match self.stream_reply(request, progress).await {
            Ok((session_id, final_text)) => self.commit(session_id, final_text, progress),
            Err(e) => {
                self.fail(&e, progress);
                Err(e)
            }
        }
    }

    async fn stream_reply(
        &self,
        request: ChatRequest,
        progress: &dyn TurnProgressNotifier,
    ) -> Result<(SessionHandle, String), TurnError> {
        let ChatStream {
            session_id,
            mut events,
        } = self.client.chat_turn(request).await?;

        debug!("Turn accepted, session {}", session_id);

        while let Some(event) = events.recv().await {
            match event {
                StreamEvent::Delta(token) => {
                    let live = {
                        let mut state = self.lock_state();
                        state.accumulator.on_token(&token)?;
                        state.accumulator.live_text().to_string()
                    };
                    progress.on_token(&token, &live);
                }
                StreamEvent::Completed(final_text) => return Ok((session_id, final_text)),
                StreamEvent::Error(message) => return Err(ChatError::Remote(message).into()),
            }
        }

        Err(ChatError::StreamClosed.into())
    }

    fn commit(
        &self,
        session_id: SessionHandle,
        final_text: String,
        progress: &dyn TurnProgressNotifier,
    ) -> Result<TurnOutcome, TurnError> {
        let outcome = {
            let mut state = self.lock_state();
            let streamed = state.accumulator.live_text().to_string();
            let reply = state.accumulator.on_complete(final_text)?;
            state.log.append(Role::Assistant, reply.clone());
            state.accumulator.reset();
            state.session_id = Some(session_id.clone());
            TurnOutcome {
                reply,
                streamed,
                session_id,
            }
        };

        if outcome.streamed != outcome.reply {
            debug!(
                "Final text differs from streamed text ({} vs {} bytes)",
                outcome.reply.len(),
                outcome.streamed.len()
            );
        }
        info!("Turn completed ({} bytes)", outcome.reply.len());

        self.conversation_logger.log(ConversationEvent::new(
            "turn_completed",
            serde_json::json!({
                "app_id": self.app_id,
                "session_id": outcome.session_id.as_str(),
                "bytes": outcome.reply.len(),
                "text": outcome.reply,
            }),
        ));
        progress.on_turn_complete(&outcome.reply);

        Ok(outcome)
    }

    fn fail(&self, error: &TurnError, progress: &dyn TurnProgressNotifier) {
        let message = error.to_string();
        {
            let mut state = self.lock_state();
            if let Some(partial) = state.accumulator.discard() {
                debug!("Discarded {} streamed bytes", partial.len());
            }
            state.last_error = Some(message.clone());
        }

        warn!("Turn failed: {}", message);
        self.conversation_logger.log(ConversationEvent::new(
            "turn_failed",
            serde_json::json!({
                "app_id": self.app_id,
                "error": message,
            }),
        ));
        progress.on_turn_failed(&message);
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::chat_gateway::StreamHandle;
    use crate::ports::progress::NoTurnProgress;
    use async_trait::async_trait;
    use playground_domain::Position;
    use std::collections::VecDeque;
    use tokio::sync::{Notify, mpsc};

    // ==================== Test Mocks ====================

    /// One scripted reply: the handle to return and the events to stream.
    enum Scripted {
        Reply {
            session_id: &'static str,
            events: Vec<StreamEvent>,
        },
        Reject(&'static str),
    }

    struct MockClient {
        script: Mutex<VecDeque<Scripted>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl MockClient {
        fn new(script: Vec<Scripted>) -> Self {
            Self {
                script: Mutex::new(VecDeque::from(script)),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatClient for MockClient {
        async fn chat_turn(&self, request: ChatRequest) -> Result<ChatStream, ChatError> {
            self.requests.lock().unwrap().push(request);
            let next = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ChatError::Remote("No more replies".to_string()))?;
            match next {
                Scripted::Reject(message) => Err(ChatError::Remote(message.to_string())),
                Scripted::Reply { session_id, events } => {
                    let (tx, handle) = StreamHandle::channel(events.len() + 1);
                    for event in events {
                        tx.try_send(event).unwrap();
                    }
                    Ok(ChatStream {
                        session_id: SessionHandle::from(session_id),
                        events: handle,
                    })
                }
            }
        }
    }

    /// Client whose stream stays open until the test releases it.
    struct GatedClient {
        release: Arc<Notify>,
    }

    #[async_trait]
    impl ChatClient for GatedClient {
        async fn chat_turn(&self, _request: ChatRequest) -> Result<ChatStream, ChatError> {
            let (tx, rx) = mpsc::channel(4);
            let release = self.release.clone();
            tokio::spawn(async move {
                tx.send(StreamEvent::Delta("wait".into())).await.ok();
                release.notified().await;
                tx.send(StreamEvent::Completed("waited".into())).await.ok();
            });
            Ok(ChatStream {
                session_id: SessionHandle::from("gated"),
                events: StreamHandle::new(rx),
            })
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        events: Mutex<Vec<String>>,
    }

    impl RecordingProgress {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl TurnProgressNotifier for RecordingProgress {
        fn on_turn_start(&self, message: &str) {
            self.events.lock().unwrap().push(format!("start:{message}"));
        }
        fn on_token(&self, token: &str, live_text: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("token:{token}:{live_text}"));
        }
        fn on_turn_complete(&self, final_text: &str) {
            self.events.lock().unwrap().push(format!("done:{final_text}"));
        }
        fn on_turn_failed(&self, error: &str) {
            self.events.lock().unwrap().push(format!("failed:{error}"));
        }
    }

    #[derive(Default)]
    struct RecordingLogger {
        types: Mutex<Vec<&'static str>>,
    }

    impl ConversationLogger for RecordingLogger {
        fn log(&self, event: ConversationEvent) {
            self.types.lock().unwrap().push(event.event_type);
        }
    }

    fn reply(session_id: &'static str, tokens: &[&str], final_text: &str) -> Scripted {
        let mut events: Vec<_> = tokens
            .iter()
            .map(|t| StreamEvent::Delta(t.to_string()))
            .collect();
        events.push(StreamEvent::Completed(final_text.to_string()));
        Scripted::Reply { session_id, events }
    }

    // ==================== Tests ====================

    #[tokio::test]
    async fn test_streamed_tokens_are_live_but_final_text_is_committed() {
        let client = Arc::new(MockClient::new(vec![reply(
            "abc123",
            &["Hel", "lo"],
            "Hello!",
        )]));
        let orchestrator = TurnOrchestrator::new(client, "app-1");
        let progress = RecordingProgress::default();

        let outcome = orchestrator.execute("hi", &progress).await.unwrap();

        assert_eq!(outcome.streamed, "Hello");
        assert_eq!(outcome.reply, "Hello!");
        assert_eq!(
            progress.events(),
            vec![
                "start:hi",
                "token:Hel:Hel",
                "token:lo:Hello",
                "done:Hello!",
            ]
        );
        assert_eq!(
            orchestrator.messages(),
            vec![Message::user("hi"), Message::assistant("Hello!")]
        );
        assert_eq!(orchestrator.live_text(), "");
        assert!(!orchestrator.is_busy());
    }

    #[tokio::test]
    async fn test_user_message_is_displayed_left() {
        let client = Arc::new(MockClient::new(vec![reply("s", &[], "ok")]));
        let orchestrator = TurnOrchestrator::new(client, "app-1");

        orchestrator.execute("hi", &NoTurnProgress).await.unwrap();

        let positions: Vec<_> =
            orchestrator.with_log(|log| log.display_sequence().map(|r| r.position).collect());
        assert_eq!(positions, vec![Position::Left, Position::Right]);
    }

    #[tokio::test]
    async fn test_session_handle_is_threaded_into_next_turn() {
        let client = Arc::new(MockClient::new(vec![
            reply("abc123", &["a"], "first"),
            reply("abc123", &["b"], "second"),
        ]));
        let orchestrator = TurnOrchestrator::new(client.clone(), "app-1");

        orchestrator.execute("one", &NoTurnProgress).await.unwrap();
        assert_eq!(orchestrator.session_id(), Some(SessionHandle::from("abc123")));
        orchestrator.execute("two", &NoTurnProgress).await.unwrap();

        let requests = client.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].session_id, None);
        assert_eq!(requests[1].session_id, Some(SessionHandle::from("abc123")));
        assert_eq!(requests[1].app_id, "app-1");
        assert_eq!(requests[1].message, "two");
    }

    #[tokio::test]
    async fn test_rejected_call_surfaces_message_and_clears_busy() {
        let client = Arc::new(MockClient::new(vec![Scripted::Reject("network down")]));
        let logger = Arc::new(RecordingLogger::default());
        let orchestrator =
            TurnOrchestrator::new(client, "app-1").with_conversation_logger(logger.clone());
        let progress = RecordingProgress::default();

        let err = orchestrator.execute("hi", &progress).await.unwrap_err();

        assert_eq!(err.to_string(), "network down");
        assert_eq!(orchestrator.last_error().as_deref(), Some("network down"));
        assert!(!orchestrator.is_busy());
        assert_eq!(orchestrator.live_text(), "");
        // Only the user message is in the log
        assert_eq!(orchestrator.messages(), vec![Message::user("hi")]);
        assert_eq!(progress.events(), vec!["start:hi", "failed:network down"]);
        assert_eq!(
            *logger.types.lock().unwrap(),
            vec!["turn_started", "turn_failed"]
        );
    }

    #[tokio::test]
    async fn test_error_mid_stream_discards_partial_reply() {
        let client = Arc::new(MockClient::new(vec![
            Scripted::Reply {
                session_id: "abc123",
                events: vec![
                    StreamEvent::Delta("partial ".into()),
                    StreamEvent::Error("network down".into()),
                ],
            },
            reply("abc123", &["ok"], "ok"),
        ]));
        let orchestrator = TurnOrchestrator::new(client.clone(), "app-1");

        let err = orchestrator.execute("hi", &NoTurnProgress).await.unwrap_err();
        assert_eq!(err, TurnError::Chat(ChatError::Remote("network down".into())));
        assert_eq!(orchestrator.live_text(), "");
        assert_eq!(orchestrator.messages().len(), 1);
        // A failed turn never stores the handle
        assert_eq!(orchestrator.session_id(), None);

        // Manual retry works and clears the error
        orchestrator.execute("hi again", &NoTurnProgress).await.unwrap();
        assert_eq!(orchestrator.last_error(), None);
        assert_eq!(client.requests()[1].session_id, None);
    }

    #[tokio::test]
    async fn test_stream_closed_without_completion_is_an_error() {
        let client = Arc::new(MockClient::new(vec![Scripted::Reply {
            session_id: "s",
            events: vec![StreamEvent::Delta("dangling".into())],
        }]));
        let orchestrator = TurnOrchestrator::new(client, "app-1");

        let err = orchestrator.execute("hi", &NoTurnProgress).await.unwrap_err();
        assert_eq!(err, TurnError::Chat(ChatError::StreamClosed));
        assert_eq!(
            orchestrator.last_error().as_deref(),
            Some("Stream ended before completion")
        );
    }

    #[tokio::test]
    async fn test_blank_message_is_rejected_before_logging() {
        let client = Arc::new(MockClient::new(vec![]));
        let orchestrator = TurnOrchestrator::new(client.clone(), "app-1");

        let err = orchestrator.execute("   ", &NoTurnProgress).await.unwrap_err();
        assert_eq!(err, TurnError::EmptyMessage);
        assert!(orchestrator.messages().is_empty());
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn test_second_turn_while_busy_is_rejected() {
        let release = Arc::new(Notify::new());
        let client = Arc::new(GatedClient {
            release: release.clone(),
        });
        let orchestrator = Arc::new(TurnOrchestrator::new(client, "app-1"));

        let first = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.execute("first", &NoTurnProgress).await })
        };

        // Wait until the first turn is streaming
        while orchestrator.live_text() != "wait" {
            tokio::task::yield_now().await;
        }
        assert!(orchestrator.is_busy());

        let err = orchestrator
            .execute("second", &NoTurnProgress)
            .await
            .unwrap_err();
        assert_eq!(err, TurnError::Busy);

        release.notify_one();
        let outcome = first.await.unwrap().unwrap();
        assert_eq!(outcome.reply, "waited");
        assert!(!orchestrator.is_busy());
        // The rejected turn left no trace in the log
        assert_eq!(
            orchestrator.messages(),
            vec![Message::user("first"), Message::assistant("waited")]
        );
    }

    #[tokio::test]
    async fn test_dropping_an_in_flight_turn_discards_partial_reply() {
        let release = Arc::new(Notify::new());
        let client = Arc::new(GatedClient {
            release: release.clone(),
        });
        let orchestrator = TurnOrchestrator::new(client, "app-1");

        // The stream never completes, so the timeout drops the turn mid-reply
        let cancelled = tokio::time::timeout(
            std::time::Duration::from_millis(100),
            orchestrator.execute("first", &NoTurnProgress),
        )
        .await;
        assert!(cancelled.is_err());

        assert!(!orchestrator.is_busy());
        assert_eq!(orchestrator.live_text(), "");
        assert_eq!(orchestrator.messages(), vec![Message::user("first")]);
        assert!(orchestrator.session_id().is_none());

        // The next turn starts cleanly
        let orchestrator = Arc::new(orchestrator);
        let next = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.execute("second", &NoTurnProgress).await })
        };
        while orchestrator.live_text() != "wait" {
            tokio::task::yield_now().await;
        }
        release.notify_waiters();

        let outcome = next.await.unwrap().unwrap();
        assert_eq!(outcome.reply, "waited");
        assert!(!orchestrator.is_busy());
        assert_eq!(orchestrator.session_id(), Some(SessionHandle::from("gated")));
        assert_eq!(
            orchestrator.messages(),
            vec![
                Message::user("first"),
                Message::user("second"),
                Message::assistant("waited"),
            ]
        );
    }

    #[tokio::test]
    async fn test_for_session_requires_app_id() {
        let client = Arc::new(MockClient::new(vec![]));
        let config = SessionConfig::new("u", "w", "h", " ");
        assert!(TurnOrchestrator::for_session(client.clone(), &config).is_err());

        let config = SessionConfig::new("u", "w", "h", " support-bot ");
        let orchestrator = TurnOrchestrator::for_session(client, &config).unwrap();
        assert_eq!(orchestrator.app_id(), "support-bot");
    }
}
