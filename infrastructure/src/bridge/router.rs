//! Message router for the SDK bridge connection.
//!
//! The bridge speaks JSON-RPC 2.0 over a single pair of byte streams (its
//! stdin/stdout). [`BridgeRouter`] runs one background reader task that owns
//! the read half and:
//!
//! - correlates responses with pending requests through `oneshot` channels
//! - routes `chat.*` notifications by `streamId` to the turn's stream
//! - rejects requests the bridge makes of us with "method not found"
//!
//! The reader never waits on a consumer. Each stream has an unbounded inbox
//! drained by its own forwarder task into the turn's bounded channel, so
//! tokens sent ahead of the `chat.stream` response queue up while the
//! response itself still gets through.
//!
//! When the reader ends, every pending request and open stream is dropped so
//! callers observe [`BridgeError::TransportClosed`] or a closed stream.

use super::error::{BridgeError, Result};
use super::protocol::{JsonRpcErrorOut, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use super::transport::{MessageKind, classify_message, read_frame, write_frame};
use playground_application::StreamHandle;
use playground_domain::StreamEvent;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, RwLock, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;
type SharedWriter = Arc<Mutex<BoxedWriter>>;
/// `std::sync::RwLock` so routes can be dropped from synchronous code.
type Routes = Arc<std::sync::RwLock<HashMap<String, mpsc::UnboundedSender<StreamEvent>>>>;
type Pending = Arc<RwLock<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;

/// Central router that multiplexes chat streams over one bridge connection.
pub struct BridgeRouter {
    reader_handle: JoinHandle<()>,
    routes: Routes,
    pending_responses: Pending,
    writer: SharedWriter,
    next_stream: AtomicU64,
    /// Bridge process, if we spawned one (killed on Drop)
    child: Option<Child>,
}

impl BridgeRouter {
    /// Spawn the bridge executable and connect to its stdio.
    pub fn spawn(command: &str, args: &[String]) -> Result<Arc<Self>> {
        debug!("Spawning chat bridge: {} {}", command, args.join(" "));

        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        // Linux: request kernel to send SIGTERM to child when parent dies.
        #[cfg(target_os = "linux")]
        unsafe {
            cmd.pre_exec(|| {
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                Ok(())
            });
        }

        let mut child = cmd.spawn().map_err(|source| BridgeError::Spawn {
            command: command.to_string(),
            source,
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::UnexpectedResponse("bridge stdout not captured".into()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BridgeError::UnexpectedResponse("bridge stdin not captured".into()))?;

        info!("Chat bridge started (pid {:?})", child.id());
        Ok(Self::start(stdout, stdin, Some(child)))
    }

    /// Build a router over an already-connected pair of streams.
    pub fn connect<R, W>(reader: R, writer: W) -> Arc<Self>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::start(reader, writer, None)
    }

    fn start<R, W>(reader: R, writer: W, child: Option<Child>) -> Arc<Self>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let routes: Routes = Arc::new(std::sync::RwLock::new(HashMap::new()));
        let pending_responses: Pending = Arc::new(RwLock::new(HashMap::new()));
        let writer: SharedWriter = Arc::new(Mutex::new(Box::new(writer)));

        let reader_handle = tokio::spawn(reader_loop(
            BufReader::new(reader),
            Arc::clone(&routes),
            Arc::clone(&pending_responses),
            Arc::clone(&writer),
        ));

        Arc::new(Self {
            reader_handle,
            routes,
            pending_responses,
            writer,
            next_stream: AtomicU64::new(1),
            child,
        })
    }

    /// Send a request and decode the correlated response's result.
    pub async fn request<T: DeserializeOwned>(&self, request: JsonRpcRequest) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        let request_id = request.id;

        self.pending_responses.write().await.insert(request_id, tx);

        if self.reader_handle.is_finished() {
            self.pending_responses.write().await.remove(&request_id);
            return Err(BridgeError::TransportClosed);
        }

        if let Err(e) = self.send(&request).await {
            self.pending_responses.write().await.remove(&request_id);
            return Err(e);
        }

        let response = rx.await.map_err(|_| BridgeError::TransportClosed)?;
        response.into_result()
    }

    async fn send(&self, request: &JsonRpcRequest) -> Result<()> {
        trace!("Router sending {} (id={})", request.method, request.id);
        let mut writer = self.writer.lock().await;
        write_frame(&mut *writer, request).await
    }

    /// Allocate a stream id and register its route.
    ///
    /// Must happen before the request that starts the stream goes out, so
    /// tokens arriving ahead of the response already have a route. Must be
    /// called inside a Tokio runtime.
    pub fn open_stream(&self, capacity: usize) -> (String, StreamHandle) {
        let stream_id = format!("s{}", self.next_stream.fetch_add(1, Ordering::SeqCst));
        let (tx, handle) = StreamHandle::channel(capacity);
        let (inbox, pending) = mpsc::unbounded_channel();
        tokio::spawn(forward_stream(stream_id.clone(), pending, tx));
        self.routes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(stream_id.clone(), inbox);
        debug!("Router: opened stream {}", stream_id);
        (stream_id, handle)
    }

    /// Drop a stream's route. Events arriving later are discarded.
    pub fn close_stream(&self, stream_id: &str) {
        let mut routes = self.routes.write().unwrap_or_else(|e| e.into_inner());
        if routes.remove(stream_id).is_some() {
            debug!("Router: closed stream {}", stream_id);
        }
    }

    /// Number of streams currently routed.
    pub fn open_streams(&self) -> usize {
        self.routes.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Drop for BridgeRouter {
    fn drop(&mut self) {
        self.reader_handle.abort();
        if let Some(child) = self.child.as_mut() {
            debug!("BridgeRouter dropping, killing bridge process");
            let _ = child.start_kill();
        }
    }
}

/// Background reader loop: single owner of the read half.
async fn reader_loop<R>(mut reader: BufReader<R>, routes: Routes, pending: Pending, writer: SharedWriter)
where
    R: AsyncRead + Unpin,
{
    loop {
        let body = match read_frame(&mut reader).await {
            Ok(Some(body)) => body,
            Ok(None) => {
                info!("Router: bridge closed its output");
                break;
            }
            Err(e) => {
                warn!("Router: failed to read frame: {}", e);
                break;
            }
        };

        let json: serde_json::Value = match serde_json::from_slice(&body) {
            Ok(v) => v,
            Err(e) => {
                warn!("Router: failed to parse JSON: {} ({})", e, String::from_utf8_lossy(&body));
                continue;
            }
        };
        trace!("Router received: {}", json);

        match classify_message(&json) {
            MessageKind::Response => {
                let response: JsonRpcResponse = match serde_json::from_value(json) {
                    Ok(r) => r,
                    Err(e) => {
                        warn!("Router: failed to parse response: {}", e);
                        continue;
                    }
                };
                let Some(id) = response.id else { continue };
                let sender = pending.write().await.remove(&id);
                match sender {
                    Some(tx) => {
                        let _ = tx.send(response);
                    }
                    None => debug!("Router: no pending receiver for response id={}", id),
                }
            }

            MessageKind::IncomingRequest { id } => {
                let method = json.get("method").and_then(|m| m.as_str()).unwrap_or("");
                debug!("Router: rejecting incoming request method={}", method);
                let reply = JsonRpcErrorOut::method_not_found(id, method);
                let mut w = writer.lock().await;
                if let Err(e) = write_frame(&mut *w, &reply).await {
                    warn!("Router: failed to reject request {}: {}", id, e);
                }
            }

            MessageKind::Notification => {
                let notification: JsonRpcNotification = match serde_json::from_value(json) {
                    Ok(n) => n,
                    Err(e) => {
                        warn!("Router: failed to parse notification: {}", e);
                        continue;
                    }
                };
                let method = notification.method.clone();
                let Some((stream_id, event)) = notification.into_stream_event() else {
                    trace!("Router: ignoring notification method={}", method);
                    continue;
                };
                route_event(&routes, stream_id, event);
            }
        }
    }

    // Dropping every sender wakes receivers with `None` / `RecvError`
    routes.write().unwrap_or_else(|e| e.into_inner()).clear();
    pending.write().await.clear();
}

fn route_event(routes: &Routes, stream_id: String, event: StreamEvent) {
    let terminal = event.is_terminal();
    let mut routes = routes.write().unwrap_or_else(|e| e.into_inner());

    let Some(inbox) = routes.get(&stream_id) else {
        debug!("Router: no route for stream {}, dropping event", stream_id);
        return;
    };

    let delivered = inbox.send(event).is_ok();
    if terminal || !delivered {
        routes.remove(&stream_id);
    }
}

/// Drain one stream's inbox into the turn's bounded channel.
///
/// A slow consumer backs up only its own inbox. Ends after the terminal
/// event or once either side goes away.
async fn forward_stream(
    stream_id: String,
    mut inbox: mpsc::UnboundedReceiver<StreamEvent>,
    tx: mpsc::Sender<StreamEvent>,
) {
    while let Some(event) = inbox.recv().await {
        let terminal = event.is_terminal();
        if tx.send(event).await.is_err() {
            debug!("Router: consumer of stream {} went away", stream_id);
            break;
        }
        if terminal {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::protocol::{ChatStreamResult, IdentifyResult, METHOD_CHAT_STREAM, METHOD_IDENTIFY};
    use serde_json::{Value, json};
    use tokio::io::{DuplexStream, ReadHalf, WriteHalf};

    /// The far end of a duplex pipe, playing the bridge.
    struct FakeBridge {
        reader: BufReader<ReadHalf<DuplexStream>>,
        writer: WriteHalf<DuplexStream>,
    }

    impl FakeBridge {
        async fn next(&mut self) -> Value {
            let body = read_frame(&mut self.reader).await.unwrap().unwrap();
            serde_json::from_slice(&body).unwrap()
        }

        async fn send(&mut self, value: Value) {
            write_frame(&mut self.writer, &value).await.unwrap();
        }
    }

    fn pair() -> (Arc<BridgeRouter>, FakeBridge) {
        let (client, server) = tokio::io::duplex(4096);
        let (client_r, client_w) = tokio::io::split(client);
        let (server_r, server_w) = tokio::io::split(server);
        let router = BridgeRouter::connect(client_r, client_w);
        (
            router,
            FakeBridge {
                reader: BufReader::new(server_r),
                writer: server_w,
            },
        )
    }

    #[tokio::test]
    async fn request_correlates_response_by_id() {
        let (router, mut bridge) = pair();

        let request = JsonRpcRequest::new(METHOD_IDENTIFY, json!({ "userId": "u" })).unwrap();
        let id = request.id;
        let call = tokio::spawn({
            let router = Arc::clone(&router);
            async move { router.request::<IdentifyResult>(request).await }
        });

        let seen = bridge.next().await;
        assert_eq!(seen["method"], "identify");
        assert_eq!(seen["id"], id);

        // A stray response for another id is ignored
        bridge.send(json!({ "jsonrpc": "2.0", "id": id + 1000, "result": {} })).await;
        bridge
            .send(json!({ "jsonrpc": "2.0", "id": id, "result": { "clientId": "c-9" } }))
            .await;

        let result = call.await.unwrap().unwrap();
        assert_eq!(result.client_id, "c-9");
    }

    #[tokio::test]
    async fn tokens_before_the_response_are_not_lost() {
        let (router, mut bridge) = pair();
        let (stream_id, mut handle) = router.open_stream(8);

        let request = JsonRpcRequest::new(
            METHOD_CHAT_STREAM,
            json!({ "clientId": "c", "appId": "a", "message": "Hi", "streamId": stream_id }),
        )
        .unwrap();
        let call = tokio::spawn({
            let router = Arc::clone(&router);
            async move { router.request::<ChatStreamResult>(request).await }
        });

        let seen = bridge.next().await;
        let sid = seen["params"]["streamId"].clone();
        bridge
            .send(json!({ "method": "chat.token", "params": { "streamId": sid, "token": "Hel" } }))
            .await;
        bridge
            .send(json!({ "id": seen["id"], "result": { "sessionId": "abc123" } }))
            .await;
        bridge
            .send(json!({ "method": "chat.token", "params": { "streamId": sid, "token": "lo" } }))
            .await;
        bridge
            .send(json!({ "method": "chat.completed", "params": { "streamId": sid, "result": "Hello!" } }))
            .await;

        assert_eq!(call.await.unwrap().unwrap().session_id, "abc123");
        assert_eq!(handle.recv().await, Some(StreamEvent::Delta("Hel".into())));
        assert_eq!(handle.recv().await, Some(StreamEvent::Delta("lo".into())));
        assert_eq!(
            handle.recv().await,
            Some(StreamEvent::Completed("Hello!".into()))
        );
        // Terminal event removes the route and closes the channel
        assert_eq!(handle.recv().await, None);
        assert_eq!(router.open_streams(), 0);
    }

    #[tokio::test]
    async fn more_early_tokens_than_capacity_do_not_block_the_response() {
        let (router, mut bridge) = pair();
        let (stream_id, mut handle) = router.open_stream(2);

        let request = JsonRpcRequest::new(
            METHOD_CHAT_STREAM,
            json!({ "clientId": "c", "appId": "a", "message": "Hi", "streamId": stream_id }),
        )
        .unwrap();
        let call = tokio::spawn({
            let router = Arc::clone(&router);
            async move { router.request::<ChatStreamResult>(request).await }
        });

        let seen = bridge.next().await;
        let sid = seen["params"]["streamId"].clone();
        for token in ["a", "b", "c", "d", "e"] {
            bridge
                .send(json!({ "method": "chat.token", "params": { "streamId": sid, "token": token } }))
                .await;
        }
        bridge
            .send(json!({ "id": seen["id"], "result": { "sessionId": "abc123" } }))
            .await;

        let started = tokio::time::timeout(std::time::Duration::from_secs(2), call)
            .await
            .expect("chat.stream response was not delivered")
            .unwrap()
            .unwrap();
        assert_eq!(started.session_id, "abc123");

        bridge
            .send(json!({ "method": "chat.completed", "params": { "streamId": sid, "result": "abcde" } }))
            .await;

        let mut streamed = String::new();
        loop {
            match handle.recv().await {
                Some(StreamEvent::Delta(token)) => streamed.push_str(&token),
                Some(StreamEvent::Completed(text)) => {
                    assert_eq!(text, "abcde");
                    break;
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }
        assert_eq!(streamed, "abcde");
        assert_eq!(handle.recv().await, None);
    }

    #[tokio::test]
    async fn streams_are_routed_independently() {
        let (router, mut bridge) = pair();
        let (first_id, mut first) = router.open_stream(4);
        let (second_id, mut second) = router.open_stream(4);
        assert_ne!(first_id, second_id);

        bridge
            .send(json!({ "method": "chat.error", "params": { "streamId": second_id, "message": "quota exceeded" } }))
            .await;
        bridge
            .send(json!({ "method": "chat.completed", "params": { "streamId": first_id, "result": "ok" } }))
            .await;

        assert_eq!(
            second.recv().await,
            Some(StreamEvent::Error("quota exceeded".into()))
        );
        assert_eq!(first.recv().await, Some(StreamEvent::Completed("ok".into())));
    }

    #[tokio::test]
    async fn rpc_error_surfaces_message() {
        let (router, mut bridge) = pair();
        let request = JsonRpcRequest::new(METHOD_IDENTIFY, json!({})).unwrap();
        let call = tokio::spawn({
            let router = Arc::clone(&router);
            async move { router.request::<IdentifyResult>(request).await }
        });

        let seen = bridge.next().await;
        bridge
            .send(json!({ "id": seen["id"], "error": { "code": 401, "message": "Invalid hashed user id" } }))
            .await;

        let err = call.await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "Invalid hashed user id");
    }

    #[tokio::test]
    async fn closing_the_bridge_fails_pending_work() {
        let (router, mut bridge) = pair();
        let (_stream_id, mut handle) = router.open_stream(4);
        let request = JsonRpcRequest::new(METHOD_IDENTIFY, json!({})).unwrap();
        let call = tokio::spawn({
            let router = Arc::clone(&router);
            async move { router.request::<IdentifyResult>(request).await }
        });

        let _ = bridge.next().await;
        drop(bridge);

        assert!(matches!(
            call.await.unwrap(),
            Err(BridgeError::TransportClosed)
        ));
        assert_eq!(handle.recv().await, None);
    }

    #[tokio::test]
    async fn closed_stream_drops_late_events() {
        let (router, mut bridge) = pair();
        let (stream_id, mut handle) = router.open_stream(4);
        router.close_stream(&stream_id);

        bridge
            .send(json!({ "method": "chat.token", "params": { "streamId": stream_id, "token": "late" } }))
            .await;
        assert_eq!(handle.recv().await, None);
    }

    #[tokio::test]
    async fn incoming_requests_are_rejected() {
        let (_router, mut bridge) = pair();
        bridge
            .send(json!({ "jsonrpc": "2.0", "id": 77, "method": "client.ping" }))
            .await;

        let reply = bridge.next().await;
        assert_eq!(reply["id"], 77);
        assert_eq!(reply["error"]["code"], -32601);
    }
}
