//! JSON-RPC protocol types for the SDK bridge.
//!
//! # Protocol Overview
//!
//! - **Requests** (client → bridge): `identify`, `chat.stream`
//! - **Responses** (bridge → client): result or error, correlated by `id`
//! - **Notifications** (bridge → client): `chat.token`, `chat.completed`,
//!   `chat.error`, each tagged with the `streamId` the client chose

use super::error::BridgeError;
use playground_domain::StreamEvent;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicU64, Ordering};

pub const METHOD_IDENTIFY: &str = "identify";
pub const METHOD_CHAT_STREAM: &str = "chat.stream";
pub const NOTIFY_TOKEN: &str = "chat.token";
pub const NOTIFY_COMPLETED: &str = "chat.completed";
pub const NOTIFY_ERROR: &str = "chat.error";

/// JSON-RPC "method not found"
pub const METHOD_NOT_FOUND: i64 = -32601;

static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    REQUEST_ID.fetch_add(1, Ordering::SeqCst)
}

/// JSON-RPC request
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl JsonRpcRequest {
    /// Create a request with a fresh id.
    pub fn new(method: &'static str, params: impl Serialize) -> Result<Self, BridgeError> {
        Ok(Self {
            jsonrpc: "2.0",
            id: next_id(),
            method,
            params: Some(serde_json::to_value(params)?),
        })
    }
}

/// JSON-RPC response
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    pub id: Option<u64>,
    pub result: Option<serde_json::Value>,
    pub error: Option<RpcError>,
}

impl JsonRpcResponse {
    /// Decode the result as `T`, or surface the error object.
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T, BridgeError> {
        if let Some(err) = self.error {
            return Err(BridgeError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        let value = self.result.unwrap_or(serde_json::Value::Null);
        serde_json::from_value(value).map_err(|e| {
            BridgeError::UnexpectedResponse(format!("malformed result: {}", e))
        })
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// Error response we send back for requests the bridge makes of us
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcErrorOut {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub error: RpcError,
}

impl JsonRpcErrorOut {
    pub fn method_not_found(id: u64, method: &str) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            error: RpcError {
                code: METHOD_NOT_FOUND,
                message: format!("Method not found: {}", method),
            },
        }
    }
}

/// Notification from the bridge
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcNotification {
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyParams<'a> {
    pub user_id: &'a str,
    pub workspace_id: &'a str,
    pub hashed_user_id: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyResult {
    pub client_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatStreamParams<'a> {
    pub client_id: &'a str,
    pub app_id: &'a str,
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<&'a str>,
    pub stream_id: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatStreamResult {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenParams {
    stream_id: String,
    token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompletedParams {
    stream_id: String,
    result: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorParams {
    stream_id: String,
    message: String,
}

impl JsonRpcNotification {
    /// Decode a streaming notification into its stream id and event.
    ///
    /// Returns `None` for methods this client does not handle or params
    /// that do not match the method's shape.
    pub fn into_stream_event(self) -> Option<(String, StreamEvent)> {
        let params = self.params;
        match self.method.as_str() {
            NOTIFY_TOKEN => serde_json::from_value::<TokenParams>(params)
                .ok()
                .map(|p| (p.stream_id, StreamEvent::Delta(p.token))),
            NOTIFY_COMPLETED => serde_json::from_value::<CompletedParams>(params)
                .ok()
                .map(|p| (p.stream_id, StreamEvent::Completed(p.result))),
            NOTIFY_ERROR => serde_json::from_value::<ErrorParams>(params)
                .ok()
                .map(|p| (p.stream_id, StreamEvent::Error(p.message))),
            _ => None,
        }
    }
}
