//! Chat gateway backed by the SDK bridge process

use super::protocol::{
    ChatStreamParams, ChatStreamResult, IdentifyParams, IdentifyResult, JsonRpcRequest,
    METHOD_CHAT_STREAM, METHOD_IDENTIFY,
};
use super::router::BridgeRouter;
use super::error::Result;
use async_trait::async_trait;
use playground_application::{
    ChatClient, ChatError, ChatGateway, ChatRequest, ChatStream, DEFAULT_STREAM_CAPACITY,
    IdentityError,
};
use playground_domain::{SessionConfig, SessionHandle};
use std::sync::Arc;
use tracing::{debug, info};

/// [`ChatGateway`] implementation that forwards to the bridge over JSON-RPC
pub struct BridgeGateway {
    router: Arc<BridgeRouter>,
    channel_capacity: usize,
}

impl BridgeGateway {
    /// Spawn the bridge executable and build a gateway on its stdio
    pub fn spawn(command: &str, args: &[String]) -> Result<Self> {
        let router = BridgeRouter::spawn(command, args)?;
        info!("BridgeGateway initialized");
        Ok(Self::with_router(router))
    }

    /// Create a gateway over an existing router
    pub fn with_router(router: Arc<BridgeRouter>) -> Self {
        Self {
            router,
            channel_capacity: DEFAULT_STREAM_CAPACITY,
        }
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }
}

#[async_trait]
impl ChatGateway for BridgeGateway {
    async fn identify(&self, config: &SessionConfig) -> std::result::Result<Arc<dyn ChatClient>, IdentityError> {
        let params = IdentifyParams {
            user_id: &config.user_id,
            workspace_id: &config.workspace_id,
            hashed_user_id: &config.hashed_user_id,
        };
        let request = JsonRpcRequest::new(METHOD_IDENTIFY, &params)?;
        let result: IdentifyResult = self.router.request(request).await?;
        debug!("Identified as client {}", result.client_id);

        Ok(Arc::new(BridgeClient {
            router: Arc::clone(&self.router),
            client_id: result.client_id,
            channel_capacity: self.channel_capacity,
        }))
    }
}

/// An identified bridge client
pub struct BridgeClient {
    router: Arc<BridgeRouter>,
    client_id: String,
    channel_capacity: usize,
}

#[async_trait]
impl ChatClient for BridgeClient {
    async fn chat_turn(&self, request: ChatRequest) -> std::result::Result<ChatStream, ChatError> {
        let (stream_id, events) = self.router.open_stream(self.channel_capacity);

        let params = ChatStreamParams {
            client_id: &self.client_id,
            app_id: &request.app_id,
            message: &request.message,
            session_id: request.session_id.as_ref().map(|s| s.as_str()),
            stream_id: &stream_id,
        };

        let started = match JsonRpcRequest::new(METHOD_CHAT_STREAM, &params) {
            Ok(rpc) => self.router.request::<ChatStreamResult>(rpc).await,
            Err(e) => Err(e),
        };

        match started {
            Ok(result) => {
                debug!("Stream {} started for session {}", stream_id, result.session_id);
                Ok(ChatStream {
                    session_id: SessionHandle::new(result.session_id),
                    events,
                })
            }
            Err(e) => {
                self.router.close_stream(&stream_id);
                Err(e.into())
            }
        }
    }
}
