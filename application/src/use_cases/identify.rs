//! Identify use case.
//!
//! Validates the identity fields of a [`SessionConfig`] and exchanges them
//! with the SDK for a [`ChatClient`].

use crate::ports::chat_gateway::{ChatClient, ChatGateway, IdentityError};
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use playground_domain::{DomainError, SessionConfig};
use std::sync::Arc;
use tracing::{info, warn};

/// Use case for the one-shot identify step
#[derive(Clone)]
pub struct IdentifyUseCase {
    gateway: Arc<dyn ChatGateway>,
    conversation_logger: Arc<dyn ConversationLogger>,
}

impl IdentifyUseCase {
    pub fn new(gateway: Arc<dyn ChatGateway>) -> Self {
        Self {
            gateway,
            conversation_logger: Arc::new(NoConversationLogger),
        }
    }

    /// Create with a conversation logger.
    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    pub async fn execute(
        &self,
        config: &SessionConfig,
    ) -> Result<Arc<dyn ChatClient>, IdentityError> {
        config.validate_identity().map_err(|e| match e {
            DomainError::MissingField(field) => IdentityError::MissingField(field),
            other => IdentityError::Rejected(other.to_string()),
        })?;

        info!("Identifying user {} in workspace {}", config.user_id, config.workspace_id);

        match self.gateway.identify(config).await {
            Ok(client) => {
                self.conversation_logger.log(ConversationEvent::new(
                    "identified",
                    serde_json::json!({
                        "user_id": config.user_id,
                        "workspace_id": config.workspace_id,
                    }),
                ));
                Ok(client)
            }
            Err(e) => {
                warn!("Identify failed: {}", e);
                self.conversation_logger.log(ConversationEvent::new(
                    "identify_failed",
                    serde_json::json!({ "error": e.to_string() }),
                ));
                Err(e)
            }
        }
    }
}
