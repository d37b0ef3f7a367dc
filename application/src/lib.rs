//! Application layer for chat-playground
//!
//! This crate contains use cases and port definitions.
//! It depends only on the domain layer.

pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use ports::{
    chat_gateway::{
        ChatClient, ChatError, ChatGateway, ChatRequest, ChatStream, DEFAULT_STREAM_CAPACITY,
        IdentityError, StreamHandle,
    },
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    progress::{NoTurnProgress, TurnProgressNotifier},
};
pub use use_cases::identify::IdentifyUseCase;
pub use use_cases::run_turn::{TurnError, TurnOrchestrator, TurnOutcome};
