//! Infrastructure layer for chat-playground
//!
//! Adapters for the application ports: the SDK bridge and offline chat
//! gateways, the JSONL transcript writer, and configuration file loading.

pub mod bridge;
pub mod config;
pub mod logging;
pub mod offline;

pub use bridge::{BridgeClient, BridgeError, BridgeGateway, BridgeRouter};
pub use config::{ConfigLoader, ConfigValidationError, FileConfig};
pub use logging::JsonlTranscriptLogger;
pub use offline::{EchoClient, EchoGateway};
