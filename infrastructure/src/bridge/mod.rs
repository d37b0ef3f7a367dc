//! SDK bridge adapter
//!
//! The vendor chat SDK runs inside a separate bridge process. This module
//! spawns it and speaks JSON-RPC 2.0 over its stdio.

pub mod error;
pub mod gateway;
pub mod protocol;
pub mod router;
pub mod transport;

pub use error::BridgeError;
pub use gateway::{BridgeClient, BridgeGateway};
pub use router::BridgeRouter;
