//! In-process chat gateway for running without the SDK bridge

mod gateway;

pub use gateway::{DEFAULT_FINAL_SUFFIX, EchoClient, EchoGateway};
