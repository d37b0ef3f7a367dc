//! Domain error types

use crate::session::config::ConfigField;
use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("A reply is already streaming")]
    AlreadyStreaming,

    #[error("No reply is streaming")]
    NotStreaming,

    #[error("{0} is required")]
    MissingField(ConfigField),
}
