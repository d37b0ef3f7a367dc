//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into domain types where needed.

use playground_application::DEFAULT_STREAM_CAPACITY;
use playground_domain::SessionConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("stream.channel_capacity cannot be 0")]
    ZeroChannelCapacity,

    #[error("session.{0} is set but blank")]
    BlankSessionField(&'static str),

    #[error("bridge.command cannot be empty")]
    EmptyBridgeCommand,
}

/// Raw session configuration from TOML
///
/// Every field is optional; whatever is missing is asked for interactively.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSessionConfig {
    pub user_id: Option<String>,
    pub workspace_id: Option<String>,
    pub hashed_user_id: Option<String>,
    pub app_id: Option<String>,
}

impl FileSessionConfig {
    /// Build a domain [`SessionConfig`], leaving absent fields blank
    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig::new(
            self.user_id.clone().unwrap_or_default(),
            self.workspace_id.clone().unwrap_or_default(),
            self.hashed_user_id.clone().unwrap_or_default(),
            self.app_id.clone().unwrap_or_default(),
        )
    }

    fn fields(&self) -> [(&'static str, &Option<String>); 4] {
        [
            ("user_id", &self.user_id),
            ("workspace_id", &self.workspace_id),
            ("hashed_user_id", &self.hashed_user_id),
            ("app_id", &self.app_id),
        ]
    }
}

/// Raw SDK bridge configuration from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBridgeConfig {
    /// Executable that wraps the chat SDK and speaks JSON-RPC on stdio
    pub command: String,
    /// Extra arguments passed to the bridge
    pub args: Vec<String>,
}

impl Default for FileBridgeConfig {
    fn default() -> Self {
        Self {
            command: "chat-bridge".to_string(),
            args: Vec::new(),
        }
    }
}

/// Raw streaming configuration from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStreamConfig {
    /// Capacity of each turn's event channel
    pub channel_capacity: usize,
}

impl Default for FileStreamConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_STREAM_CAPACITY,
        }
    }
}

/// Raw offline gateway configuration from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOfflineConfig {
    /// Text prepended to the echoed message
    pub reply_prefix: String,
    /// Text added to the completed reply but never streamed
    pub final_suffix: String,
    /// Delay between streamed tokens
    pub token_delay_ms: u64,
}

impl Default for FileOfflineConfig {
    fn default() -> Self {
        Self {
            reply_prefix: "Echo: ".to_string(),
            final_suffix: crate::offline::DEFAULT_FINAL_SUFFIX.to_string(),
            token_delay_ms: 30,
        }
    }
}

/// Raw output configuration from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOutputConfig {
    /// Enable colored terminal output
    pub color: bool,
    /// Write a JSONL conversation transcript to this path
    pub transcript: Option<PathBuf>,
}

impl Default for FileOutputConfig {
    fn default() -> Self {
        Self {
            color: true,
            transcript: None,
        }
    }
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Identity and application settings
    pub session: FileSessionConfig,
    /// SDK bridge process settings
    pub bridge: FileBridgeConfig,
    /// Streaming settings
    pub stream: FileStreamConfig,
    /// Offline gateway settings
    pub offline: FileOfflineConfig,
    /// Output settings
    pub output: FileOutputConfig,
}

impl FileConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.stream.channel_capacity == 0 {
            return Err(ConfigValidationError::ZeroChannelCapacity);
        }

        for (name, value) in self.session.fields() {
            if let Some(v) = value
                && v.trim().is_empty()
            {
                return Err(ConfigValidationError::BlankSessionField(name));
            }
        }

        if self.bridge.command.trim().is_empty() {
            return Err(ConfigValidationError::EmptyBridgeCommand);
        }

        Ok(())
    }
}
