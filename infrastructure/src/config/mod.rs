//! Configuration file loading for chat-playground
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `--config <path>` specified file
//! 2. `PLAYGROUND_*` environment variables
//! 3. Project root: `./playground.toml` or `./.playground.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/chat-playground/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileBridgeConfig, FileConfig, FileOfflineConfig, FileOutputConfig,
    FileSessionConfig, FileStreamConfig,
};
pub use loader::ConfigLoader;
