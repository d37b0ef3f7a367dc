//! CLI command definitions

use clap::Parser;
use std::path::PathBuf;

/// CLI arguments for chat-playground
#[derive(Parser, Debug)]
#[command(name = "chat-playground")]
#[command(author, version, about = "Interactive playground for a streaming chat SDK")]
#[command(long_about = r#"
Chat Playground identifies a user with the chat SDK, then runs an interactive
conversation against one application, streaming each reply as it arrives.

Identity fields and the app id can come from flags, config files or the
environment; anything still missing is asked for at startup.

Configuration files are loaded from (in priority order):
1. --config <path>        Explicit config file
2. PLAYGROUND_* env vars  e.g. PLAYGROUND_SESSION__APP_ID=support-bot
3. ./playground.toml      Project-level config
4. ~/.config/chat-playground/config.toml   Global config

Example:
  chat-playground --app-id support-bot
  chat-playground --offline --user-id demo --workspace-id 1 --hashed-user-id x --app-id echo
"#)]
pub struct Cli {
    /// User id to identify as
    #[arg(long, value_name = "ID")]
    pub user_id: Option<String>,

    /// Workspace the user belongs to
    #[arg(long, value_name = "ID")]
    pub workspace_id: Option<String>,

    /// Server-issued hash of the user id
    #[arg(long, value_name = "HASH")]
    pub hashed_user_id: Option<String>,

    /// Application to chat with
    #[arg(long, value_name = "ID")]
    pub app_id: Option<String>,

    /// Use the built-in echo gateway instead of the SDK bridge
    #[arg(long)]
    pub offline: bool,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Append a JSONL transcript of the conversation to this file
    #[arg(long, value_name = "PATH")]
    pub transcript: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}
