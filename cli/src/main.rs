//! CLI entrypoint for Chat Playground
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use playground_application::{
    ChatClient, ChatGateway, ConversationLogger, IdentifyUseCase, NoConversationLogger,
    TurnOrchestrator,
};
use playground_domain::{ConfigField, SessionConfig};
use playground_infrastructure::{
    BridgeGateway, ConfigLoader, EchoGateway, FileConfig, JsonlTranscriptLogger,
};
use playground_presentation::{
    ChatRepl, Cli, ConsoleFormatter, LinePrompt, app_form, correct_identity, identity_form,
};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if cli.show_config {
        ConfigLoader::print_config_sources();
        return Ok(ExitCode::SUCCESS);
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).map_err(|e| anyhow!("Invalid configuration: {}", e))?
    };
    config.validate().context("Invalid configuration")?;

    ConsoleFormatter::set_color(config.output.color && !cli.no_color);
    info!("Starting Chat Playground");

    let mut session = merge_session(&config, &cli);

    let transcript_path = cli.transcript.clone().or_else(|| config.output.transcript.clone());
    let conversation_logger: Arc<dyn ConversationLogger> = match transcript_path
        .and_then(JsonlTranscriptLogger::open)
    {
        Some(logger) => Arc::new(logger),
        None => Arc::new(NoConversationLogger),
    };

    // === Dependency Injection ===
    let gateway = build_gateway(&cli, &config)?;

    let mut editor = DefaultEditor::new()?;
    match identity_form(&mut session, &mut editor) {
        Ok(()) => {}
        Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
            println!("Bye!");
            return Ok(ExitCode::SUCCESS);
        }
        Err(e) => return Err(e.into()),
    }

    let identify = IdentifyUseCase::new(gateway).with_conversation_logger(conversation_logger.clone());
    let client = match identify_until_accepted(&identify, &mut session, &mut editor).await? {
        Some(client) => client,
        None => return Ok(ExitCode::FAILURE),
    };

    match app_form(&mut session, &mut editor) {
        Ok(()) => {}
        Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
            println!("Bye!");
            return Ok(ExitCode::SUCCESS);
        }
        Err(e) => return Err(e.into()),
    }
    drop(editor);

    let orchestrator = TurnOrchestrator::for_session(client, &session)?
        .with_conversation_logger(conversation_logger);

    ChatRepl::new(Arc::new(orchestrator))
        .with_user_label(session.user_id.clone())
        .with_progress(std::io::stdout().is_terminal())
        .run()
        .await?;

    Ok(ExitCode::SUCCESS)
}

/// Identify, re-showing the identity form after each correctable rejection.
///
/// `None` means the user gave up or the SDK is unreachable; the error has
/// already been printed.
async fn identify_until_accepted(
    identify: &IdentifyUseCase,
    session: &mut SessionConfig,
    input: &mut dyn LinePrompt,
) -> Result<Option<Arc<dyn ChatClient>>> {
    loop {
        let err = match identify.execute(session).await {
            Ok(client) => return Ok(Some(client)),
            Err(e) => e,
        };
        eprintln!("{}", ConsoleFormatter::format_error(&err.to_string()));
        if !err.is_correctable() {
            return Ok(None);
        }

        match correct_identity(session, input) {
            Ok(()) => {}
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                println!("Bye!");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Config file values, overridden field by field with CLI flags
fn merge_session(config: &FileConfig, cli: &Cli) -> SessionConfig {
    let mut session = config.session.to_session_config();
    let overrides = [
        (ConfigField::UserId, &cli.user_id),
        (ConfigField::WorkspaceId, &cli.workspace_id),
        (ConfigField::HashedUserId, &cli.hashed_user_id),
        (ConfigField::AppId, &cli.app_id),
    ];
    for (field, value) in overrides {
        if let Some(value) = value {
            session.set(field, value.trim());
        }
    }
    session
}

fn build_gateway(cli: &Cli, config: &FileConfig) -> Result<Arc<dyn ChatGateway>> {
    let capacity = config.stream.channel_capacity;

    if cli.offline {
        info!("Using offline echo gateway");
        let gateway = EchoGateway::new()
            .with_reply_prefix(config.offline.reply_prefix.clone())
            .with_final_suffix(config.offline.final_suffix.clone())
            .with_token_delay(Duration::from_millis(config.offline.token_delay_ms))
            .with_channel_capacity(capacity);
        return Ok(Arc::new(gateway));
    }

    let gateway = BridgeGateway::spawn(&config.bridge.command, &config.bridge.args)
        .inspect_err(|_| warn!("Use --offline to run without the chat bridge"))?
        .with_channel_capacity(capacity);
    Ok(Arc::new(gateway))
}
