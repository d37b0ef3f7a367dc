//! REPL (Read-Eval-Print Loop) for interactive chat

use crate::ConsoleFormatter;
use crate::StreamPrinter;
use colored::Colorize;
use playground_application::{TurnError, TurnOrchestrator, TurnProgressNotifier};
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};
use std::sync::Arc;
use tracing::debug;

/// Slash commands understood by the REPL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Help,
    History,
    Session,
    Quit,
    Unknown(String),
}

impl ReplCommand {
    /// Parse a line starting with `/`
    pub fn parse(line: &str) -> Self {
        match line.split_whitespace().next().unwrap_or(line) {
            "/quit" | "/exit" | "/q" => ReplCommand::Quit,
            "/help" | "/h" | "/?" => ReplCommand::Help,
            "/history" => ReplCommand::History,
            "/session" => ReplCommand::Session,
            other => ReplCommand::Unknown(other.to_string()),
        }
    }
}

/// Interactive chat REPL
pub struct ChatRepl {
    orchestrator: Arc<TurnOrchestrator>,
    user_label: String,
    show_progress: bool,
}

impl ChatRepl {
    pub fn new(orchestrator: Arc<TurnOrchestrator>) -> Self {
        Self {
            orchestrator,
            user_label: String::new(),
            show_progress: true,
        }
    }

    /// Name shown in the welcome banner
    pub fn with_user_label(mut self, label: impl Into<String>) -> Self {
        self.user_label = label.into();
        self
    }

    /// Set whether to show the waiting spinner
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Run the interactive REPL
    pub async fn run(&self) -> RlResult<()> {
        let mut rl = DefaultEditor::new()?;

        let history_path = dirs::data_dir().map(|p| p.join("chat-playground").join("history.txt"));

        if let Some(ref path) = history_path {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let _ = rl.load_history(path);
        }

        self.print_welcome();

        loop {
            match rl.readline("You> ") {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    if line.starts_with('/') {
                        if self.handle_command(ReplCommand::parse(line)) {
                            break;
                        }
                        continue;
                    }

                    let _ = rl.add_history_entry(line);
                    self.process_message(line).await;
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("Bye!");
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {:?}", err);
                    break;
                }
            }
        }

        if let Some(ref path) = history_path {
            let _ = rl.save_history(path);
        }

        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("╭─────────────────────────────────────────────╮");
        println!("│              Chat Playground                │");
        println!("╰─────────────────────────────────────────────╯");
        println!();
        if !self.user_label.is_empty() {
            println!("{} {}", "User:".cyan().bold(), self.user_label);
        }
        println!("{} {}", "App:".cyan().bold(), self.orchestrator.app_id());
        println!();
        Self::print_help();
    }

    fn print_help() {
        println!("Commands:");
        println!("  /help, /h, /?     - Show this help");
        println!("  /history          - Show the conversation so far");
        println!("  /session          - Show app, session id and last error");
        println!("  /quit, /exit, /q  - Exit chat");
        println!();
    }

    /// Handle slash commands. Returns true if should exit.
    fn handle_command(&self, command: ReplCommand) -> bool {
        match command {
            ReplCommand::Quit => {
                println!("Bye!");
                true
            }
            ReplCommand::Help => {
                println!();
                Self::print_help();
                false
            }
            ReplCommand::History => {
                let text = self.orchestrator.with_log(ConsoleFormatter::format_log);
                println!();
                println!("{}", text);
                println!();
                false
            }
            ReplCommand::Session => {
                let session_id = self.orchestrator.session_id();
                let last_error = self.orchestrator.last_error();
                let messages = self.orchestrator.with_log(|log| log.len());
                println!();
                println!(
                    "{}",
                    ConsoleFormatter::format_session(
                        self.orchestrator.app_id(),
                        session_id.as_ref(),
                        messages,
                        last_error.as_deref(),
                    )
                );
                println!();
                false
            }
            ReplCommand::Unknown(cmd) => {
                println!("Unknown command: {}", cmd);
                println!("Type /help for available commands");
                false
            }
        }
    }

    async fn process_message(&self, message: &str) {
        println!();
        let printer = StreamPrinter::new().with_spinner(self.show_progress);

        tokio::select! {
            result = self.orchestrator.execute(message, &printer) => match result {
                Ok(outcome) => debug!("Reply committed ({} bytes)", outcome.reply.len()),
                Err(TurnError::EmptyMessage) => {}
                Err(e) => eprintln!("{}", ConsoleFormatter::format_error(&e.to_string())),
            },
            _ = tokio::signal::ctrl_c() => {
                // Dropping the turn future discards the partial reply
                printer.on_turn_failed("cancelled");
                println!("^C (reply cancelled)");
            }
        }
        println!();
    }
}
