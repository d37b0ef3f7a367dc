//! Console rendering for the conversation transcript

use colored::Colorize;
use playground_domain::{ConversationLog, DisplayRecord, Position, SessionHandle};

/// Indent applied to right-hand (assistant) records
const RIGHT_MARGIN: &str = "                ";

/// Formats conversation records and status lines for the terminal
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Turn colored output off for the rest of the process.
    ///
    /// Passing `true` leaves the terminal auto-detection in place.
    pub fn set_color(enabled: bool) {
        if !enabled {
            colored::control::set_override(false);
        }
    }

    /// Title line for a record on the given side
    pub fn title(position: Position, title: &str) -> String {
        match position {
            Position::Left => format!("{}", title.cyan().bold()),
            Position::Right => format!("{}{}", RIGHT_MARGIN, title.green().bold()),
        }
    }

    /// Prefix for each body line on the given side
    pub fn body_prefix(position: Position) -> String {
        match position {
            Position::Left => "  ".to_string(),
            Position::Right => format!("{}  ", RIGHT_MARGIN),
        }
    }

    /// Format a single display record: title line, then the indented text
    pub fn format_record(record: &DisplayRecord<'_>) -> String {
        format!(
            "{}\n{}",
            Self::title(record.position, record.title),
            Self::indent(record.text, &Self::body_prefix(record.position))
        )
    }

    /// Format the whole log, oldest first
    pub fn format_log(log: &ConversationLog) -> String {
        if log.is_empty() {
            return format!("{}", "(no messages yet)".dimmed());
        }
        log.display_sequence()
            .map(|record| Self::format_record(&record))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// User-visible line for a failed identify or chat turn
    pub fn format_error(message: &str) -> String {
        format!("{} {}", "Error running the app:".red().bold(), message)
    }

    /// Summary printed by `/session`
    pub fn format_session(
        app_id: &str,
        session_id: Option<&SessionHandle>,
        messages: usize,
        last_error: Option<&str>,
    ) -> String {
        let mut output = String::new();
        output.push_str(&format!("{} {}\n", "App:".cyan().bold(), app_id));
        output.push_str(&format!(
            "{} {}\n",
            "Session:".cyan().bold(),
            session_id
                .map(SessionHandle::as_str)
                .unwrap_or("(not started)")
        ));
        output.push_str(&format!("{} {}", "Messages:".cyan().bold(), messages));
        if let Some(error) = last_error {
            output.push_str(&format!("\n{} {}", "Last error:".red().bold(), error));
        }
        output
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        if text.is_empty() {
            return prefix.trim_end().to_string();
        }
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
