//! Live rendering of a streaming reply

use crate::output::console::ConsoleFormatter;
use indicatif::{ProgressBar, ProgressStyle};
use playground_application::TurnProgressNotifier;
use playground_domain::{DisplayRecord, Position};
use std::io::Write;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
struct PrinterState {
    spinner: Option<ProgressBar>,
    /// Text already written to the terminal for this turn
    printed: String,
    /// Whether the current output line still needs its body prefix
    at_line_start: bool,
}

/// Prints each token as it arrives, with a spinner until the first one.
///
/// The committed reply is the server-final text. When it differs from what
/// was streamed, the final text is printed again under a marker.
pub struct StreamPrinter {
    show_spinner: bool,
    state: Mutex<PrinterState>,
}

impl StreamPrinter {
    pub fn new() -> Self {
        Self {
            show_spinner: true,
            state: Mutex::new(PrinterState::default()),
        }
    }

    /// Set whether to show the waiting spinner
    pub fn with_spinner(mut self, show: bool) -> Self {
        self.show_spinner = show;
        self
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PrinterState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Render `text` with the assistant body prefix at every line start.
    fn render(state: &mut PrinterState, text: &str) -> String {
        let prefix = ConsoleFormatter::body_prefix(Position::Right);
        let mut out = String::with_capacity(text.len());
        for ch in text.chars() {
            if state.at_line_start {
                out.push_str(&prefix);
                state.at_line_start = false;
            }
            out.push(ch);
            if ch == '\n' {
                state.at_line_start = true;
            }
        }
        out
    }

    fn clear_spinner(state: &mut PrinterState) {
        if let Some(spinner) = state.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

impl Default for StreamPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnProgressNotifier for StreamPrinter {
    fn on_turn_start(&self, _message: &str) {
        let mut state = self.lock();
        *state = PrinterState::default();
        if self.show_spinner {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(Self::spinner_style());
            spinner.set_message("Waiting for reply...");
            spinner.enable_steady_tick(Duration::from_millis(100));
            state.spinner = Some(spinner);
        }
    }

    fn on_token(&self, token: &str, _live_text: &str) {
        let mut state = self.lock();
        let mut out = String::new();
        if state.printed.is_empty() {
            Self::clear_spinner(&mut state);
            out.push_str(&ConsoleFormatter::title(Position::Right, "Assistant"));
            out.push('\n');
            state.at_line_start = true;
        }
        out.push_str(&Self::render(&mut state, token));
        state.printed.push_str(token);

        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(out.as_bytes());
        let _ = stdout.flush();
    }

    fn on_turn_complete(&self, final_text: &str) {
        let mut state = self.lock();
        Self::clear_spinner(&mut state);

        if state.printed.is_empty() {
            println!(
                "{}",
                ConsoleFormatter::format_record(&DisplayRecord {
                    position: Position::Right,
                    title: "Assistant",
                    text: final_text,
                })
            );
        } else {
            if !state.at_line_start {
                println!();
            }
            if state.printed != final_text {
                println!(
                    "{}",
                    ConsoleFormatter::format_record(&DisplayRecord {
                        position: Position::Right,
                        title: "Assistant (final)",
                        text: final_text,
                    })
                );
            }
        }
        *state = PrinterState::default();
    }

    fn on_turn_failed(&self, _error: &str) {
        let mut state = self.lock();
        Self::clear_spinner(&mut state);
        if !state.printed.is_empty() && !state.at_line_start {
            println!();
        }
        *state = PrinterState::default();
    }
}
