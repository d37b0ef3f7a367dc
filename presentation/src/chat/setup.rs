//! Startup forms for identity and application fields
//!
//! Whatever the flags, config files and environment left blank is asked for
//! here: the identity form first, then the app id form. When the SDK rejects
//! the identity, the identity form is shown again with the current values.

use playground_domain::{ConfigField, SessionConfig};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

/// Source of answers for the startup forms
pub trait LinePrompt {
    fn prompt(&mut self, label: &str) -> rustyline::Result<String>;

    /// Prompt with `initial` already in the input line, ready to edit
    fn prompt_with_initial(&mut self, label: &str, _initial: &str) -> rustyline::Result<String> {
        self.prompt(label)
    }
}

impl LinePrompt for DefaultEditor {
    fn prompt(&mut self, label: &str) -> rustyline::Result<String> {
        self.readline(label)
    }

    fn prompt_with_initial(&mut self, label: &str, initial: &str) -> rustyline::Result<String> {
        self.readline_with_initial(label, (initial, ""))
    }
}

/// Ask for each blank field in `fields`, re-asking until an answer is given.
///
/// Ctrl-C or Ctrl-D aborts the form with the readline error.
pub fn fill_missing(
    config: &mut SessionConfig,
    fields: &[ConfigField],
    input: &mut dyn LinePrompt,
) -> Result<(), ReadlineError> {
    for &field in fields {
        if !config.get(field).trim().is_empty() {
            continue;
        }
        loop {
            let answer = input.prompt(&format!("{}: ", field.label()))?;
            let answer = answer.trim();
            if answer.is_empty() {
                println!("{} is required", field);
                continue;
            }
            config.set(field, answer);
            break;
        }
    }
    Ok(())
}

/// User id, workspace id and hashed user id
pub fn identity_form(config: &mut SessionConfig, input: &mut dyn LinePrompt) -> Result<(), ReadlineError> {
    fill_missing(config, &ConfigField::IDENTITY, input)
}

/// Show every identity field again, pre-filled with its current value.
///
/// A blank answer keeps the current value if there is one.
pub fn correct_identity(config: &mut SessionConfig, input: &mut dyn LinePrompt) -> Result<(), ReadlineError> {
    for field in ConfigField::IDENTITY {
        loop {
            let current = config.get(field).to_string();
            let answer = input.prompt_with_initial(&format!("{}: ", field.label()), &current)?;
            let answer = answer.trim();
            if !answer.is_empty() {
                config.set(field, answer);
                break;
            }
            if !current.trim().is_empty() {
                break;
            }
            println!("{} is required", field);
        }
    }
    Ok(())
}

pub fn app_form(config: &mut SessionConfig, input: &mut dyn LinePrompt) -> Result<(), ReadlineError> {
    fill_missing(config, &[ConfigField::AppId], input)
}
