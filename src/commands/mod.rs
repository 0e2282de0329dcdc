//! Terminal Commands
//!
//! Translates lines typed at the prompt into session intents. Lines starting
//! with `/` are commands; anything else is a message for the model.

pub mod render;

pub use render::Renderer;

use crate::services::dispatcher::UserIntent;

/// What a typed line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Forward an intent to the session
    Intent(UserIntent),
    /// Print the current session state
    Status,
    /// Print the command list
    Help,
    /// Leave the program
    Quit,
    /// A `/word` that is not a known command
    Unknown(String),
}

/// Help text listing the commands.
pub const HELP: &str = "\
Commands:
  /load    load the model
  /stop    interrupt the running generation
  /reset   clear the conversation
  /status  show session state
  /help    show this list
  /quit    exit
Anything else is sent to the model.";

/// Parse one input line. Plain text, including empty text, becomes a
/// submission; the session decides what to do with blank input.
pub fn parse_line(line: &str) -> Command {
    let trimmed = line.trim();
    let Some(name) = trimmed.strip_prefix('/') else {
        return Command::Intent(UserIntent::Submit(line.trim_end_matches(['\r', '\n']).to_string()));
    };

    match name.split_whitespace().next().unwrap_or_default() {
        "load" => Command::Intent(UserIntent::Load),
        "stop" | "interrupt" => Command::Intent(UserIntent::Interrupt),
        "reset" | "clear" => Command::Intent(UserIntent::Reset),
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => Command::Unknown(other.to_string()),
    }
}
