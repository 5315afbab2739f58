//! Slash command parsing for the chat loop.
//!
//! Commands start with `/` and provide in-chat session management, help and
//! screen control.

use console::style;

/// Available slash commands in the chat loop.
#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    /// Show available commands.
    Help,
    /// Clear the terminal screen.
    Clear,
    /// Exit the chat.
    Exit,
    /// Start a new session.
    New,
    /// List sessions, most recent first.
    List,
    /// Switch to a session by list position or identifier.
    Select(String),
    /// Delete the current session.
    Delete,
    /// Delete every session.
    ClearAll,
    /// Replay the current session's transcript.
    History,
    /// Unknown or malformed command (carries a message for the user).
    Unknown(String),
}

/// Parse user input as a slash command.
///
/// Returns `None` if the input doesn't start with `/`.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (cmd, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd.to_lowercase(), arg.trim()),
        None => (trimmed.to_lowercase(), ""),
    };

    let command = match cmd.as_str() {
        "/help" | "/h" | "/?" => ChatCommand::Help,
        "/clear" | "/cls" => ChatCommand::Clear,
        "/exit" | "/quit" | "/q" => ChatCommand::Exit,
        "/new" => ChatCommand::New,
        "/list" | "/ls" => ChatCommand::List,
        "/select" | "/switch" | "/s" => {
            if arg.is_empty() {
                ChatCommand::Unknown("/select requires a session number or identifier".to_string())
            } else {
                ChatCommand::Select(arg.to_string())
            }
        }
        "/delete" | "/del" => ChatCommand::Delete,
        "/clearall" => ChatCommand::ClearAll,
        "/history" => ChatCommand::History,
        other => ChatCommand::Unknown(other.to_string()),
    };
    Some(command)
}

/// Resolve a `/select` argument against identifiers listed most recent first.
///
/// A number is a 1-based list position; anything else must match an
/// identifier exactly.
pub fn resolve_session_ref<'a>(arg: &str, ids: &[&'a str]) -> Option<&'a str> {
    let arg = arg.trim();
    if let Ok(position) = arg.parse::<usize>() {
        return position.checked_sub(1).and_then(|i| ids.get(i).copied());
    }
    ids.iter().copied().find(|id| *id == arg)
}

/// Print the help text listing all available commands.
pub fn print_help(single: bool) {
    println!();
    println!("  {}", style("Available commands:").bold());
    println!();
    println!("  {}       {}", style("/help").cyan(), "Show this help message");
    println!("  {}      {}", style("/clear").cyan(), "Clear the screen");
    println!("  {}    {}", style("/history").cyan(), "Show the conversation so far");
    if single {
        println!("  {}   {}", style("/clearall").cyan(), "Delete the conversation");
    } else {
        println!("  {}        {}", style("/new").cyan(), "Start a new session");
        println!("  {}       {}", style("/list").cyan(), "List sessions");
        println!("  {} {}", style("/select <n>").cyan(), "Switch to session n (or an identifier)");
        println!("  {}     {}", style("/delete").cyan(), "Delete the current session");
        println!("  {}   {}", style("/clearall").cyan(), "Delete every session");
    }
    println!("  {}       {}", style("/exit").cyan(), "Leave the chat");
    println!();
    println!(
        "  {}",
        style("Ctrl+C cancels a reply in progress, Ctrl+D exits").dim()
    );
    println!();
}
