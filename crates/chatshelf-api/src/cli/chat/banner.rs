//! Welcome banner display for chat sessions.

use console::style;

/// Print the welcome banner at the start of a chat.
///
/// `session` is the display label of the selected session, or `None` in
/// single-conversation mode.
pub fn print_welcome_banner(provider: &str, model: &str, session: Option<&str>, sessions: usize) {
    println!();
    println!("  {} {}", "*", style("chatshelf").cyan().bold());
    println!();
    println!(
        "  {}     {} {}",
        style("Model:").bold(),
        style(model).dim(),
        style(format!("({provider})")).dim()
    );
    match session {
        Some(label) => println!(
            "  {}   {} {}",
            style("Session:").bold(),
            style(label).dim(),
            style(format!("[{sessions} total]")).dim()
        ),
        None => println!(
            "  {}      {}",
            style("Mode:").bold(),
            style("single conversation").dim()
        ),
    }
    println!();
    println!(
        "  {}",
        style("Type /help for commands, Ctrl+D to exit").dim()
    );
    println!("  {}", style("---").dim());
    println!();
}
