//! Main chat loop orchestration.
//!
//! Starts the controller, prints the banner and the selected transcript, then
//! alternates between reading input and running turns. Slash commands map to
//! the controller's session-management operations.

use std::future::Future;
use std::time::Duration;

use console::style;
use crossterm::style::Color;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use chatshelf_core::chat::controller::{ChatController, StartupReport};
use chatshelf_core::storage::history_store::HistoryStore;
use chatshelf_types::chat::Session;
use chatshelf_types::error::{ChatError, StoreError, TurnError};

use crate::state::AppState;

use super::banner::print_welcome_banner;
use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};
use super::observer::TerminalObserver;
use super::renderer::ChatRenderer;

enum Flow {
    Continue,
    Exit,
}

/// Run the interactive multi-session chat.
pub async fn run_chat_loop(state: &AppState) -> anyhow::Result<()> {
    let store = state.open_store().await?;
    let client = state.completion_client()?;
    let provider_name = client.provider_name().to_string();
    let model = client.model().to_string();

    let (mut controller, report) =
        ChatController::start(store, client, state.request_timeout()).await;
    print_startup_report(&report);

    let renderer = ChatRenderer::new(Some(Color::Cyan));
    let label = controller.current().map(Session::display_label);
    print_welcome_banner(
        &provider_name,
        &model,
        label.as_deref(),
        controller.registry().len(),
    );
    if let Some(session) = controller.current() {
        if !session.messages.is_empty() {
            renderer.print_transcript(&session.messages);
        }
    }

    let prompt = format!("  {} ", style("You >").green().bold());
    let (mut chat_input, _writer) = ChatInput::new(prompt)
        .map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;

    loop {
        let text = match chat_input.read_line().await {
            InputEvent::Eof => {
                println!("\n  {}", style("Chat ended.").dim());
                break;
            }
            InputEvent::Interrupted => {
                println!("\n  {}", style("Press Ctrl+D to exit, or keep chatting.").dim());
                continue;
            }
            InputEvent::Message(text) => text,
        };

        if text.is_empty() {
            continue;
        }

        if let Some(cmd) = commands::parse(&text) {
            match handle_command(&mut controller, &renderer, &mut chat_input, cmd).await {
                Flow::Exit => break,
                Flow::Continue => continue,
            }
        }

        let cancel = CancellationToken::new();
        let mut observer = TerminalObserver::new(&renderer);
        let result = drive_turn(
            &mut chat_input,
            &cancel,
            controller.send(&text, &mut observer, &cancel),
        )
        .await;
        let streamed = observer.streamed();
        drop(observer);

        match result {
            Ok(report) => print_reply_footer(
                &renderer,
                report.fragments,
                report.elapsed,
                &model,
                streamed,
                report.persist_error.as_ref(),
            ),
            Err(err) => print_turn_error(&err, streamed),
        }
    }

    chat_input.flush();
    info!(sessions = controller.registry().len(), "Chat loop finished");
    Ok(())
}

/// Await a turn while watching the input for Ctrl+C / Ctrl+D.
///
/// Either key cancels the turn. Lines typed while a reply streams are
/// discarded.
pub async fn drive_turn<T, F>(
    input: &mut ChatInput,
    cancel: &CancellationToken,
    turn: F,
) -> Result<T, TurnError>
where
    F: Future<Output = Result<T, TurnError>>,
{
    tokio::pin!(turn);
    loop {
        tokio::select! {
            result = &mut turn => return result,
            event = input.read_line(), if !cancel.is_cancelled() => match event {
                InputEvent::Interrupted | InputEvent::Eof => cancel.cancel(),
                InputEvent::Message(_) => {}
            },
        }
    }
}

async fn handle_command<S: HistoryStore>(
    controller: &mut ChatController<S>,
    renderer: &ChatRenderer,
    input: &mut ChatInput,
    cmd: ChatCommand,
) -> Flow {
    match cmd {
        ChatCommand::Help => commands::print_help(false),
        ChatCommand::Clear => input.clear(),
        ChatCommand::Exit => {
            println!("\n  {}", style("Chat ended.").dim());
            return Flow::Exit;
        }
        ChatCommand::New => {
            let result = controller.new_session().await;
            report_switch(controller, result.map(|_| ()), "Started a new session");
        }
        ChatCommand::List => print_session_list(&controller.sessions(), controller.selected_id()),
        ChatCommand::Select(arg) => {
            let target = {
                let sessions = controller.sessions();
                let ids: Vec<&str> = sessions.iter().map(|s| s.id.as_str()).collect();
                commands::resolve_session_ref(&arg, &ids).map(str::to_string)
            };
            match target {
                Some(id) => match controller.select(&id) {
                    Ok(()) => {
                        report_switch(controller, Ok(()), "Switched to");
                        if let Some(session) = controller.current() {
                            renderer.print_transcript(&session.messages);
                        }
                    }
                    Err(e) => println!("\n  {} {e}\n", style("!").red().bold()),
                },
                None => println!(
                    "\n  {} No session matches '{}'. Use /list to see them.\n",
                    style("?").yellow().bold(),
                    style(arg).dim()
                ),
            }
        }
        ChatCommand::Delete => {
            let result = controller.delete_current().await;
            report_switch(controller, result.map(|_| ()), "Deleted; now on");
        }
        ChatCommand::ClearAll => {
            let result = controller.clear_all().await;
            report_switch(controller, result.map(|_| ()), "Cleared all sessions; now on");
        }
        ChatCommand::History => {
            if let Some(session) = controller.current() {
                renderer.print_transcript(&session.messages);
            }
        }
        ChatCommand::Unknown(msg) => println!(
            "\n  {} Unknown command: {}. Type /help for available commands.\n",
            style("?").yellow().bold(),
            style(msg).dim()
        ),
    }
    Flow::Continue
}

/// Report a session switch. A storage error means the change is kept in
/// memory but was not saved.
fn report_switch<S: HistoryStore>(
    controller: &ChatController<S>,
    result: Result<(), ChatError>,
    verb: &str,
) {
    let label = controller
        .current()
        .map(Session::display_label)
        .unwrap_or_default();
    println!("\n  {} {verb} {}", style("*").cyan().bold(), style(label).bold());
    if let Err(e) = result {
        warn!(error = %e, "Session change not saved");
        println!("  {} Not saved: {e}", style("!").yellow().bold());
    }
    println!();
}

pub fn print_session_list(sessions: &[&Session], selected: &str) {
    println!();
    for (i, session) in sessions.iter().enumerate() {
        let marker = if session.id == selected {
            style(">").green().bold().to_string()
        } else {
            " ".to_string()
        };
        println!(
            "  {marker} {:>2}. {} {}",
            i + 1,
            session.display_label(),
            style(format!("({} messages)", session.messages.len())).dim()
        );
    }
    println!();
}

fn print_startup_report(report: &StartupReport) {
    if let Some(err) = &report.storage_error {
        eprintln!(
            "\n  {} Could not read chat history ({err}).\n    Starting with a fresh session; changes this run will not be saved.",
            style("!").yellow().bold()
        );
    }
    for err in &report.malformed {
        eprintln!("  {} Skipped stored session: {err}", style("!").yellow().bold());
    }
    if let Some(err) = &report.persist_error {
        eprintln!("  {} Could not save the new session: {err}", style("!").yellow().bold());
    }
}

pub(crate) fn print_reply_footer(
    renderer: &ChatRenderer,
    fragments: usize,
    elapsed: Duration,
    model: &str,
    streamed: bool,
    persist_error: Option<&StoreError>,
) {
    if streamed {
        println!();
    } else {
        println!("\n  {}", style("(empty reply)").dim());
    }
    renderer.print_stats_footer(fragments, elapsed, model);
    if let Some(err) = persist_error {
        eprintln!("  {} Reply not saved: {err}", style("!").yellow().bold());
    }
    println!();
}

pub(crate) fn print_turn_error(err: &TurnError, streamed: bool) {
    if streamed {
        println!();
    }
    match err {
        TurnError::Cancelled => println!("\n  {}\n", style("Response cancelled.").dim()),
        TurnError::EmptyPrompt => {}
        other => {
            eprintln!("\n  {} {other}", style("!").red().bold());
            eprintln!("  {}\n", style("Type a message to retry, /exit to quit.").dim());
        }
    }
}
