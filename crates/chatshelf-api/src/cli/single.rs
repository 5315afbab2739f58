//! Single-conversation chat: one running transcript, no sessions.

use console::style;
use crossterm::style::Color;
use tokio_util::sync::CancellationToken;
use tracing::info;

use chatshelf_core::chat::single::SingleConversation;

use crate::state::AppState;

use super::chat::banner::print_welcome_banner;
use super::chat::commands::{self, ChatCommand};
use super::chat::input::{ChatInput, InputEvent};
use super::chat::loop_runner::{drive_turn, print_reply_footer, print_turn_error};
use super::chat::observer::TerminalObserver;
use super::chat::renderer::ChatRenderer;

pub async fn run_single(state: &AppState, reset: bool) -> anyhow::Result<()> {
    let store = state.open_store().await?;
    let client = state.completion_client()?;
    let provider_name = client.provider_name().to_string();
    let model = client.model().to_string();

    let (mut conversation, load_error) =
        SingleConversation::load(store, client, state.request_timeout()).await;
    if let Some(err) = load_error {
        eprintln!(
            "\n  {} Could not read the conversation ({err}).\n    Starting empty; changes this run will not be saved.",
            style("!").yellow().bold()
        );
    }
    if reset {
        conversation.reset().await?;
    }

    let renderer = ChatRenderer::new(Some(Color::Cyan));
    print_welcome_banner(&provider_name, &model, None, 0);
    if !conversation.messages().is_empty() {
        renderer.print_transcript(conversation.messages());
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
            match cmd {
                ChatCommand::Help => commands::print_help(true),
                ChatCommand::Clear => chat_input.clear(),
                ChatCommand::Exit => {
                    println!("\n  {}", style("Chat ended.").dim());
                    break;
                }
                ChatCommand::History => renderer.print_transcript(conversation.messages()),
                ChatCommand::ClearAll => match conversation.reset().await {
                    Ok(()) => println!("\n  {} Conversation cleared.\n", style("*").cyan().bold()),
                    Err(e) => println!(
                        "\n  {} Cleared in memory, not saved: {e}\n",
                        style("!").yellow().bold()
                    ),
                },
                ChatCommand::New
                | ChatCommand::List
                | ChatCommand::Select(_)
                | ChatCommand::Delete => println!(
                    "\n  {} Sessions are not available in single-conversation mode.\n",
                    style("?").yellow().bold()
                ),
                ChatCommand::Unknown(msg) => println!(
                    "\n  {} Unknown command: {}. Type /help for available commands.\n",
                    style("?").yellow().bold(),
                    style(msg).dim()
                ),
            }
            continue;
        }

        let cancel = CancellationToken::new();
        let mut observer = TerminalObserver::new(&renderer);
        let result = drive_turn(
            &mut chat_input,
            &cancel,
            conversation.send(&text, &mut observer, &cancel),
        )
        .await;
        let streamed = observer.streamed();
        drop(observer);

        match result {
            Ok(reply) => print_reply_footer(
                &renderer,
                reply.fragments,
                reply.elapsed,
                &model,
                streamed,
                reply.persist_error.as_ref(),
            ),
            Err(err) => print_turn_error(&err, streamed),
        }
    }

    chat_input.flush();
    info!(messages = conversation.messages().len(), "Single conversation finished");
    Ok(())
}
