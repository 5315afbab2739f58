//! chatshelf CLI entry point.
//!
//! Binary name: `chatshelf`
//!
//! Parses CLI arguments, resolves configuration, then dispatches to the
//! interactive chat, the single-conversation chat, or a session command.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;
use console::style;
use tracing_subscriber::EnvFilter;

use chatshelf_infra::llm::test_provider_connection;

use cli::{Cli, Commands, SessionsCommand};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Diagnostics go to stderr so they never interleave with a streamed reply.
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,chatshelf=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "chatshelf", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init(cli.model, cli.ephemeral).await?;

    match cli.command {
        Commands::Chat => {
            cli::chat::loop_runner::run_chat_loop(&state).await?;
        }

        Commands::Single { reset } => {
            cli::single::run_single(&state, reset).await?;
        }

        Commands::Sessions { action } => match action {
            SessionsCommand::List => {
                cli::session::list_sessions(&state, cli.json).await?;
            }
            SessionsCommand::Show { session } => {
                cli::session::show_session(&state, &session, cli.json).await?;
            }
            SessionsCommand::Delete { session, force } => {
                cli::session::delete_session(&state, &session, force, cli.json).await?;
            }
            SessionsCommand::Clear { force } => {
                cli::session::clear_sessions(&state, force, cli.json).await?;
            }
        },

        Commands::Check => {
            let provider = state.provider()?;
            let result = test_provider_connection(&provider).await;

            if cli.json {
                let check = serde_json::json!({
                    "provider": provider.name(),
                    "model": state.config.model,
                    "ok": result.is_ok(),
                    "error": result.as_ref().err().map(|e| e.to_string()),
                });
                println!("{}", serde_json::to_string_pretty(&check)?);
            } else {
                println!();
                match &result {
                    Ok(()) => println!(
                        "  {} {} responded with model {}",
                        style("✓").green(),
                        style(provider.name()).cyan(),
                        style(&state.config.model).bold()
                    ),
                    Err(e) => println!(
                        "  {} {} failed: {e}",
                        style("✗").red(),
                        style(provider.name()).cyan()
                    ),
                }
                println!();
            }

            result?;
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}
