//! CLI command definitions for the `chatshelf` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod chat;
pub mod session;
pub mod single;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Multi-session terminal chat over an OpenAI-compatible LLM API.
#[derive(Parser)]
#[command(name = "chatshelf", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Model identifier, overriding config.toml.
    #[arg(long, global = true, env = "CHATSHELF_MODEL")]
    pub model: Option<String>,

    /// Keep history in memory only; nothing is read from or written to disk.
    #[arg(long, global = true)]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the interactive multi-session chat.
    Chat,

    /// Chat in a single running conversation (no sessions).
    Single {
        /// Delete the stored conversation before starting.
        #[arg(long)]
        reset: bool,
    },

    /// Inspect and manage stored sessions.
    #[command(alias = "s")]
    Sessions {
        #[command(subcommand)]
        action: SessionsCommand,
    },

    /// Verify the API key and endpoint with a tiny completion request.
    Check,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum SessionsCommand {
    /// List sessions, most recent first.
    #[command(alias = "ls")]
    List,

    /// Print the transcript of a session.
    Show {
        /// Session identifier or 1-based position in the list.
        session: String,
    },

    /// Delete one session.
    #[command(alias = "rm")]
    Delete {
        /// Session identifier or 1-based position in the list.
        session: String,

        /// Skip the confirmation prompt.
        #[arg(long)]
        force: bool,
    },

    /// Delete every session, leaving one empty session behind.
    Clear {
        /// Skip the confirmation prompt.
        #[arg(long)]
        force: bool,
    },
}
