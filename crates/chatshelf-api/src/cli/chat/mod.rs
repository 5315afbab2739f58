//! Interactive terminal chat.
//!
//! Streams replies token by token behind a thinking spinner, replays stored
//! transcripts as rendered markdown, and exposes session management through
//! slash commands. Entry point: `loop_runner::run_chat_loop`.

pub mod banner;
pub mod commands;
pub mod input;
pub mod loop_runner;
pub mod observer;
pub mod renderer;
