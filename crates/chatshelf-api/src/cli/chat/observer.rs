//! Terminal view of a running turn.
//!
//! Shows a spinner while waiting for the first fragment, then prints the
//! reply as it streams.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use chatshelf_core::chat::observer::{TurnObserver, TurnPhase};

use super::renderer::ChatRenderer;

pub struct TerminalObserver<'a> {
    renderer: &'a ChatRenderer,
    spinner: Option<ProgressBar>,
    streamed: bool,
}

impl<'a> TerminalObserver<'a> {
    pub fn new(renderer: &'a ChatRenderer) -> Self {
        Self {
            renderer,
            spinner: None,
            streamed: false,
        }
    }

    /// Whether any part of the reply reached the terminal.
    pub fn streamed(&self) -> bool {
        self.streamed
    }

    fn start_spinner(&mut self) {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message("thinking...");
        spinner.enable_steady_tick(Duration::from_millis(80));
        self.spinner = Some(spinner);
    }

    fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

impl TurnObserver for TerminalObserver<'_> {
    fn on_phase(&mut self, phase: TurnPhase) {
        match phase {
            TurnPhase::AwaitingCompletion => self.start_spinner(),
            TurnPhase::Streaming => {
                self.stop_spinner();
                self.renderer.print_reply_label();
            }
            TurnPhase::Settled | TurnPhase::Failed | TurnPhase::Idle => self.stop_spinner(),
        }
    }

    fn on_fragment(&mut self, fragment: &str) {
        self.streamed = true;
        self.renderer.print_streaming_token(fragment);
    }
}

impl Drop for TerminalObserver<'_> {
    fn drop(&mut self) {
        self.stop_spinner();
    }
}
