//! Terminal markdown rendering with syntax-highlighted code blocks.
//!
//! `ChatRenderer` combines `termimad` for prose and `syntect` for fenced
//! code. While a reply streams, fragments are printed raw; stored transcripts
//! are replayed as formatted markdown.

use std::io::Write;
use std::time::Duration;

use console::style;
use crossterm::style::Color;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Style, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::as_24_bit_terminal_escaped;
use termimad::MadSkin;

use chatshelf_types::chat::{Message, MessageRole};

const CODE_THEME: &str = "base16-ocean.dark";

/// Label printed before assistant replies.
pub const ASSISTANT_LABEL: &str = "Assistant";

pub struct ChatRenderer {
    skin: MadSkin,
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
}

impl ChatRenderer {
    /// Create a renderer, tinting headers and bold text with `accent_color`.
    pub fn new(accent_color: Option<Color>) -> Self {
        let mut skin = MadSkin::default_dark();

        if let Some(color) = accent_color {
            let tc = Self::crossterm_to_termimad(color);
            skin.bold.set_fg(tc);
            skin.headers[0].set_fg(tc);
            skin.headers[1].set_fg(tc);
        }

        skin.inline_code
            .set_fg(termimad::crossterm::style::Color::Yellow);

        Self {
            skin,
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
        }
    }

    /// Render markdown, highlighting fenced code blocks with syntect.
    pub fn render_final(&self, markdown: &str) -> String {
        let mut output = String::new();
        let mut in_code_block = false;
        let mut code_lang = String::new();
        let mut code_buf = String::new();

        for line in markdown.lines() {
            if line.starts_with("```") && !in_code_block {
                in_code_block = true;
                code_lang = line.trim_start_matches('`').trim().to_string();
                code_buf.clear();
            } else if line.starts_with("```") && in_code_block {
                in_code_block = false;
                output.push_str(&self.highlight_code(&code_buf, &code_lang));
                output.push('\n');
            } else if in_code_block {
                code_buf.push_str(line);
                code_buf.push('\n');
            } else {
                output.push_str(&self.skin.term_text(line).to_string());
            }
        }

        // Unclosed fence
        if in_code_block && !code_buf.is_empty() {
            output.push_str(&self.highlight_code(&code_buf, &code_lang));
        }

        output
    }

    /// Print one streamed fragment as-is.
    pub fn print_streaming_token(&self, token: &str) {
        print!("{token}");
        let _ = std::io::stdout().flush();
    }

    /// Print the label that opens a streamed assistant reply.
    pub fn print_reply_label(&self) {
        print!("\n  {} ", style(ASSISTANT_LABEL).cyan().bold());
        let _ = std::io::stdout().flush();
    }

    /// Replay a stored transcript.
    pub fn print_transcript(&self, messages: &[Message]) {
        if messages.is_empty() {
            println!("\n  {}\n", style("No messages yet.").dim());
            return;
        }

        println!();
        for message in messages {
            match message.role {
                MessageRole::User => {
                    println!("  {} {}", style("You >").green().bold(), message.content);
                }
                MessageRole::Assistant => {
                    println!("  {}", style(ASSISTANT_LABEL).cyan().bold());
                    let rendered = self.render_final(&message.content);
                    for line in rendered.trim_end().lines() {
                        println!("  {line}");
                    }
                }
            }
            println!();
        }
    }

    /// Footer after a reply: "| {n} chunks . {time}s . {model}".
    pub fn print_stats_footer(&self, fragments: usize, elapsed: Duration, model: &str) {
        println!(
            "\n  {} {} chunks {} {:.1}s {} {}",
            style("|").dim(),
            style(fragments).dim(),
            style("\u{00b7}").dim(),
            style(elapsed.as_secs_f64()).dim(),
            style("\u{00b7}").dim(),
            style(model).dim(),
        );
    }

    fn highlight_code(&self, code: &str, lang: &str) -> String {
        let syntax = if lang.is_empty() {
            self.syntax_set.find_syntax_plain_text()
        } else {
            self.syntax_set
                .find_syntax_by_token(lang)
                .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text())
        };

        let mut output = String::new();
        output.push_str(&format!("  {}\n", style(format!("--- {lang} ---")).dim()));

        let Some(theme) = self.theme_set.themes.get(CODE_THEME) else {
            for line in code.lines() {
                output.push_str(&format!("  {line}\n"));
            }
            return output;
        };
        let mut h = HighlightLines::new(syntax, theme);

        for line in code.lines() {
            let ranges: Vec<(Style, &str)> = h
                .highlight_line(line, &self.syntax_set)
                .unwrap_or_default();
            let escaped = as_24_bit_terminal_escaped(&ranges[..], false);
            output.push_str(&format!("  {escaped}\x1b[0m\n"));
        }

        output
    }

    fn crossterm_to_termimad(color: Color) -> termimad::crossterm::style::Color {
        match color {
            Color::Cyan => termimad::crossterm::style::Color::Cyan,
            Color::Green => termimad::crossterm::style::Color::Green,
            Color::Yellow => termimad::crossterm::style::Color::Yellow,
            Color::Magenta => termimad::crossterm::style::Color::Magenta,
            Color::Blue => termimad::crossterm::style::Color::Blue,
            Color::Rgb { r, g, b } => termimad::crossterm::style::Color::Rgb { r, g, b },
            _ => termimad::crossterm::style::Color::Cyan,
        }
    }
}
