//! Terminal output helpers.
//!
//! Every command talks to the user through [`Output`] so glyphs, colors,
//! and indentation stay consistent across the CLI. Data that scripts might
//! want to capture (task tables, transcripts, TOML dumps) goes through
//! `print`; everything else is commentary.

use owo_colors::OwoColorize;

/// Uniform styling for CLI messages.
#[derive(Clone, Copy, Default)]
pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    /// Section header, printed before a block of related output.
    pub fn section(&self, title: &str) {
        println!();
        println!("{}", title.bold().underline());
    }

    /// Plain line, no decoration. Also used for blank separator lines.
    pub fn print(&self, message: &str) {
        println!("{}", message);
    }

    /// Progress or context line.
    pub fn status(&self, message: &str) {
        println!("  {}", message.dimmed());
    }

    /// Labeled value, e.g. `User: alice`.
    pub fn info(&self, label: &str, value: &str) {
        println!("  {} {}", label.bright_cyan(), value);
    }

    /// Key/value line with aligned-ish formatting for detail views.
    pub fn kv(&self, key: &str, value: &str) {
        println!("  {}: {}", key.bright_blue(), value);
    }

    /// Bulleted list entry.
    pub fn list_item(&self, message: &str) {
        println!("  {} {}", "•".bright_blue(), message);
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", "✓".bright_green(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", "⚠".bright_yellow(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".bright_red(), message);
    }
}
