use console::{style, Color, Style};
use dialoguer::{theme::ColorfulTheme, Confirm};
use std::fmt::Display;

/// Restack terminal theme
struct Theme;

impl Theme {
    const SUCCESS: Color = Color::Green;
    const ERROR: Color = Color::Red;
    const WARNING: Color = Color::Yellow;

    fn info_style() -> Style {
        Style::new().cyan()
    }

    fn dim_style() -> Style {
        Style::new().dim()
    }
}

/// Centralized output formatting for consistent CLI presentation
pub struct Output;

impl Output {
    /// Print a success message with checkmark
    pub fn success<T: Display>(message: T) {
        println!("{} {}", style("✓").fg(Theme::SUCCESS), message);
    }

    /// Print an error message with X mark
    pub fn error<T: Display>(message: T) {
        println!("{} {}", style("✗").fg(Theme::ERROR), message);
    }

    /// Print a warning message
    pub fn warning<T: Display>(message: T) {
        println!("{} {}", style("⚠").fg(Theme::WARNING), message);
    }

    /// Print an info message
    pub fn info<T: Display>(message: T) {
        println!("{} {}", Theme::info_style().apply_to("ℹ"), message);
    }

    /// Print a bullet point
    pub fn bullet<T: Display>(message: T) {
        println!("  {} {}", Theme::dim_style().apply_to("•"), message);
    }

    /// Print a sub-item with arrow prefix
    pub fn sub_item<T: Display>(message: T) {
        println!("  {} {}", Theme::dim_style().apply_to("→"), message);
    }

    /// Print a section header
    pub fn section<T: Display>(title: T) {
        println!("\n{}", style(title).bold().underlined());
    }

    /// Print empty line for spacing
    pub fn spacing() {
        println!();
    }
}

/// Ask a y/N question. `assume_yes` short-circuits to true; any prompt I/O
/// failure (closed stdin, no tty) counts as No.
pub fn confirm(prompt: &str, assume_yes: bool) -> bool {
    if assume_yes {
        return true;
    }
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()
        .unwrap_or(false)
}
