//! Colour and width handling for terminal output

use owo_colors::{OwoColorize, colors::css};

/// Below this many columns, tables are printed as stacked lines.
const NARROW_COLUMNS: u16 = 60;

fn colour_enabled() -> bool {
    supports_color::on(supports_color::Stream::Stdout).is_some()
}

/// Whether the terminal is too narrow for tabular output.
///
/// Returns `false` when stdout isn't a terminal.
pub fn is_narrow() -> bool {
    terminal_size::terminal_size().is_some_and(|(width, _)| width.0 < NARROW_COLUMNS)
}

/// Semantic colouring that degrades to plain text.
pub trait Colorize {
    /// Green.
    fn success(&self) -> String;
    /// Amber.
    fn warning(&self) -> String;
    /// Red.
    fn error(&self) -> String;
    /// Blue.
    fn info(&self) -> String;
    /// Dimmed.
    fn dim(&self) -> String;
}

impl<T: AsRef<str> + ?Sized> Colorize for T {
    fn success(&self) -> String {
        paint(self.as_ref(), |s| s.fg::<css::Green>().to_string())
    }

    fn warning(&self) -> String {
        paint(self.as_ref(), |s| s.fg::<css::Orange>().to_string())
    }

    fn error(&self) -> String {
        paint(self.as_ref(), |s| s.fg::<css::Red>().to_string())
    }

    fn info(&self) -> String {
        paint(self.as_ref(), |s| s.fg::<css::LightBlue>().to_string())
    }

    fn dim(&self) -> String {
        paint(self.as_ref(), |s| s.dimmed().to_string())
    }
}

fn paint(text: &str, style: impl FnOnce(&str) -> String) -> String {
    if colour_enabled() {
        style(text)
    } else {
        text.to_string()
    }
}
