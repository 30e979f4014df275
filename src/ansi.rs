//! ANSI escape code helpers
//!
//! Named colors used by prompt templates and alert output, plus stripping
//! of escape sequences for width calculations and plain output.

use once_cell::sync::Lazy;
use regex::Regex;

/// Matches SGR and erase-line escape sequences
static ESCAPE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*[mK]").expect("valid ANSI escape pattern"));

/// Terminal colors and attributes addressable by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Reset,
    Bold,
    Dark,
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
}

impl Color {
    /// All colors, in the order they are listed by `coloring`
    pub const ALL: [Color; 11] = [
        Color::Reset,
        Color::Bold,
        Color::Dark,
        Color::Black,
        Color::Red,
        Color::Green,
        Color::Yellow,
        Color::Blue,
        Color::Magenta,
        Color::Cyan,
        Color::White,
    ];

    /// SGR escape sequence for this color
    pub fn code(self) -> &'static str {
        match self {
            Color::Reset => "\x1b[0m",
            Color::Bold => "\x1b[1m",
            Color::Dark => "\x1b[2m",
            Color::Black => "\x1b[30m",
            Color::Red => "\x1b[31m",
            Color::Green => "\x1b[32m",
            Color::Yellow => "\x1b[33m",
            Color::Blue => "\x1b[34m",
            Color::Magenta => "\x1b[35m",
            Color::Cyan => "\x1b[36m",
            Color::White => "\x1b[37m",
        }
    }

    /// Placeholder name as used in prompt templates (`$CYAN`)
    pub fn name(self) -> &'static str {
        match self {
            Color::Reset => "RESET",
            Color::Bold => "BOLD",
            Color::Dark => "DARK",
            Color::Black => "BLACK",
            Color::Red => "RED",
            Color::Green => "GREEN",
            Color::Yellow => "YELLOW",
            Color::Blue => "BLUE",
            Color::Magenta => "MAGENTA",
            Color::Cyan => "CYAN",
            Color::White => "WHITE",
        }
    }

    /// Look up a color by placeholder name, case-insensitively
    pub fn from_name(name: &str) -> Option<Color> {
        Color::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }
}

/// Wrap `text` in `color`, or return it untouched when coloring is off
pub fn paint(text: &str, color: Color, enabled: bool) -> String {
    if enabled {
        format!("{}{}{}", color.code(), text, Color::Reset.code())
    } else {
        text.to_string()
    }
}

/// Remove all ANSI escape sequences from `text`
pub fn strip_ansi(text: &str) -> String {
    ESCAPE_REGEX.replace_all(text, "").into_owned()
}

/// Whether `text` contains any escape sequence
pub fn has_ansi(text: &str) -> bool {
    ESCAPE_REGEX.is_match(text)
}
