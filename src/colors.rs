//! IRC text formatting.
//!
//! # IRC Format Codes
//! - 0x02 (^B): Bold
//! - 0x03 (^C): Color (followed by a color number)

use std::fmt;

/// mIRC color palette.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Color {
    White = 0,
    Black = 1,
    Blue = 2,
    Green = 3,
    Red = 4,
    Brown = 5,
    Purple = 6,
    Orange = 7,
    Yellow = 8,
    LightGreen = 9,
    Teal = 10,
    LightCyan = 11,
    LightBlue = 12,
    Pink = 13,
    Grey = 14,
    LightGrey = 15,
    /// Client default color.
    Default = 16,
}

impl Color {
    /// Numeric color code.
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Wrap `text` in a foreground color.
///
/// A zero-width space separates the color number from the text so text
/// starting with a digit is not read as part of the code.
///
/// ```
/// use slirc_client::colors::{foreground, Color};
///
/// assert_eq!(foreground("42", Color::Red), "\x034\u{200B}42\x03");
/// ```
pub fn foreground(text: &str, color: Color) -> String {
    format!("\x03{}\u{200B}{}\x03", color.code(), text)
}

/// Make `text` bold.
pub fn bold(text: &str) -> String {
    format!("\x02{}\x02", text)
}
