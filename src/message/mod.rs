//! IRC message codec.
//!
//! [`Message::parse`] turns one wire line into a [`Message`];
//! [`Message::to_bytes`] and [`Display`](std::fmt::Display) turn it back.

mod nom_parser;
mod parse;
mod serialize;
pub mod tags;
mod types;

pub use self::types::{Message, Tags};

/// Maximum length of an inbound line, terminator included.
pub const MAX_LINE_LENGTH: usize = 1024;

/// Maximum length of a serialized line before the `\r\n` terminator.
pub const MAX_CONTENT_LENGTH: usize = MAX_LINE_LENGTH - 2;
