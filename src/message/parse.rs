use std::str::FromStr;

use super::nom_parser::{scan_command, scan_prefix, scan_tags};
use super::tags::parse_tags;
use super::{Message, MAX_LINE_LENGTH};
use crate::error::MessageParseError;
use crate::prefix::Prefix;

impl Message {
    /// Parse one wire line into a message.
    ///
    /// The line may still carry its `\r\n` terminator. Malformed input always
    /// yields an error, never a partially filled message.
    ///
    /// # Example
    ///
    /// ```
    /// use slirc_client::{Message, MessageParseError};
    ///
    /// let msg = Message::parse("CMD a b :c d").unwrap();
    /// assert_eq!(msg.params, vec!["a", "b"]);
    /// assert_eq!(msg.trailing.as_deref(), Some("c d"));
    ///
    /// assert_eq!(Message::parse("   "), Err(MessageParseError::BlankMessage));
    /// ```
    pub fn parse(raw: &str) -> Result<Message, MessageParseError> {
        if raw.len() > MAX_LINE_LENGTH {
            return Err(MessageParseError::MessageTooLong(raw.len()));
        }
        Message::parse_framed(raw)
    }

    /// Parse a line whose length was already checked on its raw bytes.
    ///
    /// The line codec measures the wire bytes before replacing invalid UTF-8,
    /// so the decoded text may be longer than the limit.
    pub(crate) fn parse_framed(raw: &str) -> Result<Message, MessageParseError> {
        if raw.is_empty() {
            return Err(MessageParseError::EmptyMessage);
        }
        if raw.trim().is_empty() {
            return Err(MessageParseError::BlankMessage);
        }

        let mut rest = raw.trim_end_matches(['\r', '\n']);
        let mut message = Message::default();

        if rest.starts_with('@') {
            let (block, remainder) = scan_tags(rest)?;
            let tags = parse_tags(block);
            if tags.is_empty() {
                return Err(MessageParseError::EmptyTags);
            }
            message.tags = Some(tags);
            rest = remainder;
        }

        if rest.starts_with(':') {
            let (block, remainder) = scan_prefix(rest)?;
            message.prefix = Some(Prefix::parse(block));
            rest = remainder;
        }

        let (command, remainder) = scan_command(rest)?;
        message.command = command.to_owned();

        // `remainder` is empty or starts with the space after the command.
        match remainder.find(" :") {
            Some(marker) => {
                let middle = remainder[..marker].trim();
                if !middle.is_empty() {
                    message.params = middle.split(' ').map(str::to_owned).collect();
                }
                message.trailing = Some(remainder[marker + 2..].to_owned());
            }
            None => {
                if let Some(middle) = remainder.strip_prefix(' ') {
                    if !middle.is_empty() {
                        message.params = middle.split(' ').map(str::to_owned).collect();
                    }
                }
            }
        }

        Ok(message)
    }
}

impl FromStr for Message {
    type Err = MessageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Message::parse(s)
    }
}
