use std::fmt::{self, Write};

use super::tags::write_tags;
use super::{Message, MAX_CONTENT_LENGTH};
use crate::util::truncate_utf8_safe;

impl Message {
    /// Render the full line without terminator or length limit.
    fn render(&self) -> String {
        let mut out = String::with_capacity(64);
        // Writing into a String cannot fail.
        let _ = self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut String) -> fmt::Result {
        if let Some(tags) = &self.tags {
            out.push('@');
            write_tags(out, tags)?;
            out.push(' ');
        }

        if let Some(prefix) = &self.prefix {
            write!(out, ":{} ", prefix)?;
        }

        out.push_str(&self.command);

        for param in &self.params {
            out.push(' ');
            out.push_str(param);
        }

        if let Some(trailing) = &self.trailing {
            out.push_str(" :");
            out.push_str(trailing);
        }

        Ok(())
    }

    /// Serialize to wire bytes, terminated by `\r\n`.
    ///
    /// Content longer than 1022 bytes is cut at the last UTF-8 boundary at or
    /// below 1022 bytes before the terminator is appended. [`Message::parse`]
    /// accepts up to 1024 bytes with the terminator optional, so a parsed line
    /// with more than 1022 content bytes is cut too. If the cut lands before
    /// the command ends, the result no longer parses.
    ///
    /// # Example
    ///
    /// ```
    /// use slirc_client::Message;
    ///
    /// let msg = Message::new("PONG").with_trailing("123");
    /// assert_eq!(msg.to_bytes(), b"PONG :123\r\n");
    /// ```
    pub fn to_bytes(&self) -> Vec<u8> {
        let rendered = self.render();
        let content = truncate_utf8_safe(&rendered, MAX_CONTENT_LENGTH);
        let mut bytes = Vec::with_capacity(content.len() + 2);
        bytes.extend_from_slice(content.as_bytes());
        bytes.extend_from_slice(b"\r\n");
        bytes
    }
}

impl fmt::Display for Message {
    /// The serialized line without its terminator, truncated like
    /// [`Message::to_bytes`].
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self.render();
        f.write_str(truncate_utf8_safe(&rendered, MAX_CONTENT_LENGTH))
    }
}
