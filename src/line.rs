//! Line-based codec for tokio.
//!
//! Reads and writes `\n`-terminated lines. Decoded lines keep their
//! terminator so the message parser sees exactly what the server sent.
//! The length limit applies to the raw bytes; after lossy decoding a line
//! may be longer in UTF-8, so the connection parses framed lines without a
//! second length check.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{ConnectionError, MessageParseError};
use crate::message::{MAX_CONTENT_LENGTH, MAX_LINE_LENGTH};
use crate::util::truncate_utf8_safe;

/// Line-based codec that handles newline-terminated messages.
///
/// Inbound lines are limited to 1024 bytes, terminator included. Invalid
/// UTF-8 is replaced rather than rejected.
#[derive(Debug, Clone)]
pub struct LineCodec {
    /// Index of next byte to check for newline
    next_index: usize,
    /// Maximum line length
    max_len: usize,
}

impl LineCodec {
    /// Create a codec with the default 1024-byte limit.
    pub fn new() -> Self {
        Self::with_max_len(MAX_LINE_LENGTH)
    }

    /// Create a codec with a custom max line length.
    pub fn with_max_len(max_len: usize) -> Self {
        LineCodec {
            next_index: 0,
            max_len,
        }
    }

    fn too_long(&self, line: &[u8]) -> ConnectionError {
        let raw = String::from_utf8_lossy(line);
        ConnectionError::Parse {
            raw: truncate_utf8_safe(&raw, 64).to_owned(),
            cause: MessageParseError::MessageTooLong(line.len()),
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        LineCodec::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = ConnectionError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, ConnectionError> {
        if let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') {
            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if line.len() > self.max_len {
                return Err(self.too_long(&line));
            }

            Ok(Some(String::from_utf8_lossy(&line).into_owned()))
        } else {
            self.next_index = src.len();

            if src.len() > self.max_len {
                return Err(self.too_long(src));
            }

            Ok(None)
        }
    }
}

/// The wire content of an outbound line, without its terminator.
///
/// Trailing CR/LF is dropped. A line that is then empty, or still holds a
/// CR or LF, is rejected. Content is cut to 1022 bytes at a char boundary.
pub fn outbound_content(line: &str) -> Result<&str, ConnectionError> {
    let content = line.trim_end_matches(['\r', '\n']);
    if content.is_empty() {
        return Err(ConnectionError::EmptyMessage);
    }
    if content.contains(['\r', '\n']) {
        return Err(ConnectionError::LineBreak(
            truncate_utf8_safe(content, 64).to_owned(),
        ));
    }
    Ok(truncate_utf8_safe(content, MAX_CONTENT_LENGTH))
}

impl Encoder<String> for LineCodec {
    type Error = ConnectionError;

    /// Writes the line with exactly one `\r\n` terminator.
    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<(), ConnectionError> {
        let content = outbound_content(&line)?;
        dst.reserve(content.len() + 2);
        dst.extend_from_slice(content.as_bytes());
        dst.extend_from_slice(b"\r\n");
        Ok(())
    }
}
