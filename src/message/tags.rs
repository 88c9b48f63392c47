//! IRCv3 message tag handling.
//!
//! Tags are stored unescaped; escaping is applied on the wire only.

use std::fmt::{Result as FmtResult, Write};

use super::Tags;

/// Escape a tag value for serialization.
pub fn escape_tag_value(f: &mut dyn Write, value: &str) -> FmtResult {
    for c in value.chars() {
        match c {
            ';' => f.write_str("\\:")?,
            ' ' => f.write_str("\\s")?,
            '\\' => f.write_str("\\\\")?,
            '\r' => f.write_str("\\r")?,
            '\n' => f.write_str("\\n")?,
            c => f.write_char(c)?,
        }
    }
    Ok(())
}

/// Unescape a tag value from wire format.
///
/// Unknown escapes keep the escaped character; a lone trailing backslash is
/// dropped.
pub fn unescape_tag_value(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut iter = value.chars();
    while let Some(c) = iter.next() {
        let r = if c == '\\' {
            match iter.next() {
                Some(':') => ';',
                Some('s') => ' ',
                Some('\\') => '\\',
                Some('r') => '\r',
                Some('n') => '\n',
                Some(c) => c,
                None => break,
            }
        } else {
            c
        };
        unescaped.push(r);
    }
    unescaped
}

/// Split a raw tag block (without the leading `@`) into a tag map.
///
/// Tags are separated by `;`; each splits on its first `=`. A tag without
/// `=` maps to the empty string. Vendor prefixes stay part of the key.
/// Entries with an empty key carry nothing and are skipped.
pub(crate) fn parse_tags(block: &str) -> Tags {
    block
        .split(';')
        .map(|tag| match tag.split_once('=') {
            Some((key, value)) => (key, unescape_tag_value(value)),
            None => (tag, String::new()),
        })
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_owned(), value))
        .collect()
}

/// Write `key[=value];...` for every tag.
pub(crate) fn write_tags(f: &mut dyn Write, tags: &Tags) -> FmtResult {
    for (i, (key, value)) in tags.iter().enumerate() {
        if i > 0 {
            f.write_char(';')?;
        }
        f.write_str(key)?;
        if !value.is_empty() {
            f.write_char('=')?;
            escape_tag_value(f, value)?;
        }
    }
    Ok(())
}
