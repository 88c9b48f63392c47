use std::collections::BTreeMap;

use crate::prefix::Prefix;

/// IRCv3 message tags, keyed by tag name.
///
/// Vendor-prefixed keys (`example.com/key`) are kept whole. Values are stored
/// unescaped; a tag sent without `=` has an empty value.
pub type Tags = BTreeMap<String, String>;

/// An owned IRC message.
///
/// Contains the optional tags and prefix, the command token, the middle
/// parameters, and the trailing parameter. `trailing` distinguishes a
/// missing trailing parameter (`None`) from an empty one (`Some("")`).
///
/// # Example
///
/// ```
/// use slirc_client::Message;
///
/// let msg: Message = ":nick!user@host PRIVMSG #channel :Hello!".parse().unwrap();
/// assert_eq!(msg.command, "PRIVMSG");
/// assert_eq!(msg.params, vec!["#channel"]);
/// assert_eq!(msg.trailing.as_deref(), Some("Hello!"));
///
/// let reply = Message::new("PRIVMSG").with_param("#channel").with_trailing("Hi");
/// assert_eq!(reply.to_string(), "PRIVMSG #channel :Hi");
/// ```
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Message {
    /// IRCv3 message tags, if a tag block was present.
    pub tags: Option<Tags>,
    /// Message prefix/source (e.g., `nick!user@host`).
    pub prefix: Option<Prefix>,
    /// Command name or three-digit numeric.
    pub command: String,
    /// Middle parameters in wire order.
    pub params: Vec<String>,
    /// Trailing parameter, present whenever the line carried a ` :` marker.
    pub trailing: Option<String>,
}

impl Message {
    /// Create a message with only a command.
    pub fn new(command: impl Into<String>) -> Self {
        Message {
            command: command.into(),
            ..Default::default()
        }
    }

    /// Add a tag, creating the tag map if needed.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags
            .get_or_insert_with(Tags::new)
            .insert(key.into(), value.into());
        self
    }

    /// Set the prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: Prefix) -> Self {
        self.prefix = Some(prefix);
        self
    }

    /// Append a middle parameter.
    #[must_use]
    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.params.push(param.into());
        self
    }

    /// Set the trailing parameter.
    #[must_use]
    pub fn with_trailing(mut self, trailing: impl Into<String>) -> Self {
        self.trailing = Some(trailing.into());
        self
    }

    /// Get the value of an IRCv3 tag by key.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.as_ref()?.get(key).map(String::as_str)
    }

    /// Get the name (nick or server) from the message prefix, if present.
    pub fn source_nickname(&self) -> Option<&str> {
        self.prefix
            .as_ref()
            .map(|p| p.name.as_str())
            .filter(|name| !name.is_empty())
    }

    /// The trailing parameter, or the last middle parameter when there is none.
    pub fn last_param(&self) -> Option<&str> {
        self.trailing
            .as_deref()
            .or_else(|| self.params.last().map(String::as_str))
    }

    /// Whether the command is a three-digit numeric reply.
    pub fn is_numeric(&self) -> bool {
        self.command.len() == 3 && self.command.bytes().all(|b| b.is_ascii_digit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let msg = Message::new("PRIVMSG")
            .with_tag("time", "now")
            .with_prefix(Prefix::new("nick", "user", "host"))
            .with_param("#chan")
            .with_trailing("");

        assert_eq!(msg.tag("time"), Some("now"));
        assert_eq!(msg.tag("missing"), None);
        assert_eq!(msg.source_nickname(), Some("nick"));
        assert_eq!(msg.last_param(), Some(""));
    }

    #[test]
    fn test_last_param_falls_back_to_middle() {
        let msg = Message::new("PING").with_param("a").with_param("b");
        assert_eq!(msg.last_param(), Some("b"));
        assert_eq!(Message::new("PING").last_param(), None);
    }

    #[test]
    fn test_is_numeric() {
        assert!(Message::new("001").is_numeric());
        assert!(Message::new("433").is_numeric());
        assert!(!Message::new("PING").is_numeric());
        assert!(!Message::new("1234").is_numeric());
    }
}
