//! IRC message prefix types.
//!
//! A prefix identifies the origin of a message: a server name, or a user's
//! `nick!user@host` mask.
//!
//! # Reference
//! - RFC 2812 Section 2.3.1: Message format

use std::str::FromStr;

/// IRC message prefix.
///
/// `name` holds the nick or server name. `user` and `host` are empty when the
/// prefix did not carry them.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct Prefix {
    /// Nickname or server name.
    pub name: String,
    /// Username (the part after `!`), empty if absent.
    pub user: String,
    /// Hostname (the part after `@`), empty if absent.
    pub host: String,
}

impl Prefix {
    /// Create a prefix from its three components.
    ///
    /// # Example
    ///
    /// ```
    /// use slirc_client::Prefix;
    ///
    /// let prefix = Prefix::new("nick", "user", "host.example.com");
    /// assert_eq!(prefix.to_string(), "nick!user@host.example.com");
    /// ```
    pub fn new(name: impl Into<String>, user: impl Into<String>, host: impl Into<String>) -> Self {
        Prefix {
            name: name.into(),
            user: user.into(),
            host: host.into(),
        }
    }

    /// Parse a prefix block (the text between `:` and the first space).
    ///
    /// The first `!` splits the name from `user@host`, and the first `@` of
    /// that remainder splits user from host. Without a `!`, the first `@`
    /// splits name from host directly. Parsing never fails.
    pub fn parse(s: &str) -> Self {
        match s.split_once('!') {
            Some((name, rest)) => {
                let (user, host) = rest.split_once('@').unwrap_or((rest, ""));
                Prefix::new(name, user, host)
            }
            None => {
                let (name, host) = s.split_once('@').unwrap_or((s, ""));
                Prefix::new(name, "", host)
            }
        }
    }

    /// Get the nickname, if not empty.
    pub fn nick(&self) -> Option<&str> {
        Some(self.name.as_str()).filter(|s| !s.is_empty())
    }

    /// Get the username, if not empty.
    pub fn user(&self) -> Option<&str> {
        Some(self.user.as_str()).filter(|s| !s.is_empty())
    }

    /// Get the hostname, if not empty.
    pub fn host(&self) -> Option<&str> {
        Some(self.host.as_str()).filter(|s| !s.is_empty())
    }
}

impl FromStr for Prefix {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Prefix::parse(s))
    }
}

impl From<&str> for Prefix {
    fn from(s: &str) -> Self {
        Prefix::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_mask() {
        assert_eq!(
            Prefix::parse("nick!user@host"),
            Prefix::new("nick", "user", "host")
        );
    }

    #[test]
    fn test_parse_nick_at_host() {
        assert_eq!(Prefix::parse("nick@host"), Prefix::new("nick", "", "host"));
    }

    #[test]
    fn test_parse_server() {
        let prefix = Prefix::parse("irc.example.com");
        assert_eq!(prefix, Prefix::new("irc.example.com", "", ""));
        assert_eq!(prefix.user(), None);
        assert_eq!(prefix.host(), None);
    }

    #[test]
    fn test_parse_nick_user_only() {
        assert_eq!(Prefix::parse("nick!user"), Prefix::new("nick", "user", ""));
    }

    #[test]
    fn test_first_separator_wins() {
        assert_eq!(
            Prefix::parse("a!b!c@d@e"),
            Prefix::new("a", "b!c", "d@e")
        );
        assert_eq!(Prefix::parse("a@b!c@d"), Prefix::new("a@b", "c", "d"));
    }
}
