//! Wire codec compliance tests.
//!
//! Covers the line grammar the client accepts and emits:
//! - RFC 1459/2812 framing: prefix, command, middle and trailing parameters
//! - IRCv3 Message Tags: https://ircv3.net/specs/extensions/message-tags
//! - one distinct error per way a line can be malformed
//!
//! Run with: `cargo test --test codec_compliance`

use slirc_client::message::tags::{escape_tag_value, unescape_tag_value};
use slirc_client::{Message, MessageParseError, Prefix, Response};

// =============================================================================
// IRCv3 MESSAGE TAGS ESCAPING
// =============================================================================

mod tag_escaping {
    use super::*;

    fn escape(value: &str) -> String {
        let mut out = String::new();
        escape_tag_value(&mut out, value).unwrap();
        out
    }

    #[test]
    fn test_unescape_sequences() {
        assert_eq!(unescape_tag_value("a\\:b"), "a;b");
        assert_eq!(unescape_tag_value("hello\\sworld"), "hello world");
        assert_eq!(unescape_tag_value("path\\\\file"), "path\\file");
        assert_eq!(unescape_tag_value("line\\rend"), "line\rend");
        assert_eq!(unescape_tag_value("line\\nend"), "line\nend");
    }

    #[test]
    fn test_unknown_escape_keeps_character() {
        assert_eq!(unescape_tag_value("\\b"), "b");
    }

    #[test]
    fn test_trailing_backslash_is_dropped() {
        assert_eq!(unescape_tag_value("value\\"), "value");
    }

    #[test]
    fn test_escape_sequences() {
        assert_eq!(escape("a;b c\\d\r\n"), "a\\:b\\sc\\\\d\\r\\n");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_tags_in_message_are_unescaped() {
        let msg: Message = "@note=two\\swords;+vendor.example/key=x :n PRIVMSG #c :hi"
            .parse()
            .unwrap();
        assert_eq!(msg.tag("note"), Some("two words"));
        assert_eq!(msg.tag("+vendor.example/key"), Some("x"));
        assert_eq!(msg.tag("missing"), None);
    }

    #[test]
    fn test_value_splits_on_first_equals_only() {
        let msg: Message = "@k=a=b CMD".parse().unwrap();
        assert_eq!(msg.tag("k"), Some("a=b"));
    }
}

// =============================================================================
// PARSE ERRORS
// =============================================================================

mod parse_errors {
    use super::*;

    #[test]
    fn test_empty_line() {
        assert_eq!(Message::parse(""), Err(MessageParseError::EmptyMessage));
    }

    #[test]
    fn test_blank_line() {
        assert_eq!(Message::parse(" \t "), Err(MessageParseError::BlankMessage));
        assert_eq!(Message::parse("\r\n"), Err(MessageParseError::BlankMessage));
    }

    #[test]
    fn test_too_long() {
        let line = format!("PRIVMSG #c :{}", "a".repeat(1100));
        assert_eq!(
            Message::parse(&line),
            Err(MessageParseError::MessageTooLong(line.len()))
        );
    }

    #[test]
    fn test_exactly_at_limit_is_accepted() {
        let mut line = String::from("PRIVMSG #c :");
        line.push_str(&"a".repeat(1024 - line.len()));
        assert_eq!(line.len(), 1024);
        assert!(Message::parse(&line).is_ok());
    }

    #[test]
    fn test_unterminated_tags() {
        assert_eq!(
            Message::parse("@time=now"),
            Err(MessageParseError::UnterminatedTags)
        );
    }

    #[test]
    fn test_empty_tags() {
        assert_eq!(Message::parse("@ PING"), Err(MessageParseError::EmptyTags));
    }

    #[test]
    fn test_unterminated_prefix() {
        assert_eq!(
            Message::parse(":irc.example.com"),
            Err(MessageParseError::UnterminatedPrefix)
        );
    }

    #[test]
    fn test_empty_prefix() {
        assert_eq!(
            Message::parse(": PRIVMSG #c :x"),
            Err(MessageParseError::EmptyPrefix)
        );
    }

    #[test]
    fn test_missing_command() {
        assert_eq!(
            Message::parse("@a=b  PING"),
            Err(MessageParseError::MissingCommand)
        );
        assert_eq!(
            Message::parse(":nick  PING"),
            Err(MessageParseError::MissingCommand)
        );
    }

    #[test]
    fn test_errors_have_messages() {
        for err in [
            MessageParseError::EmptyMessage,
            MessageParseError::BlankMessage,
            MessageParseError::UnterminatedTags,
            MessageParseError::EmptyTags,
            MessageParseError::UnterminatedPrefix,
            MessageParseError::EmptyPrefix,
            MessageParseError::MissingCommand,
            MessageParseError::MessageTooLong(2000),
        ] {
            assert!(!err.to_string().is_empty());
        }
    }
}

// =============================================================================
// PARAMETERS
// =============================================================================

mod params {
    use super::*;

    #[test]
    fn test_middle_and_trailing() {
        let msg = Message::parse("USER guest 0 * :Real Name").unwrap();
        assert_eq!(msg.params, vec!["guest", "0", "*"]);
        assert_eq!(msg.trailing.as_deref(), Some("Real Name"));
        assert_eq!(msg.last_param(), Some("Real Name"));
    }

    #[test]
    fn test_no_params() {
        let msg = Message::parse("QUIT").unwrap();
        assert!(msg.params.is_empty());
        assert!(msg.trailing.is_none());
        assert_eq!(msg.last_param(), None);
    }

    #[test]
    fn test_only_trailing() {
        let msg = Message::parse("PING :irc.example.com").unwrap();
        assert!(msg.params.is_empty());
        assert_eq!(msg.trailing.as_deref(), Some("irc.example.com"));
    }

    #[test]
    fn test_last_middle_param_without_trailing() {
        let msg = Message::parse(":nick!u@h JOIN #rust").unwrap();
        assert_eq!(msg.params, vec!["#rust"]);
        assert!(msg.trailing.is_none());
        assert_eq!(msg.last_param(), Some("#rust"));
    }

    #[test]
    fn test_numeric_reply() {
        let msg = Message::parse(":srv 353 bot = #rust :@alice +bob").unwrap();
        assert!(msg.is_numeric());
        assert_eq!(msg.command.parse::<Response>(), Ok(Response::RPL_NAMREPLY));
        assert_eq!(msg.params, vec!["bot", "=", "#rust"]);
        assert!(!Message::parse("PING x").unwrap().is_numeric());
    }

    #[test]
    fn test_command_is_case_preserved() {
        let msg = Message::parse("privmsg #c :x").unwrap();
        assert_eq!(msg.command, "privmsg");
    }
}

// =============================================================================
// PREFIX
// =============================================================================

mod prefix {
    use super::*;

    #[test]
    fn test_full_prefix() {
        let prefix = Prefix::parse("nick!user@host.example");
        assert_eq!(prefix.nick(), Some("nick"));
        assert_eq!(prefix.user(), Some("user"));
        assert_eq!(prefix.host(), Some("host.example"));
    }

    #[test]
    fn test_nick_at_host() {
        let prefix = Prefix::parse("nick@host");
        assert_eq!(prefix.name, "nick");
        assert_eq!(prefix.user(), None);
        assert_eq!(prefix.host(), Some("host"));
    }

    #[test]
    fn test_server_name() {
        let prefix = Prefix::parse("irc.example.com");
        assert_eq!(prefix.name, "irc.example.com");
        assert_eq!(prefix.to_string(), "irc.example.com");
    }

    #[test]
    fn test_display_matches_input() {
        for raw in ["nick!user@host", "nick@host", "server.name", "nick!user"] {
            assert_eq!(Prefix::parse(raw).to_string(), raw);
        }
    }
}
