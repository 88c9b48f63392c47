//! Error types for the IRC client library.
//!
//! Each layer has its own error enum: wire parsing ([`MessageParseError`]),
//! the connection engine ([`ConnectionError`]), the handler catalog
//! ([`RegistryError`]), sessions ([`SessionError`]), the multi-bot
//! [`ManagerError`], and configuration loading ([`ConfigError`]).

use std::time::Duration;

use thiserror::Error;

/// Convenience type alias for Results using [`ConnectionError`].
pub type Result<T, E = ConnectionError> = std::result::Result<T, E>;

/// Errors encountered when parsing IRC messages.
///
/// Every rejection has its own variant so callers can match on the exact
/// cause; parsing never yields a partially populated message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageParseError {
    /// Message exceeded the maximum line length.
    #[error("message too long: {0} bytes")]
    MessageTooLong(usize),

    /// Message was empty.
    #[error("empty message")]
    EmptyMessage,

    /// Message contained nothing but whitespace.
    #[error("message is blank")]
    BlankMessage,

    /// Tag block was not followed by a space.
    #[error("message ends with tags")]
    UnterminatedTags,

    /// Tag block was present but empty (`@ `).
    #[error("empty tag field")]
    EmptyTags,

    /// Prefix block was not followed by a space.
    #[error("message ends with prefix")]
    UnterminatedPrefix,

    /// Prefix block was present but empty or whitespace (`: `).
    #[error("empty prefix")]
    EmptyPrefix,

    /// No command token followed the tags and prefix.
    #[error("missing command")]
    MissingCommand,
}

/// Errors raised by the connection engine.
///
/// Errors from the background read and write loops are delivered through the
/// engine's error queue; `connect`, `reconnect` and `send` return them directly.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConnectionError {
    /// `connect` was called while a socket is live.
    #[error("connection already active")]
    AlreadyConnected,

    /// The engine was disconnected and its queues are closed.
    #[error("connection closed")]
    Closed,

    /// Host or port missing from the configuration.
    #[error("need hostname and port to connect, got {host:?}:{port}")]
    InvalidTarget {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
    },

    /// The host cannot be used as a TLS server name.
    #[error("invalid TLS server name: {0}")]
    InvalidServerName(String),

    /// TLS handshake failed.
    #[error("tls error: {0}")]
    Tls(#[source] std::io::Error),

    /// I/O error on the socket.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Establishing the TCP connection took longer than the deadline.
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// Consecutive read deadlines exceeded the configured tolerance.
    #[error("read timed out {attempts} times in a row")]
    ReadTimeout {
        /// Number of consecutive deadlines that expired.
        attempts: u32,
    },

    /// A socket write did not finish before the write deadline.
    #[error("write timed out after {0:?}")]
    WriteTimeout(Duration),

    /// An empty line was queued for sending.
    #[error("tried to send empty message")]
    EmptyMessage,

    /// A queued line contained a CR or LF before its end.
    #[error("outbound line contains a line break: {0:?}")]
    LineBreak(String),

    /// An inbound line could not be parsed.
    #[error("could not parse {raw:?}: {cause}")]
    Parse {
        /// The offending raw line.
        raw: String,
        /// The underlying parse error.
        #[source]
        cause: MessageParseError,
    },

    /// The server closed the stream.
    #[error("server closed the connection")]
    Disconnected,
}

impl ConnectionError {
    /// Whether this error is a deadline expiry.
    pub fn is_timeout(&self) -> bool {
        match self {
            ConnectionError::ReadTimeout { .. }
            | ConnectionError::WriteTimeout(_)
            | ConnectionError::ConnectTimeout(_) => true,
            ConnectionError::Io(e) => e.kind() == std::io::ErrorKind::TimedOut,
            _ => false,
        }
    }

    /// Whether the loop that reported this error has stopped.
    ///
    /// Rejected outbound lines ([`ConnectionError::EmptyMessage`] and
    /// [`ConnectionError::LineBreak`]) leave the writer running.
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            ConnectionError::EmptyMessage | ConnectionError::LineBreak(_)
        )
    }
}

/// Errors raised while building the handler catalog.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegistryError {
    /// A handler with the same name is already registered for the event.
    #[error("handler {name:?} already exists for event {event:?}")]
    HandlerExists {
        /// Event the handler was registered for.
        event: String,
        /// Handler name.
        name: String,
    },
}

/// Errors raised by a session.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// The underlying connection failed.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// The outbound queue is closed; the session was stopped.
    #[error("outbound queue closed")]
    QueueClosed,
}

/// Errors raised by the bot manager.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ManagerError {
    /// A bot with that name is already managed.
    #[error("bot {0:?} already exists")]
    BotExists(String),

    /// No bot with that name is managed.
    #[error("bot {0:?} not found")]
    BotNotFound(String),

    /// A bot failed to start.
    #[error("bot {name:?} failed to start: {source}")]
    Session {
        /// Bot name.
        name: String,
        /// Why it failed.
        #[source]
        source: SessionError,
    },

    /// Waiting for the shutdown signal failed.
    #[error("signal handling failed: {0}")]
    Signal(#[source] std::io::Error),
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("could not read config: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration is not valid TOML or has the wrong shape.
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    /// A field holds a value the client cannot use.
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MessageParseError::MessageTooLong(2048);
        assert_eq!(format!("{}", err), "message too long: 2048 bytes");

        let err = ConnectionError::EmptyMessage;
        assert_eq!(format!("{}", err), "tried to send empty message");

        let err = RegistryError::HandlerExists {
            event: "PING".to_string(),
            name: "Ping".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "handler \"Ping\" already exists for event \"PING\""
        );
    }

    #[test]
    fn test_parse_errors_are_distinct() {
        let all = [
            MessageParseError::MessageTooLong(1025),
            MessageParseError::EmptyMessage,
            MessageParseError::BlankMessage,
            MessageParseError::UnterminatedTags,
            MessageParseError::EmptyTags,
            MessageParseError::UnterminatedPrefix,
            MessageParseError::EmptyPrefix,
            MessageParseError::MissingCommand,
        ];

        for (i, a) in all.iter().enumerate() {
            for (j, b) in all.iter().enumerate() {
                assert_eq!(i == j, a == b);
                assert_eq!(i == j, a.to_string() == b.to_string());
            }
        }
    }

    #[test]
    fn test_connection_error_chaining() {
        let err = ConnectionError::Parse {
            raw: "@tag=val".to_string(),
            cause: MessageParseError::UnterminatedTags,
        };

        let source = std::error::Error::source(&err);
        assert!(source.is_some());
        assert_eq!(source.unwrap().to_string(), "message ends with tags");
    }

    #[test]
    fn test_classification() {
        assert!(ConnectionError::ReadTimeout { attempts: 6 }.is_timeout());
        assert!(ConnectionError::WriteTimeout(Duration::from_secs(1)).is_timeout());
        assert!(ConnectionError::Io(std::io::ErrorKind::TimedOut.into()).is_timeout());
        assert!(!ConnectionError::Disconnected.is_timeout());
        assert!(!ConnectionError::EmptyMessage.is_terminal());
        assert!(!ConnectionError::LineBreak("a\nb".to_string()).is_terminal());
        assert!(ConnectionError::Disconnected.is_terminal());
    }

    #[test]
    fn test_error_conversion() {
        let io_err =
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
        let err: ConnectionError = io_err.into();
        assert!(matches!(err, ConnectionError::Io(_)));

        let session: SessionError = err.into();
        assert!(matches!(session, SessionError::Connection(_)));
    }
}
