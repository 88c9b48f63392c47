//! Command names and numeric replies the client drives.
//!
//! Only the replies needed for registration, keepalive, nick recovery and
//! channel tracking are listed. Handlers key on the wire form, so both the
//! command constants and [`Response::event`] produce the exact event string.
//!
//! # Reference
//! - RFC 2812: Internet Relay Chat: Client Protocol

#![allow(non_camel_case_types)]

use std::fmt;
use std::str::FromStr;

/// Protocol command names, as they appear on the wire.
pub mod commands {
    /// Liveness check.
    pub const PING: &str = "PING";
    /// Liveness reply.
    pub const PONG: &str = "PONG";
    /// Notice to a user or channel.
    pub const NOTICE: &str = "NOTICE";
    /// Message to a user or channel.
    pub const PRIVMSG: &str = "PRIVMSG";
    /// Channel join.
    pub const JOIN: &str = "JOIN";
    /// Channel part.
    pub const PART: &str = "PART";
    /// Removal from a channel.
    pub const KICK: &str = "KICK";
    /// Client disconnect.
    pub const QUIT: &str = "QUIT";
    /// Nickname change.
    pub const NICK: &str = "NICK";
    /// Registration user line.
    pub const USER: &str = "USER";
}

/// IRC server numeric reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
#[non_exhaustive]
pub enum Response {
    /// 001 - Welcome to the IRC network; registration is complete.
    RPL_WELCOME = 1,
    /// 353 - Names list for a channel.
    RPL_NAMREPLY = 353,
    /// 366 - End of names list.
    RPL_ENDOFNAMES = 366,
    /// 376 - End of MOTD.
    RPL_ENDOFMOTD = 376,
    /// 422 - MOTD file is missing.
    ERR_NOMOTD = 422,
    /// 432 - Erroneous nickname.
    ERR_ERRONEUSNICKNAME = 432,
    /// 433 - Nickname is already in use.
    ERR_NICKNAMEINUSE = 433,
}

impl Response {
    /// Numeric code.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Three-digit wire form, used as the dispatch event name.
    pub fn event(self) -> &'static str {
        match self {
            Response::RPL_WELCOME => "001",
            Response::RPL_NAMREPLY => "353",
            Response::RPL_ENDOFNAMES => "366",
            Response::RPL_ENDOFMOTD => "376",
            Response::ERR_NOMOTD => "422",
            Response::ERR_ERRONEUSNICKNAME => "432",
            Response::ERR_NICKNAMEINUSE => "433",
        }
    }

    /// Whether this is an error reply (400-599).
    pub fn is_error(self) -> bool {
        (400..600).contains(&self.code())
    }

    /// Look up a numeric code.
    pub fn from_code(code: u16) -> Option<Response> {
        Some(match code {
            1 => Response::RPL_WELCOME,
            353 => Response::RPL_NAMREPLY,
            366 => Response::RPL_ENDOFNAMES,
            376 => Response::RPL_ENDOFMOTD,
            422 => Response::ERR_NOMOTD,
            432 => Response::ERR_ERRONEUSNICKNAME,
            433 => Response::ERR_NICKNAMEINUSE,
            _ => return None,
        })
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event())
    }
}

impl FromStr for Response {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 3 {
            return Err(());
        }
        s.parse::<u16>()
            .ok()
            .and_then(Response::from_code)
            .ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_is_zero_padded() {
        assert_eq!(Response::RPL_WELCOME.event(), "001");
        assert_eq!(Response::ERR_NICKNAMEINUSE.to_string(), "433");

        for code in 0..1000 {
            if let Some(response) = Response::from_code(code) {
                assert_eq!(response.event(), format!("{:03}", code));
                assert_eq!(response.event().parse::<Response>(), Ok(response));
            }
        }
    }

    #[test]
    fn test_from_str() {
        assert_eq!("001".parse::<Response>(), Ok(Response::RPL_WELCOME));
        assert_eq!("353".parse::<Response>(), Ok(Response::RPL_NAMREPLY));
        assert!("1".parse::<Response>().is_err());
        assert!("999".parse::<Response>().is_err());
        assert!("PING".parse::<Response>().is_err());
    }

    #[test]
    fn test_is_error() {
        assert!(Response::ERR_NICKNAMEINUSE.is_error());
        assert!(!Response::RPL_WELCOME.is_error());
    }
}
