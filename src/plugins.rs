//! Built-in handlers.
//!
//! These cover what every bot needs on a typical network: registration,
//! answering server pings, measuring keepalive latency, auto-joining
//! channels, following nick changes, and tracking channel membership.
//! Register them with [`register_builtins`] and enable them by name in the
//! session configuration.

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use crate::error::RegistryError;
use crate::handler::{Handler, Registry};
use crate::message::Message;
use crate::response::{commands, Response};
use crate::session::Session;

/// Notice text after which the server expects NICK and USER.
pub const HOSTNAME_LOOKUP: &str = "*** Looking up your hostname...";

/// Names of the built-in handlers.
pub const BUILTINS: &[&str] = &["Registration", "Ping", "Pong", "Join", "Nick", "Tracker"];

/// Register every built-in handler.
pub fn register_builtins(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.register(Registration)?;
    registry.register(Ping)?;
    registry.register(Pong)?;
    registry.register(Join)?;
    registry.register(Nick(commands::NICK))?;
    registry.register(Nick(Response::ERR_NICKNAMEINUSE.event()))?;
    for event in [
        commands::JOIN,
        commands::PART,
        commands::KICK,
        commands::QUIT,
        commands::NICK,
        Response::RPL_NAMREPLY.event(),
    ] {
        registry.register(Tracker(event))?;
    }
    Ok(())
}

/// Sends NICK and USER once the server starts looking up our hostname.
#[derive(Debug, Clone, Copy)]
pub struct Registration;

#[async_trait]
impl Handler for Registration {
    fn name(&self) -> &str {
        "Registration"
    }

    fn description(&self) -> &str {
        "Registers the bot to the server"
    }

    fn event(&self) -> &str {
        commands::NOTICE
    }

    async fn run(&self, session: &Session, message: &Message) -> anyhow::Result<bool> {
        if message.trailing.as_deref() != Some(HOSTNAME_LOOKUP) {
            return Ok(false);
        }

        let config = session.config();
        session.change_nick(&config.identification.nick).await?;
        session.user(config.user(), config.real_name()).await?;
        Ok(true)
    }
}

/// Answers server pings.
#[derive(Debug, Clone, Copy)]
pub struct Ping;

#[async_trait]
impl Handler for Ping {
    fn name(&self) -> &str {
        "Ping"
    }

    fn description(&self) -> &str {
        "Handles ping requests from the server"
    }

    fn event(&self) -> &str {
        commands::PING
    }

    async fn run(&self, session: &Session, message: &Message) -> anyhow::Result<bool> {
        let token = message
            .trailing
            .as_deref()
            .or_else(|| message.params.first().map(String::as_str))
            .unwrap_or_default();
        session.pong(token).await?;
        Ok(true)
    }
}

/// Logs the round trip of keepalive pings.
#[derive(Debug, Clone, Copy)]
pub struct Pong;

#[async_trait]
impl Handler for Pong {
    fn name(&self) -> &str {
        "Pong"
    }

    fn description(&self) -> &str {
        "Handles pong responses from the server"
    }

    fn event(&self) -> &str {
        commands::PONG
    }

    async fn run(&self, session: &Session, message: &Message) -> anyhow::Result<bool> {
        let Some(sent) = message.last_param().and_then(|p| p.parse::<i64>().ok()) else {
            return Ok(false);
        };
        let now = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let latency_ms = now.saturating_sub(sent) / 1_000_000;
        info!(bot = %session.name(), latency_ms, "pong");
        Ok(true)
    }
}

/// Joins the configured channels after the welcome reply.
#[derive(Debug, Clone, Copy)]
pub struct Join;

#[async_trait]
impl Handler for Join {
    fn name(&self) -> &str {
        "Join"
    }

    fn description(&self) -> &str {
        "Joins all configured channels after registration"
    }

    fn event(&self) -> &str {
        Response::RPL_WELCOME.event()
    }

    async fn run(&self, session: &Session, _message: &Message) -> anyhow::Result<bool> {
        for channel in session.config().channels {
            session.join(&channel).await?;
        }
        Ok(true)
    }
}

/// Keeps the session's nick in line with the server.
///
/// On `NICK` from ourselves the new nick is stored; on `433` an underscore
/// is appended and the changed nick is requested.
#[derive(Debug, Clone, Copy)]
pub struct Nick(&'static str);

#[async_trait]
impl Handler for Nick {
    fn name(&self) -> &str {
        "Nick"
    }

    fn description(&self) -> &str {
        "Follows nick changes and retries taken nicks"
    }

    fn event(&self) -> &str {
        self.0
    }

    async fn run(&self, session: &Session, message: &Message) -> anyhow::Result<bool> {
        if message.command == Response::ERR_NICKNAMEINUSE.event() {
            let nick = format!("{}_", session.nick());
            debug!(bot = %session.name(), nick = %nick, "nickname in use, retrying");
            session.set_nick(nick.as_str());
            session.change_nick(&nick).await?;
            return Ok(true);
        }

        let (Some(old), Some(new)) = (message.source_nickname(), message.last_param()) else {
            return Ok(false);
        };
        if old != session.nick() {
            return Ok(false);
        }
        info!(bot = %session.name(), old, new, "nick changed");
        session.set_nick(new);
        Ok(true)
    }
}

/// Maintains the session's channel roster.
#[derive(Debug, Clone, Copy)]
pub struct Tracker(&'static str);

#[async_trait]
impl Handler for Tracker {
    fn name(&self) -> &str {
        "Tracker"
    }

    fn description(&self) -> &str {
        "Tracks channels and the users in them"
    }

    fn event(&self) -> &str {
        self.0
    }

    async fn run(&self, session: &Session, message: &Message) -> anyhow::Result<bool> {
        let nick = message.source_nickname();

        match (message.command.as_str(), nick) {
            (commands::JOIN, Some(nick)) => {
                let Some(channel) = message.last_param() else {
                    return Ok(false);
                };
                session.track_join(channel, nick);
            }
            (commands::PART, Some(nick)) => {
                let Some(channel) = message.params.first() else {
                    return Ok(false);
                };
                session.track_part(channel, nick);
            }
            (commands::KICK, _) => {
                let (Some(channel), Some(kicked)) = (message.params.first(), message.params.get(1))
                else {
                    return Ok(false);
                };
                session.track_part(channel, kicked);
            }
            (commands::QUIT, Some(nick)) => session.track_quit(nick),
            (commands::NICK, Some(old)) => {
                let Some(new) = message.last_param() else {
                    return Ok(false);
                };
                session.track_nick(old, new);
            }
            (event, _) if event == Response::RPL_NAMREPLY.event() => {
                let (Some(channel), Some(names)) = (message.params.get(2), message.trailing.as_deref())
                else {
                    return Ok(false);
                };
                session.track_names(channel, names.split_whitespace());
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}
