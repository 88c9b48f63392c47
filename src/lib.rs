//! # slirc-client
//!
//! A self-healing IRC bot client: a strict line codec, a connection engine
//! that keeps a socket alive and reconnects with backoff, per-bot sessions
//! that dispatch inbound messages to named handlers, and a manager that runs
//! many bots in one process.
//!
//! ## Features
//!
//! - Message parsing and serialization with tags, prefixes and trailing text
//! - Plain TCP or rustls TLS, optional certificate verification
//! - Rate-limited outbound queue, read timeouts with a tolerance count
//! - Handler registry with closure handlers and built-in registration,
//!   keepalive, auto-join and channel tracking
//! - TOML configuration for any number of bots
//!
//! With default features off only the I/O-free codec and configuration
//! types are built.

#![deny(clippy::all)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! ## Quick Start
//!
//! ### Parsing and building messages
//!
//! ```rust
//! use slirc_client::{Message, Prefix};
//!
//! let msg: Message = "@id=7 :nick!user@host PRIVMSG #rust :Hello!".parse().unwrap();
//! assert_eq!(msg.command, "PRIVMSG");
//! assert_eq!(msg.tag("id"), Some("7"));
//! assert_eq!(msg.trailing.as_deref(), Some("Hello!"));
//!
//! let reply = Message::new("PRIVMSG")
//!     .with_prefix(Prefix::parse("bot!bot@example.com"))
//!     .with_param("#rust")
//!     .with_trailing("Hi there");
//! assert_eq!(reply.to_string(), ":bot!bot@example.com PRIVMSG #rust :Hi there");
//! ```
//!
//! ### Running a bot
//!
//! ```no_run
//! # #[cfg(feature = "tokio")]
//! # async fn example() -> anyhow::Result<()> {
//! use std::sync::Arc;
//!
//! use slirc_client::{plugins, FnHandler, Manager, Registry, Session, SessionConfig};
//!
//! let mut registry = Registry::new();
//! plugins::register_builtins(&mut registry)?;
//! registry.register(FnHandler::new("Hello", "PRIVMSG", |session, msg| async move {
//!     if msg.trailing.as_deref() == Some("!hello") {
//!         if let Some(channel) = msg.params.first() {
//!             session.send(channel, "hello!").await?;
//!         }
//!     }
//!     Ok(true)
//! }))?;
//!
//! let mut config = SessionConfig::new("irc.libera.chat", 6667, "slirc");
//! config.channels = vec!["#slirc".into()];
//! config.plugins = vec!["Registration".into(), "Ping".into(), "Join".into(), "Hello".into()];
//!
//! let manager = Manager::new();
//! manager.add("libera", Session::new("libera", config, Arc::new(registry))).await?;
//! manager.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod colors;
pub mod config;
pub mod error;
pub mod message;
pub mod prefix;
pub mod response;
pub mod util;

#[cfg(feature = "tokio")]
pub mod backoff;
#[cfg(feature = "tokio")]
pub mod connection;
#[cfg(feature = "tokio")]
pub mod handler;
#[cfg(feature = "tokio")]
pub mod line;
#[cfg(feature = "tokio")]
pub mod manager;
#[cfg(feature = "tokio")]
pub mod plugins;
#[cfg(feature = "tokio")]
pub mod session;

pub use self::colors::Color;
pub use self::config::{BotsConfig, ConnectionConfig, SessionConfig};
pub use self::error::{
    ConfigError, ConnectionError, ManagerError, MessageParseError, RegistryError, SessionError,
};
pub use self::message::{Message, Tags};
pub use self::prefix::Prefix;
pub use self::response::Response;

#[cfg(feature = "tokio")]
pub use self::backoff::Backoff;
#[cfg(feature = "tokio")]
pub use self::connection::Connection;
#[cfg(feature = "tokio")]
pub use self::handler::{FnHandler, Handler, Registry};
#[cfg(feature = "tokio")]
pub use self::line::LineCodec;
#[cfg(feature = "tokio")]
pub use self::manager::Manager;
#[cfg(feature = "tokio")]
pub use self::session::{ChannelRef, Session, UserRef};
