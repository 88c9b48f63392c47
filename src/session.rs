//! Bot sessions.
//!
//! A [`Session`] binds one identity to one [`Connection`]. Starting it
//! connects, runs the enabled handlers' initializers, and spawns three loops:
//!
//! - the error loop drains the engine's error queue and reconnects with
//!   backoff when the reconnect policy matches;
//! - the keepalive loop sends `PING :<unix nanos>` every `ping_interval`;
//! - the dispatch loop hands each inbound message to the enabled handlers
//!   for its command, at most `workers` at a time.
//!
//! `Session` is a cheap handle; clones share the same state.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backoff::Backoff;
use crate::config::{ReconnectOn, SessionConfig};
use crate::connection::Connection;
use crate::error::{ConnectionError, SessionError};
use crate::handler::Registry;
use crate::message::Message;
use crate::response::commands;

/// QUIT text sent by [`Session::close`].
pub const DEFAULT_FAREWELL: &str = "Leaving";

/// A channel the session is in, with the nicks seen there.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Channel {
    /// Channel name as first seen.
    pub name: String,
    /// Nicks currently tracked in the channel.
    pub users: BTreeSet<String>,
}

impl Channel {
    fn new(name: &str) -> Self {
        Channel {
            name: name.to_owned(),
            users: BTreeSet::new(),
        }
    }
}

fn channel_key(name: &str) -> String {
    name.to_ascii_lowercase()
}

struct SessionInner {
    name: String,
    config: RwLock<SessionConfig>,
    enabled: HashSet<String>,
    connection: Connection,
    registry: Arc<Registry>,
    channels: RwLock<BTreeMap<String, Channel>>,
    shutdown: CancellationToken,
    started: AtomicBool,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// One bot identity bound to one connection.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("name", &self.inner.name)
            .field("nick", &self.nick())
            .finish()
    }
}

impl Session {
    /// Create a session named `name` (used in logs) using handlers from
    /// `registry`.
    pub fn new(name: impl Into<String>, config: SessionConfig, registry: Arc<Registry>) -> Self {
        let enabled = config.plugins.iter().cloned().collect();
        let connection = Connection::new(config.connection());

        Session {
            inner: Arc::new(SessionInner {
                name: name.into(),
                config: RwLock::new(config),
                enabled,
                connection,
                registry,
                channels: RwLock::new(BTreeMap::new()),
                shutdown: CancellationToken::new(),
                started: AtomicBool::new(false),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Session name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> SessionConfig {
        self.inner.config.read().clone()
    }

    /// The underlying connection engine.
    pub fn connection(&self) -> &Connection {
        &self.inner.connection
    }

    /// The handler catalog.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.inner.registry
    }

    /// Whether `handler` is in the enabled list.
    pub fn is_enabled(&self, handler: &str) -> bool {
        self.inner.enabled.contains(handler)
    }

    /// Current nickname.
    pub fn nick(&self) -> String {
        self.inner.config.read().identification.nick.clone()
    }

    /// Record a nickname change.
    pub fn set_nick(&self, nick: impl Into<String>) {
        self.inner.config.write().identification.nick = nick.into();
    }

    /// Record a username change.
    pub fn set_user(&self, user: impl Into<String>) {
        self.inner.config.write().identification.user = user.into();
    }

    /// Whether `start` has run and `close` has not.
    pub fn is_running(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst) && !self.inner.shutdown.is_cancelled()
    }

    /// Connect, run initializers, and spawn the session loops.
    pub async fn start(&self) -> Result<(), SessionError> {
        if self.inner.shutdown.is_cancelled() {
            return Err(SessionError::QueueClosed);
        }
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        if let Err(e) = self.inner.connection.connect().await {
            self.inner.started.store(false, Ordering::SeqCst);
            return Err(e.into());
        }

        let (Some(inbound), Some(errors)) = (
            self.inner.connection.take_inbound(),
            self.inner.connection.take_errors(),
        ) else {
            return Err(SessionError::QueueClosed);
        };

        for name in &self.inner.enabled {
            if !self.inner.registry.contains(name) {
                warn!(bot = %self.inner.name, handler = %name, "enabled handler is not registered");
            }
        }

        self.run_initializers().await;

        let (config, weak) = (self.config(), Arc::downgrade(&self.inner));
        let tasks = vec![
            tokio::spawn(error_loop(weak.clone(), errors, config.clone())),
            tokio::spawn(keepalive_loop(
                weak.clone(),
                Duration::from_secs(config.timings.ping_interval),
            )),
            tokio::spawn(dispatch_loop(weak, inbound, config.limits.workers)),
        ];
        self.inner.tasks.lock().extend(tasks);

        info!(bot = %self.inner.name, "session started");
        Ok(())
    }

    async fn run_initializers(&self) {
        let registry = self.inner.registry.clone();
        for handler in registry.initializers(&self.inner.enabled) {
            match handler.init(self).await {
                Ok(_) => debug!(bot = %self.inner.name, handler = handler.name(), "initialized"),
                Err(e) => error!(
                    bot = %self.inner.name,
                    handler = handler.name(),
                    error = %e,
                    "handler initialization failed"
                ),
            }
        }
    }

    /// Stop the loops and disconnect with the default farewell.
    pub async fn close(&self) {
        self.close_with(DEFAULT_FAREWELL).await;
    }

    /// Stop the loops and disconnect, sending `QUIT :<farewell>`.
    pub async fn close_with(&self, farewell: &str) {
        self.inner.shutdown.cancel();
        self.inner.connection.disconnect(Some(farewell)).await;

        let tasks: Vec<_> = self.inner.tasks.lock().drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                warn!(bot = %self.inner.name, error = %e, "session loop did not exit cleanly");
            }
        }
        info!(bot = %self.inner.name, "session closed");
    }

    /// Enqueue a raw line.
    pub async fn send_raw(&self, line: impl Into<String>) -> Result<(), SessionError> {
        self.inner
            .connection
            .send(line)
            .await
            .map_err(|e| match e {
                ConnectionError::Closed => SessionError::QueueClosed,
                other => SessionError::Connection(other),
            })
    }

    /// `PRIVMSG <target> :<text>`.
    pub async fn send(&self, target: &str, text: &str) -> Result<(), SessionError> {
        self.send_raw(format!("{} {} :{}", commands::PRIVMSG, target, text))
            .await
    }

    /// `NOTICE <target> :<text>`.
    pub async fn notice(&self, target: &str, text: &str) -> Result<(), SessionError> {
        self.send_raw(format!("{} {} :{}", commands::NOTICE, target, text))
            .await
    }

    /// `JOIN <channel>`, adding a leading `#` to bare names.
    pub async fn join(&self, channel: &str) -> Result<(), SessionError> {
        let channel = if channel.starts_with('#') {
            channel.to_owned()
        } else {
            format!("#{}", channel)
        };
        self.send_raw(format!("{} {}", commands::JOIN, channel)).await
    }

    /// `PART <channel>`.
    pub async fn part(&self, channel: &str) -> Result<(), SessionError> {
        self.send_raw(format!("{} {}", commands::PART, channel)).await
    }

    /// `PING :<nonce>`.
    pub async fn ping(&self, nonce: &str) -> Result<(), SessionError> {
        self.send_raw(format!("{} :{}", commands::PING, nonce)).await
    }

    /// `PONG :<text>`.
    pub async fn pong(&self, text: &str) -> Result<(), SessionError> {
        self.send_raw(format!("{} :{}", commands::PONG, text)).await
    }

    /// `NICK <nick>`.
    pub async fn change_nick(&self, nick: &str) -> Result<(), SessionError> {
        self.send_raw(format!("{} {}", commands::NICK, nick)).await
    }

    /// `USER <user> 0 * :<real name>`.
    pub async fn user(&self, user: &str, real_name: &str) -> Result<(), SessionError> {
        self.send_raw(format!("{} {} 0 * :{}", commands::USER, user, real_name))
            .await
    }

    /// Names of the channels the session is in.
    pub fn channels(&self) -> Vec<String> {
        self.inner
            .channels
            .read()
            .values()
            .map(|c| c.name.clone())
            .collect()
    }

    /// A handle to a tracked channel.
    pub fn channel(&self, name: &str) -> Option<ChannelRef> {
        let channels = self.inner.channels.read();
        channels.get(&channel_key(name)).map(|c| ChannelRef {
            session: Arc::downgrade(&self.inner),
            name: c.name.clone(),
        })
    }

    /// A handle for messaging `nick`.
    pub fn user_ref(&self, nick: &str) -> UserRef {
        UserRef {
            session: Arc::downgrade(&self.inner),
            nick: nick.to_owned(),
        }
    }

    /// Record that `nick` joined `channel`; our own join adds the channel.
    pub fn track_join(&self, channel: &str, nick: &str) {
        let own = nick == self.nick();
        let mut channels = self.inner.channels.write();
        let key = channel_key(channel);
        if own {
            channels
                .entry(key)
                .or_insert_with(|| Channel::new(channel));
        } else if let Some(c) = channels.get_mut(&key) {
            c.users.insert(nick.to_owned());
        }
    }

    /// Record that `nick` left `channel`; our own part drops the channel.
    pub fn track_part(&self, channel: &str, nick: &str) {
        let own = nick == self.nick();
        let mut channels = self.inner.channels.write();
        let key = channel_key(channel);
        if own {
            channels.remove(&key);
        } else if let Some(c) = channels.get_mut(&key) {
            c.users.remove(nick);
        }
    }

    /// Record that `nick` quit the network.
    pub fn track_quit(&self, nick: &str) {
        for c in self.inner.channels.write().values_mut() {
            c.users.remove(nick);
        }
    }

    /// Record a nick change in every channel.
    pub fn track_nick(&self, old: &str, new: &str) {
        for c in self.inner.channels.write().values_mut() {
            if c.users.remove(old) {
                c.users.insert(new.to_owned());
            }
        }
    }

    /// Record a names reply. Our own nick and membership prefixes are skipped.
    pub fn track_names<'a>(&self, channel: &str, names: impl IntoIterator<Item = &'a str>) {
        let own = self.nick();
        let mut channels = self.inner.channels.write();
        let entry = channels
            .entry(channel_key(channel))
            .or_insert_with(|| Channel::new(channel));
        for name in names {
            let nick = name.trim_start_matches(['~', '&', '@', '%', '+']);
            if !nick.is_empty() && nick != own {
                entry.users.insert(nick.to_owned());
            }
        }
    }
}

fn upgrade(weak: &Weak<SessionInner>) -> Option<Session> {
    weak.upgrade().map(|inner| Session { inner })
}

/// Non-owning handle to a tracked channel.
#[derive(Debug, Clone)]
pub struct ChannelRef {
    session: Weak<SessionInner>,
    name: String,
}

impl ChannelRef {
    /// Channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Nicks currently tracked in the channel.
    pub fn users(&self) -> Result<Vec<String>, SessionError> {
        let session = upgrade(&self.session).ok_or(SessionError::QueueClosed)?;
        let channels = session.inner.channels.read();
        Ok(channels
            .get(&channel_key(&self.name))
            .map(|c| c.users.iter().cloned().collect())
            .unwrap_or_default())
    }

    /// Send a message to the channel.
    pub async fn send(&self, text: &str) -> Result<(), SessionError> {
        let session = upgrade(&self.session).ok_or(SessionError::QueueClosed)?;
        session.send(&self.name, text).await
    }
}

/// Non-owning handle to a user.
#[derive(Debug, Clone)]
pub struct UserRef {
    session: Weak<SessionInner>,
    nick: String,
}

impl UserRef {
    /// Nickname.
    pub fn nick(&self) -> &str {
        &self.nick
    }

    /// Channels in which the user is tracked.
    pub fn channels(&self) -> Result<Vec<String>, SessionError> {
        let session = upgrade(&self.session).ok_or(SessionError::QueueClosed)?;
        let channels = session.inner.channels.read();
        Ok(channels
            .values()
            .filter(|c| c.users.contains(&self.nick))
            .map(|c| c.name.clone())
            .collect())
    }

    /// Send a private message to the user.
    pub async fn send(&self, text: &str) -> Result<(), SessionError> {
        let session = upgrade(&self.session).ok_or(SessionError::QueueClosed)?;
        session.send(&self.nick, text).await
    }
}

fn should_reconnect(error: &ConnectionError, policy: ReconnectOn) -> bool {
    match policy {
        ReconnectOn::Timeout => error.is_timeout(),
        ReconnectOn::AnyFailure => error.is_terminal(),
    }
}

async fn error_loop(
    weak: Weak<SessionInner>,
    mut errors: mpsc::Receiver<ConnectionError>,
    config: SessionConfig,
) {
    let Some(shutdown) = upgrade(&weak).map(|s| s.inner.shutdown.clone()) else {
        return;
    };
    let mut backoff = Backoff::from(&config.backoff);

    loop {
        let error = tokio::select! {
            _ = shutdown.cancelled() => break,
            error = errors.recv() => match error {
                Some(error) => error,
                None => break,
            },
        };

        let Some(session) = upgrade(&weak) else { break };
        warn!(bot = %session.name(), error = %error, "connection error");

        if !should_reconnect(&error, config.limits.reconnect) {
            continue;
        }

        backoff.reset();
        drop(session);
        loop {
            let Some(session) = upgrade(&weak) else { return };
            let delay = match session.connection().reconnect().await {
                Ok(()) => {
                    info!(bot = %session.name(), attempt = backoff.attempt() + 1, "reconnected");
                    break;
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    warn!(
                        bot = %session.name(),
                        error = %e,
                        attempt = backoff.attempt(),
                        delay_ms = delay.as_millis() as u64,
                        "reconnect failed"
                    );
                    delay
                }
            };
            drop(session);

            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = sleep(delay) => {}
            }
        }
    }
}

/// Shorter keepalive intervals, zero included, are raised to this.
const MIN_PING_INTERVAL: Duration = Duration::from_secs(1);

async fn keepalive_loop(weak: Weak<SessionInner>, every: Duration) {
    let Some(shutdown) = upgrade(&weak).map(|s| s.inner.shutdown.clone()) else {
        return;
    };

    let mut ticker = interval(every.max(MIN_PING_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let Some(session) = upgrade(&weak) else { break };
        let nonce = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        if let Err(e) = session.ping(&nonce.to_string()).await {
            debug!(bot = %session.name(), error = %e, "keepalive not sent");
        }
    }
}

async fn dispatch_loop(
    weak: Weak<SessionInner>,
    mut inbound: mpsc::Receiver<Message>,
    workers: usize,
) {
    let Some(shutdown) = upgrade(&weak).map(|s| s.inner.shutdown.clone()) else {
        return;
    };
    let pool = Arc::new(Semaphore::new(workers.max(1)));

    loop {
        let message = tokio::select! {
            _ = shutdown.cancelled() => break,
            message = inbound.recv() => match message {
                Some(message) => Arc::new(message),
                None => break,
            },
        };

        let Some(session) = upgrade(&weak) else { break };
        let registry = session.inner.registry.clone();

        for handler in registry.handlers_for(&message.command) {
            if !session.is_enabled(handler.name()) {
                continue;
            }

            let permit = tokio::select! {
                _ = shutdown.cancelled() => return,
                permit = pool.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return,
                },
            };

            let (handler, session, message) = (handler.clone(), session.clone(), message.clone());
            tokio::spawn(async move {
                let _permit = permit;
                if let Err(e) = handler.run(&session, &message).await {
                    error!(
                        bot = %session.name(),
                        handler = handler.name(),
                        event = handler.event(),
                        error = %e,
                        "handler failed"
                    );
                }
            });
        }
    }

    debug!("dispatch loop stopped");
}
