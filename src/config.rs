//! Session and connection configuration.
//!
//! Every type is constructible in code; [`BotsConfig`] additionally loads a
//! set of named sessions from TOML:
//!
//! ```toml
//! [bots.libera]
//! host = "irc.libera.chat"
//! port = 6697
//! channels = ["#rust"]
//! plugins = ["Registration", "Ping", "Pong", "Join"]
//!
//! [bots.libera.secure]
//! enable = true
//!
//! [bots.libera.identification]
//! nick = "slirc"
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Transport security settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecureConfig {
    /// Wrap the socket in TLS.
    #[serde(default)]
    pub enable: bool,
    /// Verify the server certificate. Turning this off is an explicit opt-out.
    #[serde(default = "default_true")]
    pub verify: bool,
}

impl Default for SecureConfig {
    fn default() -> Self {
        Self {
            enable: false,
            verify: true,
        }
    }
}

/// Bot identity. Registration handlers keep `nick` current.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identification {
    /// Nickname.
    #[serde(default)]
    pub nick: String,
    /// Username; the nickname is used when empty.
    #[serde(default)]
    pub user: String,
    /// Real name; the nickname is used when empty.
    #[serde(default)]
    pub name: String,
}

/// Timing parameters, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timings {
    /// Read/write deadline, also used as the connect deadline.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Interval between keepalive pings.
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            ping_interval: default_ping_interval(),
        }
    }
}

/// Which terminal connection errors make the session reconnect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconnectOn {
    /// Only deadline expiries.
    #[default]
    Timeout,
    /// Any terminal failure of the read or write loop.
    #[serde(rename = "any")]
    AnyFailure,
}

/// Rate and concurrency limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Outbound messages per second.
    #[serde(default = "default_rate")]
    pub rate: u32,
    /// Consecutive read timeouts tolerated before the connection is dropped.
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Concurrent handler invocations per session.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Reconnect policy.
    #[serde(default)]
    pub reconnect: ReconnectOn,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            rate: default_rate(),
            retries: default_retries(),
            workers: default_workers(),
            reconnect: ReconnectOn::default(),
        }
    }
}

/// Reconnect backoff parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// First delay, in milliseconds.
    #[serde(default = "default_backoff_initial")]
    pub initial_ms: u64,
    /// Upper bound on the delay, in seconds.
    #[serde(default = "default_backoff_max")]
    pub max_secs: u64,
    /// Growth factor per failed attempt.
    #[serde(default = "default_backoff_factor")]
    pub factor: f64,
    /// Maximum random jitter as a fraction of the current delay.
    #[serde(default = "default_backoff_jitter")]
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_ms: default_backoff_initial(),
            max_secs: default_backoff_max(),
            factor: default_backoff_factor(),
            jitter: default_backoff_jitter(),
        }
    }
}

/// Configuration of one bot session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Server hostname.
    #[serde(default)]
    pub host: String,
    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Channels joined after registration.
    #[serde(default)]
    pub channels: Vec<String>,
    /// Enabled handler names.
    #[serde(default)]
    pub plugins: Vec<String>,
    /// Transport security.
    #[serde(default)]
    pub secure: SecureConfig,
    /// Identity.
    #[serde(default)]
    pub identification: Identification,
    /// Deadlines and keepalive interval.
    #[serde(default)]
    pub timings: Timings,
    /// Rate and concurrency limits.
    #[serde(default)]
    pub limits: Limits,
    /// Reconnect backoff.
    #[serde(default)]
    pub backoff: BackoffConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_port(),
            channels: Vec::new(),
            plugins: Vec::new(),
            secure: SecureConfig::default(),
            identification: Identification::default(),
            timings: Timings::default(),
            limits: Limits::default(),
            backoff: BackoffConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Create a configuration for `nick` at `host:port` with default settings.
    pub fn new(host: impl Into<String>, port: u16, nick: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            identification: Identification {
                nick: nick.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Check for values the client cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(invalid("host", "must not be empty"));
        }
        if self.port == 0 {
            return Err(invalid("port", "must not be zero"));
        }
        if self.identification.nick.trim().is_empty() {
            return Err(invalid("identification.nick", "must not be empty"));
        }
        if self.limits.rate == 0 {
            return Err(invalid("limits.rate", "must be at least 1"));
        }
        if self.limits.workers == 0 {
            return Err(invalid("limits.workers", "must be at least 1"));
        }
        if self.timings.timeout == 0 {
            return Err(invalid("timings.timeout", "must be at least 1"));
        }
        if self.timings.ping_interval == 0 {
            return Err(invalid("timings.ping_interval", "must be at least 1"));
        }
        if self.backoff.initial_ms == 0 {
            return Err(invalid("backoff.initial_ms", "must be at least 1"));
        }
        if self.backoff.factor < 1.0 {
            return Err(invalid("backoff.factor", "must be at least 1.0"));
        }
        if !(0.0..=1.0).contains(&self.backoff.jitter) {
            return Err(invalid("backoff.jitter", "must be between 0 and 1"));
        }
        Ok(())
    }

    /// Engine settings derived from this session configuration.
    pub fn connection(&self) -> ConnectionConfig {
        ConnectionConfig {
            host: self.host.clone(),
            port: self.port,
            secure: self.secure.enable,
            verify: self.secure.verify,
            timeout: Duration::from_secs(self.timings.timeout),
            timeout_limit: self.limits.retries,
            messages_per_second: self.limits.rate,
        }
    }

    /// Effective username.
    pub fn user(&self) -> &str {
        non_empty_or(&self.identification.user, &self.identification.nick)
    }

    /// Effective real name.
    pub fn real_name(&self) -> &str {
        non_empty_or(&self.identification.name, &self.identification.nick)
    }
}

/// Connection engine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Wrap the socket in TLS.
    pub secure: bool,
    /// Verify the server certificate.
    pub verify: bool,
    /// Connect, read and write deadline.
    pub timeout: Duration,
    /// Consecutive read timeouts tolerated.
    pub timeout_limit: u32,
    /// Outbound messages per second.
    pub messages_per_second: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        SessionConfig::default().connection()
    }
}

impl ConnectionConfig {
    /// Spacing between outbound messages.
    pub fn send_interval(&self) -> Duration {
        Duration::from_secs(1) / self.messages_per_second.max(1)
    }
}

/// A set of named bot sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BotsConfig {
    /// Sessions keyed by bot name.
    #[serde(default)]
    pub bots: BTreeMap<String, SessionConfig>,
}

impl BotsConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: BotsConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate every session, naming the bot in the error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, bot) in &self.bots {
            bot.validate().map_err(|e| match e {
                ConfigError::Invalid { field, reason } => ConfigError::Invalid {
                    field: format!("bots.{}.{}", name, field),
                    reason,
                },
                other => other,
            })?;
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &'static str) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason,
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

fn default_true() -> bool {
    true
}

fn default_port() -> u16 {
    6667
}

fn default_timeout() -> u64 {
    30
}

fn default_ping_interval() -> u64 {
    60
}

fn default_rate() -> u32 {
    2
}

fn default_retries() -> u32 {
    5
}

fn default_workers() -> usize {
    32
}

fn default_backoff_initial() -> u64 {
    1000
}

fn default_backoff_max() -> u64 {
    300
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_backoff_jitter() -> f64 {
    0.25
}
