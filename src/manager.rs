//! Multi-bot manager.
//!
//! A [`Manager`] owns sessions by name and starts and stops them together.
//! Starting is all-or-nothing: if any session fails to connect, every
//! session is closed and the failure is returned.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info};

use crate::config::BotsConfig;
use crate::error::ManagerError;
use crate::handler::Registry;
use crate::session::Session;

/// Owns sessions by name.
#[derive(Debug, Default)]
pub struct Manager {
    bots: Mutex<BTreeMap<String, Session>>,
    running: AtomicBool,
}

impl Manager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a manager holding one session per configured bot.
    pub fn from_config(config: &BotsConfig, registry: Arc<Registry>) -> Self {
        let bots = config
            .bots
            .iter()
            .map(|(name, bot)| {
                let session = Session::new(name.clone(), bot.clone(), registry.clone());
                (name.clone(), session)
            })
            .collect();

        Manager {
            bots: Mutex::new(bots),
            running: AtomicBool::new(false),
        }
    }

    /// Whether [`start`](Manager::start) succeeded and [`stop`](Manager::stop)
    /// has not run since.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Names of the managed bots, sorted.
    pub async fn names(&self) -> Vec<String> {
        self.bots.lock().await.keys().cloned().collect()
    }

    /// The session managed under `name`.
    pub async fn get(&self, name: &str) -> Option<Session> {
        self.bots.lock().await.get(name).cloned()
    }

    /// Add a session. While the manager is running it is started first and
    /// only added if that succeeds.
    pub async fn add(&self, name: impl Into<String>, session: Session) -> Result<(), ManagerError> {
        let name = name.into();
        let mut bots = self.bots.lock().await;
        if bots.contains_key(&name) {
            return Err(ManagerError::BotExists(name));
        }

        if self.is_running() {
            session
                .start()
                .await
                .map_err(|source| ManagerError::Session {
                    name: name.clone(),
                    source,
                })?;
        }

        info!(bot = %name, "bot added");
        bots.insert(name, session);
        Ok(())
    }

    /// Remove a session, closing it if the manager is running.
    pub async fn remove(&self, name: &str) -> Result<Session, ManagerError> {
        let session = self
            .bots
            .lock()
            .await
            .remove(name)
            .ok_or_else(|| ManagerError::BotNotFound(name.to_owned()))?;

        if self.is_running() {
            session.close().await;
        }
        info!(bot = %name, "bot removed");
        Ok(session)
    }

    /// Start every session.
    ///
    /// If one fails, all sessions are closed and its error is returned.
    pub async fn start(&self) -> Result<(), ManagerError> {
        let bots = self.bots.lock().await;
        if self.is_running() {
            return Ok(());
        }

        for (name, session) in bots.iter() {
            if let Err(source) = session.start().await {
                error!(bot = %name, error = %source, "bot failed to start, stopping all");
                for session in bots.values() {
                    session.close().await;
                }
                return Err(ManagerError::Session {
                    name: name.clone(),
                    source,
                });
            }
        }

        self.running.store(true, Ordering::SeqCst);
        info!(bots = bots.len(), "manager started");
        Ok(())
    }

    /// Close every session.
    pub async fn stop(&self) {
        let bots = self.bots.lock().await;
        for session in bots.values() {
            session.close().await;
        }
        self.running.store(false, Ordering::SeqCst);
        info!(bots = bots.len(), "manager stopped");
    }

    /// Start if needed, wait for Ctrl-C or SIGTERM, then stop.
    pub async fn run(&self) -> Result<(), ManagerError> {
        if !self.is_running() {
            self.start().await?;
        }

        let signal = shutdown_signal().await;
        self.stop().await;
        signal
    }

    /// Start if needed, wait for `shutdown` to complete, then stop.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<(), ManagerError>
    where
        F: Future<Output = ()>,
    {
        if !self.is_running() {
            self.start().await?;
        }

        shutdown.await;
        self.stop().await;
        Ok(())
    }
}

async fn shutdown_signal() -> Result<(), ManagerError> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = signal(SignalKind::terminate()).map_err(ManagerError::Signal)?;
        tokio::select! {
            ctrl_c = tokio::signal::ctrl_c() => ctrl_c.map_err(ManagerError::Signal)?,
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await.map_err(ManagerError::Signal)?;

    info!("shutdown signal received");
    Ok(())
}
