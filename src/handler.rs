//! Handler contract and the handler catalog.
//!
//! A [`Handler`] is a named unit of behavior keyed by the event (command or
//! numeric) it fires on. Handlers are collected into a [`Registry`] at
//! startup; sessions share the registry read-only and activate the handlers
//! named in their configuration.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;

use crate::error::RegistryError;
use crate::message::Message;
use crate::session::Session;

/// A named, event-keyed unit of behavior.
///
/// `run` is invoked for every message whose command equals [`event`](Handler::event)
/// on sessions that enabled the handler. Invocations for one message run
/// concurrently with each other and with the next message's handlers.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Unique name within the event; sessions enable handlers by this name.
    fn name(&self) -> &str;

    /// Human-readable summary.
    fn description(&self) -> &str {
        ""
    }

    /// Command or three-digit numeric this handler fires on.
    fn event(&self) -> &str;

    /// One-time setup, run when a session starts.
    ///
    /// A failure disables nothing; it is logged and the session carries on.
    async fn init(&self, _session: &Session) -> anyhow::Result<bool> {
        Ok(true)
    }

    /// Handle one message.
    async fn run(&self, session: &Session, message: &Message) -> anyhow::Result<bool>;
}

type RunFn = dyn Fn(Session, Message) -> BoxFuture<'static, anyhow::Result<bool>> + Send + Sync;
type InitFn = dyn Fn(Session) -> BoxFuture<'static, anyhow::Result<bool>> + Send + Sync;

/// Adapts async closures into a [`Handler`].
///
/// ```
/// use slirc_client::handler::{FnHandler, Registry};
///
/// let echo = FnHandler::new("Echo", "PRIVMSG", |session, msg| async move {
///     if let (Some(target), Some(text)) = (msg.params.first(), msg.trailing.as_deref()) {
///         session.send(target, text).await?;
///     }
///     Ok(true)
/// })
/// .with_description("Repeats every message");
///
/// let mut registry = Registry::new();
/// registry.register(echo).unwrap();
/// ```
pub struct FnHandler {
    name: String,
    description: String,
    event: String,
    run: Box<RunFn>,
    init: Option<Box<InitFn>>,
}

impl FnHandler {
    /// Create a handler named `name` for `event`.
    pub fn new<F, Fut>(name: impl Into<String>, event: impl Into<String>, run: F) -> Self
    where
        F: Fn(Session, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
    {
        FnHandler {
            name: name.into(),
            description: String::new(),
            event: event.into(),
            run: Box::new(move |session, message| Box::pin(run(session, message))),
            init: None,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the one-time initializer.
    #[must_use]
    pub fn with_init<F, Fut>(mut self, init: F) -> Self
    where
        F: Fn(Session) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
    {
        self.init = Some(Box::new(move |session| Box::pin(init(session))));
        self
    }
}

impl fmt::Debug for FnHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler")
            .field("name", &self.name)
            .field("event", &self.event)
            .field("init", &self.init.is_some())
            .finish()
    }
}

#[async_trait]
impl Handler for FnHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn event(&self) -> &str {
        &self.event
    }

    async fn init(&self, session: &Session) -> anyhow::Result<bool> {
        match &self.init {
            Some(init) => init(session.clone()).await,
            None => Ok(true),
        }
    }

    async fn run(&self, session: &Session, message: &Message) -> anyhow::Result<bool> {
        (self.run)(session.clone(), message.clone()).await
    }
}

/// Catalog of handlers keyed by event, then by name.
///
/// Built once before any session runs and shared behind an `Arc`.
#[derive(Default)]
pub struct Registry {
    by_event: HashMap<String, Vec<Arc<dyn Handler>>>,
    order: Vec<Arc<dyn Handler>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler under its event.
    ///
    /// Fails if a handler with the same name is already registered for that
    /// event; the first registration stays active.
    pub fn register<H: Handler + 'static>(&mut self, handler: H) -> Result<(), RegistryError> {
        self.register_arc(Arc::new(handler))
    }

    /// Add a shared handler under its event.
    pub fn register_arc(&mut self, handler: Arc<dyn Handler>) -> Result<(), RegistryError> {
        let handlers = self.by_event.entry(handler.event().to_owned()).or_default();
        if handlers.iter().any(|h| h.name() == handler.name()) {
            return Err(RegistryError::HandlerExists {
                event: handler.event().to_owned(),
                name: handler.name().to_owned(),
            });
        }

        handlers.push(handler.clone());
        self.order.push(handler);
        Ok(())
    }

    /// The first-registered handler with this name, under any event.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Handler>> {
        self.order.iter().find(|h| h.name() == name).cloned()
    }

    /// Handlers registered for `event`, in registration order.
    pub fn handlers_for(&self, event: &str) -> &[Arc<dyn Handler>] {
        self.by_event.get(event).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether any handler is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.order.iter().any(|h| h.name() == name)
    }

    /// Distinct handler names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.order
            .iter()
            .map(|h| h.name())
            .filter(|name| seen.insert(*name))
            .collect()
    }

    /// Number of registrations (a name under two events counts twice).
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Handlers whose initializer should run for a session enabling
    /// `enabled`: one per name, in registration order.
    pub(crate) fn initializers<'a>(
        &'a self,
        enabled: &'a HashSet<String>,
    ) -> impl Iterator<Item = &'a Arc<dyn Handler>> + 'a {
        let mut seen = HashSet::new();
        self.order
            .iter()
            .filter(move |h| enabled.contains(h.name()) && seen.insert(h.name()))
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("handlers", &self.names())
            .finish()
    }
}
