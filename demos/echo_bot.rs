//! Echo bot example
//!
//! Loads bots from a TOML file (default `demos/bots.toml`), enables the
//! built-in handlers plus an echo handler, and runs until Ctrl-C.
//!
//! ```text
//! RUST_LOG=slirc_client=debug cargo run --example echo_bot -- demos/bots.toml
//! ```

use std::sync::Arc;

use slirc_client::colors::{bold, foreground, Color};
use slirc_client::{plugins, BotsConfig, FnHandler, Manager, Registry};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "demos/bots.toml".to_string());
    let config = BotsConfig::load(&path)?;

    let mut registry = Registry::new();
    plugins::register_builtins(&mut registry)?;
    registry.register(
        FnHandler::new("Echo", "PRIVMSG", |session, msg| async move {
            let Some(text) = msg.trailing.as_deref().and_then(|t| t.strip_prefix("!echo ")) else {
                return Ok(false);
            };
            let Some(channel) = msg.params.first().filter(|t| t.starts_with('#')) else {
                return Ok(false);
            };
            let from = msg.source_nickname().unwrap_or("someone");
            let reply = format!("{} said: {}", bold(from), foreground(text, Color::Teal));
            session.send(channel, &reply).await?;
            Ok(true)
        })
        .with_description("Repeats `!echo <text>` back to the channel"),
    )?;

    let manager = Manager::from_config(&config, Arc::new(registry));
    manager.run().await?;
    Ok(())
}
