//! Raw connection example
//!
//! Drives the connection engine directly, without sessions or handlers:
//! registers by hand, answers PINGs, joins a channel and greets it.

use std::time::Duration;

use slirc_client::{Connection, Response, SessionConfig};
use tokio::time::timeout;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = SessionConfig::new("irc.libera.chat", 6667, "example_bot");
    let conn = Connection::new(config.connection());
    let mut inbound = conn.take_inbound().ok_or("inbound queue already taken")?;
    let mut errors = conn.take_errors().ok_or("error queue already taken")?;

    conn.connect().await?;
    conn.send("NICK example_bot").await?;
    conn.send("USER example 0 * :Example Bot").await?;

    let welcome = Response::RPL_WELCOME.event();
    loop {
        tokio::select! {
            message = timeout(Duration::from_secs(300), inbound.recv()) => {
                let message = match message {
                    Ok(Some(message)) => message,
                    Ok(None) => {
                        println!("Connection closed");
                        break;
                    }
                    Err(_) => {
                        println!("No messages received in 5 minutes, keeping alive...");
                        continue;
                    }
                };
                println!("← {}", message);

                match message.command.as_str() {
                    "PING" => {
                        let token = message.last_param().unwrap_or_default();
                        conn.send(format!("PONG :{}", token)).await?;
                    }
                    cmd if cmd == welcome => {
                        println!("✓ Registration successful!");
                        conn.send("JOIN #example").await?;
                        conn.send("PRIVMSG #example :Hello from slirc-client!").await?;
                    }
                    "PRIVMSG" if message.trailing.as_deref().unwrap_or_default().contains("hello") => {
                        if let Some(target) = message.params.first() {
                            conn.send(format!("PRIVMSG {} :Hello there! 👋", target)).await?;
                        }
                    }
                    _ => {}
                }
            }
            Some(error) = errors.recv() => {
                eprintln!("Connection error: {}", error);
                if error.is_timeout() {
                    conn.reconnect().await?;
                } else if error.is_terminal() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    conn.disconnect(Some("Goodbye!")).await;
    Ok(())
}
