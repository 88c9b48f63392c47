//! In-process mock IRC server for integration tests.
//!
//! Every client is greeted with a hostname lookup notice, gets `001` once it
//! sent both NICK and USER, and has every other line echoed back. Lines
//! received from all clients are recorded in order.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;

pub const GREETING: &str = ":mock.server NOTICE Auth :*** Looking up your hostname...";
pub const WELCOME: &str = ":mock.server 001 bot :Welcome to the mock network";

/// How long a test waits for an expected line.
pub const WAIT: Duration = Duration::from_secs(5);

pub struct MockServer {
    pub port: u16,
    received: mpsc::UnboundedReceiver<String>,
    connections: Arc<AtomicUsize>,
    kick: watch::Sender<u64>,
    accept: JoinHandle<()>,
}

impl MockServer {
    pub async fn start() -> MockServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let (lines_tx, received) = mpsc::unbounded_channel();
        let connections = Arc::new(AtomicUsize::new(0));
        let (kick, kicked) = watch::channel(0u64);

        let counter = connections.clone();
        let accept = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve(socket, lines_tx.clone(), kicked.clone()));
            }
        });

        MockServer {
            port,
            received,
            connections,
            kick,
            accept,
        }
    }

    /// Number of connections accepted so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Close every connected client.
    pub fn drop_clients(&self) {
        self.kick.send_modify(|generation| *generation += 1);
    }

    /// Next line received from any client.
    pub async fn next_line(&mut self) -> String {
        timeout(WAIT, self.received.recv())
            .await
            .expect("timed out waiting for a line")
            .expect("server stopped")
    }

    /// Skip lines until one satisfies `pred`.
    pub async fn wait_for(&mut self, pred: impl Fn(&str) -> bool) -> String {
        loop {
            let line = self.next_line().await;
            if pred(&line) {
                return line;
            }
        }
    }

    /// Wait until `n` connections were accepted.
    pub async fn wait_for_connections(&self, n: usize) {
        timeout(WAIT, async {
            while self.connections() < n {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("timed out waiting for a connection");
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.accept.abort();
        self.drop_clients();
    }
}

async fn serve(
    socket: tokio::net::TcpStream,
    lines: mpsc::UnboundedSender<String>,
    mut kicked: watch::Receiver<u64>,
) {
    // Only kicks issued after this client connected apply to it.
    kicked.borrow_and_update();

    let (read_half, mut write_half) = socket.into_split();
    let mut reader = BufReader::new(read_half).lines();

    if write_half
        .write_all(format!("{}\r\n", GREETING).as_bytes())
        .await
        .is_err()
    {
        return;
    }

    let (mut nick, mut user) = (false, false);
    loop {
        let line = tokio::select! {
            _ = kicked.changed() => break,
            line = reader.next_line() => match line {
                Ok(Some(line)) => line,
                _ => break,
            },
        };
        let _ = lines.send(line.clone());

        let command = line.split(' ').next().unwrap_or_default();
        match command {
            "NICK" => nick = true,
            "USER" => user = true,
            _ => {
                if write_half
                    .write_all(format!("{}\r\n", line).as_bytes())
                    .await
                    .is_err()
                {
                    break;
                }
            }
        }

        if nick && user {
            nick = false;
            user = false;
            if write_half
                .write_all(format!("{}\r\n", WELCOME).as_bytes())
                .await
                .is_err()
            {
                break;
            }
        }
    }

    let _ = write_half.shutdown().await;
}
