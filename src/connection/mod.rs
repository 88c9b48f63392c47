//! Connection engine.
//!
//! A [`Connection`] owns at most one live socket and runs two loops on it:
//! the read loop parses each inbound line and pushes it onto the inbound
//! queue, the write loop drains the outbound queue at the configured rate.
//! Terminal loop failures are reported once on the error queue; deciding
//! whether to [`reconnect`](Connection::reconnect) is left to the caller.
//!
//! ```no_run
//! # async fn example() -> Result<(), slirc_client::ConnectionError> {
//! use slirc_client::config::SessionConfig;
//! use slirc_client::Connection;
//!
//! let conn = Connection::new(SessionConfig::new("irc.libera.chat", 6667, "bot").connection());
//! let mut inbound = conn.take_inbound().expect("first call");
//!
//! conn.connect().await?;
//! conn.send("NICK bot").await?;
//! while let Some(msg) = inbound.recv().await {
//!     println!("{}", msg);
//! }
//! # Ok(())
//! # }
//! ```

mod stream;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use self::stream::Stream;

use crate::config::ConnectionConfig;
use crate::error::{ConnectionError, Result};
use crate::line::{outbound_content, LineCodec};
use crate::message::Message;

/// Capacity of the inbound and outbound queues.
pub const QUEUE_CAPACITY: usize = 256;

/// Capacity of the error queue; further errors are dropped with a warning.
pub const ERROR_QUEUE_CAPACITY: usize = 100;

type Reader = FramedRead<ReadHalf<Stream>, LineCodec>;
type Writer = FramedWrite<WriteHalf<Stream>, LineCodec>;

/// The loops of one live socket.
struct Live {
    cancel: CancellationToken,
    reader: JoinHandle<()>,
    writer: JoinHandle<Writer>,
}

impl Live {
    fn is_alive(&self) -> bool {
        !self.reader.is_finished() && !self.writer.is_finished()
    }

    /// Stop both loops and wait for them; hands back the write half.
    async fn stop(self) -> Option<Writer> {
        self.cancel.cancel();
        if let Err(e) = self.reader.await {
            warn!(error = %e, "read loop did not exit cleanly");
        }
        match self.writer.await {
            Ok(writer) => Some(writer),
            Err(e) => {
                warn!(error = %e, "write loop did not exit cleanly");
                None
            }
        }
    }
}

/// Shared state handed to the loops.
#[derive(Clone)]
struct Reporter {
    errors: mpsc::Sender<ConnectionError>,
    reconnecting: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl Reporter {
    /// Push an error unless a reconnect or shutdown is tearing the socket down.
    fn report(&self, error: ConnectionError) {
        if self.cancel.is_cancelled() || self.reconnecting.load(Ordering::SeqCst) {
            debug!(error = %error, "suppressed error during teardown");
            return;
        }
        if let Err(mpsc::error::TrySendError::Full(error)) = self.errors.try_send(error) {
            warn!(error = %error, "error queue full, dropping error");
        }
    }
}

/// Connection engine owning one socket and its read/write loops.
pub struct Connection {
    config: ConnectionConfig,
    inbound_tx: Mutex<Option<mpsc::Sender<Message>>>,
    inbound_rx: Mutex<Option<mpsc::Receiver<Message>>>,
    outbound_tx: Mutex<Option<mpsc::Sender<String>>>,
    outbound_rx: Arc<tokio::sync::Mutex<mpsc::Receiver<String>>>,
    errors_tx: mpsc::Sender<ConnectionError>,
    errors_rx: Mutex<Option<mpsc::Receiver<ConnectionError>>>,
    reconnecting: Arc<AtomicBool>,
    closed: AtomicBool,
    live: tokio::sync::Mutex<Option<Live>>,
}

impl Connection {
    /// Create an idle engine with fresh queues.
    pub fn new(config: ConnectionConfig) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (outbound_tx, outbound_rx) = mpsc::channel(QUEUE_CAPACITY);
        let (errors_tx, errors_rx) = mpsc::channel(ERROR_QUEUE_CAPACITY);

        Connection {
            config,
            inbound_tx: Mutex::new(Some(inbound_tx)),
            inbound_rx: Mutex::new(Some(inbound_rx)),
            outbound_tx: Mutex::new(Some(outbound_tx)),
            outbound_rx: Arc::new(tokio::sync::Mutex::new(outbound_rx)),
            errors_tx,
            errors_rx: Mutex::new(Some(errors_rx)),
            reconnecting: Arc::new(AtomicBool::new(false)),
            closed: AtomicBool::new(false),
            live: tokio::sync::Mutex::new(None),
        }
    }

    /// Engine settings.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Take the inbound message queue. Returns `None` after the first call.
    pub fn take_inbound(&self) -> Option<mpsc::Receiver<Message>> {
        self.inbound_rx.lock().take()
    }

    /// Take the error queue. Returns `None` after the first call.
    pub fn take_errors(&self) -> Option<mpsc::Receiver<ConnectionError>> {
        self.errors_rx.lock().take()
    }

    /// A handle for enqueueing raw outbound lines.
    pub fn outbound(&self) -> Result<mpsc::Sender<String>> {
        self.outbound_tx
            .lock()
            .clone()
            .ok_or(ConnectionError::Closed)
    }

    /// Enqueue one raw line. The terminator is added by the write loop.
    pub async fn send(&self, line: impl Into<String>) -> Result<()> {
        self.outbound()?
            .send(line.into())
            .await
            .map_err(|_| ConnectionError::Closed)
    }

    /// Whether a socket is live and both loops are running.
    pub async fn is_connected(&self) -> bool {
        self.live
            .lock()
            .await
            .as_ref()
            .map(Live::is_alive)
            .unwrap_or(false)
    }

    /// Whether a reconnect is in flight.
    pub fn is_reconnecting(&self) -> bool {
        self.reconnecting.load(Ordering::SeqCst)
    }

    /// Open the socket and start the read and write loops.
    ///
    /// Fails with [`ConnectionError::AlreadyConnected`] while a socket is
    /// live, and with [`ConnectionError::Closed`] after
    /// [`disconnect`](Connection::disconnect).
    pub async fn connect(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ConnectionError::Closed);
        }

        let mut live = self.live.lock().await;
        if let Some(current) = live.as_ref() {
            if current.is_alive() {
                return Err(ConnectionError::AlreadyConnected);
            }
        }
        // A loop died on its own; clear the remains before reconnecting.
        if let Some(stale) = live.take() {
            if let Some(writer) = stale.stop().await {
                close_writer(writer, None, self.config.timeout).await;
            }
        }

        let inbound = self
            .inbound_tx
            .lock()
            .clone()
            .ok_or(ConnectionError::Closed)?;

        let stream = Stream::connect(&self.config).await?;
        let secure = stream.is_tls();
        let (read_half, write_half) = tokio::io::split(stream);

        let cancel = CancellationToken::new();
        let reporter = Reporter {
            errors: self.errors_tx.clone(),
            reconnecting: self.reconnecting.clone(),
            cancel: cancel.clone(),
        };

        let reader = tokio::spawn(read_loop(
            FramedRead::new(read_half, LineCodec::new()),
            inbound,
            reporter.clone(),
            self.config.timeout,
            self.config.timeout_limit,
        ));
        let writer = tokio::spawn(write_loop(
            FramedWrite::new(write_half, LineCodec::new()),
            self.outbound_rx.clone(),
            reporter,
            self.config.timeout,
            self.config.send_interval(),
        ));

        *live = Some(Live {
            cancel,
            reader,
            writer,
        });

        info!(host = %self.config.host, port = self.config.port, secure, "connected");
        Ok(())
    }

    /// Stop both loops, send `QUIT :<farewell>` if given, and close the socket
    /// and the queues.
    ///
    /// Safe to call when idle. After this the engine cannot connect again.
    pub async fn disconnect(&self, farewell: Option<&str>) {
        let live = self.live.lock().await.take();
        if let Some(live) = live {
            if let Some(writer) = live.stop().await {
                close_writer(writer, farewell, self.config.timeout).await;
            }
            info!(host = %self.config.host, "disconnected");
        }

        self.closed.store(true, Ordering::SeqCst);
        self.inbound_tx.lock().take();
        self.outbound_tx.lock().take();
        self.outbound_rx.lock().await.close();
    }

    /// Drop the current socket without reporting its errors and connect again.
    ///
    /// Returns immediately if a reconnect is already in flight. Errors from
    /// the new connect are returned.
    pub async fn reconnect(&self) -> Result<()> {
        if self
            .reconnecting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("reconnect already in progress");
            return Ok(());
        }

        info!(host = %self.config.host, "reconnecting");
        let stale = self.live.lock().await.take();
        if let Some(stale) = stale {
            if let Some(writer) = stale.stop().await {
                close_writer(writer, None, self.config.timeout).await;
            }
        }

        let result = self.connect().await;
        self.reconnecting.store(false, Ordering::SeqCst);
        result
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(live) = self.live.get_mut().as_ref() {
            live.cancel.cancel();
        }
    }
}

/// Write an optional QUIT and shut the write half down, within `deadline`.
async fn close_writer(mut writer: Writer, farewell: Option<&str>, deadline: Duration) {
    if let Some(farewell) = farewell {
        let quit = format!("QUIT :{}", farewell);
        debug!(line = %quit, "send");
        match timeout(deadline, writer.send(quit)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(error = %e, "could not send farewell"),
            Err(_) => debug!("farewell timed out"),
        }
    }

    let mut half = writer.into_inner();
    if let Ok(Err(e)) = timeout(deadline, half.shutdown()).await {
        debug!(error = %e, "socket shutdown failed");
    }
}

async fn read_loop(
    mut reader: Reader,
    inbound: mpsc::Sender<Message>,
    reporter: Reporter,
    deadline: Duration,
    timeout_limit: u32,
) {
    let cancel = reporter.cancel.clone();
    let mut timeouts: u32 = 0;

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = timeout(deadline, reader.next()) => next,
        };

        let line = match next {
            Ok(Some(Ok(line))) => line,
            Ok(Some(Err(e))) => {
                reporter.report(e);
                break;
            }
            Ok(None) => {
                reporter.report(ConnectionError::Disconnected);
                break;
            }
            Err(_) => {
                timeouts += 1;
                if timeouts > timeout_limit {
                    reporter.report(ConnectionError::ReadTimeout { attempts: timeouts });
                    break;
                }
                debug!(attempt = timeouts, "read deadline expired");
                continue;
            }
        };

        timeouts = 0;
        let raw = line.trim_end_matches(['\r', '\n']);
        debug!(line = %raw, "recv");

        let message = match Message::parse_framed(&line) {
            Ok(message) => message,
            Err(cause) => {
                reporter.report(ConnectionError::Parse {
                    raw: raw.to_owned(),
                    cause,
                });
                break;
            }
        };

        // A message already read is handed over even if teardown starts
        // while waiting for queue space.
        let permit = tokio::select! {
            biased;
            permit = inbound.reserve() => match permit {
                Ok(permit) => permit,
                Err(_) => {
                    debug!("inbound queue closed");
                    break;
                }
            },
            _ = cancel.cancelled() => {
                if inbound.try_send(message).is_err() {
                    debug!("inbound queue full during teardown, message dropped");
                }
                break;
            }
        };
        permit.send(message);
    }
}

async fn write_loop(
    mut writer: Writer,
    outbound: Arc<tokio::sync::Mutex<mpsc::Receiver<String>>>,
    reporter: Reporter,
    deadline: Duration,
    spacing: Duration,
) -> Writer {
    let cancel = reporter.cancel.clone();
    let mut queue = outbound.lock().await;

    // The first tick completes immediately, so pacing only delays later sends.
    let mut pace = interval(spacing);
    pace.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = pace.tick() => {}
        }

        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = queue.recv() => match line {
                Some(line) => line,
                None => break,
            },
        };

        let content = match outbound_content(&line) {
            Ok(content) => content.to_owned(),
            Err(rejected) => {
                reporter.report(rejected);
                continue;
            }
        };

        debug!(line = %content, "send");
        match timeout(deadline, writer.send(content)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                reporter.report(e);
                break;
            }
            Err(_) => {
                reporter.report(ConnectionError::WriteTimeout(deadline));
                break;
            }
        }
    }

    writer
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    fn config(port: u16) -> ConnectionConfig {
        ConnectionConfig {
            host: "127.0.0.1".to_string(),
            port,
            timeout: Duration::from_secs(5),
            messages_per_second: 100,
            ..ConnectionConfig::default()
        }
    }

    #[tokio::test]
    async fn delivers_lines_in_order() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket
                .write_all(b":srv NOTICE * :one\r\n:srv NOTICE * :two\r\n")
                .await
                .unwrap();
            let mut lines = BufReader::new(socket).lines();
            lines.next_line().await.unwrap()
        });

        let conn = Connection::new(config(port));
        let mut inbound = conn.take_inbound().unwrap();
        conn.connect().await.unwrap();

        assert_eq!(inbound.recv().await.unwrap().trailing.as_deref(), Some("one"));
        assert_eq!(inbound.recv().await.unwrap().trailing.as_deref(), Some("two"));

        conn.send("PONG :x").await.unwrap();
        assert_eq!(server.await.unwrap().as_deref(), Some("PONG :x"));

        conn.disconnect(None).await;
    }

    #[tokio::test]
    async fn empty_line_is_reported_and_writer_continues() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut lines = BufReader::new(socket).lines();
            lines.next_line().await.unwrap()
        });

        let conn = Connection::new(config(port));
        let mut errors = conn.take_errors().unwrap();
        conn.connect().await.unwrap();

        conn.send("").await.unwrap();
        conn.send("PING :after").await.unwrap();

        assert!(matches!(
            errors.recv().await,
            Some(ConnectionError::EmptyMessage)
        ));
        assert_eq!(server.await.unwrap().as_deref(), Some("PING :after"));

        conn.disconnect(None).await;
    }

    #[tokio::test]
    async fn line_break_is_reported_and_writer_continues() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut lines = BufReader::new(socket).lines();
            lines.next_line().await.unwrap()
        });

        let conn = Connection::new(config(port));
        let mut errors = conn.take_errors().unwrap();
        conn.connect().await.unwrap();

        conn.send("PRIVMSG #c :hi\r\nQUIT :injected").await.unwrap();
        conn.send("PING :after").await.unwrap();

        match errors.recv().await {
            Some(ConnectionError::LineBreak(raw)) => assert!(raw.starts_with("PRIVMSG #c :hi")),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(server.await.unwrap().as_deref(), Some("PING :after"));
        assert!(conn.is_connected().await);

        conn.disconnect(None).await;
    }

    #[tokio::test]
    async fn read_timeouts_exceeding_limit_are_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let _server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let mut cfg = config(port);
        cfg.timeout = Duration::from_millis(50);
        cfg.timeout_limit = 2;

        let conn = Connection::new(cfg);
        let mut errors = conn.take_errors().unwrap();
        conn.connect().await.unwrap();

        match errors.recv().await {
            Some(ConnectionError::ReadTimeout { attempts }) => assert_eq!(attempts, 3),
            other => panic!("unexpected: {:?}", other),
        }
        conn.disconnect(None).await;
    }

    #[tokio::test]
    async fn parse_failure_is_reported_with_raw_line() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let _server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b": PRIVMSG test :x\r\n").await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let conn = Connection::new(config(port));
        let mut errors = conn.take_errors().unwrap();
        conn.connect().await.unwrap();

        match errors.recv().await {
            Some(ConnectionError::Parse { raw, cause }) => {
                assert_eq!(raw, ": PRIVMSG test :x");
                assert_eq!(cause, crate::error::MessageParseError::EmptyPrefix);
            }
            other => panic!("unexpected: {:?}", other),
        }
        conn.disconnect(None).await;
    }

    #[tokio::test]
    async fn connect_after_disconnect_is_closed() {
        let conn = Connection::new(config(1));
        conn.disconnect(None).await;
        assert!(matches!(conn.connect().await, Err(ConnectionError::Closed)));
        assert!(matches!(conn.send("PING").await, Err(ConnectionError::Closed)));
    }
}
