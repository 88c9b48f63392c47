//! Manager tests: bulk start and stop, hot add and remove.

#![cfg(feature = "tokio")]

mod common;

use std::sync::Arc;

use common::MockServer;
use slirc_client::{Manager, ManagerError, Registry, Session, SessionConfig, SessionError};
use tokio::sync::oneshot;

fn session(name: &str, port: u16) -> Session {
    let mut config = SessionConfig::new("127.0.0.1", port, name);
    config.limits.rate = 50;
    Session::new(name, config, Arc::new(Registry::new()))
}

fn unused_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn start_is_all_or_nothing() {
    let mut server = MockServer::start().await;
    let manager = Manager::new();
    manager.add("a_good", session("good", server.port)).await.unwrap();
    manager.add("b_bad", session("bad", unused_port())).await.unwrap();

    match manager.start().await {
        Err(ManagerError::Session { name, source }) => {
            assert_eq!(name, "b_bad");
            assert!(matches!(source, SessionError::Connection(_)));
        }
        other => panic!("unexpected: {:?}", other),
    }

    assert!(!manager.is_running());
    assert_eq!(server.next_line().await, "QUIT :Leaving");
    assert!(!manager.get("a_good").await.unwrap().is_running());
}

#[tokio::test]
async fn add_and_remove_while_running() {
    let mut server = MockServer::start().await;
    let manager = Manager::new();
    manager.add("first", session("first", server.port)).await.unwrap();
    manager.start().await.unwrap();
    assert!(manager.is_running());
    server.wait_for_connections(1).await;

    manager.add("second", session("second", server.port)).await.unwrap();
    server.wait_for_connections(2).await;
    assert!(manager.get("second").await.unwrap().is_running());

    let removed = manager.remove("first").await.unwrap();
    assert!(!removed.is_running());
    assert_eq!(server.next_line().await, "QUIT :Leaving");
    assert_eq!(manager.names().await, vec!["second"]);

    manager.stop().await;
    assert!(!manager.is_running());
}

#[tokio::test]
async fn failed_hot_add_is_not_kept() {
    let server = MockServer::start().await;
    let manager = Manager::new();
    manager.add("first", session("first", server.port)).await.unwrap();
    manager.start().await.unwrap();

    let result = manager.add("broken", session("broken", unused_port())).await;
    assert!(matches!(result, Err(ManagerError::Session { .. })));
    assert!(manager.get("broken").await.is_none());

    manager.stop().await;
}

#[tokio::test]
async fn run_until_stops_everything_on_shutdown() {
    let mut server = MockServer::start().await;
    let manager = Arc::new(Manager::new());
    manager.add("bot", session("bot", server.port)).await.unwrap();

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let runner = {
        let manager = manager.clone();
        tokio::spawn(async move {
            manager
                .run_until(async {
                    let _ = shutdown_rx.await;
                })
                .await
        })
    };

    server.wait_for_connections(1).await;
    shutdown_tx.send(()).unwrap();
    runner.await.unwrap().unwrap();

    assert_eq!(server.next_line().await, "QUIT :Leaving");
    assert!(!manager.is_running());
}
