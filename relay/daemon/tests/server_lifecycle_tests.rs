//! Server Lifecycle Tests
//!
//! Bind real sockets on port 0 and exercise listen, shutdown and the exit
//! notification end to end.

mod common;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use panel_core::{Frontend, ServerConfig};
use panel_daemon::{Server, ServerError};

use common::{Calls, FakeAlerter};

fn config(port: u16) -> ServerConfig {
    ServerConfig {
        port,
        ..ServerConfig::default()
    }
}

fn start(
    server: &Arc<Server>,
) -> (
    JoinHandle<Result<(), ServerError>>,
    oneshot::Receiver<()>,
) {
    let (exited_tx, exited_rx) = oneshot::channel();
    let server = Arc::clone(server);
    let handle = tokio::spawn(async move { server.listen_and_serve(exited_tx).await });
    (handle, exited_rx)
}

/// Send one raw HTTP/1.1 POST and return the response head and body
async fn raw_post(addr: SocketAddr, path: &str, body: &str) -> String {
    let mut stream = TcpStream::connect(("127.0.0.1", addr.port())).await.unwrap();
    let request = format!(
        "POST {path} HTTP/1.1\r\nHost: localhost\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn test_serves_then_signals_exit_on_shutdown() {
    let server = Arc::new(Server::new(config(0), Arc::new(Frontend::console())));
    let (handle, exited) = start(&server);

    let addr = server.listening().await.unwrap();
    assert_ne!(addr.port(), 0);
    assert_eq!(server.local_addr(), Some(addr));

    let response = raw_post(addr, "/sound", r#"{"sound":"chime"}"#).await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.to_ascii_lowercase().contains("x-request-id"));

    server.shutdown(Duration::from_secs(5)).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), exited)
        .await
        .unwrap()
        .unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_shutdown_before_start_returns_immediately() {
    let server = Server::new(config(0), Arc::new(Frontend::new()));
    server.shutdown(Duration::from_millis(10)).await.unwrap();
    assert_eq!(server.local_addr(), None);
}

#[tokio::test]
async fn test_bind_failure_still_signals_exit() {
    let occupied = TcpListener::bind("0.0.0.0:0").await.unwrap();
    let port = occupied.local_addr().unwrap().port();

    let server = Arc::new(Server::new(config(port), Arc::new(Frontend::new())));
    let (handle, exited) = start(&server);

    tokio::time::timeout(Duration::from_secs(5), exited)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(
        handle.await.unwrap(),
        Err(ServerError::Bind { .. })
    ));
    assert_eq!(server.listening().await, None);
    server.shutdown(Duration::from_millis(10)).await.unwrap();
}

#[tokio::test]
async fn test_shutdown_drains_in_flight_request() {
    let calls = Calls::default();
    let alerter = FakeAlerter::new(&calls);
    let entered = Arc::clone(&alerter.entered);
    let server = Arc::new(Server::new(
        config(0),
        Arc::new(Frontend::new().with_alerter(alerter)),
    ));
    let (handle, exited) = start(&server);
    let addr = server.listening().await.unwrap();

    let request = tokio::spawn(async move { raw_post(addr, "/alert", r#"{"message":"brief"}"#).await });
    entered.notified().await;

    server.shutdown(Duration::from_secs(5)).await.unwrap();

    let response = request.await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert_eq!(calls.all(), vec!["alert:brief"]);
    tokio::time::timeout(Duration::from_secs(5), exited)
        .await
        .unwrap()
        .unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_shutdown_times_out_on_stuck_request() {
    let calls = Calls::default();
    let alerter = FakeAlerter::new(&calls);
    let entered = Arc::clone(&alerter.entered);
    let server = Arc::new(Server::new(
        config(0),
        Arc::new(Frontend::new().with_alerter(alerter)),
    ));
    let (handle, exited) = start(&server);
    let addr = server.listening().await.unwrap();

    let request = tokio::spawn(async move { raw_post(addr, "/alert", r#"{"message":"slow"}"#).await });
    entered.notified().await;

    let result = server.shutdown(Duration::from_millis(50)).await;
    assert!(matches!(result, Err(ServerError::ShutdownTimedOut(_))));

    // The in-flight request still completes, and serving then ends
    let response = request.await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    tokio::time::timeout(Duration::from_secs(5), exited)
        .await
        .unwrap()
        .unwrap();
    handle.await.unwrap().unwrap();
}
