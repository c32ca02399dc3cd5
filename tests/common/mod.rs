//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::Request;
use switchyard::config::ServerConfig;
use switchyard::{Connection, HttpServer, Router, Shutdown};
use tokio::net::TcpListener;

/// A server running on an ephemeral local port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Serve `router` with default config on 127.0.0.1 and an OS-assigned port.
pub async fn start_server(router: Router) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let mut config = ServerConfig::default();
    config.listener.bind_address = addr.to_string();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, router);
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestServer { addr, shutdown }
}

/// HTTP descriptor for a bodiless GET to `path`.
pub fn get(path: &str) -> Connection {
    Connection::http(Request::builder().uri(path).body(Body::empty()).unwrap())
}

/// Drain the response stored on a descriptor into a string.
pub async fn body_text(conn: &mut Connection) -> String {
    let response = conn.take_response().expect("no response stored");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
