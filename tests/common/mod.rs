//! Test helpers for flatstore integration tests.
//!
//! Provides store setup, router construction and a raw HTTP client for
//! tests that need to control exactly what goes on the wire.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use flatstore::web::handlers::AppState;
use flatstore::web::router::create_router;
use flatstore::{FileStore, WebServer};

/// Default timeout for test operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Body of the index document written by [`setup_store`].
pub const INDEX_HTML: &str = "<!DOCTYPE html><html><body><h1>flatstore</h1></body></html>";

/// A store rooted in a fresh temporary directory.
pub struct TestStore {
    /// Keeps the directory alive for the duration of the test.
    pub temp_dir: TempDir,
    pub store: FileStore,
}

impl TestStore {
    /// Storage root of this store.
    pub fn root(&self) -> &Path {
        self.store.root()
    }

    /// Path a stored file named `name` would have.
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.store.root().join(name)
    }

    /// Router serving this store.
    pub fn router(&self) -> Router {
        create_router(Arc::new(AppState::new(self.store.clone())))
    }

    /// Start a live server on a random local port.
    pub async fn spawn(&self) -> SocketAddr {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        WebServer::with_store(addr, self.store.clone())
            .run_with_addr()
            .await
            .expect("Failed to start test server")
    }
}

/// Create a store with the given upload limit and an index document.
pub fn setup_store(max_upload_size: u64) -> TestStore {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let index = temp_dir.path().join("index.html");
    std::fs::write(&index, INDEX_HTML).expect("Failed to write index");

    let store = FileStore::new(temp_dir.path().join("files"))
        .expect("Failed to create store")
        .with_index_path(index)
        .with_max_upload_size(max_upload_size);

    TestStore { temp_dir, store }
}

/// Raw HTTP/1.1 client over a plain TCP stream.
pub struct RawClient {
    stream: TcpStream,
}

impl RawClient {
    /// Connect to the server at the given address.
    pub async fn connect(addr: SocketAddr) -> Result<Self, std::io::Error> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self { stream })
    }

    /// Send raw bytes to the server.
    pub async fn send_raw(&mut self, data: &[u8]) -> Result<(), std::io::Error> {
        self.stream.write_all(data).await?;
        self.stream.flush().await
    }

    /// Read until the server closes the connection or the timeout elapses.
    ///
    /// Returns whatever was received, lossily decoded.
    pub async fn read_until_close(&mut self, limit: Duration) -> String {
        let mut received = Vec::new();
        let mut buf = [0u8; 4096];

        let _ = timeout(limit, async {
            loop {
                match self.stream.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => received.extend_from_slice(&buf[..n]),
                }
            }
        })
        .await;

        String::from_utf8_lossy(&received).into_owned()
    }

    /// Drop the connection without finishing the request.
    pub fn abort(self) {
        drop(self.stream);
    }
}

/// Send one complete request on a fresh connection and return the raw response.
pub async fn request(addr: SocketAddr, method: &str, target: &str, body: &[u8]) -> String {
    let mut client = RawClient::connect(addr).await.expect("Failed to connect");
    let head = format!(
        "{method} {target} HTTP/1.1\r\nHost: localhost\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    client.send_raw(head.as_bytes()).await.unwrap();
    client.send_raw(body).await.unwrap();
    client.read_until_close(DEFAULT_TIMEOUT).await
}

/// Status code of a raw HTTP response.
pub fn status_of(response: &str) -> Option<u16> {
    response
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
}
