//! Common utilities for integration tests
//!
//! Runs a relay inside the test process on an ephemeral port, with a
//! temporary device store so tests never touch each other's state.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::RwLock;

use device_relay::discovery::DiscoveredDevices;
use device_relay::registry::DeviceRegistry;
use device_relay::relay::server::{create_router, AppState};
use device_relay::relay::websocket::RelayState;

/// A relay running on an ephemeral port with its own device store.
pub struct TestRelay {
    pub addr: SocketAddr,
    pub data_file: PathBuf,
    _store_dir: Option<TempDir>,
}

impl TestRelay {
    pub fn http(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    #[allow(dead_code)] // Only the websocket tests join the bus
    pub fn ws(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

/// Spawn a relay with a fresh temporary store.
pub async fn spawn_relay() -> TestRelay {
    let store_dir = TempDir::new().expect("temp dir");
    let data_file = store_dir.path().join("saved-devices.json");
    spawn_relay_inner(data_file, Some(store_dir)).await
}

/// Spawn a relay on an existing store file, as a restart would.
#[allow(dead_code)] // Only the HTTP tests exercise restarts
pub async fn spawn_relay_with_store(data_file: &Path) -> TestRelay {
    spawn_relay_inner(data_file.to_path_buf(), None).await
}

async fn spawn_relay_inner(data_file: PathBuf, store_dir: Option<TempDir>) -> TestRelay {
    let registry = DeviceRegistry::load(&data_file).expect("load device store");
    let state = AppState {
        registry: Arc::new(RwLock::new(registry)),
        discovered: Arc::new(RwLock::new(DiscoveredDevices::new())),
        relay: RelayState::new(),
        // Integration tests run with the package root as working directory
        static_dir: PathBuf::from("static"),
    };
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("relay serves");
    });

    TestRelay {
        addr,
        data_file,
        _store_dir: store_dir,
    }
}

/// Wait until the relay reports the expected number of connected peers.
///
/// Peer registration happens after the HTTP upgrade completes, so a client
/// with an open socket may not be in the broadcast set yet.
#[allow(dead_code)] // Only the websocket tests join the bus
pub async fn wait_for_peers(relay: &TestRelay, expected: usize) {
    for _ in 0..100 {
        let health: serde_json::Value = reqwest::get(relay.http("/health"))
            .await
            .expect("health request")
            .json()
            .await
            .expect("health body");
        if health["peers"].as_u64() == Some(expected as u64) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("relay never reached {} peer(s)", expected);
}
