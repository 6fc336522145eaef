// SPDX-License-Identifier: GPL-3.0-only
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::handlers::{MoveUnitRequest, UnitReachedWarehouseRequest, WarehouseAnnouncement};
use crate::api::{ApiHandlers, HttpServer};
use crate::monitor::HitCounter;
use crate::registry::{InMemoryRegistry, Location};

pub const DEFAULT_LATITUDE: u32 = 123456789;
pub const DEFAULT_LONGITUDE: u32 = 987654321;

/// A warehouse id that no test ever delivers to
pub const DEFAULT_GET_WAREHOUSE_ID: i64 = 2001;

pub fn default_location() -> Location {
    Location::new(DEFAULT_LATITUDE, DEFAULT_LONGITUDE)
}

/// Move request for cargo unit 101 at the default location
pub fn default_move_unit_request() -> MoveUnitRequest {
    MoveUnitRequest {
        cargo_unit_id: 101,
        location: Some(default_location()),
    }
}

/// Cargo unit 1001 reaching warehouse 5001 at the default location
pub fn default_unit_reached_warehouse_request() -> UnitReachedWarehouseRequest {
    UnitReachedWarehouseRequest {
        announcement: Some(WarehouseAnnouncement {
            cargo_unit_id: 1001,
            warehouse_id: 5001,
            message: "New cargo unit received at warehouse.".to_string(),
        }),
        location: Some(default_location()),
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub registry: Arc<InMemoryRegistry>,
    pub hits: Arc<HitCounter>,
    shutdown: CancellationToken,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger graceful shutdown and wait for the server task
    pub async fn stop(self) {
        self.shutdown.cancel();
        self.handle
            .await
            .expect("server task panicked")
            .expect("server returned an error");
    }
}

/// Start an HTTP server on an ephemeral local port
pub async fn spawn_test_server() -> TestServer {
    let registry = Arc::new(InMemoryRegistry::new());
    let hits = Arc::new(HitCounter::new());
    let shutdown = CancellationToken::new();

    let handlers = ApiHandlers::new(registry.clone(), CancellationToken::new(), Duration::from_secs(5));
    let server = HttpServer::new(handlers, hits.clone());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local address");
    let handle = tokio::spawn(server.serve(listener, shutdown.clone()));

    TestServer {
        addr,
        registry,
        hits,
        shutdown,
        handle,
    }
}
