// SPDX-License-Identifier: GPL-3.0-only
use axum::{
    Json, Router,
    extract::{Path, Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::api::handlers::{
    ApiHandlers, ApiResponse, ApiResult, GetWarehouseResponse, MoveUnitRequest,
    UnitReachedWarehouseRequest,
};
use crate::monitor::HitCounter;
use crate::registry::SupplierView;

pub struct HttpServer {
    handlers: Arc<ApiHandlers>,
    hits: Arc<HitCounter>,
}

impl HttpServer {
    pub fn new(handlers: ApiHandlers, hits: Arc<HitCounter>) -> Self {
        Self {
            handlers: Arc::new(handlers),
            hits,
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/units/move", post(move_unit_handler))
            .route("/api/units/reached-warehouse", post(unit_reached_warehouse_handler))
            .route("/api/warehouses/:id", get(get_warehouse_handler))
            .route("/api/suppliers/:id", get(get_supplier_handler))
            .layer(middleware::from_fn_with_state(Arc::clone(&self.hits), record_hit))
            // Registered after the layer so probes do not count as activity
            .route("/api/health", get(health_handler))
            .with_state(Arc::clone(&self.handlers))
    }

    /// Serve until `shutdown` is cancelled, then drain in-flight requests and
    /// release the listener.
    pub async fn serve(self, listener: TcpListener, shutdown: CancellationToken) -> anyhow::Result<()> {
        let app = self.router();

        info!(addr = %listener.local_addr()?, "Starting HTTP server");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }
}

/// Count one hit per inbound call before dispatch
async fn record_hit(State(hits): State<Arc<HitCounter>>, request: Request, next: Next) -> Response {
    hits.record();

    let span = info_span!(
        "request",
        request_id = %Uuid::new_v4(),
        method = %request.method(),
        path = %request.uri().path(),
    );
    next.run(request).instrument(span).await
}

async fn health_handler() -> Json<ApiResponse<&'static str>> {
    ApiHandlers::health().await
}

async fn move_unit_handler(
    State(handlers): State<Arc<ApiHandlers>>,
    Json(request): Json<MoveUnitRequest>,
) -> ApiResult<()> {
    handlers.move_unit(request).await
}

async fn unit_reached_warehouse_handler(
    State(handlers): State<Arc<ApiHandlers>>,
    Json(request): Json<UnitReachedWarehouseRequest>,
) -> ApiResult<()> {
    handlers.unit_reached_warehouse(request).await
}

async fn get_warehouse_handler(
    State(handlers): State<Arc<ApiHandlers>>,
    Path(id): Path<i64>,
) -> ApiResult<GetWarehouseResponse> {
    handlers.get_warehouse(id).await
}

async fn get_supplier_handler(
    State(handlers): State<Arc<ApiHandlers>>,
    Path(id): Path<i64>,
) -> ApiResult<SupplierView> {
    handlers.get_supplier(id).await
}
