// SPDX-License-Identifier: GPL-3.0-only
use axum::Json;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Span, debug, error, warn};

use crate::registry::{
    Location, OpContext, Registry, RegistryError, RegistryResult, SupplierView, WarehouseView,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct MoveUnitRequest {
    pub cargo_unit_id: i64,
    pub location: Option<Location>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WarehouseAnnouncement {
    pub cargo_unit_id: i64,
    pub warehouse_id: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnitReachedWarehouseRequest {
    pub announcement: Option<WarehouseAnnouncement>,
    pub location: Option<Location>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetWarehouseResponse {
    pub warehouse: WarehouseView,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

pub type ApiError = (StatusCode, Json<ApiResponse<()>>);
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn bad_request(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ApiResponse::error(message.to_string())))
}

fn registry_error(op: &'static str, err: RegistryError) -> ApiError {
    let status = match &err {
        RegistryError::Canceled => StatusCode::REQUEST_TIMEOUT,
        e if e.is_not_found() => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(op, error = %err, "Registry operation failed");
    } else {
        warn!(op, error = %err, "Registry operation rejected");
    }
    (status, Json(ApiResponse::error(err.to_string())))
}

/// Registry entry points for the transport layer
pub struct ApiHandlers {
    registry: Arc<dyn Registry>,
    abort: CancellationToken,
    request_timeout: Duration,
}

impl ApiHandlers {
    /// `abort` cancels every in-flight operation when triggered
    pub fn new(registry: Arc<dyn Registry>, abort: CancellationToken, request_timeout: Duration) -> Self {
        Self {
            registry,
            abort,
            request_timeout,
        }
    }

    /// Run a registry operation on the blocking pool under a fresh context.
    ///
    /// The context is cancelled if this future is dropped before the
    /// operation completes (e.g. the client disconnected).
    async fn dispatch<T, F>(&self, op: &'static str, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&dyn Registry, &OpContext) -> RegistryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let ctx = OpContext::child_of(&self.abort).with_timeout(self.request_timeout);
        let guard = ctx.token().clone().drop_guard();
        let registry = Arc::clone(&self.registry);
        let span = Span::current();

        let joined = tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            f(registry.as_ref(), &ctx)
        })
        .await;
        guard.disarm();

        match joined {
            Ok(result) => result.map_err(|e| registry_error(op, e)),
            Err(e) => Err(registry_error(
                op,
                RegistryError::Internal(format!("{} task failed: {}", op, e)),
            )),
        }
    }

    pub async fn health() -> Json<ApiResponse<&'static str>> {
        Json(ApiResponse::success("ok"))
    }

    pub async fn move_unit(&self, request: MoveUnitRequest) -> ApiResult<()> {
        let location = request.location.ok_or_else(|| bad_request("location is required"))?;
        let supplier_id = request.cargo_unit_id;

        self.dispatch("move_unit", move |registry, ctx| {
            registry.move_unit(ctx, supplier_id, location)
        })
        .await?;

        Ok(Json(ApiResponse::success(())))
    }

    pub async fn unit_reached_warehouse(&self, request: UnitReachedWarehouseRequest) -> ApiResult<()> {
        let announcement = request
            .announcement
            .ok_or_else(|| bad_request("announcement is required"))?;
        let location = request.location.ok_or_else(|| bad_request("location is required"))?;
        let (warehouse_id, supplier_id) = (announcement.warehouse_id, announcement.cargo_unit_id);

        debug!(warehouse_id, supplier_id, message = %announcement.message, "Unit reached warehouse");

        self.dispatch("unit_reached_warehouse", move |registry, ctx| {
            registry.warehouse_received(ctx, warehouse_id, supplier_id, location)
        })
        .await?;

        Ok(Json(ApiResponse::success(())))
    }

    pub async fn get_warehouse(&self, warehouse_id: i64) -> ApiResult<GetWarehouseResponse> {
        let warehouse = self
            .dispatch("get_warehouse", move |registry, ctx| {
                registry.get_warehouse(ctx, warehouse_id)
            })
            .await?;

        Ok(Json(ApiResponse::success(GetWarehouseResponse { warehouse })))
    }

    pub async fn get_supplier(&self, supplier_id: i64) -> ApiResult<SupplierView> {
        let location = self
            .dispatch("get_supplier", move |registry, ctx| {
                registry.supplier_location(ctx, supplier_id)
            })
            .await?;

        match location {
            Some(location) => Ok(Json(ApiResponse::success(SupplierView {
                supplier_id,
                location,
            }))),
            None => Err((
                StatusCode::NOT_FOUND,
                Json(ApiResponse::error(format!("supplier does not exist: {}", supplier_id))),
            )),
        }
    }
}
