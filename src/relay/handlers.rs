use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;

use super::server::AppState;
use crate::error::RelayError;
use crate::registry::Device;

/// Catch-all error body, one shape for every failed request.
#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn internal() -> Self {
        Self {
            error: "Internal Server Error".to_string(),
        }
    }
}

/// List devices currently visible on the network.
pub async fn list_discovered(State(state): State<AppState>) -> impl IntoResponse {
    let discovered = state.discovered.read().await;
    Json(discovered.snapshot())
}

/// List devices in the persistent store.
pub async fn list_saved(State(state): State<AppState>) -> impl IntoResponse {
    let registry = state.registry.read().await;
    Json(registry.devices().to_vec())
}

/// Save a device. The id is the only required field; everything else in the
/// body is stored as-is and echoed back by the listing endpoints.
pub async fn add_device(
    State(state): State<AppState>,
    Json(device): Json<Device>,
) -> impl IntoResponse {
    let id = device.id.clone();
    let mut registry = state.registry.write().await;
    match registry.add(device) {
        Ok(()) => {
            tracing::info!(device = %id, "device saved");
            (StatusCode::OK, "Device added successfully").into_response()
        },
        Err(RelayError::DeviceExists(_)) => {
            tracing::debug!(device = %id, "rejected duplicate device");
            (StatusCode::BAD_REQUEST, "Device already exists").into_response()
        },
        Err(e) => {
            tracing::error!("Failed to save device {}: {}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::internal()),
            )
                .into_response()
        },
    }
}

/// Remove a device from the persistent store. Removing an id that is not
/// present still reports success, so retries are harmless.
pub async fn remove_device(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let mut registry = state.registry.write().await;
    match registry.remove(&id) {
        Ok(()) => {
            tracing::info!(device = %id, "device removed");
            (StatusCode::OK, "Device removed successfully").into_response()
        },
        Err(e) => {
            tracing::error!("Failed to remove device {}: {}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::internal()),
            )
                .into_response()
        },
    }
}
