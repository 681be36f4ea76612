use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use super::handlers::ErrorBody;
use super::websocket::RelayState;
use crate::config::Config;
use crate::discovery::DiscoveredDevices;
use crate::registry::DeviceRegistry;

/// Relay server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RwLock<DeviceRegistry>>,
    pub discovered: Arc<RwLock<DiscoveredDevices>>,
    pub relay: RelayState,
    pub static_dir: PathBuf,
}

/// Relay server instance
pub struct RelayServer {
    config: Config,
    registry: DeviceRegistry,
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    service: String,
    version: String,
    peers: usize,
}

impl RelayServer {
    pub fn new(config: Config, registry: DeviceRegistry) -> Self {
        Self { config, registry }
    }

    /// Run the relay until the process is stopped.
    pub async fn run(self) -> Result<()> {
        let device_count = self.registry.len();

        let state = AppState {
            registry: Arc::new(RwLock::new(self.registry)),
            discovered: Arc::new(RwLock::new(DiscoveredDevices::new())),
            relay: RelayState::new(),
            static_dir: self.config.static_dir.clone(),
        };

        let app = create_router(state);

        let addr = SocketAddr::new(self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind to {}", addr))?;

        tracing::info!("Relay listening on http://{}", addr);
        tracing::info!("Device store: {}", self.config.data_file.display());
        tracing::info!("Saved devices: {}", device_count);

        axum::serve(listener, app).await.context("Server error")?;

        Ok(())
    }
}

/// Create the Axum router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    use super::routes;

    let static_dir = state.static_dir.clone();

    Router::new()
        // Root route - serve the control page
        .route("/", get(serve_index))
        // Health endpoint for monitors and tests
        .route("/health", get(health_handler))
        // Static assets under /static prefix
        .nest_service("/static", ServeDir::new(static_dir))
        // Device API and the websocket bus
        .merge(routes::api_routes())
        // Fallback to 404
        .fallback(not_found_handler)
        // Add state
        .with_state(state)
        // Add middleware; catch_panic sits innermost so a handler panic
        // still comes back as the JSON 500 body
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([Method::GET, Method::POST, Method::DELETE])
                        .allow_headers(Any),
                )
                .layer(CatchPanicLayer::custom(panic_response)),
        )
}

/// Serve the main index.html file
async fn serve_index(State(state): State<AppState>) -> impl IntoResponse {
    let index = state.static_dir.join("index.html");
    match tokio::fs::read_to_string(&index).await {
        Ok(content) => Html(content).into_response(),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html("<h1>Error: index.html not found</h1>".to_string()),
        )
            .into_response(),
    }
}

/// Health check handler
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "device-relay".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        peers: state.relay.peer_count().await,
    })
}

/// 404 Not Found handler
async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "error": "Not found"
        })),
    )
}

/// Convert a handler panic into the generic 500 body instead of dropping
/// the connection.
fn panic_response(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    tracing::error!("Handler panicked: {}", detail);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody::internal()),
    )
        .into_response()
}
