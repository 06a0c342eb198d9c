//! HTTP API server
//!
//! Serves the query pipeline over JSON. Errors are returned as
//! `{"error": message}` with a status derived from the error class.

pub mod handlers;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

use crate::backend::BackendError;
use crate::config::ServerConfig;
use crate::disk::DiskError;
use crate::error::{MemdiskError, Result};
use crate::pipeline::QueryPipeline;

/// Header carrying the passphrase for encrypted disk loads
pub const ENCRYPTION_KEY_HEADER: &str = "x-encryption-key";

/// Shared application state for all handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub pipeline: Arc<QueryPipeline>,
}

/// The API server
pub struct MemdiskServer {
    config: ServerConfig,
    pipeline: Arc<QueryPipeline>,
}

impl MemdiskServer {
    pub fn new(config: ServerConfig, pipeline: Arc<QueryPipeline>) -> Self {
        Self { config, pipeline }
    }

    /// Bind and serve until Ctrl+C or SIGTERM
    pub async fn serve(&self) -> Result<()> {
        let app = create_router(Arc::new(AppState {
            pipeline: self.pipeline.clone(),
        }));

        let addr: SocketAddr = self
            .config
            .listen_addr
            .parse()
            .map_err(|e| MemdiskError::Config(format!("Invalid listen address: {e}")))?;

        tracing::info!("Starting MemDisk server on {addr}");
        tracing::info!(
            "Backend: {} (model {})",
            self.pipeline.backend_name(),
            self.pipeline.active_model()
        );
        tracing::info!("Disk directory: {}", self.pipeline.store().dir().display());

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| MemdiskError::Server(format!("Failed to bind to {addr}: {e}")))?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| MemdiskError::Server(e.to_string()))?;

        tracing::info!("Server shut down gracefully");
        Ok(())
    }
}

/// Create the router with all routes configured
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/api/disks", get(handlers::list_disks_handler))
        .route("/api/disk/load/{name}", get(handlers::load_disk_handler))
        .route("/api/query", axum::routing::post(handlers::query_handler))
        .route(
            "/api/model",
            get(handlers::get_model_handler).post(handlers::set_model_handler),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Error returned by handlers, rendered as `{"error": message}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

impl From<MemdiskError> for ApiError {
    fn from(err: MemdiskError) -> Self {
        Self::new(status_for(&err), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, "{}", self.message);
        } else {
            tracing::debug!(status = %self.status, "{}", self.message);
        }
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

/// HTTP status for an error class
pub fn status_for(err: &MemdiskError) -> StatusCode {
    match err {
        MemdiskError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        MemdiskError::Disk(disk) => match disk {
            DiskError::InvalidName(_) => StatusCode::BAD_REQUEST,
            DiskError::NotFound(_) => StatusCode::NOT_FOUND,
            DiskError::Malformed { .. } | DiskError::Decryption { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        },
        MemdiskError::Backend(BackendError::MissingCredential { .. }) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        MemdiskError::Backend(BackendError::Config(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        MemdiskError::Classifier(_) | MemdiskError::Backend(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}
