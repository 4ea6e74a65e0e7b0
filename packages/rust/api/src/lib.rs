//! HTTP boundary for Brand Guardian.
//!
//! `POST /audit` runs the workflow for one video and `GET /health` reports
//! liveness. The router is plain axum and can be mounted on any server.

pub mod error;
pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tracing::info;

use brandguard_core::AuditWorkflow;
use brandguard_shared::{BrandGuardError, Result};

pub use error::ApiError;
pub use handlers::{AuditRequest, AuditResponse, HealthResponse};

/// Shared handler state. Cloned per request; the workflow is shared.
#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<AuditWorkflow>,
}

impl AppState {
    pub fn new(workflow: AuditWorkflow) -> Self {
        Self {
            workflow: Arc::new(workflow),
        }
    }
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/audit", post(handlers::audit))
        .route("/health", get(handlers::health))
        .with_state(state)
}

/// Serve the API on `addr` until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| BrandGuardError::Network(format!("failed to bind {addr}: {e}")))?;
    info!(%addr, "Brand Guardian API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
        .map_err(|e| BrandGuardError::Network(format!("server error: {e}")))
}
