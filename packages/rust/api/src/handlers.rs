//! Route handlers.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

use brandguard_shared::{AuditState, AuditStatus, ComplianceIssue};

use crate::AppState;
use crate::error::ApiError;

pub const SERVICE_NAME: &str = "Brand Guardian AI";

/// Used when the workflow produced no report.
pub const NO_REPORT: &str = "No report generated.";

#[derive(Debug, Deserialize)]
pub struct AuditRequest {
    pub video_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuditResponse {
    pub session_id: String,
    pub video_id: String,
    pub status: AuditStatus,
    pub final_report: String,
    pub compliance_results: Vec<ComplianceIssue>,
}

impl AuditResponse {
    pub fn from_state(session_id: String, state: &AuditState) -> Self {
        Self {
            session_id,
            video_id: state.video_id().to_string(),
            status: state.final_status(),
            final_report: state.final_report().unwrap_or(NO_REPORT).to_string(),
            compliance_results: state.compliance_results().to_vec(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

/// `vid_` plus the first eight characters of the session id.
pub fn short_video_id(session_id: &str) -> String {
    let prefix: String = session_id.chars().take(8).collect();
    format!("vid_{prefix}")
}

/// `POST /audit`
pub async fn audit(
    State(state): State<AppState>,
    payload: Result<Json<AuditRequest>, JsonRejection>,
) -> Result<Json<AuditResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;

    let session_id = uuid::Uuid::new_v4().to_string();
    let video_id = short_video_id(&session_id);
    info!(
        session_id = %session_id,
        video_url = %request.video_url,
        "received audit request"
    );

    let initial = AuditState::new(request.video_url, video_id);
    let workflow = state.workflow.clone();

    // Dropping this handler future (client disconnect) cancels the run.
    let cancel = CancellationToken::new();
    let _disconnect = cancel.clone().drop_guard();

    // A panic inside a stage surfaces as a join error instead of tearing
    // down the connection.
    let final_state =
        tokio::spawn(async move { workflow.run_with_cancel(initial, &cancel).await })
            .await
            .map_err(|e| ApiError::WorkflowFailed(e.to_string()))?;

    Ok(Json(AuditResponse::from_state(session_id, &final_state)))
}

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
    })
}
