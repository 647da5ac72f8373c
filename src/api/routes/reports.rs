use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Serialize;

use crate::reports::ReportRequest;
use crate::task::TaskStatus;
use crate::task_manager::ReportStatusView;

use super::state::AppState;
use super::{api_error, ApiError};

#[derive(Debug, Serialize)]
pub struct CreateReportResponse {
    pub report_id: u64,
}

#[derive(Debug, Serialize)]
pub struct CancelReportResponse {
    pub report_id: u64,
    pub status: TaskStatus,
}

/// POST /api/reports
/// Validates the request and starts generation in the background
pub async fn create_report(
    State(state): State<AppState>,
    Json(request): Json<ReportRequest>,
) -> Result<(StatusCode, Json<CreateReportResponse>), ApiError> {
    // Reports work from a copy so later edits do not leak into them
    let store = state.store.read().await.clone();

    let report_id = state
        .reports
        .start(
            request,
            state.catalog.clone(),
            store,
            state.audits.as_ref().clone(),
        )
        .map_err(api_error)?;

    Ok((StatusCode::ACCEPTED, Json(CreateReportResponse { report_id })))
}

/// GET /api/reports/{report_id}
pub async fn get_report(
    State(state): State<AppState>,
    Path(report_id): Path<u64>,
) -> Result<Json<ReportStatusView>, ApiError> {
    state.reports.progress(report_id).map(Json).map_err(api_error)
}

/// POST /api/reports/{report_id}/cancel
pub async fn cancel_report(
    State(state): State<AppState>,
    Path(report_id): Path<u64>,
) -> Result<Json<CancelReportResponse>, ApiError> {
    let status = state.reports.cancel(report_id).map_err(api_error)?;
    Ok(Json(CancelReportResponse { report_id, status }))
}
