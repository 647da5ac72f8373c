use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};

use crate::audits::{parse_status_filter, Audit, AuditRegistry};

use super::state::AppState;
use super::{api_error, ApiError};

#[derive(Debug, Default, Deserialize)]
pub struct AuditListParams {
    pub text: Option<String>,
    pub status: Option<String>,
}

/// Audit with its completion derived from the current assessments
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    #[serde(flatten)]
    pub audit: Audit,
    pub completion_percentage: u32,
}

/// GET /api/audits?text&status
pub async fn list_audits(
    State(state): State<AppState>,
    Query(params): Query<AuditListParams>,
) -> Result<Json<Vec<AuditEntry>>, ApiError> {
    let status = parse_status_filter(params.status.as_deref()).map_err(api_error)?;
    let matches = state.audits.filter(params.text.as_deref(), status);

    let store = state.store.read().await;
    let entries = AuditRegistry::summaries(&matches, &state.catalog, &store)
        .into_iter()
        .map(|summary| AuditEntry {
            audit: summary.audit.clone(),
            completion_percentage: summary.completion_percentage,
        })
        .collect();

    Ok(Json(entries))
}

/// GET /api/audits/{audit_id}
pub async fn get_audit(
    State(state): State<AppState>,
    Path(audit_id): Path<String>,
) -> Result<Json<AuditEntry>, ApiError> {
    let audit = state.audits.require(&audit_id).map_err(api_error)?;
    let store = state.store.read().await;

    Ok(Json(AuditEntry {
        audit: audit.clone(),
        completion_percentage: audit.completion_percentage(&state.catalog, &store),
    }))
}
