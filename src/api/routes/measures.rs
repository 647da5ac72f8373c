use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use log::info;
use serde::{Deserialize, Serialize};

use crate::assessments::{Assessment, AssessmentStore, AssessmentUpdate};
use crate::catalog::Measure;
use crate::context::save_store;
use crate::error::EnsGuardError;
use crate::filter::{filter, MeasureQuery};
use crate::status::ComplianceStatus;

use super::state::AppState;
use super::{api_error, ApiError};

/// Query parameters for GET /api/measures. Absent values mean "all".
#[derive(Debug, Default, Deserialize)]
pub struct MeasureListParams {
    pub text: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub scope: Option<String>,
}

/// A catalog measure together with its current assessment
#[derive(Debug, Clone, Serialize)]
pub struct MeasureEntry {
    #[serde(flatten)]
    pub measure: Measure,
    pub status: ComplianceStatus,
    pub assessment: Option<Assessment>,
}

impl MeasureEntry {
    fn new(measure: &Measure, store: &AssessmentStore) -> Self {
        MeasureEntry {
            measure: measure.clone(),
            status: store.effective_status(&measure.id),
            assessment: store.get(&measure.id).ok().flatten().cloned(),
        }
    }
}

/// Assessment lookup result. A known measure without a record is reported
/// as pending with no assessment.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentResponse {
    pub measure_id: String,
    pub status: ComplianceStatus,
    pub assessment: Option<Assessment>,
}

/// Request body for PUT /api/assessments/{measure_id}. Omitted fields keep
/// their current value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateAssessmentRequest {
    pub status: Option<String>,
    pub notes: Option<String>,
    pub evidence: Option<Vec<String>>,
    pub reviewed_at: Option<String>,
    pub reviewer: Option<String>,
}

impl UpdateAssessmentRequest {
    fn into_update(self) -> Result<AssessmentUpdate, EnsGuardError> {
        AssessmentUpdate::from_text(
            self.status.as_deref(),
            self.notes,
            self.evidence,
            self.reviewed_at.as_deref(),
            self.reviewer,
        )
    }
}

/// GET /api/measures?text&category&status&scope
pub async fn list_measures(
    State(state): State<AppState>,
    Query(params): Query<MeasureListParams>,
) -> Result<Json<Vec<MeasureEntry>>, ApiError> {
    let query = MeasureQuery::parse(
        params.text.as_deref(),
        params.category.as_deref(),
        params.status.as_deref(),
        params.scope.as_deref(),
    )
    .map_err(api_error)?;

    let store = state.store.read().await;
    let entries = filter(&state.catalog, &store, &query)
        .into_iter()
        .map(|measure| MeasureEntry::new(measure, &store))
        .collect();

    Ok(Json(entries))
}

/// GET /api/measures/{measure_id}
pub async fn get_measure(
    State(state): State<AppState>,
    Path(measure_id): Path<String>,
) -> Result<Json<MeasureEntry>, ApiError> {
    let measure = state
        .catalog
        .measure(&measure_id)
        .ok_or_else(|| api_error(EnsGuardError::UnknownMeasure(measure_id.clone())))?;

    let store = state.store.read().await;
    Ok(Json(MeasureEntry::new(measure, &store)))
}

/// GET /api/assessments/{measure_id}
pub async fn get_assessment(
    State(state): State<AppState>,
    Path(measure_id): Path<String>,
) -> Result<Json<AssessmentResponse>, ApiError> {
    let store = state.store.read().await;
    let assessment = store.get(&measure_id).map_err(api_error)?.cloned();

    Ok(Json(AssessmentResponse {
        status: store.effective_status(&measure_id),
        measure_id,
        assessment,
    }))
}

/// PUT /api/assessments/{measure_id}
/// Creates or merges the assessment and persists the snapshot. The change
/// is applied to a copy and only becomes visible once it is on disk.
pub async fn update_assessment(
    State(state): State<AppState>,
    Path(measure_id): Path<String>,
    Json(request): Json<UpdateAssessmentRequest>,
) -> Result<(StatusCode, Json<Assessment>), ApiError> {
    let update = request.into_update().map_err(api_error)?;

    let mut store = state.store.write().await;
    let mut next = store.clone();
    let assessment = next.upsert(&measure_id, update).map_err(api_error)?.clone();

    save_store(&next, state.snapshot_path.as_deref()).map_err(api_error)?;
    *store = next;
    info!("Assessment for '{}' set to {}", measure_id, assessment.status);

    Ok((StatusCode::OK, Json(assessment)))
}
