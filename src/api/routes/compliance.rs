use axum::{
    extract::{Path, State},
    response::Json,
};

use crate::catalog::{Category, CategoryId};
use crate::dashboard::DashboardSummary;
use crate::stats::{compute_all_rollups, compute_category_rollup, compute_stats, CategoryRollup, ComplianceStats};

use super::state::AppState;

/// GET /api/stats
/// Global counts and compliance percentage over the whole catalog
pub async fn get_stats(State(state): State<AppState>) -> Json<ComplianceStats> {
    let store = state.store.read().await;
    Json(compute_stats(&state.catalog, &store))
}

/// GET /api/dashboard
pub async fn get_dashboard(State(state): State<AppState>) -> Json<DashboardSummary> {
    let store = state.store.read().await;
    Json(DashboardSummary::compute(&state.catalog, &store, &state.audits))
}

/// GET /api/categories
pub async fn list_categories(State(state): State<AppState>) -> Json<Vec<Category>> {
    Json(state.catalog.categories().to_vec())
}

/// GET /api/categories/rollups
/// One rollup per category, in catalog order
pub async fn get_rollups(State(state): State<AppState>) -> Json<Vec<CategoryRollup>> {
    let store = state.store.read().await;
    Json(compute_all_rollups(&state.catalog, &store))
}

/// GET /api/categories/{category_id}/rollup
/// Unknown categories yield an all-zero rollup
pub async fn get_category_rollup(
    State(state): State<AppState>,
    Path(category_id): Path<CategoryId>,
) -> Json<CategoryRollup> {
    let store = state.store.read().await;
    Json(compute_category_rollup(&state.catalog, &store, category_id))
}
