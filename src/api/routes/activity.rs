use axum::{
    extract::{Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::activity::{ActivityEvent, ActivityKind};
use crate::status::ComplianceStatus;

use super::state::AppState;

const DEFAULT_COUNT: usize = 10;

#[derive(Debug, Default, Deserialize)]
pub struct ActivityParams {
    pub count: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    pub measure_id: String,
    pub kind: ActivityKind,
    pub status: ComplianceStatus,
    pub reviewer: Option<String>,
    pub at: DateTime<Utc>,
    pub description: String,
}

impl From<&ActivityEvent> for ActivityEntry {
    fn from(event: &ActivityEvent) -> Self {
        ActivityEntry {
            measure_id: event.measure_id.clone(),
            kind: event.kind,
            status: event.status,
            reviewer: event.reviewer.clone(),
            at: event.at,
            description: event.describe(),
        }
    }
}

/// GET /api/activity?count
/// Most recent assessment changes, newest first
pub async fn get_activity(
    State(state): State<AppState>,
    Query(params): Query<ActivityParams>,
) -> Json<Vec<ActivityEntry>> {
    let count = params.count.unwrap_or(DEFAULT_COUNT);
    let store = state.store.read().await;
    Json(
        store
            .activity()
            .recent(count)
            .into_iter()
            .map(ActivityEntry::from)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::routes::state::tests::demo_state;
    use crate::assessments::AssessmentUpdate;

    #[tokio::test]
    async fn test_activity_newest_first() {
        let state = demo_state();
        {
            let mut store = state.store.write().await;
            store
                .upsert("org.4", AssessmentUpdate::status(ComplianceStatus::Partial))
                .unwrap();
            store
                .upsert(
                    "org.1",
                    AssessmentUpdate {
                        evidence: Some(vec!["a.pdf".into(), "b.pdf".into(), "c.pdf".into()]),
                        ..Default::default()
                    },
                )
                .unwrap();
        }

        let Json(entries) =
            get_activity(State(state.clone()), Query(ActivityParams::default())).await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].measure_id, "org.1");
        assert_eq!(entries[0].kind, ActivityKind::EvidenceAdded);
        assert_eq!(entries[1].kind, ActivityKind::StatusChanged);
        assert_eq!(entries[1].description, "Medida org.4 marcada como parcial");

        let Json(one) = get_activity(State(state), Query(ActivityParams { count: Some(1) })).await;
        assert_eq!(one.len(), 1);
    }
}
