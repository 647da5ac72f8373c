use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Notify, RwLock};

use crate::assessments::AssessmentStore;
use crate::audits::AuditRegistry;
use crate::catalog::Catalog;
use crate::context::AppContext;
use crate::task_manager::ReportManager;

/// Shared application state passed to all Axum handlers via `.with_state()`.
///
/// The catalog and audits are read-only for the life of the server; the
/// assessment store sits behind a lock and is persisted after each write.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub store: Arc<RwLock<AssessmentStore>>,
    pub audits: Arc<AuditRegistry>,
    pub snapshot_path: Option<PathBuf>,
    pub reports: ReportManager,
    pub shutdown_notify: Arc<Notify>,
}

impl AppState {
    pub fn new(context: AppContext, reports: ReportManager, shutdown_notify: Arc<Notify>) -> Self {
        let snapshot_path = context.snapshot_path().map(|p| p.to_path_buf());
        Self {
            catalog: Arc::new(context.catalog),
            store: Arc::new(RwLock::new(context.store)),
            audits: Arc::new(context.audits),
            snapshot_path,
            reports,
            shutdown_notify,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::time::Duration;

    /// Demo data, no persistence, reports without pacing
    pub(crate) fn demo_state() -> AppState {
        let catalog = Catalog::builtin().unwrap();
        let store = AssessmentStore::demo(&catalog).unwrap();
        let context = AppContext::in_memory(catalog, store, AuditRegistry::demo());
        AppState::new(
            context,
            ReportManager::new(Duration::ZERO),
            Arc::new(Notify::new()),
        )
    }
}
