use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::activity::ActivityEvent;
use crate::assessments::AssessmentStore;
use crate::audits::AuditRegistry;
use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::EnsGuardError;
use crate::snapshot::{write_json_atomic, AssessmentSnapshot};

/// Catalog, assessments and audits loaded for one process, plus where the
/// assessments are persisted
pub struct AppContext {
    pub catalog: Catalog,
    pub store: AssessmentStore,
    pub audits: AuditRegistry,
    snapshot_path: Option<PathBuf>,
}

impl AppContext {
    /// Loads the catalog (built-in unless `store.catalog_file` is set) and the
    /// assessment snapshot. Without a snapshot on disk the store starts from
    /// the demo assessments when `store.seed_demo` is on, otherwise empty.
    pub fn load(config: &Config, data_dir: &Path) -> Result<Self, EnsGuardError> {
        let catalog = match config.store.catalog_path(data_dir) {
            Some(path) => {
                info!("Loading catalog from {}", path.display());
                Catalog::from_json_file(&path)?
            }
            None => Catalog::builtin()?,
        };

        let snapshot_path = config.store.snapshot_path(data_dir);
        let snapshot = if snapshot_path.exists() {
            AssessmentSnapshot::load(&snapshot_path)?
        } else if config.store.seed_demo {
            info!("No snapshot at {}, seeding demo assessments", snapshot_path.display());
            AssessmentStore::demo(&catalog)?.snapshot()
        } else {
            AssessmentSnapshot::default()
        };

        let validate = config.store.validate_measure_ids;
        if !validate {
            warn!("Measure id validation is disabled");
        }
        let mut store = AssessmentStore::from_snapshot(snapshot, validate.then_some(&catalog))?;

        let activity_path = activity_path(&snapshot_path);
        if activity_path.exists() {
            let json = std::fs::read_to_string(&activity_path)?;
            let events: Vec<ActivityEvent> = serde_json::from_str(&json)?;
            store.restore_activity(events);
        }

        Ok(AppContext {
            catalog,
            store,
            audits: AuditRegistry::demo(),
            snapshot_path: Some(snapshot_path),
        })
    }

    /// Context that never touches the filesystem
    pub fn in_memory(catalog: Catalog, store: AssessmentStore, audits: AuditRegistry) -> Self {
        AppContext {
            catalog,
            store,
            audits,
            snapshot_path: None,
        }
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    pub fn save(&self) -> Result<(), EnsGuardError> {
        save_store(&self.store, self.snapshot_path())
    }
}

/// Recent activity is kept next to the snapshot it describes
fn activity_path(snapshot_path: &Path) -> PathBuf {
    snapshot_path.with_extension("activity.json")
}

/// Writes `store` and its activity log next to `path`; a `None` path is a
/// no-op
pub fn save_store(store: &AssessmentStore, path: Option<&Path>) -> Result<(), EnsGuardError> {
    if let Some(path) = path {
        store.snapshot().save(path)?;
        write_json_atomic(&activity_path(path), &store.activity().events())?;
        info!("Saved {} assessments to {}", store.len(), path.display());
    }
    Ok(())
}
