use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::assessments::Assessment;
use crate::error::EnsGuardError;

/// Full contents of an assessment store, keyed by measure id.
///
/// This is the persistence boundary: the store is rebuilt from a snapshot at
/// start and a fresh snapshot is written after each upsert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssessmentSnapshot {
    assessments: BTreeMap<String, Assessment>,
}

impl AssessmentSnapshot {
    pub fn new(assessments: BTreeMap<String, Assessment>) -> Self {
        AssessmentSnapshot { assessments }
    }

    pub fn into_inner(self) -> BTreeMap<String, Assessment> {
        self.assessments
    }

    pub fn len(&self) -> usize {
        self.assessments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assessments.is_empty()
    }

    /// Missing file means nothing has been assessed yet
    pub fn load(path: &Path) -> Result<Self, EnsGuardError> {
        if !path.exists() {
            info!(
                "No assessment snapshot at {} - starting empty",
                path.display()
            );
            return Ok(Self::default());
        }

        let json = fs::read_to_string(path)?;
        let snapshot: AssessmentSnapshot = serde_json::from_str(&json)?;
        debug!(
            "Loaded {} assessments from {}",
            snapshot.len(),
            path.display()
        );
        Ok(snapshot)
    }

    /// Writes to a sibling temp file and renames it over `path`, so a crash
    /// mid-write never leaves a truncated snapshot behind.
    pub fn save(&self, path: &Path) -> Result<(), EnsGuardError> {
        write_json_atomic(path, self)?;
        debug!("Saved {} assessments to {}", self.len(), path.display());
        Ok(())
    }
}

/// Serializes `value` as pretty JSON via a temp file renamed over `path`
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), EnsGuardError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(value)?;
    let tmp_path = path.with_extension("json.tmp");
    {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessments::{AssessmentStore, AssessmentUpdate};
    use crate::status::ComplianceStatus;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let snapshot = AssessmentSnapshot::load(&dir.path().join("none.json")).unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("assessments.json");

        let mut store = AssessmentStore::new();
        store
            .upsert(
                "org.1",
                AssessmentUpdate {
                    status: Some(ComplianceStatus::Compliant),
                    evidence: Some(vec!["politica.pdf".into()]),
                    ..Default::default()
                },
            )
            .unwrap();
        let snapshot = store.snapshot();
        snapshot.save(&path).unwrap();

        assert!(!path.with_extension("json.tmp").exists());
        let loaded = AssessmentSnapshot::load(&path).unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn test_json_shape_is_map_of_measure_ids() {
        let json = r#"{
            "org.2": {"status": "partial", "evidence": ["normativa.pdf"], "reviewer": "Carlos"},
            "mp.if.1": {"notes": "sin estado"}
        }"#;
        let snapshot: AssessmentSnapshot = serde_json::from_str(json).unwrap();
        let map = snapshot.into_inner();
        assert_eq!(map["org.2"].status, ComplianceStatus::Partial);
        assert_eq!(map["mp.if.1"].status, ComplianceStatus::Pending);
        assert!(map["mp.if.1"].evidence.is_empty());
    }

    #[test]
    fn test_load_rejects_invalid_status() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"org.1": {"status": "finished"}}"#).unwrap();
        assert!(matches!(
            AssessmentSnapshot::load(&path),
            Err(EnsGuardError::JsonError(_))
        ));
    }
}
