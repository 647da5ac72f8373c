use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::activity::{ActivityEvent, ActivityKind, ActivityLog};
use crate::catalog::Catalog;
use crate::error::EnsGuardError;
use crate::snapshot::AssessmentSnapshot;
use crate::status::ComplianceStatus;

/// Recorded evaluation of one measure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    #[serde(default)]
    pub status: ComplianceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub evidence: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<String>,
    /// Set by the store on every upsert. Records loaded from a snapshot
    /// written before their first upsert may not carry one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Partial assessment used for create-or-merge updates.
///
/// Fields left as `None` keep their previous value. There is no
/// `updated_at` field: the store always stamps that itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentUpdate {
    #[serde(default)]
    pub status: Option<ComplianceStatus>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub evidence: Option<Vec<String>>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reviewer: Option<String>,
}

impl AssessmentUpdate {
    pub fn status(status: ComplianceStatus) -> Self {
        AssessmentUpdate {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Builds an update from loosely typed input. Status and timestamp text
    /// is validated here; everything else is taken as given.
    pub fn from_text(
        status: Option<&str>,
        notes: Option<String>,
        evidence: Option<Vec<String>>,
        reviewed_at: Option<&str>,
        reviewer: Option<String>,
    ) -> Result<Self, EnsGuardError> {
        Ok(AssessmentUpdate {
            status: status.map(str::parse).transpose()?,
            notes,
            evidence,
            reviewed_at: reviewed_at.map(parse_timestamp).transpose()?,
            reviewer,
        })
    }

    fn merge_into(self, assessment: &mut Assessment) {
        if let Some(status) = self.status {
            assessment.status = status;
        }
        if let Some(notes) = self.notes {
            assessment.notes = Some(notes);
        }
        if let Some(evidence) = self.evidence {
            assessment.evidence = evidence;
        }
        if let Some(reviewed_at) = self.reviewed_at {
            assessment.reviewed_at = Some(reviewed_at);
        }
        if let Some(reviewer) = self.reviewer {
            assessment.reviewer = Some(reviewer);
        }
    }
}

/// Accepts either a full RFC 3339 timestamp or a bare `YYYY-MM-DD` date
/// (taken as midnight UTC).
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, EnsGuardError> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| EnsGuardError::InvalidTimestamp(s.to_owned()))
}

/// Sparse map from measure id to its assessment.
///
/// A measure without an entry is pending. When built with a catalog, every
/// read and write is checked against the catalog's measure ids.
#[derive(Debug, Clone, Default)]
pub struct AssessmentStore {
    records: BTreeMap<String, Assessment>,
    known_measures: Option<HashSet<String>>,
    activity: ActivityLog,
}

impl AssessmentStore {
    /// Store with no measure id validation
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that rejects ids missing from `catalog` with `UnknownMeasure`
    pub fn validated(catalog: &Catalog) -> Self {
        AssessmentStore {
            known_measures: Some(catalog.measure_ids()),
            ..Default::default()
        }
    }

    pub fn from_snapshot(
        snapshot: AssessmentSnapshot,
        catalog: Option<&Catalog>,
    ) -> Result<Self, EnsGuardError> {
        let mut store = match catalog {
            Some(catalog) => Self::validated(catalog),
            None => Self::new(),
        };

        for (measure_id, assessment) in snapshot.into_inner() {
            store.check_known(&measure_id)?;
            store.records.insert(measure_id, assessment);
        }

        debug!("Assessment store loaded with {} records", store.records.len());
        Ok(store)
    }

    pub fn snapshot(&self) -> AssessmentSnapshot {
        AssessmentSnapshot::new(self.records.clone())
    }

    pub fn is_validating(&self) -> bool {
        self.known_measures.is_some()
    }

    fn check_known(&self, measure_id: &str) -> Result<(), EnsGuardError> {
        match &self.known_measures {
            Some(known) if !known.contains(measure_id) => {
                Err(EnsGuardError::UnknownMeasure(measure_id.to_owned()))
            }
            _ => Ok(()),
        }
    }

    /// Creates or shallow-merges the assessment for `measure_id` and stamps
    /// `updated_at`. On error the store is left unchanged.
    pub fn upsert(
        &mut self,
        measure_id: &str,
        update: AssessmentUpdate,
    ) -> Result<&Assessment, EnsGuardError> {
        if let Err(e) = self.check_known(measure_id) {
            warn!("Rejected assessment update for unknown measure '{}'", measure_id);
            return Err(e);
        }

        let record = self.records.entry(measure_id.to_owned()).or_default();
        let prev_status = record.status;
        let prev_evidence = record.evidence.len();

        update.merge_into(record);
        let now = Utc::now();
        record.updated_at = Some(now);

        let kind = if record.status != prev_status {
            ActivityKind::StatusChanged
        } else if record.evidence.len() > prev_evidence {
            ActivityKind::EvidenceAdded
        } else {
            ActivityKind::Updated
        };

        debug!(
            "Assessment for '{}' upserted: {} -> {}",
            measure_id, prev_status, record.status
        );

        self.activity.record(ActivityEvent {
            measure_id: measure_id.to_owned(),
            kind,
            status: record.status,
            reviewer: record.reviewer.clone(),
            at: now,
        });

        Ok(record)
    }

    /// Read-only lookup; never creates a record
    pub fn get(&self, measure_id: &str) -> Result<Option<&Assessment>, EnsGuardError> {
        self.check_known(measure_id)?;
        Ok(self.records.get(measure_id))
    }

    /// Status as every consumer should see it: absent records are pending
    pub fn effective_status(&self, measure_id: &str) -> ComplianceStatus {
        self.records
            .get(measure_id)
            .map(|assessment| assessment.status)
            .unwrap_or_default()
    }

    pub fn contains(&self, measure_id: &str) -> bool {
        self.records.contains_key(measure_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Assessment)> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    /// Reinstates an activity history saved by an earlier process
    pub fn restore_activity(&mut self, events: Vec<ActivityEvent>) {
        self.activity.restore(events);
    }

    /// Store seeded with the demo assessments of the built-in catalog
    pub fn demo(catalog: &Catalog) -> Result<Self, EnsGuardError> {
        let mut records = BTreeMap::new();
        let seeds: [(&str, ComplianceStatus, &str, &[&str], &str, &str); 5] = [
            (
                "org.1",
                ComplianceStatus::Compliant,
                "Política de seguridad aprobada y comunicada a toda la organización.",
                &["politica_seguridad_v2.pdf", "comunicacion_politica.pdf"],
                "2024-01-20",
                "Ana García",
            ),
            (
                "org.2",
                ComplianceStatus::Partial,
                "Normativa existe pero necesita actualización.",
                &["normativa_actual.pdf"],
                "2024-01-22",
                "Carlos López",
            ),
            (
                "org.3",
                ComplianceStatus::NonCompliant,
                "Procedimientos no documentados adecuadamente.",
                &[],
                "2024-01-25",
                "María Rodríguez",
            ),
            (
                "op.acc.1",
                ComplianceStatus::Compliant,
                "Sistema de identificación única implementado.",
                &["config_ad.pdf"],
                "2024-01-18",
                "Pedro Martín",
            ),
            (
                "mp.if.1",
                ComplianceStatus::Partial,
                "Controles físicos básicos implementados, faltan mejoras.",
                &["plano_instalaciones.pdf"],
                "2024-01-28",
                "Laura Sánchez",
            ),
        ];

        for (measure_id, status, notes, evidence, reviewed_at, reviewer) in seeds {
            records.insert(
                measure_id.to_owned(),
                Assessment {
                    status,
                    notes: Some(notes.to_owned()),
                    evidence: evidence.iter().map(|e| (*e).to_owned()).collect(),
                    reviewed_at: Some(parse_timestamp(reviewed_at)?),
                    reviewer: Some(reviewer.to_owned()),
                    updated_at: None,
                },
            );
        }

        Self::from_snapshot(AssessmentSnapshot::new(records), Some(catalog))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::sample_catalog;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_upsert_creates_pending_by_default() {
        let mut store = AssessmentStore::new();
        let update = AssessmentUpdate {
            notes: Some("first look".into()),
            ..Default::default()
        };
        let record = store.upsert("org.1", update).unwrap();
        assert_eq!(record.status, ComplianceStatus::Pending);
        assert_eq!(record.notes.as_deref(), Some("first look"));
        assert!(record.updated_at.is_some());
    }

    #[test]
    fn test_upsert_then_get_returns_status_and_fresh_timestamp() {
        let mut store = AssessmentStore::new();
        let before = Utc::now();
        store
            .upsert("org.1", AssessmentUpdate::status(ComplianceStatus::Compliant))
            .unwrap();

        let record = store.get("org.1").unwrap().unwrap();
        assert_eq!(record.status, ComplianceStatus::Compliant);
        assert!(record.updated_at.unwrap() >= before);
    }

    #[test]
    fn test_upsert_is_shallow_merge() {
        let mut store = AssessmentStore::new();
        store
            .upsert(
                "org.1",
                AssessmentUpdate {
                    status: Some(ComplianceStatus::Partial),
                    notes: Some("needs work".into()),
                    evidence: Some(vec!["a.pdf".into()]),
                    reviewer: Some("Ana".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        store
            .upsert(
                "org.1",
                AssessmentUpdate {
                    evidence: Some(vec!["b.pdf".into()]),
                    ..Default::default()
                },
            )
            .unwrap();

        let record = store.get("org.1").unwrap().unwrap();
        assert_eq!(record.status, ComplianceStatus::Partial);
        assert_eq!(record.notes.as_deref(), Some("needs work"));
        assert_eq!(record.reviewer.as_deref(), Some("Ana"));
        // Sequences are replaced, not appended
        assert_eq!(record.evidence, vec!["b.pdf".to_string()]);
    }

    #[test]
    fn test_upsert_idempotent_except_updated_at() {
        let mut store = AssessmentStore::new();
        let update = AssessmentUpdate {
            status: Some(ComplianceStatus::NonCompliant),
            notes: Some("missing".into()),
            evidence: Some(vec!["x.pdf".into()]),
            reviewed_at: Some(parse_timestamp("2024-02-01").unwrap()),
            reviewer: Some("Carlos".into()),
        };

        let mut first = store.upsert("org.2", update.clone()).unwrap().clone();
        let mut second = store.upsert("org.2", update).unwrap().clone();
        first.updated_at = None;
        second.updated_at = None;
        assert_eq!(first, second);
    }

    #[test]
    fn test_get_never_creates() {
        let store = AssessmentStore::new();
        assert!(store.get("org.1").unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_validated_store_rejects_unknown_measure() {
        let catalog = sample_catalog();
        let mut store = AssessmentStore::validated(&catalog);

        let err = store
            .upsert("zz.9", AssessmentUpdate::status(ComplianceStatus::Compliant))
            .unwrap_err();
        assert!(matches!(err, EnsGuardError::UnknownMeasure(id) if id == "zz.9"));
        assert!(store.is_empty());
        assert!(store.activity().is_empty());

        assert!(matches!(
            store.get("zz.9"),
            Err(EnsGuardError::UnknownMeasure(_))
        ));
        assert!(store.get("org.1").unwrap().is_none());
    }

    #[test]
    fn test_unvalidated_store_accepts_any_id() {
        let mut store = AssessmentStore::new();
        assert!(!store.is_validating());
        store
            .upsert("anything", AssessmentUpdate::status(ComplianceStatus::Partial))
            .unwrap();
        assert!(store.contains("anything"));
    }

    #[test]
    fn test_update_from_text() {
        let update = AssessmentUpdate::from_text(
            Some("partial"),
            None,
            Some(vec!["acta.pdf".into()]),
            Some("2024-02-01"),
            Some("Ana García".into()),
        )
        .unwrap();
        assert_eq!(update.status, Some(ComplianceStatus::Partial));
        assert_eq!(update.reviewed_at, Some(parse_timestamp("2024-02-01").unwrap()));
        assert_eq!(update.notes, None);

        let err = AssessmentUpdate::from_text(Some("done"), None, None, None, None).unwrap_err();
        assert!(matches!(err, EnsGuardError::InvalidStatus(_)));

        let err = AssessmentUpdate::from_text(None, None, None, Some("soon"), None).unwrap_err();
        assert!(matches!(err, EnsGuardError::InvalidTimestamp(_)));
    }

    #[test]
    fn test_effective_status_defaults_to_pending() {
        let mut store = AssessmentStore::new();
        assert_eq!(store.effective_status("org.1"), ComplianceStatus::Pending);
        store
            .upsert("org.1", AssessmentUpdate::status(ComplianceStatus::NotApplicable))
            .unwrap();
        assert_eq!(store.effective_status("org.1"), ComplianceStatus::NotApplicable);
    }

    #[test]
    fn test_activity_kinds() {
        let mut store = AssessmentStore::new();
        store
            .upsert("org.1", AssessmentUpdate::status(ComplianceStatus::Compliant))
            .unwrap();
        store
            .upsert(
                "org.1",
                AssessmentUpdate {
                    evidence: Some(vec!["a.pdf".into()]),
                    ..Default::default()
                },
            )
            .unwrap();
        store
            .upsert(
                "org.1",
                AssessmentUpdate {
                    notes: Some("ok".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        let kinds: Vec<ActivityKind> = store.activity().recent(10).iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ActivityKind::Updated,
                ActivityKind::EvidenceAdded,
                ActivityKind::StatusChanged
            ]
        );
    }

    #[test]
    fn test_snapshot_rebuild() {
        let catalog = sample_catalog();
        let mut store = AssessmentStore::validated(&catalog);
        store
            .upsert("org.3", AssessmentUpdate::status(ComplianceStatus::Compliant))
            .unwrap();

        let rebuilt = AssessmentStore::from_snapshot(store.snapshot(), Some(&catalog)).unwrap();
        assert_eq!(rebuilt.get("org.3").unwrap(), store.get("org.3").unwrap());
        assert!(rebuilt.is_validating());
    }

    #[test]
    fn test_snapshot_with_unknown_id_fails_when_validating() {
        let catalog = sample_catalog();
        let mut loose = AssessmentStore::new();
        loose
            .upsert("gone.1", AssessmentUpdate::status(ComplianceStatus::Compliant))
            .unwrap();

        assert!(matches!(
            AssessmentStore::from_snapshot(loose.snapshot(), Some(&catalog)),
            Err(EnsGuardError::UnknownMeasure(_))
        ));
        assert!(AssessmentStore::from_snapshot(loose.snapshot(), None).is_ok());
    }

    #[test]
    fn test_demo_store() {
        let catalog = Catalog::builtin().unwrap();
        let store = AssessmentStore::demo(&catalog).unwrap();
        assert_eq!(store.len(), 5);
        let org1 = store.get("org.1").unwrap().unwrap();
        assert_eq!(org1.evidence.len(), 2);
        assert_eq!(org1.reviewer.as_deref(), Some("Ana García"));
        assert_eq!(store.effective_status("org.3"), ComplianceStatus::NonCompliant);
    }

    #[test]
    fn test_parse_timestamp() {
        let date = parse_timestamp("2024-01-20").unwrap();
        assert_eq!(date.to_rfc3339(), "2024-01-20T00:00:00+00:00");
        let full = parse_timestamp("2024-01-20T10:30:00+01:00").unwrap();
        assert_eq!(full.to_rfc3339(), "2024-01-20T09:30:00+00:00");
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(EnsGuardError::InvalidTimestamp(_))
        ));
    }
}
