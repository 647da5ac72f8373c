use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::assessments::AssessmentStore;
use crate::catalog::{Catalog, SecurityLevel};
use crate::error::EnsGuardError;
use crate::stats::percent;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    #[default]
    Draft,
    InProgress,
    Completed,
    Cancelled,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Draft => "draft",
            AuditStatus::InProgress => "in_progress",
            AuditStatus::Completed => "completed",
            AuditStatus::Cancelled => "cancelled",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AuditStatus::Draft => "Borrador",
            AuditStatus::InProgress => "En Progreso",
            AuditStatus::Completed => "Completada",
            AuditStatus::Cancelled => "Cancelada",
        }
    }
}

impl FromStr for AuditStatus {
    type Err = EnsGuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "draft" => Ok(AuditStatus::Draft),
            "in_progress" => Ok(AuditStatus::InProgress),
            "completed" => Ok(AuditStatus::Completed),
            "cancelled" => Ok(AuditStatus::Cancelled),
            _ => Err(EnsGuardError::InvalidFilter(format!(
                "unknown audit status '{}'",
                s
            ))),
        }
    }
}

/// An audit engagement against the ENS catalog at one security level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audit {
    pub id: String,
    pub name: String,
    pub organization: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: AuditStatus,
    pub level: SecurityLevel,
    pub created_at: NaiveDate,
}

impl Audit {
    /// Share of catalog measures that carry an assessment. Always derived
    /// from live assessment data; audits store no completion figure of
    /// their own.
    pub fn completion_percentage(&self, catalog: &Catalog, store: &AssessmentStore) -> u32 {
        let total = catalog.measures().len();
        let evaluated = catalog
            .measures()
            .iter()
            .filter(|measure| store.contains(&measure.id))
            .count();
        percent(evaluated, total)
    }
}

/// Audit with its derived completion, as listed to users
#[derive(Debug, Clone, Serialize)]
pub struct AuditSummary<'a> {
    #[serde(flatten)]
    pub audit: &'a Audit,
    pub completion_percentage: u32,
}

#[derive(Debug, Clone, Default)]
pub struct AuditRegistry {
    audits: Vec<Audit>,
}

impl AuditRegistry {
    pub fn new(audits: Vec<Audit>) -> Self {
        AuditRegistry { audits }
    }

    pub fn demo() -> Self {
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default();
        AuditRegistry::new(vec![
            Audit {
                id: "1".into(),
                name: "Auditoría ENS 2024".into(),
                organization: "Empresa Demo".into(),
                start_date: date(2024, 1, 15),
                end_date: date(2024, 3, 15),
                status: AuditStatus::InProgress,
                level: SecurityLevel::Medium,
                created_at: date(2024, 1, 15),
            },
            Audit {
                id: "2".into(),
                name: "Revisión Anual ENS".into(),
                organization: "Empresa Demo".into(),
                start_date: date(2023, 10, 1),
                end_date: date(2023, 12, 31),
                status: AuditStatus::Completed,
                level: SecurityLevel::Basic,
                created_at: date(2023, 10, 1),
            },
        ])
    }

    pub fn all(&self) -> &[Audit] {
        &self.audits
    }

    pub fn get(&self, id: &str) -> Option<&Audit> {
        self.audits.iter().find(|audit| audit.id == id)
    }

    pub fn require(&self, id: &str) -> Result<&Audit, EnsGuardError> {
        self.get(id)
            .ok_or_else(|| EnsGuardError::UnknownAudit(id.to_owned()))
    }

    pub fn active_count(&self) -> usize {
        self.audits
            .iter()
            .filter(|audit| audit.status == AuditStatus::InProgress)
            .count()
    }

    /// Case-insensitive text over name or organization, ANDed with an
    /// optional status. Registry order is preserved.
    pub fn filter(&self, text: Option<&str>, status: Option<AuditStatus>) -> Vec<&Audit> {
        let needle = text.map(str::to_lowercase).unwrap_or_default();
        self.audits
            .iter()
            .filter(|audit| {
                needle.is_empty()
                    || audit.name.to_lowercase().contains(&needle)
                    || audit.organization.to_lowercase().contains(&needle)
            })
            .filter(|audit| status.is_none_or(|s| audit.status == s))
            .collect()
    }

    pub fn summaries<'a>(
        audits: &[&'a Audit],
        catalog: &Catalog,
        store: &AssessmentStore,
    ) -> Vec<AuditSummary<'a>> {
        audits
            .iter()
            .map(|audit| AuditSummary {
                audit,
                completion_percentage: audit.completion_percentage(catalog, store),
            })
            .collect()
    }
}

/// Parses the audit status filter, honoring the "all" sentinel
pub fn parse_status_filter(s: Option<&str>) -> Result<Option<AuditStatus>, EnsGuardError> {
    match s.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) if s.eq_ignore_ascii_case("all") => Ok(None),
        Some(s) => s.parse().map(Some),
    }
}
