use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};

use crate::assessments::AssessmentStore;
use crate::audits::{Audit, AuditRegistry};
use crate::catalog::{Catalog, CategoryId, SecurityLevel};
use crate::dashboard::DashboardSummary;
use crate::error::EnsGuardError;
use crate::stats::{compute_all_rollups, CategoryRollup};
use crate::status::ComplianceStatus;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    #[default]
    Compliance,
    Detailed,
    Executive,
    ActionPlan,
}

impl ReportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::Compliance => "compliance",
            ReportKind::Detailed => "detailed",
            ReportKind::Executive => "executive",
            ReportKind::ActionPlan => "action_plan",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReportKind::Compliance => "Informe de Cumplimiento",
            ReportKind::Detailed => "Informe Detallado",
            ReportKind::Executive => "Resumen Ejecutivo",
            ReportKind::ActionPlan => "Plan de Acción",
        }
    }
}

/// Selectable report sections, in the order they appear in a report
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum ReportSection {
    ExecutiveSummary,
    ComplianceOverview,
    DetailedMeasures,
    Recommendations,
    Appendices,
}

impl ReportSection {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportSection::ExecutiveSummary => "executive_summary",
            ReportSection::ComplianceOverview => "compliance_overview",
            ReportSection::DetailedMeasures => "detailed_measures",
            ReportSection::Recommendations => "recommendations",
            ReportSection::Appendices => "appendices",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReportSection::ExecutiveSummary => "Resumen Ejecutivo",
            ReportSection::ComplianceOverview => "Estado de Cumplimiento",
            ReportSection::DetailedMeasures => "Medidas Detalladas",
            ReportSection::Recommendations => "Recomendaciones",
            ReportSection::Appendices => "Anexos",
        }
    }

    /// Everything except the appendices
    pub fn default_selection() -> Vec<ReportSection> {
        ReportSection::iter()
            .filter(|section| *section != ReportSection::Appendices)
            .collect()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize, EnumIter)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Pdf,
    Docx,
    Html,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Pdf => "pdf",
            ReportFormat::Docx => "docx",
            ReportFormat::Html => "html",
        }
    }
}

fn parse_variant<T: Copy>(
    s: &str,
    what: &str,
    variants: impl Iterator<Item = T>,
    as_str: fn(&T) -> &'static str,
) -> Result<T, EnsGuardError> {
    let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
    variants
        .into_iter()
        .find(|variant| as_str(variant) == normalized)
        .ok_or_else(|| EnsGuardError::InvalidFilter(format!("unknown report {} '{}'", what, s)))
}

impl FromStr for ReportKind {
    type Err = EnsGuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(s, "kind", ReportKind::iter(), ReportKind::as_str)
    }
}

impl FromStr for ReportSection {
    type Err = EnsGuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(s, "section", ReportSection::iter(), ReportSection::as_str)
    }
}

impl FromStr for ReportFormat {
    type Err = EnsGuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_variant(s, "format", ReportFormat::iter(), ReportFormat::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub audit_id: String,
    #[serde(default)]
    pub kind: ReportKind,
    #[serde(default = "ReportSection::default_selection")]
    pub sections: Vec<ReportSection>,
    #[serde(default)]
    pub format: ReportFormat,
}

impl ReportRequest {
    pub fn new(audit_id: &str) -> Self {
        ReportRequest {
            audit_id: audit_id.to_owned(),
            kind: ReportKind::default(),
            sections: ReportSection::default_selection(),
            format: ReportFormat::default(),
        }
    }

    /// Checks the request against the known audits and returns the audit it
    /// targets
    pub fn validate<'a>(&self, audits: &'a AuditRegistry) -> Result<&'a Audit, EnsGuardError> {
        let audit = audits.require(&self.audit_id)?;
        if self.sections.is_empty() {
            return Err(EnsGuardError::NoSectionsSelected);
        }
        Ok(audit)
    }

    /// Selected sections in report order, without duplicates
    pub fn ordered_sections(&self) -> Vec<ReportSection> {
        let mut sections = self.sections.clone();
        sections.sort();
        sections.dedup();
        sections
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureLine {
    pub measure_id: String,
    pub code: String,
    pub name: String,
    pub category_id: CategoryId,
    pub status: ComplianceStatus,
    pub status_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub measure_id: String,
    pub code: String,
    pub name: String,
    pub status: ComplianceStatus,
    /// Requirement text at the audit's security level
    pub requirement: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guide_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceEntry {
    pub measure_id: String,
    pub code: String,
    pub evidence: Vec<String>,
}

/// Content of one generated section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "section", rename_all = "snake_case")]
pub enum ReportContent {
    ExecutiveSummary { summary: DashboardSummary },
    ComplianceOverview { rollups: Vec<CategoryRollup> },
    DetailedMeasures { measures: Vec<MeasureLine> },
    Recommendations { items: Vec<Recommendation> },
    Appendices { evidence: Vec<EvidenceEntry> },
}

/// A generated report. Structured data only; rendering to the requested
/// format is left to the consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub title: String,
    pub audit_id: String,
    pub audit_name: String,
    pub organization: String,
    pub level: SecurityLevel,
    pub kind: ReportKind,
    pub format: ReportFormat,
    pub generated_at: DateTime<Utc>,
    pub sections: Vec<ReportContent>,
}

impl Report {
    pub fn new(audit: &Audit, kind: ReportKind, format: ReportFormat) -> Self {
        Report {
            title: format!("{} - {}", kind.label(), audit.name),
            audit_id: audit.id.clone(),
            audit_name: audit.name.clone(),
            organization: audit.organization.clone(),
            level: audit.level,
            kind,
            format,
            generated_at: Utc::now(),
            sections: Vec::new(),
        }
    }
}

/// Builds the content for one section from the current catalog and
/// assessments
pub fn build_section(
    section: ReportSection,
    audit: &Audit,
    catalog: &Catalog,
    store: &AssessmentStore,
    audits: &AuditRegistry,
) -> ReportContent {
    match section {
        ReportSection::ExecutiveSummary => ReportContent::ExecutiveSummary {
            summary: DashboardSummary::compute(catalog, store, audits),
        },
        ReportSection::ComplianceOverview => ReportContent::ComplianceOverview {
            rollups: compute_all_rollups(catalog, store),
        },
        ReportSection::DetailedMeasures => ReportContent::DetailedMeasures {
            measures: detailed_measures(catalog, store),
        },
        ReportSection::Recommendations => ReportContent::Recommendations {
            items: recommendations(audit.level, catalog, store),
        },
        ReportSection::Appendices => ReportContent::Appendices {
            evidence: evidence_appendix(catalog, store),
        },
    }
}

fn detailed_measures(catalog: &Catalog, store: &AssessmentStore) -> Vec<MeasureLine> {
    catalog
        .measures()
        .iter()
        .map(|measure| {
            let status = store.effective_status(&measure.id);
            let assessment = store.get(&measure.id).ok().flatten();
            MeasureLine {
                measure_id: measure.id.clone(),
                code: measure.code.clone(),
                name: measure.name.clone(),
                category_id: measure.category_id,
                status,
                status_label: status.label().to_owned(),
                notes: assessment.and_then(|a| a.notes.clone()),
                reviewer: assessment.and_then(|a| a.reviewer.clone()),
            }
        })
        .collect()
}

const RECOMMENDATION_PRIORITY: [ComplianceStatus; 3] = [
    ComplianceStatus::NonCompliant,
    ComplianceStatus::Partial,
    ComplianceStatus::Pending,
];

/// Non-compliant first, then partial, then pending; catalog order within
/// each group
pub fn recommendations(
    level: SecurityLevel,
    catalog: &Catalog,
    store: &AssessmentStore,
) -> Vec<Recommendation> {
    RECOMMENDATION_PRIORITY
        .iter()
        .flat_map(|wanted| {
            catalog
                .measures()
                .iter()
                .filter(move |measure| store.effective_status(&measure.id) == *wanted)
                .map(move |measure| Recommendation {
                    measure_id: measure.id.clone(),
                    code: measure.code.clone(),
                    name: measure.name.clone(),
                    status: *wanted,
                    requirement: measure.requirement(level).to_owned(),
                    guide_link: measure.guide_link.clone(),
                })
        })
        .collect()
}

fn evidence_appendix(catalog: &Catalog, store: &AssessmentStore) -> Vec<EvidenceEntry> {
    catalog
        .measures()
        .iter()
        .filter_map(|measure| {
            let assessment = store.get(&measure.id).ok().flatten()?;
            if assessment.evidence.is_empty() {
                return None;
            }
            Some(EvidenceEntry {
                measure_id: measure.id.clone(),
                code: measure.code.clone(),
                evidence: assessment.evidence.clone(),
            })
        })
        .collect()
}
