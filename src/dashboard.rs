use serde::{Deserialize, Serialize};

use crate::assessments::AssessmentStore;
use crate::audits::AuditRegistry;
use crate::catalog::Catalog;
use crate::stats::{compute_stats, ComplianceStats};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthBand {
    Good,
    Warning,
    Critical,
}

impl HealthBand {
    pub fn for_percentage(percentage: u32) -> Self {
        match percentage {
            80.. => HealthBand::Good,
            60..=79 => HealthBand::Warning,
            _ => HealthBand::Critical,
        }
    }
}

/// Headline figures for the dashboard landing view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub stats: ComplianceStats,
    pub health: HealthBand,
    pub evaluated: usize,
    pub needs_attention: usize,
    pub pending: usize,
    pub active_audits: usize,
}

impl DashboardSummary {
    pub fn compute(catalog: &Catalog, store: &AssessmentStore, audits: &AuditRegistry) -> Self {
        let stats = compute_stats(catalog, store);
        DashboardSummary {
            health: HealthBand::for_percentage(stats.percentage),
            evaluated: stats.evaluated(),
            needs_attention: stats.needs_attention(),
            pending: stats.pending,
            active_audits: audits.active_count(),
            stats,
        }
    }
}
