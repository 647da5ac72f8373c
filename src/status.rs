use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};

use crate::error::EnsGuardError;

/// Outcome recorded for one measure.
///
/// A measure with no assessment at all is treated exactly like one whose
/// status is `Pending`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Compliant,
    Partial,
    NonCompliant,
    NotApplicable,
    #[default]
    Pending,
}

impl ComplianceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComplianceStatus::Compliant => "compliant",
            ComplianceStatus::Partial => "partial",
            ComplianceStatus::NonCompliant => "non_compliant",
            ComplianceStatus::NotApplicable => "not_applicable",
            ComplianceStatus::Pending => "pending",
        }
    }

    /// Label shown to users of the dashboard
    pub fn label(&self) -> &'static str {
        match self {
            ComplianceStatus::Compliant => "Cumple",
            ComplianceStatus::Partial => "Parcial",
            ComplianceStatus::NonCompliant => "No Cumple",
            ComplianceStatus::NotApplicable => "No Aplica",
            ComplianceStatus::Pending => "Pendiente",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        ComplianceStatus::iter().find(|status| status.as_str() == normalized)
    }

    /// True for statuses that count as an evaluation result (the
    /// "evaluated" figure on the dashboard).
    pub fn is_evaluated(&self) -> bool {
        matches!(
            self,
            ComplianceStatus::Compliant | ComplianceStatus::Partial | ComplianceStatus::NonCompliant
        )
    }

    pub fn needs_attention(&self) -> bool {
        matches!(self, ComplianceStatus::Partial | ComplianceStatus::NonCompliant)
    }
}

impl std::fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ComplianceStatus {
    type Err = EnsGuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s).ok_or_else(|| EnsGuardError::InvalidStatus(s.to_owned()))
    }
}
