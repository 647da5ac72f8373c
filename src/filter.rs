use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::assessments::AssessmentStore;
use crate::catalog::{Catalog, CategoryId, Measure};
use crate::error::EnsGuardError;
use crate::status::ComplianceStatus;

const ALL: &str = "all";

/// Category predicate; `All` is the "all" sentinel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Id(CategoryId),
}

impl CategoryFilter {
    fn matches(&self, measure: &Measure) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Id(id) => measure.category_id == *id,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = EnsGuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case(ALL) {
            return Ok(CategoryFilter::All);
        }
        s.parse::<CategoryId>()
            .map(CategoryFilter::Id)
            .map_err(|_| EnsGuardError::InvalidFilter(format!("category '{}' is not an id", s)))
    }
}

/// Status predicate; `All` is the "all" sentinel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Status(ComplianceStatus),
}

impl StatusFilter {
    fn matches(&self, store: &AssessmentStore, measure: &Measure) -> bool {
        match self {
            StatusFilter::All => true,
            // Absent assessments match the pending filter
            StatusFilter::Status(status) => store.effective_status(&measure.id) == *status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = EnsGuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case(ALL) {
            return Ok(StatusFilter::All);
        }
        Ok(StatusFilter::Status(s.parse()?))
    }
}

/// Which measure fields free text is matched against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextScope {
    /// Name or code (audit detail view)
    #[default]
    NameCode,
    /// Name, code or description (measures page)
    All,
}

impl FromStr for TextScope {
    type Err = EnsGuardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "" | "name_code" => Ok(TextScope::NameCode),
            "all" => Ok(TextScope::All),
            other => Err(EnsGuardError::InvalidFilter(format!(
                "unknown text scope '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeasureQuery {
    pub text: Option<String>,
    pub category: CategoryFilter,
    pub status: StatusFilter,
    pub scope: TextScope,
}

impl MeasureQuery {
    /// Builds a query from the loose string parameters used by the CLI and
    /// the HTTP API. Missing values mean "all".
    pub fn parse(
        text: Option<&str>,
        category: Option<&str>,
        status: Option<&str>,
        scope: Option<&str>,
    ) -> Result<Self, EnsGuardError> {
        Ok(MeasureQuery {
            text: text.map(str::to_owned),
            category: category.map(str::parse).transpose()?.unwrap_or_default(),
            status: status.map(str::parse).transpose()?.unwrap_or_default(),
            scope: scope.map(str::parse).transpose()?.unwrap_or_default(),
        })
    }

    pub fn matches(&self, store: &AssessmentStore, measure: &Measure) -> bool {
        self.matches_text(measure)
            && self.category.matches(measure)
            && self.status.matches(store, measure)
    }

    fn matches_text(&self, measure: &Measure) -> bool {
        let needle = match self.text.as_deref() {
            None | Some("") => return true,
            Some(text) => text.to_lowercase(),
        };

        let contains = |haystack: &str| haystack.to_lowercase().contains(&needle);

        contains(&measure.name)
            || contains(&measure.code)
            || (self.scope == TextScope::All && contains(&measure.description))
    }
}

/// Measures matching every predicate of `query`, in catalog order
pub fn filter<'a>(
    catalog: &'a Catalog,
    store: &AssessmentStore,
    query: &MeasureQuery,
) -> Vec<&'a Measure> {
    catalog
        .measures()
        .iter()
        .filter(|measure| query.matches(store, measure))
        .collect()
}
