use serde::{Deserialize, Serialize};

use crate::assessments::AssessmentStore;
use crate::catalog::{Catalog, CategoryCode, CategoryId};
use crate::status::ComplianceStatus;

/// Rounds `numerator / denominator * 100` half away from zero.
/// A zero denominator yields 0.
pub fn percent(numerator: usize, denominator: usize) -> u32 {
    if denominator == 0 {
        return 0;
    }
    let num = numerator as u64;
    let den = denominator as u64;
    ((num * 200 + den) / (den * 2)) as u32
}

/// Global compliance figures across the whole catalog
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceStats {
    pub total: usize,
    pub compliant: usize,
    pub partial: usize,
    pub non_compliant: usize,
    pub not_applicable: usize,
    /// Explicitly pending plus measures with no assessment at all
    pub pending: usize,
    pub percentage: u32,
}

impl ComplianceStats {
    pub fn evaluated(&self) -> usize {
        self.compliant + self.partial + self.non_compliant
    }

    pub fn needs_attention(&self) -> usize {
        self.partial + self.non_compliant
    }

    pub fn count_of(&self, status: ComplianceStatus) -> usize {
        match status {
            ComplianceStatus::Compliant => self.compliant,
            ComplianceStatus::Partial => self.partial,
            ComplianceStatus::NonCompliant => self.non_compliant,
            ComplianceStatus::NotApplicable => self.not_applicable,
            ComplianceStatus::Pending => self.pending,
        }
    }
}

pub fn compute_stats(catalog: &Catalog, store: &AssessmentStore) -> ComplianceStats {
    let total = catalog.measures().len();
    let mut stats = ComplianceStats {
        total,
        ..Default::default()
    };

    // Only catalog measures count; stray ids in an unvalidated store are ignored
    for measure in catalog.measures() {
        match store.effective_status(&measure.id) {
            ComplianceStatus::Compliant => stats.compliant += 1,
            ComplianceStatus::Partial => stats.partial += 1,
            ComplianceStatus::NonCompliant => stats.non_compliant += 1,
            ComplianceStatus::NotApplicable => stats.not_applicable += 1,
            ComplianceStatus::Pending => stats.pending += 1,
        }
    }

    stats.percentage = percent(stats.compliant, total - stats.not_applicable);

    stats
}

/// Per-category completion and compliance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRollup {
    pub category_id: CategoryId,
    pub code: Option<CategoryCode>,
    pub name: Option<String>,
    pub total_measures: usize,
    pub evaluated_measures: usize,
    pub compliant_measures: usize,
    pub completion_percentage: u32,
    pub compliance_percentage: u32,
}

/// Rollup for one category. An id with no measures (including one that is
/// not in the catalog) yields all-zero figures.
pub fn compute_category_rollup(
    catalog: &Catalog,
    store: &AssessmentStore,
    category_id: CategoryId,
) -> CategoryRollup {
    let mut total_measures = 0;
    let mut evaluated_measures = 0;
    let mut compliant_measures = 0;

    for measure in catalog.measures_in(category_id) {
        total_measures += 1;
        if store.contains(&measure.id) {
            evaluated_measures += 1;
        }
        if store.effective_status(&measure.id) == ComplianceStatus::Compliant {
            compliant_measures += 1;
        }
    }

    let category = catalog.category(category_id);

    CategoryRollup {
        category_id,
        code: category.map(|c| c.code),
        name: category.map(|c| c.name.clone()),
        total_measures,
        evaluated_measures,
        compliant_measures,
        completion_percentage: percent(evaluated_measures, total_measures),
        compliance_percentage: percent(compliant_measures, total_measures),
    }
}

/// One rollup per category, in catalog order
pub fn compute_all_rollups(catalog: &Catalog, store: &AssessmentStore) -> Vec<CategoryRollup> {
    catalog
        .categories()
        .iter()
        .map(|category| compute_category_rollup(catalog, store, category.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessments::AssessmentUpdate;
    use crate::catalog::tests::sample_catalog;
    use crate::catalog::{Category, Measure};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn assess(store: &mut AssessmentStore, id: &str, status: ComplianceStatus) {
        store.upsert(id, AssessmentUpdate::status(status)).unwrap();
    }

    fn catalog_of(size: usize, categories: u32) -> Catalog {
        let cats = (1..=categories)
            .zip([CategoryCode::Org, CategoryCode::Op, CategoryCode::Mp])
            .map(|(id, code)| Category {
                id,
                code,
                name: code.to_string(),
                description: String::new(),
            })
            .collect();
        let measures = (0..size)
            .map(|i| Measure {
                id: format!("m.{i}"),
                category_id: (i as u32 % categories) + 1,
                code: format!("m.{i}"),
                name: format!("Measure {i}"),
                description: String::new(),
                basic_requirement: String::new(),
                medium_requirement: String::new(),
                high_requirement: String::new(),
                guide_link: None,
            })
            .collect();
        Catalog::new(cats, measures).unwrap()
    }

    #[test]
    fn test_percent_rounding() {
        assert_eq!(percent(4, 9), 44);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(1, 2), 50);
        assert_eq!(percent(1, 8), 13); // 12.5 rounds away from zero
        assert_eq!(percent(3, 8), 38); // 37.5
        assert_eq!(percent(0, 5), 0);
        assert_eq!(percent(5, 5), 100);
        assert_eq!(percent(3, 0), 0);
    }

    #[test]
    fn test_stats_mixed_scenario() {
        let catalog = catalog_of(10, 3);
        let mut store = AssessmentStore::validated(&catalog);
        for i in 0..4 {
            assess(&mut store, &format!("m.{i}"), ComplianceStatus::Compliant);
        }
        assess(&mut store, "m.4", ComplianceStatus::Partial);
        assess(&mut store, "m.5", ComplianceStatus::Partial);
        assess(&mut store, "m.6", ComplianceStatus::NonCompliant);
        assess(&mut store, "m.7", ComplianceStatus::NotApplicable);

        let stats = compute_stats(&catalog, &store);
        assert_eq!(
            stats,
            ComplianceStats {
                total: 10,
                compliant: 4,
                partial: 2,
                non_compliant: 1,
                not_applicable: 1,
                pending: 2,
                percentage: 44,
            }
        );
        assert_eq!(stats.evaluated(), 7);
        assert_eq!(stats.needs_attention(), 3);
    }

    #[test]
    fn test_explicit_pending_counts_same_as_absent() {
        let catalog = sample_catalog();
        let mut store = AssessmentStore::new();
        assess(&mut store, "org.1", ComplianceStatus::Pending);

        let stats = compute_stats(&catalog, &store);
        assert_eq!(stats.pending, 4);
        assert_eq!(stats.count_of(ComplianceStatus::Pending), 4);
    }

    #[test]
    fn test_stats_all_not_applicable_is_zero_percent() {
        let catalog = sample_catalog();
        let mut store = AssessmentStore::new();
        for m in catalog.measures() {
            assess(&mut store, &m.id, ComplianceStatus::NotApplicable);
        }
        let stats = compute_stats(&catalog, &store);
        assert_eq!(stats.percentage, 0);
        assert_eq!(stats.pending, 0);
    }

    #[test]
    fn test_stats_ignore_ids_outside_catalog() {
        let catalog = catalog_of(4, 2);
        let mut store = AssessmentStore::new();
        for i in 0..6 {
            assess(&mut store, &format!("gone.{i}"), ComplianceStatus::Compliant);
        }
        assess(&mut store, "m.0", ComplianceStatus::Partial);

        let stats = compute_stats(&catalog, &store);
        assert_eq!(
            stats,
            ComplianceStats {
                total: 4,
                compliant: 0,
                partial: 1,
                non_compliant: 0,
                not_applicable: 0,
                pending: 3,
                percentage: 0,
            }
        );
    }

    #[test]
    fn test_stats_empty_catalog() {
        let catalog = Catalog::new(Vec::new(), Vec::new()).unwrap();
        let stats = compute_stats(&catalog, &AssessmentStore::new());
        assert_eq!(stats, ComplianceStats::default());
    }

    #[test]
    fn test_stats_demo_data() {
        let catalog = Catalog::builtin().unwrap();
        let store = AssessmentStore::demo(&catalog).unwrap();
        let stats = compute_stats(&catalog, &store);
        assert_eq!(stats.total, 10);
        assert_eq!(stats.compliant, 2);
        assert_eq!(stats.partial, 2);
        assert_eq!(stats.non_compliant, 1);
        assert_eq!(stats.pending, 5);
        assert_eq!(stats.percentage, 20);
    }

    #[test]
    fn test_category_rollup_one_of_three() {
        let catalog = sample_catalog();
        let mut store = AssessmentStore::validated(&catalog);
        assess(&mut store, "org.1", ComplianceStatus::Compliant);

        let rollup = compute_category_rollup(&catalog, &store, 1);
        assert_eq!(rollup.total_measures, 3);
        assert_eq!(rollup.evaluated_measures, 1);
        assert_eq!(rollup.compliant_measures, 1);
        assert_eq!(rollup.completion_percentage, 33);
        assert_eq!(rollup.compliance_percentage, 33);
        assert_eq!(rollup.code, Some(CategoryCode::Org));
    }

    #[test]
    fn test_category_rollup_counts_explicit_pending_as_evaluated() {
        let catalog = sample_catalog();
        let mut store = AssessmentStore::new();
        assess(&mut store, "org.1", ComplianceStatus::Pending);
        assess(&mut store, "org.2", ComplianceStatus::Partial);

        let rollup = compute_category_rollup(&catalog, &store, 1);
        assert_eq!(rollup.evaluated_measures, 2);
        assert_eq!(rollup.compliant_measures, 0);
        assert_eq!(rollup.completion_percentage, 67);
        assert_eq!(rollup.compliance_percentage, 0);
    }

    #[test]
    fn test_category_rollup_empty_and_unknown_category() {
        let catalog = sample_catalog();
        let store = AssessmentStore::new();

        let empty = compute_category_rollup(&catalog, &store, 3);
        assert_eq!(empty.total_measures, 0);
        assert_eq!(empty.completion_percentage, 0);
        assert_eq!(empty.compliance_percentage, 0);

        let unknown = compute_category_rollup(&catalog, &store, 99);
        assert_eq!(unknown.total_measures, 0);
        assert_eq!(unknown.code, None);
    }

    #[test]
    fn test_all_rollups_follow_catalog_order() {
        let catalog = Catalog::builtin().unwrap();
        let store = AssessmentStore::demo(&catalog).unwrap();
        let rollups = compute_all_rollups(&catalog, &store);

        let ids: Vec<CategoryId> = rollups.iter().map(|r| r.category_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        // org: 3 of 4 evaluated, 1 compliant
        assert_eq!(rollups[0].completion_percentage, 75);
        assert_eq!(rollups[0].compliance_percentage, 25);
        // op: 1 of 3 evaluated and compliant
        assert_eq!(rollups[1].completion_percentage, 33);
        assert_eq!(rollups[1].compliance_percentage, 33);
        // mp: 1 of 3 evaluated, none compliant
        assert_eq!(rollups[2].completion_percentage, 33);
        assert_eq!(rollups[2].compliance_percentage, 0);
    }

    fn status_strategy() -> impl Strategy<Value = ComplianceStatus> {
        prop_oneof![
            Just(ComplianceStatus::Compliant),
            Just(ComplianceStatus::Partial),
            Just(ComplianceStatus::NonCompliant),
            Just(ComplianceStatus::NotApplicable),
            Just(ComplianceStatus::Pending),
        ]
    }

    proptest! {
        #[test]
        fn prop_counts_sum_to_total(
            statuses in prop::collection::vec(prop::option::of(status_strategy()), 0..40),
            strays in prop::collection::vec(status_strategy(), 0..10)
        ) {
            let catalog = catalog_of(statuses.len(), 3);
            let mut store = AssessmentStore::new();
            for (i, status) in statuses.iter().enumerate() {
                if let Some(status) = status {
                    assess(&mut store, &format!("m.{i}"), *status);
                }
            }
            for (i, status) in strays.iter().enumerate() {
                assess(&mut store, &format!("gone.{i}"), *status);
            }

            let stats = compute_stats(&catalog, &store);
            prop_assert_eq!(
                stats.compliant + stats.partial + stats.non_compliant
                    + stats.not_applicable + stats.pending,
                stats.total
            );
            prop_assert!(stats.percentage <= 100);

            for rollup in compute_all_rollups(&catalog, &store) {
                prop_assert!(rollup.completion_percentage <= 100);
                prop_assert!(rollup.compliance_percentage <= 100);
                prop_assert!(rollup.compliant_measures <= rollup.evaluated_measures);
                prop_assert!(rollup.evaluated_measures <= rollup.total_measures);
            }
        }

        #[test]
        fn prop_percent_in_bounds(den in 0usize..500, num_frac in 0.0f64..=1.0) {
            let num = (den as f64 * num_frac) as usize;
            prop_assert!(percent(num, den) <= 100);
        }
    }
}
