//! Completion percentages derived from a module's structure and a `CompletionSet`.
//!
//! Everything here is a pure function of its inputs and is safe to call on
//! every render.

use crate::model::{CompletionSet, Module, Unit};

/// Integer percentage of `completed` out of `total`, rounded half up.
///
/// Returns `0` when `total` is zero and never exceeds `100`.
#[must_use]
pub fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total) as u128;
    let total = total as u128;
    let rounded = (200 * completed + total) / (2 * total);
    u8::try_from(rounded).map_or(100, |value| value.min(100))
}

/// Number of items directly in `unit` present in `completions`.
#[must_use]
pub fn completed_in_unit(unit: &Unit, completions: &CompletionSet) -> usize {
    unit.items()
        .iter()
        .filter(|item| completions.contains(item.id()))
        .count()
}

/// Number of items across all units of `module` present in `completions`.
#[must_use]
pub fn completed_in_module(module: &Module, completions: &CompletionSet) -> usize {
    module
        .units()
        .iter()
        .map(|unit| completed_in_unit(unit, completions))
        .sum()
}

#[must_use]
pub fn unit_percentage(unit: &Unit, completions: &CompletionSet) -> u8 {
    percent(completed_in_unit(unit, completions), unit.items().len())
}

#[must_use]
pub fn module_percentage(module: &Module, completions: &CompletionSet) -> u8 {
    percent(completed_in_module(module, completions), module.item_count())
}

/// Aggregated view of a module's completion, useful for dashboards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleProgress {
    pub total: usize,
    pub completed: usize,
    pub remaining: usize,
    pub percentage: u8,
    pub is_complete: bool,
}

impl ModuleProgress {
    #[must_use]
    pub fn compute(module: &Module, completions: &CompletionSet) -> Self {
        let total = module.item_count();
        let completed = completed_in_module(module, completions);
        Self {
            total,
            completed,
            remaining: total.saturating_sub(completed),
            percentage: percent(completed, total),
            is_complete: total > 0 && completed == total,
        }
    }
}

/// Cross-module summary shown on a learner dashboard.
///
/// A module counts as started above 0% and as completed at 100%, using the
/// same rounded percentage the module page displays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LearnerStats {
    pub started_modules: usize,
    pub completed_modules: usize,
    /// Every completed item id, including ids outside `modules`.
    pub completed_lessons: usize,
}

impl LearnerStats {
    #[must_use]
    pub fn compute(modules: &[Module], completions: &CompletionSet) -> Self {
        let mut stats = Self {
            completed_lessons: completions.len(),
            ..Self::default()
        };
        for module in modules {
            let pct = module_percentage(module, completions);
            if pct > 0 {
                stats.started_modules += 1;
            }
            if pct == 100 {
                stats.completed_modules += 1;
            }
        }
        stats
    }
}

/// Modules that are started but not finished, in the given order, with their
/// percentage. At most `limit` entries are returned.
#[must_use]
pub fn in_progress<'a>(
    modules: &'a [Module],
    completions: &CompletionSet,
    limit: usize,
) -> Vec<(&'a Module, u8)> {
    modules
        .iter()
        .map(|module| (module, module_percentage(module, completions)))
        .filter(|&(_, pct)| pct > 0 && pct < 100)
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Item, ItemId, ItemKind, ModuleId, UnitId};
    use proptest::prelude::*;

    fn module(shape: &[usize]) -> Module {
        let units = shape
            .iter()
            .enumerate()
            .map(|(u, &count)| {
                let items = (0..count)
                    .map(|i| Item::new(ItemId::new(format!("u{u}-i{i}")), "Lesson", ItemKind::Video))
                    .collect();
                Unit::new(UnitId::new(format!("u{u}")), format!("Unit {u}"), items)
            })
            .collect();
        Module::new(ModuleId::new("m"), "Module", "", units).unwrap()
    }

    fn all_ids(module: &Module) -> Vec<ItemId> {
        module.items().map(|(_, item)| item.id().clone()).collect()
    }

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(1, 8), 13);
        assert_eq!(percent(1, 200), 1);
        assert_eq!(percent(0, 5), 0);
        assert_eq!(percent(5, 5), 100);
    }

    #[test]
    fn percent_with_zero_total_is_zero() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(4, 0), 0);
    }

    #[test]
    fn percent_clamps_overcount() {
        assert_eq!(percent(9, 3), 100);
    }

    #[test]
    fn intro_basics_scenario() {
        let intro = Unit::new(
            UnitId::new("Intro"),
            "Intro",
            vec![
                Item::new(ItemId::new("Welcome"), "Welcome", ItemKind::Video),
                Item::new(ItemId::new("Setup"), "Setup", ItemKind::Reading),
            ],
        );
        let basics = Unit::new(
            UnitId::new("Basics"),
            "Basics",
            vec![Item::new(ItemId::new("Lesson1"), "Lesson 1", ItemKind::Article)],
        );
        let module = Module::new(ModuleId::new("m"), "Course", "", vec![intro, basics]).unwrap();
        let completions: CompletionSet = [ItemId::new("Welcome")].into_iter().collect();

        assert_eq!(module_percentage(&module, &completions), 33);
        assert_eq!(unit_percentage(&module.units()[0], &completions), 50);
        assert_eq!(unit_percentage(&module.units()[1], &completions), 0);
    }

    #[test]
    fn empty_unit_reports_zero() {
        let module = module(&[0, 2]);
        let completions: CompletionSet = all_ids(&module).into_iter().collect();
        assert_eq!(unit_percentage(&module.units()[0], &completions), 0);
        assert_eq!(module_percentage(&module, &completions), 100);
    }

    #[test]
    fn ids_outside_the_module_are_ignored() {
        let module = module(&[2]);
        let completions: CompletionSet = [ItemId::new("elsewhere"), ItemId::new("u0-i0")]
            .into_iter()
            .collect();
        assert_eq!(completed_in_module(&module, &completions), 1);
        assert_eq!(module_percentage(&module, &completions), 50);
    }

    #[test]
    fn module_progress_view() {
        let module = module(&[2, 2]);
        let completions: CompletionSet = [ItemId::new("u0-i0")].into_iter().collect();
        let progress = ModuleProgress::compute(&module, &completions);
        assert_eq!(
            progress,
            ModuleProgress {
                total: 4,
                completed: 1,
                remaining: 3,
                percentage: 25,
                is_complete: false,
            }
        );

        let empty = ModuleProgress::compute(&self::module(&[]), &CompletionSet::new());
        assert_eq!(empty.percentage, 0);
        assert!(!empty.is_complete);
    }

    fn named(id: &str, items: &[&str]) -> Module {
        let items = items
            .iter()
            .map(|item| Item::new(ItemId::new(*item), "Lesson", ItemKind::Reading))
            .collect();
        Module::new(
            ModuleId::new(id),
            format!("Module {id}"),
            "",
            vec![Unit::new(UnitId::new(format!("{id}-u")), "Week 1", items)],
        )
        .unwrap()
    }

    fn dashboard() -> Vec<Module> {
        vec![
            named("untouched", &["a1", "a2"]),
            named("half", &["b1", "b2"]),
            named("done", &["c1"]),
            named("empty", &[]),
            named("third", &["d1", "d2", "d3"]),
        ]
    }

    #[test]
    fn learner_stats_counts_started_and_completed_modules() {
        let modules = dashboard();
        let completions: CompletionSet = ["b1", "c1", "d1", "stray"]
            .into_iter()
            .map(ItemId::new)
            .collect();

        let stats = LearnerStats::compute(&modules, &completions);
        assert_eq!(
            stats,
            LearnerStats {
                started_modules: 3,
                completed_modules: 1,
                completed_lessons: 4,
            }
        );
    }

    #[test]
    fn learner_stats_without_progress_is_zero() {
        let stats = LearnerStats::compute(&dashboard(), &CompletionSet::new());
        assert_eq!(stats, LearnerStats::default());
        assert_eq!(LearnerStats::compute(&[], &CompletionSet::new()), LearnerStats::default());
    }

    #[test]
    fn in_progress_excludes_untouched_and_finished_modules() {
        let modules = dashboard();
        let completions: CompletionSet = ["b1", "c1", "d1"].into_iter().map(ItemId::new).collect();

        let listed: Vec<(&str, u8)> = in_progress(&modules, &completions, 3)
            .into_iter()
            .map(|(module, pct)| (module.id().as_str(), pct))
            .collect();
        assert_eq!(listed, vec![("half", 50), ("third", 33)]);

        let first = in_progress(&modules, &completions, 1);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].0.id().as_str(), "half");
        assert!(in_progress(&modules, &completions, 0).is_empty());
    }

    fn arb_shape() -> impl Strategy<Value = Vec<usize>> {
        prop::collection::vec(0usize..6, 0..6)
    }

    proptest! {
        #[test]
        fn module_percentage_is_bounded(shape in arb_shape(), mask in prop::collection::vec(any::<bool>(), 36)) {
            let module = module(&shape);
            let completions: CompletionSet = all_ids(&module)
                .into_iter()
                .zip(mask.iter())
                .filter(|(_, keep)| **keep)
                .map(|(id, _)| id)
                .collect();
            let pct = module_percentage(&module, &completions);
            prop_assert!(pct <= 100);
        }

        #[test]
        fn empty_set_is_zero_and_full_set_is_hundred(shape in arb_shape()) {
            let module = module(&shape);
            prop_assume!(module.item_count() > 0);
            prop_assert_eq!(module_percentage(&module, &CompletionSet::new()), 0);
            let full: CompletionSet = all_ids(&module).into_iter().collect();
            prop_assert_eq!(module_percentage(&module, &full), 100);
        }

        #[test]
        fn insertion_order_does_not_matter(shape in arb_shape(), take in 0usize..36) {
            let module = module(&shape);
            let ids: Vec<ItemId> = all_ids(&module).into_iter().take(take).collect();
            let forward: CompletionSet = ids.iter().cloned().collect();
            let backward: CompletionSet = ids.iter().rev().cloned().collect();
            prop_assert_eq!(
                module_percentage(&module, &forward),
                module_percentage(&module, &backward)
            );
        }
    }
}
