//! Linear lesson navigation across a module's units.
//!
//! Sequence order is the stored order of units and items. Units without items
//! are never landing targets; navigation scans past them.

use serde::{Deserialize, Serialize};

use crate::model::{CompletionSet, Item, ItemId, Module, Unit, UnitId};

/// Where the learner currently is inside a module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub unit_id: UnitId,
    pub item_id: ItemId,
}

impl Position {
    #[must_use]
    pub fn new(unit_id: UnitId, item_id: ItemId) -> Self {
        Self { unit_id, item_id }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// A resolved landing target, borrowed from the module.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavTarget<'a> {
    pub unit: &'a Unit,
    pub item: &'a Item,
}

impl NavTarget<'_> {
    /// Owned position to hand to a router.
    #[must_use]
    pub fn position(&self) -> Position {
        Position::new(self.unit.id().clone(), self.item.id().clone())
    }
}

/// Where a "Continue Learning" entry point should send the learner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContinueTarget<'a> {
    /// First item not yet completed.
    Resume(NavTarget<'a>),
    /// Everything is complete; start over from the first item.
    Review(NavTarget<'a>),
    /// The module has no items at all; show its overview page.
    Overview,
}

impl<'a> ContinueTarget<'a> {
    #[must_use]
    pub fn target(&self) -> Option<NavTarget<'a>> {
        match self {
            ContinueTarget::Resume(target) | ContinueTarget::Review(target) => Some(*target),
            ContinueTarget::Overview => None,
        }
    }
}

/// Find the item adjacent to `position` in `direction`.
///
/// Returns `None` at the start/end of the module or when the unit or item
/// cannot be found.
#[must_use]
pub fn resolve<'a>(
    module: &'a Module,
    position: &Position,
    direction: Direction,
) -> Option<NavTarget<'a>> {
    let units = module.units();
    let unit_index = module.unit_index(&position.unit_id)?;
    let unit = units.get(unit_index)?;
    let item_index = unit.item_index(&position.item_id)?;

    match direction {
        Direction::Next => {
            if let Some(item) = unit.items().get(item_index + 1) {
                return Some(NavTarget { unit, item });
            }
            units
                .iter()
                .skip(unit_index + 1)
                .find_map(|next| next.items().first().map(|item| NavTarget { unit: next, item }))
        }
        Direction::Previous => {
            if let Some(item) = item_index.checked_sub(1).and_then(|i| unit.items().get(i)) {
                return Some(NavTarget { unit, item });
            }
            units
                .iter()
                .take(unit_index)
                .rev()
                .find_map(|prev| prev.items().last().map(|item| NavTarget { unit: prev, item }))
        }
    }
}

#[must_use]
pub fn resolve_next<'a>(module: &'a Module, position: &Position) -> Option<NavTarget<'a>> {
    resolve(module, position, Direction::Next)
}

#[must_use]
pub fn resolve_previous<'a>(module: &'a Module, position: &Position) -> Option<NavTarget<'a>> {
    resolve(module, position, Direction::Previous)
}

#[must_use]
pub fn first_item(module: &Module) -> Option<NavTarget<'_>> {
    module.items().next().map(|(unit, item)| NavTarget { unit, item })
}

#[must_use]
pub fn last_item(module: &Module) -> Option<NavTarget<'_>> {
    module
        .units()
        .iter()
        .rev()
        .find_map(|unit| unit.items().last().map(|item| NavTarget { unit, item }))
}

/// First item, in order, whose id is absent from `completions`.
///
/// Falls back to the first item for review when everything is complete, or
/// to the overview when the module is empty.
#[must_use]
pub fn first_incomplete<'a>(module: &'a Module, completions: &CompletionSet) -> ContinueTarget<'a> {
    if let Some((unit, item)) = module
        .items()
        .find(|(_, item)| !completions.contains(item.id()))
    {
        return ContinueTarget::Resume(NavTarget { unit, item });
    }
    first_item(module).map_or(ContinueTarget::Overview, ContinueTarget::Review)
}
