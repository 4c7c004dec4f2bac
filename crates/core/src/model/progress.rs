use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{ItemId, ModuleId, UnitId};

//
// ─── COMPLETION SET ────────────────────────────────────────────────────────────
//

/// Set of item ids the current learner has completed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionSet {
    items: HashSet<ItemId>,
}

impl CompletionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Membership test. `None` is never completed.
    #[must_use]
    pub fn contains<'a>(&self, id: impl Into<Option<&'a ItemId>>) -> bool {
        id.into().is_some_and(|id| self.items.contains(id))
    }

    /// Returns true if the id was not already present.
    pub fn insert(&mut self, id: ItemId) -> bool {
        self.items.insert(id)
    }

    /// Returns true if the id was present.
    pub fn remove(&mut self, id: &ItemId) -> bool {
        self.items.remove(id)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemId> {
        self.items.iter()
    }
}

impl FromIterator<ItemId> for CompletionSet {
    fn from_iter<T: IntoIterator<Item = ItemId>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl Extend<ItemId> for CompletionSet {
    fn extend<T: IntoIterator<Item = ItemId>>(&mut self, iter: T) {
        self.items.extend(iter);
    }
}

//
// ─── PROGRESS SNAPSHOT ─────────────────────────────────────────────────────────
//

/// One completed item as recorded by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedItem {
    pub item_id: ItemId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<UnitId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl CompletedItem {
    #[must_use]
    pub fn new(item_id: ItemId) -> Self {
        Self {
            item_id,
            unit_id: None,
            completed_at: None,
        }
    }
}

/// Backend record of a learner's progress in a single module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub module_id: ModuleId,
    #[serde(default)]
    pub completed_items: Vec<CompletedItem>,
}

impl ProgressSnapshot {
    #[must_use]
    pub fn new(module_id: ModuleId, completed_items: Vec<CompletedItem>) -> Self {
        Self {
            module_id,
            completed_items,
        }
    }

    /// Convenience constructor from bare item ids.
    #[must_use]
    pub fn from_item_ids(module_id: ModuleId, ids: impl IntoIterator<Item = ItemId>) -> Self {
        Self::new(module_id, ids.into_iter().map(CompletedItem::new).collect())
    }

    pub fn completed_item_ids(&self) -> impl Iterator<Item = &ItemId> {
        self.completed_items.iter().map(|entry| &entry.item_id)
    }
}
