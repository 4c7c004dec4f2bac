use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ItemId, ModuleId, UnitId};
use crate::model::quiz::QuizQuestion;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModelError {
    #[error("module title cannot be empty")]
    EmptyTitle,

    #[error("unit {0} appears more than once in the module")]
    DuplicateUnit(UnitId),

    #[error("item {0} appears more than once in the module")]
    DuplicateItem(ItemId),
}

//
// ─── ITEM KIND ─────────────────────────────────────────────────────────────────
//

/// The kind of learning artifact an item represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Reading,
    Article,
    Video,
    Quiz,
    Lab,
}

impl ItemKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Reading => "reading",
            ItemKind::Article => "article",
            ItemKind::Video => "video",
            ItemKind::Quiz => "quiz",
            ItemKind::Lab => "lab",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── ITEM ──────────────────────────────────────────────────────────────────────
//

/// A single learning artifact inside a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "_id", alias = "id")]
    id: ItemId,
    title: String,
    #[serde(rename = "type")]
    kind: ItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration: Option<String>,
    #[serde(rename = "videoUrl", default, skip_serializing_if = "Option::is_none")]
    video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    questions: Vec<QuizQuestion>,
}

impl Item {
    #[must_use]
    pub fn new(id: ItemId, title: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            id,
            title: title.into(),
            kind,
            content: None,
            duration: None,
            video_url: None,
            questions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Attach a free-form duration label such as `"10 min"`.
    #[must_use]
    pub fn with_duration(mut self, duration: impl Into<String>) -> Self {
        self.duration = Some(duration.into());
        self
    }

    #[must_use]
    pub fn with_video_url(mut self, url: impl Into<String>) -> Self {
        self.video_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_questions(mut self, questions: Vec<QuizQuestion>) -> Self {
        self.questions = questions;
        self
    }

    #[must_use]
    pub fn id(&self) -> &ItemId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    #[must_use]
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    #[must_use]
    pub fn duration(&self) -> Option<&str> {
        self.duration.as_deref()
    }

    /// Embeddable video source; video items without one show a placeholder.
    #[must_use]
    pub fn video_url(&self) -> Option<&str> {
        self.video_url.as_deref()
    }

    #[must_use]
    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    /// True when the item is a quiz with at least one question to grade.
    #[must_use]
    pub fn is_gradable_quiz(&self) -> bool {
        self.kind == ItemKind::Quiz && !self.questions.is_empty()
    }
}

//
// ─── UNIT ──────────────────────────────────────────────────────────────────────
//

/// A named group of items (also shown as a "week").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    #[serde(rename = "_id", alias = "id")]
    id: UnitId,
    title: String,
    #[serde(default)]
    items: Vec<Item>,
}

impl Unit {
    #[must_use]
    pub fn new(id: UnitId, title: impl Into<String>, items: Vec<Item>) -> Self {
        Self {
            id,
            title: title.into(),
            items,
        }
    }

    #[must_use]
    pub fn id(&self) -> &UnitId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn item_index(&self, id: &ItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    #[must_use]
    pub fn find_item(&self, id: &ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id() == id)
    }
}

//
// ─── MODULE ────────────────────────────────────────────────────────────────────
//

/// A course: an ordered list of units, each with an ordered list of items.
///
/// Order is the stored order and is never re-sorted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    #[serde(rename = "_id", alias = "id")]
    id: ModuleId,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    units: Vec<Unit>,
}

impl Module {
    /// Creates a module and validates its structure.
    ///
    /// # Errors
    ///
    /// Returns `ModelError` if the title is blank or a unit/item id repeats.
    pub fn new(
        id: ModuleId,
        title: impl Into<String>,
        description: impl Into<String>,
        units: Vec<Unit>,
    ) -> Result<Self, ModelError> {
        let module = Self {
            id,
            title: title.into(),
            description: description.into(),
            units,
        };
        module.validate()?;
        Ok(module)
    }

    /// Check structural invariants of a module received from elsewhere.
    ///
    /// # Errors
    ///
    /// Returns `ModelError` if the title is blank or a unit/item id repeats.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.title.trim().is_empty() {
            return Err(ModelError::EmptyTitle);
        }

        let mut unit_ids = HashSet::new();
        let mut item_ids = HashSet::new();
        for unit in &self.units {
            if !unit_ids.insert(unit.id()) {
                return Err(ModelError::DuplicateUnit(unit.id().clone()));
            }
            for item in unit.items() {
                if !item_ids.insert(item.id()) {
                    return Err(ModelError::DuplicateItem(item.id().clone()));
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    #[must_use]
    pub fn unit_index(&self, id: &UnitId) -> Option<usize> {
        self.units.iter().position(|unit| unit.id() == id)
    }

    #[must_use]
    pub fn find_unit(&self, id: &UnitId) -> Option<&Unit> {
        self.units.iter().find(|unit| unit.id() == id)
    }

    /// Look up a unit and one of its items together.
    #[must_use]
    pub fn locate(&self, unit_id: &UnitId, item_id: &ItemId) -> Option<(&Unit, &Item)> {
        let unit = self.find_unit(unit_id)?;
        let item = unit.find_item(item_id)?;
        Some((unit, item))
    }

    /// Total number of items across every unit.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.units.iter().map(|unit| unit.items().len()).sum()
    }

    /// Items in navigation order, paired with their unit.
    pub fn items(&self) -> impl Iterator<Item = (&Unit, &Item)> {
        self.units
            .iter()
            .flat_map(|unit| unit.items().iter().map(move |item| (unit, item)))
    }

    #[must_use]
    pub fn contains_item(&self, id: &ItemId) -> bool {
        self.items().any(|(_, item)| item.id() == id)
    }
}
