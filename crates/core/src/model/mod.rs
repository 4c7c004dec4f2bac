mod course;
mod ids;
mod progress;
pub mod quiz;

pub use ids::{ItemId, ModuleId, ParseIdError, UnitId};

pub use course::{Item, ItemKind, ModelError, Module, Unit};
pub use progress::{CompletedItem, CompletionSet, ProgressSnapshot};
pub use quiz::{QUIZ_PASS_PERCENTAGE, QuizAnswers, QuizQuestion, QuizScore, grade_quiz};
