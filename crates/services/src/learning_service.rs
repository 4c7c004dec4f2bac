use learn_core::model::{Module, QuizAnswers, QuizScore, grade_quiz};
use learn_core::sequence::{self, ContinueTarget, Position};
use tracing::debug;

use crate::error::LearningError;
use crate::progress_store::{MarkOutcome, ProgressStore};

/// What happened to the item the learner just finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    /// Already complete; the backend was not called.
    AlreadyCompleted,
    Marked(MarkOutcome),
}

/// Result of finishing the current lesson.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The position does not exist in this module; nothing was recorded.
    NotInModule,
    /// The item was handled; `next` is `None` at the end of the module.
    Advanced {
        status: CompletionStatus,
        next: Option<Position>,
    },
}

/// Result of grading a quiz item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSubmission {
    pub score: QuizScore,
    /// Present only when the quiz was passed and the item was marked complete.
    pub advance: Option<AdvanceOutcome>,
}

/// Lesson-page flow on top of the shared progress store.
#[derive(Clone)]
pub struct LearningService {
    store: ProgressStore,
}

impl LearningService {
    #[must_use]
    pub fn new(store: ProgressStore) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    /// Mark the item at `position` complete and resolve the next lesson.
    ///
    /// The next position is returned whether or not the backend confirmed.
    pub async fn mark_and_advance(&self, module: &Module, position: &Position) -> AdvanceOutcome {
        if module.locate(&position.unit_id, &position.item_id).is_none() {
            debug!(module_id = %module.id(), ?position, "position not in module");
            return AdvanceOutcome::NotInModule;
        }

        let status = if self.store.is_completed(&position.item_id) {
            CompletionStatus::AlreadyCompleted
        } else {
            let outcome = self
                .store
                .mark_complete(module.id(), &position.unit_id, &position.item_id)
                .await;
            CompletionStatus::Marked(outcome)
        };

        let next = sequence::resolve_next(module, position).map(|target| target.position());
        AdvanceOutcome::Advanced { status, next }
    }

    /// Grade a quiz and, when it passes, complete it and advance.
    ///
    /// # Errors
    ///
    /// Returns `LearningError::NotInModule` if the position is unknown, or
    /// `LearningError::NotAQuiz` if the item has no questions to grade.
    pub async fn submit_quiz(
        &self,
        module: &Module,
        position: &Position,
        answers: &QuizAnswers,
    ) -> Result<QuizSubmission, LearningError> {
        let (_, item) = module
            .locate(&position.unit_id, &position.item_id)
            .ok_or_else(|| LearningError::NotInModule(position.clone()))?;
        if !item.is_gradable_quiz() {
            return Err(LearningError::NotAQuiz(item.id().clone()));
        }

        let score = grade_quiz(item.questions(), answers);
        debug!(item_id = %item.id(), percentage = score.percentage, "quiz graded");

        let advance = if score.passed() {
            Some(self.mark_and_advance(module, position).await)
        } else {
            None
        };
        Ok(QuizSubmission { score, advance })
    }

    /// Where a "Continue Learning" button should lead.
    #[must_use]
    pub fn continue_learning<'a>(&self, module: &'a Module) -> ContinueTarget<'a> {
        self.store
            .with_completions(|completions| sequence::first_incomplete(module, completions))
    }
}
