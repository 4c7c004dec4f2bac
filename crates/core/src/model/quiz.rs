use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::aggregate::percent;

/// Minimum score (inclusive) for a quiz to count as passed.
pub const QUIZ_PASS_PERCENTAGE: u8 = 70;

/// One multiple-choice question attached to a quiz item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_answer: usize,
}

impl QuizQuestion {
    #[must_use]
    pub fn new(question: impl Into<String>, options: Vec<String>, correct_answer: usize) -> Self {
        Self {
            question: question.into(),
            options,
            correct_answer,
        }
    }
}

/// Learner answers keyed by question index, valued by chosen option index.
pub type QuizAnswers = HashMap<usize, usize>;

/// Result of grading a quiz submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizScore {
    pub correct: usize,
    pub total: usize,
    pub percentage: u8,
}

impl QuizScore {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.total > 0 && self.percentage >= QUIZ_PASS_PERCENTAGE
    }
}

/// Grade answers against the questions' correct options.
///
/// Unanswered questions count as wrong. An empty question list scores 0%.
#[must_use]
pub fn grade_quiz(questions: &[QuizQuestion], answers: &QuizAnswers) -> QuizScore {
    let correct = questions
        .iter()
        .enumerate()
        .filter(|(index, q)| answers.get(index) == Some(&q.correct_answer))
        .count();

    QuizScore {
        correct,
        total: questions.len(),
        percentage: percent(correct, questions.len()),
    }
}
