#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod learning_service;
pub mod progress_store;

pub use app_services::AppServices;
pub use error::{AppServicesError, LearningError};
pub use learning_service::{AdvanceOutcome, CompletionStatus, LearningService, QuizSubmission};
pub use progress_store::{MarkOutcome, ProgressStore};
