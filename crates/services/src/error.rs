//! Shared error types for the services crate.

use thiserror::Error;

use backend::ApiError;
use learn_core::model::ItemId;
use learn_core::sequence::Position;

/// Errors emitted by `LearningService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LearningError {
    #[error("position {0:?} is not part of the module")]
    NotInModule(Position),
    #[error("item {0} is not a gradable quiz")]
    NotAQuiz(ItemId),
}

/// Errors emitted while bootstrapping or using app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Api(#[from] ApiError),
}
