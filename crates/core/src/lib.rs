#![forbid(unsafe_code)]

pub mod aggregate;
pub mod model;
pub mod sequence;

pub use aggregate::{LearnerStats, ModuleProgress};
pub use sequence::{ContinueTarget, Direction, NavTarget, Position};
