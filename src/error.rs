//! Error types for scheduling.
//!
//! Only recoverable conditions live here. Timeline invariant violations
//! (oversubscribed capacity, zone status mismatch at a boundary) indicate a
//! scheduler bug and panic instead.

use thiserror::Error;

use crate::models::Violation;
use crate::validation::ValidationError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ScheduleError>;

/// Errors raised while building, scheduling, or decoding a project.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    /// No contractor can ever satisfy the task's worker bounds.
    ///
    /// Propagated to the caller as-is; the scheduler never retries.
    #[error("no contractor can satisfy the worker requirements of task '{task_id}'")]
    NoSufficientContractor { task_id: String },

    /// The input failed structural validation.
    #[error("invalid input: {} error(s), first: {}", .0.len(), .0.first().map(|e| e.message.as_str()).unwrap_or("-"))]
    InvalidInput(Vec<ValidationError>),

    /// A zone requirement names a zone missing from the configuration.
    #[error("zone '{0}' is not configured")]
    UnknownZone(String),

    /// A task referenced by index or id does not exist.
    #[error("unknown task '{0}'")]
    UnknownTask(String),

    /// The priority order reached a task before one of its parents.
    #[error("task '{task_id}' was reached before its parent '{parent_id}'")]
    PrecedenceOrder { task_id: String, parent_id: String },

    /// The chromosome does not fit the graph or contractor pool.
    #[error("invalid chromosome: {0}")]
    InvalidChromosome(String),

    /// The scheduler configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The produced schedule failed its post-check.
    #[error("schedule has {} violation(s)", .0.len())]
    InvalidSchedule(Vec<Violation>),
}
