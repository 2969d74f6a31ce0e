//! Scheduler configuration.
//!
//! [`SchedulerConfig`] selects the traversal policy, the resource
//! optimizer and a few run-wide options. It is serde-friendly so it can
//! be loaded next to the project data.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};
use crate::models::Time;

/// Traversal policy, and with it the resource timeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerType {
    /// Forward placement on the stack-based just-in-time timeline.
    #[default]
    JustInTime,
    /// Placement on the event-ledger timeline, which can insert a task
    /// into any gap of the horizon.
    Between,
}

/// Worker-count search used when teams are not fixed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OptimizerKind {
    /// Integer dichotomy per worker kind, minimizing finish time.
    CoordinateDescent,
    /// `(min + max) / divisor`, clamped into the bounds.
    AverageReq { divisor: f64 },
    /// Always the upper bound.
    MaxCount,
}

impl Default for OptimizerKind {
    fn default() -> Self {
        OptimizerKind::CoordinateDescent
    }
}

/// Configuration for [`TaskScheduler`](crate::scheduler::TaskScheduler).
///
/// # Builder Pattern
///
/// ```
/// use u_project::config::{OptimizerKind, SchedulerConfig, SchedulerType};
///
/// let config = SchedulerConfig::default()
///     .with_scheduler_type(SchedulerType::Between)
///     .with_optimizer(OptimizerKind::MaxCount)
///     .with_assigned_parent_time(10);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Traversal policy.
    pub scheduler_type: SchedulerType,

    /// Worker-count search.
    pub optimizer: OptimizerKind,

    /// Lower bound of every start time (project time shift).
    pub assigned_parent_time: Time,

    /// Check the produced schedule before returning it.
    ///
    /// Violations are reported as [`ScheduleError::InvalidSchedule`].
    pub validate_result: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            scheduler_type: SchedulerType::default(),
            optimizer: OptimizerKind::default(),
            assigned_parent_time: 0,
            validate_result: false,
        }
    }
}

impl SchedulerConfig {
    /// Sets the traversal policy.
    pub fn with_scheduler_type(mut self, scheduler_type: SchedulerType) -> Self {
        self.scheduler_type = scheduler_type;
        self
    }

    /// Sets the resource optimizer.
    pub fn with_optimizer(mut self, optimizer: OptimizerKind) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Sets the project time shift.
    pub fn with_assigned_parent_time(mut self, time: Time) -> Self {
        self.assigned_parent_time = time;
        self
    }

    /// Enables or disables result validation.
    pub fn with_validate_result(mut self, validate: bool) -> Self {
        self.validate_result = validate;
        self
    }

    /// Checks parameter ranges.
    ///
    /// # Errors
    /// [`ScheduleError::InvalidConfig`] for a non-positive averaging
    /// divisor or a negative time shift.
    pub fn validate(&self) -> Result<()> {
        if let OptimizerKind::AverageReq { divisor } = self.optimizer {
            if !(divisor.is_finite() && divisor > 0.0) {
                return Err(ScheduleError::InvalidConfig(format!(
                    "averaging divisor must be positive, got {divisor}"
                )));
            }
        }
        if self.assigned_parent_time < 0 {
            return Err(ScheduleError::InvalidConfig(format!(
                "assigned_parent_time must not be negative, got {}",
                self.assigned_parent_time
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.scheduler_type, SchedulerType::JustInTime);
        assert_eq!(config.optimizer, OptimizerKind::CoordinateDescent);
        assert_eq!(config.assigned_parent_time, 0);
        assert!(!config.validate_result);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_divisor() {
        let config =
            SchedulerConfig::default().with_optimizer(OptimizerKind::AverageReq { divisor: 0.0 });
        assert!(matches!(config.validate(), Err(ScheduleError::InvalidConfig(_))));
    }

    #[test]
    fn test_negative_shift() {
        let config = SchedulerConfig::default().with_assigned_parent_time(-1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: SchedulerConfig =
            serde_json::from_str(r#"{"scheduler_type":"Between"}"#).unwrap();
        assert_eq!(config.scheduler_type, SchedulerType::Between);
        assert_eq!(config.optimizer, OptimizerKind::CoordinateDescent);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = SchedulerConfig::default()
            .with_optimizer(OptimizerKind::AverageReq { divisor: 2.0 })
            .with_validate_result(true);
        let json = serde_json::to_string(&config).unwrap();
        let back: SchedulerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
