//! Schedule (solution) model.
//!
//! A schedule binds every task to a time interval, a worker team and a
//! contractor. It is indexed by task, so lookups are O(1).
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 4

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Time, Worker, Zone, ZoneTransition};

/// A task placed on the timeline.
///
/// Created once by the scheduler and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    /// Index of the task in its graph.
    pub task_index: usize,
    /// Task id (denormalized for reporting).
    pub task_id: String,
    /// Start time, inclusive.
    pub start: Time,
    /// End time, exclusive.
    pub end: Time,
    /// Assigned team. Empty for service units.
    pub workers: Vec<Worker>,
    /// Contractor the team belongs to.
    pub contractor_id: Option<String>,
    /// Zone status changes paid before start.
    pub zones_pre: Vec<ZoneTransition>,
    /// Zone statuses left behind at end.
    pub zones_post: Vec<Zone>,
    /// `Σ unit_cost × count × duration`.
    pub cost: f64,
    /// Whether the task is a zero-resource pass-through.
    pub is_service_unit: bool,
}

/// Flat, serializable summary of one placed task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub task_id: String,
    pub start: Time,
    pub finish: Time,
    pub contractor_id: String,
    /// Worker kind → count.
    pub workers: BTreeMap<String, u32>,
}

/// A complete schedule: one optional placement per task index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    tasks: Vec<Option<ScheduledTask>>,
}

/// A constraint violation found in a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Type of violation.
    pub violation_type: ViolationType,
    /// Related entity (task id, agent id or zone name).
    pub entity_id: String,
    /// Human-readable description.
    pub message: String,
    /// Severity (0-100, higher = worse).
    pub severity: i32,
}

/// Classification of constraint violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationType {
    /// A pool is assigned beyond its contractor capacity.
    CapacityExceeded,
    /// A task started before a parent allowed it.
    PrecedenceViolation,
    /// Overlapping claims disagree on a zone status.
    ZoneStatusMismatch,
    /// An assigned count lies outside the requirement bounds.
    WorkerBoundsViolation,
    /// Domain-specific violation.
    Custom(String),
}

impl ScheduledTask {
    /// Length of the interval.
    #[inline]
    pub fn duration(&self) -> Time {
        self.end - self.start
    }

    /// Earliest start for children of this task.
    ///
    /// Service units release children at their own finish; ordinary
    /// tasks one tick later.
    #[inline]
    pub fn min_child_start_time(&self) -> Time {
        if self.is_service_unit {
            self.end
        } else {
            self.end + 1
        }
    }

    /// Whether `time` falls inside `[start, end)`.
    #[inline]
    pub fn is_overlapped(&self, time: Time) -> bool {
        self.start <= time && time < self.end
    }

    /// Assigned count for a worker kind (0 if absent).
    pub fn worker_count(&self, kind: &str) -> u32 {
        self.workers
            .iter()
            .find(|w| w.kind == kind)
            .map(|w| w.count)
            .unwrap_or(0)
    }

    /// Reporting summary.
    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            task_id: self.task_id.clone(),
            start: self.start,
            finish: self.end,
            contractor_id: self.contractor_id.clone().unwrap_or_default(),
            workers: self
                .workers
                .iter()
                .map(|w| (w.kind.clone(), w.count))
                .collect(),
        }
    }
}

impl Violation {
    /// Creates a capacity exceeded violation.
    pub fn capacity_exceeded(agent_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            violation_type: ViolationType::CapacityExceeded,
            entity_id: agent_id.into(),
            message: message.into(),
            severity: 90,
        }
    }

    /// Creates a precedence violation.
    pub fn precedence_violation(task_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            violation_type: ViolationType::PrecedenceViolation,
            entity_id: task_id.into(),
            message: message.into(),
            severity: 95,
        }
    }

    /// Creates a zone status mismatch violation.
    pub fn zone_mismatch(zone: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            violation_type: ViolationType::ZoneStatusMismatch,
            entity_id: zone.into(),
            message: message.into(),
            severity: 85,
        }
    }

    /// Creates a worker bounds violation.
    pub fn worker_bounds(task_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            violation_type: ViolationType::WorkerBoundsViolation,
            entity_id: task_id.into(),
            message: message.into(),
            severity: 70,
        }
    }
}

impl Schedule {
    /// Creates an empty schedule for `n` tasks.
    pub fn with_task_count(n: usize) -> Self {
        Self {
            tasks: vec![None; n],
        }
    }

    /// Records a placement. The slot is grown if needed.
    pub fn insert(&mut self, task: ScheduledTask) {
        let idx = task.task_index;
        if idx >= self.tasks.len() {
            self.tasks.resize(idx + 1, None);
        }
        self.tasks[idx] = Some(task);
    }

    /// Placement of a task index.
    pub fn get(&self, task_index: usize) -> Option<&ScheduledTask> {
        self.tasks.get(task_index).and_then(Option::as_ref)
    }

    /// Placement of a task id.
    pub fn get_by_id(&self, task_id: &str) -> Option<&ScheduledTask> {
        self.iter().find(|t| t.task_id == task_id)
    }

    /// Placed tasks in index order.
    pub fn iter(&self) -> impl Iterator<Item = &ScheduledTask> {
        self.tasks.iter().flatten()
    }

    /// Number of placed tasks.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Whether nothing is placed.
    pub fn is_empty(&self) -> bool {
        self.tasks.iter().all(Option::is_none)
    }

    /// Whether every slot holds a placement.
    pub fn is_complete(&self) -> bool {
        self.tasks.iter().all(Option::is_some)
    }

    /// Latest end time (0 for an empty schedule).
    pub fn makespan(&self) -> Time {
        self.iter().map(|t| t.end).max().unwrap_or(0)
    }

    /// Sum of task costs.
    pub fn total_cost(&self) -> f64 {
        self.iter().map(|t| t.cost).sum()
    }

    /// Summaries ordered by start time, then task index.
    pub fn summaries(&self) -> Vec<TaskSummary> {
        let mut placed: Vec<&ScheduledTask> = self.iter().collect();
        placed.sort_by_key(|t| (t.start, t.task_index));
        placed.into_iter().map(ScheduledTask::summary).collect()
    }
}
