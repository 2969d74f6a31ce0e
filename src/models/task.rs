//! Task (work unit) model.
//!
//! A task is one node of the project graph: a volume of work that needs
//! a team of workers, may need zones in a given status, and depends on
//! parent tasks through precedence links.

use serde::{Deserialize, Serialize};

use super::{Time, ZoneReq};

/// A task to be scheduled.
///
/// # Time Representation
/// All times are integer ticks relative to a scheduling epoch (t=0).
/// The consumer defines what one tick means (hour, shift, day).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Amount of work, in the task's own measurement unit.
    pub volume: f64,
    /// Worker kinds this task needs, with count bounds.
    pub worker_reqs: Vec<WorkerReq>,
    /// Zone statuses that must hold for the whole execution window.
    pub zone_reqs: Vec<ZoneReq>,
    /// Precedence links to parent tasks, in declaration order.
    pub parents: Vec<Precedence>,
}

/// Requirement for one worker kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerReq {
    /// Worker kind (e.g. "driver", "welder").
    pub kind: String,
    /// Work volume this kind has to perform.
    pub volume: f64,
    /// Fewest workers of this kind the task can run with.
    pub min_count: u32,
    /// Most workers of this kind the task can use.
    pub max_count: u32,
}

/// Link type between a parent and a child task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeType {
    /// Child starts after the parent finishes.
    #[default]
    FinishStart,
    /// Child starts after the parent finishes, plus the link's lag.
    LagFinishStart,
    /// Child continues the parent back-to-back with the same team.
    InseparableFinishStart,
}

/// A precedence link to a parent task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Precedence {
    /// Parent task id.
    pub parent_id: String,
    /// Extra delay after the parent's finish.
    pub lag: Time,
    /// Link type.
    pub edge_type: EdgeType,
}

impl Task {
    /// Creates a new task with the given ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            volume: 0.0,
            worker_reqs: Vec::new(),
            zone_reqs: Vec::new(),
            parents: Vec::new(),
        }
    }

    /// Sets the task name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the task volume.
    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    /// Adds a worker requirement.
    pub fn with_worker_req(mut self, req: WorkerReq) -> Self {
        self.worker_reqs.push(req);
        self
    }

    /// Adds a zone requirement.
    pub fn with_zone_req(mut self, req: ZoneReq) -> Self {
        self.zone_reqs.push(req);
        self
    }

    /// Adds a finish-start parent.
    pub fn with_parent(self, parent_id: impl Into<String>) -> Self {
        self.with_precedence(Precedence::finish_start(parent_id))
    }

    /// Makes this task the inseparable successor of `parent_id`.
    pub fn with_inseparable_parent(self, parent_id: impl Into<String>) -> Self {
        self.with_precedence(Precedence {
            parent_id: parent_id.into(),
            lag: 0,
            edge_type: EdgeType::InseparableFinishStart,
        })
    }

    /// Adds an arbitrary precedence link.
    pub fn with_precedence(mut self, link: Precedence) -> Self {
        self.parents.push(link);
        self
    }

    /// Whether this is a zero-resource pass-through task.
    ///
    /// Service units take no time and let children start at their own
    /// finish time (no tie-break gap).
    pub fn is_service_unit(&self) -> bool {
        self.worker_reqs.is_empty()
    }

    /// Id of the parent this task is inseparably chained to, if any.
    pub fn inseparable_parent_id(&self) -> Option<&str> {
        self.parents
            .iter()
            .find(|p| p.edge_type == EdgeType::InseparableFinishStart)
            .map(|p| p.parent_id.as_str())
    }

    /// Returns the requirement for a worker kind.
    pub fn worker_req(&self, kind: &str) -> Option<&WorkerReq> {
        self.worker_reqs.iter().find(|r| r.kind == kind)
    }
}

impl WorkerReq {
    /// Creates a requirement.
    pub fn new(kind: impl Into<String>, volume: f64, min_count: u32, max_count: u32) -> Self {
        Self {
            kind: kind.into(),
            volume,
            min_count,
            max_count,
        }
    }

    /// Whether `count` lies within `[min_count, max_count]`.
    #[inline]
    pub fn accepts(&self, count: u32) -> bool {
        (self.min_count..=self.max_count).contains(&count)
    }
}

impl Precedence {
    /// Zero-lag finish-start link.
    pub fn finish_start(parent_id: impl Into<String>) -> Self {
        Self {
            parent_id: parent_id.into(),
            lag: 0,
            edge_type: EdgeType::FinishStart,
        }
    }

    /// Finish-start link with a lag.
    pub fn with_lag(parent_id: impl Into<String>, lag: Time) -> Self {
        Self {
            parent_id: parent_id.into(),
            lag,
            edge_type: EdgeType::LagFinishStart,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_builder() {
        let task = Task::new("T1")
            .with_name("Excavation")
            .with_volume(10.0)
            .with_worker_req(WorkerReq::new("driver", 10.0, 1, 4))
            .with_zone_req(ZoneReq::new("pit", 2))
            .with_parent("T0");

        assert_eq!(task.id, "T1");
        assert_eq!(task.name, "Excavation");
        assert_eq!(task.worker_reqs.len(), 1);
        assert_eq!(task.zone_reqs.len(), 1);
        assert_eq!(task.parents[0].edge_type, EdgeType::FinishStart);
        assert!(!task.is_service_unit());
        assert!(task.worker_req("driver").is_some());
        assert!(task.worker_req("welder").is_none());
    }

    #[test]
    fn test_service_unit() {
        let task = Task::new("start");
        assert!(task.is_service_unit());
        assert!(task.inseparable_parent_id().is_none());
    }

    #[test]
    fn test_inseparable_parent() {
        let task = Task::new("T2").with_parent("T0").with_inseparable_parent("T1");
        assert_eq!(task.inseparable_parent_id(), Some("T1"));
    }

    #[test]
    fn test_worker_req_accepts() {
        let req = WorkerReq::new("welder", 5.0, 2, 4);
        assert!(!req.accepts(1));
        assert!(req.accepts(2));
        assert!(req.accepts(4));
        assert!(!req.accepts(5));
    }

    #[test]
    fn test_lag_link() {
        let link = Precedence::with_lag("T0", 3);
        assert_eq!(link.lag, 3);
        assert_eq!(link.edge_type, EdgeType::LagFinishStart);
    }
}
