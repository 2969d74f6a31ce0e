//! Worker and contractor model.
//!
//! Workers are renewable resources grouped by kind and owned by a
//! contractor. A contractor has a fixed capacity per kind; the pair
//! (contractor, kind) identifies one resource pool, the [`AgentId`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A group of identical workers of one kind.
///
/// In a contractor this is the capacity; in a team it is the assigned
/// count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    /// Worker kind (e.g. "driver").
    pub kind: String,
    /// Number of workers.
    pub count: u32,
    /// Owning contractor.
    pub contractor_id: String,
    /// Cost per worker per time unit.
    pub unit_cost: f64,
    /// Work rate multiplier (1.0 = normal).
    pub productivity: f64,
}

/// A contractor owning a fixed worker capacity per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contractor {
    /// Unique contractor identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Capacity per worker kind (kind → workers).
    pub workers: BTreeMap<String, Worker>,
}

/// Identity of one resource pool: a contractor's workers of one kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId {
    /// Owning contractor.
    pub contractor_id: String,
    /// Worker kind.
    pub kind: String,
}

/// Capacity index: kind → contractor id → worker capacity.
pub type WorkerContractorPool = BTreeMap<String, BTreeMap<String, Worker>>;

impl Worker {
    /// Creates a worker group with unit cost 1 and normal productivity.
    pub fn new(kind: impl Into<String>, count: u32, contractor_id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            count,
            contractor_id: contractor_id.into(),
            unit_cost: 1.0,
            productivity: 1.0,
        }
    }

    /// Sets the unit cost.
    pub fn with_unit_cost(mut self, unit_cost: f64) -> Self {
        self.unit_cost = unit_cost;
        self
    }

    /// Sets the productivity multiplier.
    pub fn with_productivity(mut self, productivity: f64) -> Self {
        self.productivity = productivity;
        self
    }

    /// Returns a copy with a different count.
    pub fn with_count(&self, count: u32) -> Self {
        Self {
            count,
            ..self.clone()
        }
    }

    /// The pool this group is drawn from.
    pub fn agent_id(&self) -> AgentId {
        AgentId::new(&self.contractor_id, &self.kind)
    }

    /// Cost of the whole group per time unit.
    #[inline]
    pub fn cost(&self) -> f64 {
        self.unit_cost * self.count as f64
    }
}

impl Contractor {
    /// Creates a contractor without workers.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            workers: BTreeMap::new(),
        }
    }

    /// Sets the contractor name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds capacity for a worker kind with default cost.
    pub fn with_workers(self, kind: impl Into<String>, count: u32) -> Self {
        let kind = kind.into();
        let worker = Worker::new(kind, count, self.id.clone());
        self.with_worker(worker)
    }

    /// Adds a worker group. Its contractor id is overwritten with this one.
    pub fn with_worker(mut self, mut worker: Worker) -> Self {
        worker.contractor_id = self.id.clone();
        self.workers.insert(worker.kind.clone(), worker);
        self
    }

    /// Capacity for a worker kind (0 if absent).
    pub fn capacity(&self, kind: &str) -> u32 {
        self.workers.get(kind).map(|w| w.count).unwrap_or(0)
    }
}

impl AgentId {
    /// Creates an agent id.
    pub fn new(contractor_id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            contractor_id: contractor_id.into(),
            kind: kind.into(),
        }
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.contractor_id, self.kind)
    }
}

/// Builds the kind → contractor → capacity index.
pub fn get_worker_contractor_pool(contractors: &[Contractor]) -> WorkerContractorPool {
    let mut pool = WorkerContractorPool::new();
    for contractor in contractors {
        for (kind, worker) in &contractor.workers {
            pool.entry(kind.clone())
                .or_default()
                .insert(contractor.id.clone(), worker.clone());
        }
    }
    pool
}
