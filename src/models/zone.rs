//! Zone model.
//!
//! A zone is a shared, stateful area (a road, a site, a crane pad). Tasks
//! may require a zone to be in a given status for their whole execution;
//! switching the status costs time, read from a square cost table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Time;

/// The "not stated" status. It matches any status.
pub const STATUS_ANY: usize = 0;

/// A zone claimed in a concrete status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Zone name.
    pub name: String,
    /// Claimed status.
    pub status: usize,
}

/// A task's requirement on a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneReq {
    /// Zone name.
    pub kind: String,
    /// Status the zone must be in.
    pub required_status: usize,
}

/// A paid status change of a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneTransition {
    /// Zone name.
    pub name: String,
    /// Status before the change.
    pub from_status: usize,
    /// Status after the change.
    pub to_status: usize,
    /// When the change began.
    pub start_time: Time,
    /// When the change completed.
    pub end_time: Time,
}

/// Initial statuses and transition costs for all zones.
///
/// # Examples
///
/// ```
/// use u_project::models::ZoneConfiguration;
///
/// let config = ZoneConfiguration::new(vec![vec![0, 0, 0], vec![0, 1, 1], vec![0, 1, 1]])
///     .with_zone("road", 1);
/// assert_eq!(config.change_cost(1, 2), 1);
/// assert!(config.match_status(0, 2));
/// assert!(!config.match_status(1, 2));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneConfiguration {
    /// Status of every zone at t=0.
    pub start_statuses: BTreeMap<String, usize>,
    /// `time_costs[from][to]`: time needed to switch status.
    pub time_costs: Vec<Vec<Time>>,
}

impl Zone {
    /// Creates a zone claim.
    pub fn new(name: impl Into<String>, status: usize) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }
}

impl ZoneReq {
    /// Creates a zone requirement.
    pub fn new(kind: impl Into<String>, required_status: usize) -> Self {
        Self {
            kind: kind.into(),
            required_status,
        }
    }
}

impl ZoneConfiguration {
    /// Creates a configuration with the given cost table and no zones.
    pub fn new(time_costs: Vec<Vec<Time>>) -> Self {
        Self {
            start_statuses: BTreeMap::new(),
            time_costs,
        }
    }

    /// Declares a zone with its initial status.
    pub fn with_zone(mut self, name: impl Into<String>, status: usize) -> Self {
        self.start_statuses.insert(name.into(), status);
        self
    }

    /// Number of distinct statuses (rows of the cost table).
    pub fn statuses_available(&self) -> usize {
        self.time_costs.len()
    }

    /// Whether `status` is [`STATUS_ANY`] or has a row in the cost table.
    pub fn has_status(&self, status: usize) -> bool {
        status == STATUS_ANY || status < self.time_costs.len()
    }

    /// Time needed to switch from one status to another.
    ///
    /// Statuses outside the table cost nothing; requirements naming them
    /// are rejected before scheduling.
    pub fn change_cost(&self, from_status: usize, to_status: usize) -> Time {
        self.time_costs
            .get(from_status)
            .and_then(|row| row.get(to_status))
            .copied()
            .unwrap_or(0)
    }

    /// Whether `to_compare` satisfies the `target` requirement.
    ///
    /// [`STATUS_ANY`] matches everything; any other status only itself.
    #[inline]
    pub fn match_status(&self, target: usize, to_compare: usize) -> bool {
        target == STATUS_ANY || target == to_compare
    }

    /// Whether the zone is configured.
    pub fn has_zone(&self, name: &str) -> bool {
        self.start_statuses.contains_key(name)
    }

    /// Whether the cost table is square and covers every initial status.
    pub fn is_consistent(&self) -> bool {
        let n = self.time_costs.len();
        self.time_costs.iter().all(|row| row.len() == n)
            && self.time_costs.iter().flatten().all(|&c| c >= 0)
            && self.start_statuses.values().all(|&s| n == 0 || s < n)
    }
}
