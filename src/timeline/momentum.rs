//! Momentum resource timeline.
//!
//! Per agent, an [`EventLedger`] of START/END events carrying worker
//! counts. The free count after each event is derived by a sweep, so a
//! reservation may be inserted anywhere on the horizon: a query checks
//! the whole `[t, t + exec)` window, not only the trailing state.
//!
//! # Algorithm
//! Starting at `t = not_before`:
//! 1. If fewer than `count` workers are free at `t`, jump to the next
//!    checkpoint.
//! 2. Otherwise scan checkpoints inside the window; the first one with
//!    too few free workers moves `t` to the checkpoint after it.
//! 3. A clean window returns `t`.
//!
//! Every step strictly increases `t`, and the ledger always ends with
//! full capacity, so the search terminates.

use std::collections::HashMap;

use super::ledger::{Event, EventLedger, EventType};
use super::{agent_capacities, ResourceTimeline};
use crate::models::{AgentId, Contractor, Time};

#[derive(Debug, Clone)]
struct AgentLedger {
    capacity: u32,
    events: EventLedger<u32>,
    /// Free count after each event.
    available: Vec<i64>,
}

impl AgentLedger {
    fn new(capacity: u32) -> Self {
        Self {
            capacity,
            events: EventLedger::new(capacity),
            available: vec![capacity as i64],
        }
    }

    fn recompute(&mut self) {
        let mut free = self.capacity as i64;
        self.available = self
            .events
            .iter()
            .map(|e| {
                match e.event_type {
                    EventType::Initial => free = e.payload as i64,
                    EventType::Start => free -= e.payload as i64,
                    EventType::End => free += e.payload as i64,
                }
                free
            })
            .collect();
    }

    fn free_at(&self, time: Time) -> i64 {
        self.available[self.events.last_at_or_before(time)]
    }

    fn earliest_slot(&self, count: u32, not_before: Time, exec_time: Time) -> Time {
        let need = count as i64;
        let mut t = not_before;
        loop {
            let idx = self.events.last_at_or_before(t);
            if self.available[idx] < need {
                t = self.next_time(idx);
                continue;
            }

            let window_end = t + exec_time;
            let conflict = (idx + 1..self.events.len())
                .take_while(|&j| self.events.time(j) < window_end)
                .find(|&j| self.events.is_group_end(j) && self.available[j] < need);

            match conflict {
                Some(j) => t = self.next_time(j),
                None => return t,
            }
        }
    }

    fn next_time(&self, idx: usize) -> Time {
        match self.events.next_time(idx) {
            Some(time) => time,
            None => panic!("ledger ends below capacity"),
        }
    }
}

/// Event-ledger availability per agent.
///
/// # Example
///
/// ```
/// use u_project::models::{AgentId, Contractor};
/// use u_project::timeline::{MomentumTimeline, ResourceTimeline};
///
/// let mut tl = MomentumTimeline::new(&[Contractor::new("C1").with_workers("driver", 5)]);
/// let driver = AgentId::new("C1", "driver");
///
/// tl.reserve(&driver, 4, 10, 20);
/// // Fits before the existing reservation
/// assert_eq!(tl.earliest_slot(&driver, 4, 0, 10), 0);
/// // Too long for the gap: pushed after it
/// assert_eq!(tl.earliest_slot(&driver, 4, 0, 11), 20);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MomentumTimeline {
    agents: HashMap<AgentId, AgentLedger>,
    next_seq: i64,
}

impl MomentumTimeline {
    fn agent(&self, agent: &AgentId) -> &AgentLedger {
        match self.agents.get(agent) {
            Some(ledger) => ledger,
            None => panic!("unknown agent {agent}"),
        }
    }

    /// Free workers of `agent` at `time`.
    pub fn free_at(&self, agent: &AgentId, time: Time) -> u32 {
        self.agents
            .get(agent)
            .map(|l| l.free_at(time).max(0) as u32)
            .unwrap_or(0)
    }

    /// Number of checkpoints recorded for `agent`, including the origin.
    pub fn checkpoint_count(&self, agent: &AgentId) -> usize {
        self.agents.get(agent).map(|l| l.events.len()).unwrap_or(0)
    }
}

impl ResourceTimeline for MomentumTimeline {
    fn new(contractors: &[Contractor]) -> Self {
        let agents = agent_capacities(contractors)
            .into_iter()
            .map(|(agent, count)| (agent, AgentLedger::new(count)))
            .collect();
        Self {
            agents,
            next_seq: 0,
        }
    }

    fn earliest_slot(&self, agent: &AgentId, count: u32, not_before: Time, exec_time: Time) -> Time {
        let ledger = self.agent(agent);
        assert!(
            count <= ledger.capacity,
            "agent {agent} cannot supply {count} workers (capacity {})",
            ledger.capacity
        );
        if count == 0 {
            return not_before;
        }
        ledger.earliest_slot(count, not_before, exec_time)
    }

    fn reserve(&mut self, agent: &AgentId, count: u32, start: Time, end: Time) {
        if count == 0 || start >= end {
            return;
        }
        let seq_id = self.next_seq;
        self.next_seq += 1;

        let ledger = match self.agents.get_mut(agent) {
            Some(ledger) => ledger,
            None => panic!("unknown agent {agent}"),
        };
        ledger.events.insert(Event {
            seq_id,
            event_type: EventType::Start,
            time: start,
            payload: count,
        });
        ledger.events.insert(Event {
            seq_id,
            event_type: EventType::End,
            time: end,
            payload: count,
        });
        ledger.recompute();

        let capacity = ledger.capacity as i64;
        for (i, &free) in ledger.available.iter().enumerate() {
            if ledger.events.is_group_end(i) {
                assert!(
                    (0..=capacity).contains(&free),
                    "agent {agent} oversubscribed at t={}: {free} free of {capacity}",
                    ledger.events.time(i)
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Worker;

    fn timeline() -> MomentumTimeline {
        MomentumTimeline::new(&[Contractor::new("C1")
            .with_workers("driver", 5)
            .with_workers("welder", 2)])
    }

    fn driver() -> AgentId {
        AgentId::new("C1", "driver")
    }

    #[test]
    fn test_empty_timeline() {
        let tl = timeline();
        assert_eq!(tl.earliest_slot(&driver(), 5, 0, 100), 0);
        assert_eq!(tl.earliest_slot(&driver(), 3, 7, 1), 7);
        assert_eq!(tl.checkpoint_count(&driver()), 1);
    }

    #[test]
    fn test_release_at_end() {
        // Two tasks of 4 on a 5-capacity pool
        let mut tl = timeline();
        tl.reserve(&driver(), 4, 0, 10);
        assert_eq!(tl.earliest_slot(&driver(), 4, 0, 5), 10);
        assert_eq!(tl.earliest_slot(&driver(), 1, 0, 5), 0);
    }

    #[test]
    fn test_insert_into_gap() {
        let mut tl = timeline();
        tl.reserve(&driver(), 5, 10, 20);
        tl.reserve(&driver(), 5, 30, 40);

        assert_eq!(tl.earliest_slot(&driver(), 2, 0, 10), 0);
        assert_eq!(tl.earliest_slot(&driver(), 2, 0, 11), 40);
        assert_eq!(tl.earliest_slot(&driver(), 2, 15, 10), 20);
        assert_eq!(tl.earliest_slot(&driver(), 2, 15, 11), 40);
    }

    #[test]
    fn test_back_to_back_same_time() {
        let mut tl = timeline();
        tl.reserve(&driver(), 5, 0, 10);
        tl.reserve(&driver(), 5, 10, 20);
        assert_eq!(tl.free_at(&driver(), 9), 0);
        assert_eq!(tl.free_at(&driver(), 10), 0);
        assert_eq!(tl.free_at(&driver(), 20), 5);
        assert_eq!(tl.earliest_slot(&driver(), 1, 0, 1), 20);
    }

    #[test]
    fn test_partial_overlap() {
        let mut tl = timeline();
        tl.reserve(&driver(), 3, 5, 15);
        tl.reserve(&driver(), 2, 10, 20);
        // 0 free in [10, 15)
        assert_eq!(tl.free_at(&driver(), 12), 0);
        assert_eq!(tl.earliest_slot(&driver(), 2, 0, 6), 0);
        assert_eq!(tl.earliest_slot(&driver(), 2, 0, 11), 15);
        assert_eq!(tl.earliest_slot(&driver(), 3, 0, 6), 15);
        assert_eq!(tl.earliest_slot(&driver(), 4, 0, 6), 20);
    }

    #[test]
    fn test_zero_length_reservation_ignored() {
        let mut tl = timeline();
        tl.reserve(&driver(), 5, 3, 3);
        assert_eq!(tl.checkpoint_count(&driver()), 1);
    }

    #[test]
    fn test_find_min_start_time_fixed_point() {
        let mut tl = timeline();
        let welder = AgentId::new("C1", "welder");
        tl.reserve(&driver(), 5, 0, 4);
        tl.reserve(&welder, 2, 4, 8);
        tl.reserve(&driver(), 5, 8, 12);

        // Drivers free at 4, welders at 8, drivers busy again at 8
        let team = vec![Worker::new("driver", 1, "C1"), Worker::new("welder", 1, "C1")];
        assert_eq!(tl.find_min_start_time(&team, 0, 3), 12);
        assert_eq!(tl.find_min_start_time(&team[..1], 0, 3), 4);
    }

    #[test]
    #[should_panic]
    fn test_oversubscription_panics() {
        let mut tl = timeline();
        tl.reserve(&driver(), 4, 0, 10);
        tl.reserve(&driver(), 2, 5, 6);
    }
}
