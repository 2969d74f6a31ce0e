//! Resource and zone timelines.
//!
//! A timeline answers "when is the earliest moment this demand fits?" and
//! records commitments once a task is placed.
//!
//! # Resource timelines
//!
//! | Timeline | Structure | Insertion |
//! |----------|-----------|-----------|
//! | [`JustInTimeTimeline`] | stack of `(free_at, count)` | trailing only |
//! | [`MomentumTimeline`] | START/END event ledger | anywhere on the horizon |
//!
//! Both implement [`ResourceTimeline`], so schedulers are generic over
//! the strategy.
//!
//! # Zone timeline
//!
//! [`ZoneTimeline`] tracks stateful zones whose status must match a
//! task's requirement during its whole execution, with paid status
//! changes in between.

mod just_in_time;
mod ledger;
mod momentum;
mod zone;

pub use just_in_time::JustInTimeTimeline;
pub use ledger::{Event, EventLedger, EventType};
pub use momentum::MomentumTimeline;
pub use zone::ZoneTimeline;

use crate::models::{AgentId, Contractor, Time, Worker};

/// Availability ledger of renewable workers.
///
/// Capacity violations on [`reserve`](Self::reserve) are scheduler bugs
/// and panic.
pub trait ResourceTimeline {
    /// Creates a timeline with every contractor's full capacity free at 0.
    fn new(contractors: &[Contractor]) -> Self
    where
        Self: Sized;

    /// Earliest time `≥ not_before` at which `count` workers of `agent`
    /// are free for `exec_time`.
    fn earliest_slot(&self, agent: &AgentId, count: u32, not_before: Time, exec_time: Time) -> Time;

    /// Commits `count` workers of `agent` to `[start, end)`.
    fn reserve(&mut self, agent: &AgentId, count: u32, start: Time, end: Time);

    /// Earliest time every worker group of `team` fits simultaneously.
    ///
    /// Takes the maximum over kinds and re-queries at the new time until
    /// no kind moves it further.
    fn find_min_start_time(&self, team: &[Worker], not_before: Time, exec_time: Time) -> Time {
        let mut start = not_before;
        loop {
            let next = team
                .iter()
                .filter(|w| w.count > 0)
                .map(|w| self.earliest_slot(&w.agent_id(), w.count, start, exec_time))
                .fold(start, Time::max);
            if next == start {
                return start;
            }
            start = next;
        }
    }

    /// Commits a whole team to `[start, end)`.
    fn update(&mut self, team: &[Worker], start: Time, end: Time) {
        for worker in team.iter().filter(|w| w.count > 0) {
            self.reserve(&worker.agent_id(), worker.count, start, end);
        }
    }
}

/// Capacity of every agent in a contractor list.
pub(crate) fn agent_capacities(contractors: &[Contractor]) -> Vec<(AgentId, u32)> {
    contractors
        .iter()
        .flat_map(|c| {
            c.workers
                .values()
                .map(move |w| (AgentId::new(&c.id, &w.kind), w.count))
        })
        .collect()
}
