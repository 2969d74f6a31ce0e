//! Just-in-time resource timeline.
//!
//! Per agent, a stack of `(free_at, count)` ordered by decreasing time,
//! so the top holds the workers that became free first. A query consumes
//! from the top; the answer is the latest `free_at` it had to touch, i.e.
//! the moment all needed workers are idle together.
//!
//! Reservations always release at their end, so the structure only
//! supports appending work after what is already placed.

use std::collections::HashMap;

use super::{agent_capacities, ResourceTimeline};
use crate::models::{AgentId, Contractor, Time};

/// Stack-based availability per agent.
#[derive(Debug, Clone, Default)]
pub struct JustInTimeTimeline {
    stacks: HashMap<AgentId, Vec<(Time, u32)>>,
    capacity: HashMap<AgentId, u32>,
}

impl JustInTimeTimeline {
    fn stack(&self, agent: &AgentId) -> &Vec<(Time, u32)> {
        match self.stacks.get(agent) {
            Some(stack) => stack,
            None => panic!("unknown agent {agent}"),
        }
    }

    /// Free workers of `agent` at `time`.
    pub fn free_at(&self, agent: &AgentId, time: Time) -> u32 {
        self.stacks
            .get(agent)
            .map(|s| s.iter().filter(|(t, _)| *t <= time).map(|(_, c)| c).sum())
            .unwrap_or(0)
    }
}

impl ResourceTimeline for JustInTimeTimeline {
    fn new(contractors: &[Contractor]) -> Self {
        let mut stacks = HashMap::new();
        let mut capacity = HashMap::new();
        for (agent, count) in agent_capacities(contractors) {
            stacks.insert(agent.clone(), vec![(0, count)]);
            capacity.insert(agent, count);
        }
        Self { stacks, capacity }
    }

    fn earliest_slot(&self, agent: &AgentId, count: u32, not_before: Time, _exec_time: Time) -> Time {
        let stack = self.stack(agent);
        let mut needed = count;
        let mut latest = not_before;
        for &(time, free) in stack.iter().rev() {
            if needed == 0 {
                break;
            }
            latest = latest.max(time);
            needed -= needed.min(free);
        }
        assert!(
            needed == 0,
            "agent {agent} cannot supply {count} workers (capacity {})",
            self.capacity[agent]
        );
        latest
    }

    fn reserve(&mut self, agent: &AgentId, count: u32, _start: Time, end: Time) {
        if count == 0 {
            return;
        }
        let capacity = self.capacity.get(agent).copied().unwrap_or(0);
        let stack = match self.stacks.get_mut(agent) {
            Some(stack) => stack,
            None => panic!("unknown agent {agent}"),
        };

        let mut needed = count;
        while needed > 0 {
            let Some((time, free)) = stack.pop() else {
                panic!("agent {agent} oversubscribed: {count} > capacity {capacity}");
            };
            if free > needed {
                stack.push((time, free - needed));
                break;
            }
            needed -= free;
        }

        // Bubble the release into place, keeping decreasing time order
        stack.push((end, count));
        let mut i = stack.len() - 1;
        while i > 0 && stack[i].0 > stack[i - 1].0 {
            stack.swap(i, i - 1);
            i -= 1;
        }

        let total: u32 = stack.iter().map(|(_, c)| c).sum();
        assert_eq!(total, capacity, "agent {agent} lost workers");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Worker;

    fn timeline() -> JustInTimeTimeline {
        JustInTimeTimeline::new(&[Contractor::new("C1")
            .with_workers("driver", 5)
            .with_workers("welder", 2)])
    }

    fn driver() -> AgentId {
        AgentId::new("C1", "driver")
    }

    #[test]
    fn test_empty_timeline_starts_at_zero() {
        let tl = timeline();
        assert_eq!(tl.earliest_slot(&driver(), 3, 0, 10), 0);
        assert_eq!(tl.earliest_slot(&driver(), 5, 4, 10), 4);
    }

    #[test]
    fn test_consumes_earliest_release() {
        let mut tl = timeline();
        tl.reserve(&driver(), 5, 0, 10);
        assert_eq!(tl.earliest_slot(&driver(), 4, 0, 3), 10);

        let mut tl = timeline();
        tl.reserve(&driver(), 3, 0, 10);
        // Two still free at 0
        assert_eq!(tl.earliest_slot(&driver(), 2, 0, 3), 0);
        assert_eq!(tl.earliest_slot(&driver(), 3, 0, 3), 10);
        assert_eq!(tl.free_at(&driver(), 0), 2);
        assert_eq!(tl.free_at(&driver(), 10), 5);
    }

    #[test]
    fn test_release_order_is_kept() {
        let mut tl = timeline();
        tl.reserve(&driver(), 2, 0, 8);
        tl.reserve(&driver(), 2, 0, 4);
        // stack top to bottom: (0,1), (4,2), (8,2)
        assert_eq!(tl.earliest_slot(&driver(), 1, 0, 1), 0);
        assert_eq!(tl.earliest_slot(&driver(), 3, 0, 1), 4);
        assert_eq!(tl.earliest_slot(&driver(), 5, 0, 1), 8);
    }

    #[test]
    fn test_find_min_start_time_over_kinds() {
        let mut tl = timeline();
        tl.reserve(&AgentId::new("C1", "welder"), 2, 0, 6);
        let team = vec![Worker::new("driver", 3, "C1"), Worker::new("welder", 1, "C1")];
        assert_eq!(tl.find_min_start_time(&team, 0, 5), 6);

        tl.update(&team, 6, 11);
        assert_eq!(tl.free_at(&driver(), 6), 2);
        assert_eq!(tl.free_at(&driver(), 11), 5);
    }

    #[test]
    #[should_panic]
    fn test_over_capacity_panics() {
        let tl = timeline();
        tl.earliest_slot(&driver(), 6, 0, 1);
    }
}
