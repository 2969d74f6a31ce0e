//! Per-task placement on the timelines.
//!
//! [`ScheduleState`] owns one run's mutable state: the resource timeline,
//! the zone timeline and the placements made so far. Placement works on
//! whole inseparable chains; an unchained task is a chain of one.
//!
//! # Chain layout
//! With the head starting at `t`, member `k` starts at the later of the
//! previous member's end and its own external parents' release, and runs
//! for its own estimated duration. Workers and zones are held for the
//! whole span `[t, end of last member)`.
//!
//! # Start reconciliation
//! Starting at the precedence bound, resources and zones are asked in
//! turn; whenever one of them moves `t` the other is asked again. `t`
//! only grows, and both timelines are free after their last event, so the
//! loop ends.

use tracing::debug;

use super::{ContractorLookup, FinishTimeQuery, ResourceOptimizer, WorkTimeEstimator};
use crate::error::{Result, ScheduleError};
use crate::models::{
    Contractor, EdgeType, Schedule, ScheduledTask, TaskGraph, Time, Worker, WorkerReq, Zone,
    ZoneConfiguration, ZoneReq, STATUS_ANY,
};
use crate::timeline::{ResourceTimeline, ZoneTimeline};
use crate::validation::{ValidationError, ValidationErrorKind};

/// Everything about a chain that does not depend on the team.
#[derive(Debug, Clone)]
pub(crate) struct ChainPlan {
    pub members: Vec<usize>,
    /// Release time of each member from its external parents.
    pub ext_starts: Vec<Time>,
    pub zone_reqs: Vec<ZoneReq>,
    pub worker_reqs: Vec<WorkerReq>,
}

impl ChainPlan {
    fn head(&self) -> usize {
        self.members[0]
    }

    fn parent_start(&self) -> Time {
        self.ext_starts[0]
    }
}

/// Mutable state of one scheduling run.
pub(crate) struct ScheduleState<'a, T> {
    graph: &'a TaskGraph,
    contractors: &'a [Contractor],
    estimator: &'a dyn WorkTimeEstimator,
    resources: T,
    zones: ZoneTimeline,
    placed: Vec<Option<ScheduledTask>>,
    placement_order: Vec<usize>,
    assigned_parent_time: Time,
}

impl<'a, T: ResourceTimeline> ScheduleState<'a, T> {
    pub fn new(
        graph: &'a TaskGraph,
        contractors: &'a [Contractor],
        estimator: &'a dyn WorkTimeEstimator,
        zone_config: &ZoneConfiguration,
        assigned_parent_time: Time,
    ) -> Self {
        Self {
            graph,
            contractors,
            estimator,
            resources: T::new(contractors),
            zones: ZoneTimeline::new(zone_config),
            placed: vec![None; graph.len()],
            placement_order: Vec::with_capacity(graph.len()),
            assigned_parent_time,
        }
    }

    pub fn is_placed(&self, index: usize) -> bool {
        self.placed[index].is_some()
    }

    /// Earliest start allowed by the external parents of `index`.
    fn parent_start(&self, index: usize) -> Result<Time> {
        let mut start = self.assigned_parent_time;
        let head = self.graph.chain_head(index);
        for link in self.graph.parents(index) {
            if link.edge_type == EdgeType::InseparableFinishStart
                || self.graph.chain_head(link.parent) == head
            {
                continue;
            }
            let Some(parent) = &self.placed[link.parent] else {
                return Err(ScheduleError::PrecedenceOrder {
                    task_id: self.graph.task(index).id.clone(),
                    parent_id: self.graph.task(link.parent).id.clone(),
                });
            };
            start = start.max(parent.min_child_start_time() + link.lag);
        }
        Ok(start)
    }

    /// Collects the team-independent facts about the chain at `head`.
    pub fn plan(&self, head: usize) -> Result<ChainPlan> {
        let members = self.graph.inseparable_chain(head);
        let ext_starts = members
            .iter()
            .map(|&m| self.parent_start(m))
            .collect::<Result<Vec<_>>>()?;
        let zone_reqs = self.merge_zone_reqs(&members)?;
        let worker_reqs = merge_worker_reqs(self.graph, &members);
        Ok(ChainPlan {
            members,
            ext_starts,
            zone_reqs,
            worker_reqs,
        })
    }

    fn merge_zone_reqs(&self, members: &[usize]) -> Result<Vec<ZoneReq>> {
        let mut merged: Vec<ZoneReq> = Vec::new();
        for &m in members {
            for req in &self.graph.task(m).zone_reqs {
                if !self.zones.has_zone(&req.kind) {
                    return Err(ScheduleError::UnknownZone(req.kind.clone()));
                }
                match merged.iter_mut().find(|r| r.kind == req.kind) {
                    None => merged.push(req.clone()),
                    Some(r) if r.required_status == STATUS_ANY => {
                        r.required_status = req.required_status
                    }
                    Some(r) if req.required_status != STATUS_ANY
                        && r.required_status != req.required_status =>
                    {
                        return Err(ScheduleError::InvalidInput(vec![ValidationError::new(
                            ValidationErrorKind::ConflictingZoneRequirements,
                            format!(
                                "Inseparable chain of '{}' needs zone '{}' in statuses {} and {}",
                                self.graph.task(members[0]).id,
                                req.kind,
                                r.required_status,
                                req.required_status
                            ),
                        )]));
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(merged)
    }

    fn durations(&self, plan: &ChainPlan, team: &[Worker]) -> Vec<Time> {
        plan.members
            .iter()
            .map(|&m| self.estimator.estimate_time(self.graph.task(m), team))
            .collect()
    }

    /// Member intervals with the head starting at `t`.
    fn layout(plan: &ChainPlan, durations: &[Time], t: Time) -> Vec<(Time, Time)> {
        let mut intervals = Vec::with_capacity(durations.len());
        let mut prev_end = t;
        for (k, &duration) in durations.iter().enumerate() {
            let start = prev_end.max(plan.ext_starts[k]);
            let end = start.saturating_add(duration);
            intervals.push((start, end));
            prev_end = end;
        }
        intervals
    }

    /// Earliest layout the resource timeline accepts, ignoring zones.
    fn resource_layout(&self, plan: &ChainPlan, team: &[Worker]) -> Vec<(Time, Time)> {
        let durations = self.durations(plan, team);
        let mut t = plan.parent_start();
        loop {
            let layout = Self::layout(plan, &durations, t);
            let span = chain_end(&layout, t) - t;
            let r = self.resources.find_min_start_time(team, t, span);
            if r == t {
                return layout;
            }
            t = r;
        }
    }

    /// Earliest layout both timelines accept.
    fn find_layout(&self, plan: &ChainPlan, team: &[Worker]) -> Result<Vec<(Time, Time)>> {
        let durations = self.durations(plan, team);
        let floor = plan.parent_start();
        let mut t = floor;
        loop {
            let layout = Self::layout(plan, &durations, t);
            let span = chain_end(&layout, t) - t;

            let r = self.resources.find_min_start_time(team, t, span);
            if r > t {
                t = r;
                continue;
            }
            let z = self
                .zones
                .find_min_start_time_from(&plan.zone_reqs, t, floor, span)?;
            if z == t {
                return Ok(layout);
            }
            t = z;
        }
    }

    /// Picks contractor and team for a chain through the lookup and the
    /// optimizer.
    pub fn choose_team(
        &self,
        plan: &ChainPlan,
        lookup: &dyn ContractorLookup,
        optimizer: &dyn ResourceOptimizer,
    ) -> Result<(Option<usize>, Vec<Worker>)> {
        if plan.worker_reqs.is_empty() {
            return Ok((None, Vec::new()));
        }
        let borders = lookup.get_best_contractor_and_worker_borders(
            &self.graph.task(plan.head()).id,
            &plan.worker_reqs,
            self.contractors,
        )?;
        let mut team = borders.team;
        let finish = ChainFinishTime { state: self, plan };
        optimizer.optimize(&mut team, &borders.min_counts, &borders.max_counts, &finish);
        Ok((Some(borders.contractor_index), team))
    }

    /// Places the chain with a fixed team and commits it to both
    /// timelines.
    pub fn commit(
        &mut self,
        plan: &ChainPlan,
        contractor_index: Option<usize>,
        team: Vec<Worker>,
    ) -> Result<()> {
        let layout = self.find_layout(plan, &team)?;
        let start = layout.first().map(|&(s, _)| s).unwrap_or(plan.parent_start());
        let end = chain_end(&layout, start);

        self.resources.update(&team, start, end);
        let claims: Vec<Zone> = plan
            .zone_reqs
            .iter()
            .map(|r| Zone::new(r.kind.clone(), r.required_status))
            .collect();
        let (zones_pre, zones_post) = self.zones.update(plan.head(), &claims, start, end - start);

        let contractor_id = contractor_index.map(|i| self.contractors[i].id.clone());
        let last = plan.members.len() - 1;
        for (k, (&member, &(s, e))) in plan.members.iter().zip(&layout).enumerate() {
            let task = self.graph.task(member);
            let cost = team
                .iter()
                .map(|w| w.unit_cost * w.count as f64 * (e - s) as f64)
                .sum();
            debug!(task = %task.id, start = s, end = e, "task placed");
            self.placed[member] = Some(ScheduledTask {
                task_index: member,
                task_id: task.id.clone(),
                start: s,
                end: e,
                workers: team.clone(),
                contractor_id: contractor_id.clone(),
                zones_pre: if k == 0 { zones_pre.clone() } else { Vec::new() },
                zones_post: if k == last { zones_post.clone() } else { Vec::new() },
                cost,
                is_service_unit: task.is_service_unit(),
            });
            self.placement_order.push(member);
        }
        Ok(())
    }

    /// Consumes the state into the schedule and the placement order.
    pub fn finish(self) -> (Schedule, Vec<usize>) {
        let mut schedule = Schedule::with_task_count(self.graph.len());
        for task in self.placed.into_iter().flatten() {
            schedule.insert(task);
        }
        (schedule, self.placement_order)
    }
}

/// Finish-time query over a chain, resources only.
struct ChainFinishTime<'s, 'a, T> {
    state: &'s ScheduleState<'a, T>,
    plan: &'s ChainPlan,
}

impl<T: ResourceTimeline> FinishTimeQuery for ChainFinishTime<'_, '_, T> {
    fn finish_time(&self, team: &[Worker]) -> Time {
        let layout = self.state.resource_layout(self.plan, team);
        chain_end(&layout, self.plan.parent_start())
    }
}

fn chain_end(layout: &[(Time, Time)], default: Time) -> Time {
    layout.last().map(|&(_, e)| e).unwrap_or(default)
}

/// Worker requirements of a whole chain.
///
/// Kinds are united; a kind needed by several members takes the largest
/// lower bound and the smallest upper bound that still admits it.
pub(crate) fn merge_worker_reqs(graph: &TaskGraph, members: &[usize]) -> Vec<WorkerReq> {
    let mut merged: Vec<WorkerReq> = Vec::new();
    for &m in members {
        for req in &graph.task(m).worker_reqs {
            match merged.iter_mut().find(|r| r.kind == req.kind) {
                Some(r) => {
                    r.volume += req.volume;
                    r.min_count = r.min_count.max(req.min_count);
                    r.max_count = r.max_count.min(req.max_count).max(r.min_count);
                }
                None => merged.push(req.clone()),
            }
        }
    }
    merged
}
