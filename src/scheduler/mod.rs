//! List scheduling of a project graph.
//!
//! [`TaskScheduler`] walks a priority order and places each inseparable
//! chain at the earliest time the precedence constraints, the resource
//! timeline and the zone timeline all allow.
//!
//! # Placement
//!
//! 1. [`ContractorLookup`] picks the contractor and count bounds.
//! 2. [`ResourceOptimizer`] picks counts, querying finish times through a
//!    [`FinishTimeQuery`].
//! 3. The start is reconciled between resources and zones.
//! 4. Workers and zones are committed; each chain member is recorded.
//!
//! # Timelines
//!
//! | `SchedulerType` | Resource timeline |
//! |-----------------|-------------------|
//! | `JustInTime` | [`JustInTimeTimeline`] |
//! | `Between` | [`MomentumTimeline`] |
//!
//! # Reference
//! Kolisch & Hartmann (1999), "Heuristic Algorithms for the
//! Resource-Constrained Project Scheduling Problem", Ch. 7 in
//! Project Scheduling: Recent Models, Algorithms and Applications

mod contractor;
mod estimator;
mod optimizer;
mod placement;
mod prioritization;

pub use contractor::{ContractorLookup, DefaultContractorLookup, WorkerBorders};
pub use estimator::{DefaultWorkEstimator, WorkTimeEstimator};
pub use optimizer::{
    optimizer_from_kind, AverageReqOptimizer, CoordinateDescentOptimizer, FinishTimeQuery,
    MaxCountOptimizer, ResourceOptimizer,
};
pub use prioritization::{prioritization, upward_ranks};
pub(crate) use contractor::can_staff;
pub(crate) use placement::merge_worker_reqs;

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{SchedulerConfig, SchedulerType};
use crate::error::{Result, ScheduleError};
use crate::models::{Contractor, Schedule, TaskGraph, Worker, ZoneConfiguration};
use crate::timeline::{JustInTimeTimeline, MomentumTimeline, ResourceTimeline};
use crate::validation::{validate_schedule, validate_zone_reqs};
use placement::ScheduleState;

/// Contractor and team per task, as fixed by a chromosome.
pub(crate) type FixedTeams = [(Option<usize>, Vec<Worker>)];

/// How a chain gets its team.
#[derive(Clone, Copy)]
enum Staffing<'t> {
    Search,
    Fixed(&'t FixedTeams),
}

/// Priority-driven list scheduler.
///
/// # Example
///
/// ```
/// use u_project::models::{Contractor, Task, TaskGraph, WorkerReq, ZoneConfiguration};
/// use u_project::scheduler::TaskScheduler;
/// use u_project::SchedulerConfig;
///
/// let graph = TaskGraph::new(vec![
///     Task::new("dig").with_worker_req(WorkerReq::new("driver", 6.0, 1, 3)),
///     Task::new("pour")
///         .with_worker_req(WorkerReq::new("driver", 2.0, 1, 2))
///         .with_parent("dig"),
/// ])
/// .unwrap();
/// let contractors = vec![Contractor::new("C1").with_workers("driver", 3)];
///
/// let scheduler = TaskScheduler::new(SchedulerConfig::default());
/// let (schedule, order) = scheduler
///     .schedule(&graph, &contractors, &[0, 1], &ZoneConfiguration::default())
///     .unwrap();
///
/// assert_eq!(order, vec![0, 1]);
/// assert_eq!(schedule.get(0).unwrap().end, 2);
/// assert_eq!(schedule.get(1).unwrap().start, 3);
/// ```
#[derive(Debug, Clone)]
pub struct TaskScheduler {
    config: SchedulerConfig,
    estimator: Arc<dyn WorkTimeEstimator>,
    contractor_lookup: Arc<dyn ContractorLookup>,
    optimizer: Arc<dyn ResourceOptimizer>,
}

impl TaskScheduler {
    /// Creates a scheduler with the default estimator and lookup, and the
    /// optimizer selected in `config`.
    pub fn new(config: SchedulerConfig) -> Self {
        let optimizer: Arc<dyn ResourceOptimizer> = Arc::from(optimizer_from_kind(config.optimizer));
        Self {
            config,
            estimator: Arc::new(DefaultWorkEstimator),
            contractor_lookup: Arc::new(DefaultContractorLookup),
            optimizer,
        }
    }

    /// Replaces the duration estimator.
    pub fn with_estimator(mut self, estimator: Arc<dyn WorkTimeEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    /// Replaces the contractor lookup.
    pub fn with_contractor_lookup(mut self, lookup: Arc<dyn ContractorLookup>) -> Self {
        self.contractor_lookup = lookup;
        self
    }

    /// Replaces the optimizer chosen by the configuration.
    pub fn with_optimizer(mut self, optimizer: Arc<dyn ResourceOptimizer>) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// The configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// The duration estimator.
    pub fn estimator(&self) -> &Arc<dyn WorkTimeEstimator> {
        &self.estimator
    }

    /// Places tasks in `priority_order`.
    ///
    /// The order must list parents before children; inseparable
    /// successors may be listed or not, they are placed with their head.
    /// Returns the schedule and the order in which tasks were actually
    /// placed.
    ///
    /// # Errors
    /// - [`ScheduleError::InvalidConfig`] for a bad configuration
    /// - [`ScheduleError::UnknownTask`] for an index outside the graph
    /// - [`ScheduleError::PrecedenceOrder`] when a parent comes later
    /// - [`ScheduleError::UnknownZone`] for an unconfigured zone
    /// - [`ScheduleError::NoSufficientContractor`] when nobody can staff a
    ///   task
    /// - [`ScheduleError::InvalidSchedule`] when `validate_result` is set
    ///   and the result breaks a constraint
    pub fn schedule(
        &self,
        graph: &TaskGraph,
        contractors: &[Contractor],
        priority_order: &[usize],
        zone_config: &ZoneConfiguration,
    ) -> Result<(Schedule, Vec<usize>)> {
        self.dispatch(graph, contractors, priority_order, zone_config, Staffing::Search)
    }

    /// Places tasks in [`prioritization`] order.
    pub fn schedule_by_priority(
        &self,
        graph: &TaskGraph,
        contractors: &[Contractor],
        zone_config: &ZoneConfiguration,
    ) -> Result<(Schedule, Vec<usize>)> {
        let order = prioritization(graph, self.estimator.as_ref());
        self.schedule(graph, contractors, &order, zone_config)
    }

    /// Places tasks with teams fixed in advance, indexed by task.
    pub(crate) fn schedule_with_teams(
        &self,
        graph: &TaskGraph,
        contractors: &[Contractor],
        order: &[usize],
        zone_config: &ZoneConfiguration,
        teams: &FixedTeams,
    ) -> Result<(Schedule, Vec<usize>)> {
        self.dispatch(graph, contractors, order, zone_config, Staffing::Fixed(teams))
    }

    fn dispatch(
        &self,
        graph: &TaskGraph,
        contractors: &[Contractor],
        order: &[usize],
        zone_config: &ZoneConfiguration,
        staffing: Staffing<'_>,
    ) -> Result<(Schedule, Vec<usize>)> {
        self.config.validate()?;
        if !zone_config.is_consistent() {
            return Err(ScheduleError::InvalidConfig(
                "zone transition table must be square, non-negative and cover every initial status"
                    .into(),
            ));
        }
        validate_zone_reqs(graph.tasks(), zone_config).map_err(ScheduleError::InvalidInput)?;
        if let Some(&bad) = order.iter().find(|&&i| i >= graph.len()) {
            return Err(ScheduleError::UnknownTask(format!("#{bad}")));
        }

        debug!(
            tasks = graph.len(),
            contractors = contractors.len(),
            scheduler = ?self.config.scheduler_type,
            "scheduling run started"
        );
        let (schedule, placed) = match self.config.scheduler_type {
            SchedulerType::JustInTime => {
                self.run::<JustInTimeTimeline>(graph, contractors, order, zone_config, staffing)?
            }
            SchedulerType::Between => {
                self.run::<MomentumTimeline>(graph, contractors, order, zone_config, staffing)?
            }
        };
        info!(
            tasks = schedule.len(),
            makespan = schedule.makespan(),
            "scheduling run finished"
        );

        if self.config.validate_result {
            validate_schedule(&schedule, graph, contractors, zone_config)
                .map_err(ScheduleError::InvalidSchedule)?;
        }
        Ok((schedule, placed))
    }

    fn run<T: ResourceTimeline>(
        &self,
        graph: &TaskGraph,
        contractors: &[Contractor],
        order: &[usize],
        zone_config: &ZoneConfiguration,
        staffing: Staffing<'_>,
    ) -> Result<(Schedule, Vec<usize>)> {
        let mut state = ScheduleState::<T>::new(
            graph,
            contractors,
            self.estimator.as_ref(),
            zone_config,
            self.config.assigned_parent_time,
        );

        for &index in order {
            if graph.is_inseparable_son(index) || state.is_placed(index) {
                continue;
            }
            let plan = state.plan(index)?;
            let (contractor, team) = match staffing {
                Staffing::Search => state.choose_team(
                    &plan,
                    self.contractor_lookup.as_ref(),
                    self.optimizer.as_ref(),
                )?,
                Staffing::Fixed(teams) => teams[index].clone(),
            };
            state.commit(&plan, contractor, team)?;
        }

        Ok(state.finish())
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OptimizerKind;
    use crate::models::{Task, WorkerReq, ZoneReq};
    use crate::validation::ValidationErrorKind;

    fn driver(volume: f64, min: u32, max: u32) -> WorkerReq {
        WorkerReq::new("driver", volume, min, max)
    }

    fn one_contractor(capacity: u32) -> Vec<Contractor> {
        vec![Contractor::new("C1").with_workers("driver", capacity)]
    }

    fn both_types() -> [SchedulerConfig; 2] {
        [
            SchedulerConfig::default(),
            SchedulerConfig::default().with_scheduler_type(SchedulerType::Between),
        ]
    }

    #[test]
    fn test_single_task_starts_at_zero() {
        let graph = TaskGraph::new(vec![Task::new("A").with_worker_req(driver(6.0, 3, 3))]).unwrap();
        for config in both_types() {
            let (schedule, _) = TaskScheduler::new(config)
                .schedule(&graph, &one_contractor(5), &[0], &ZoneConfiguration::default())
                .unwrap();
            let a = schedule.get(0).unwrap();
            assert_eq!(a.start, 0);
            assert_eq!(a.end, 2);
            assert_eq!(a.contractor_id.as_deref(), Some("C1"));
        }
    }

    #[test]
    fn test_zone_transition_is_paid_before_start() {
        let zone_config = ZoneConfiguration::new(vec![vec![0, 0, 0], vec![0, 1, 1], vec![0, 1, 1]])
            .with_zone("road", 1);
        let graph = TaskGraph::new(vec![Task::new("A")
            .with_worker_req(driver(5.0, 1, 1))
            .with_zone_req(ZoneReq::new("road", 2))])
        .unwrap();
        for config in both_types() {
            let (schedule, _) = TaskScheduler::new(config)
                .schedule(&graph, &one_contractor(1), &[0], &zone_config)
                .unwrap();
            let a = schedule.get(0).unwrap();
            assert_eq!((a.start, a.end), (1, 6));
            assert_eq!(a.zones_pre.len(), 1);
            assert_eq!(a.zones_pre[0].from_status, 1);
            assert_eq!(a.zones_pre[0].to_status, 2);
            assert_eq!(a.zones_post[0].status, 2);
        }
    }

    #[test]
    fn test_capacity_delays_second_task() {
        let graph = TaskGraph::new(vec![
            Task::new("A").with_worker_req(driver(8.0, 4, 4)),
            Task::new("B").with_worker_req(driver(8.0, 4, 4)),
        ])
        .unwrap();
        for config in both_types() {
            let (schedule, _) = TaskScheduler::new(config)
                .schedule(&graph, &one_contractor(5), &[0, 1], &ZoneConfiguration::default())
                .unwrap();
            let a = schedule.get(0).unwrap();
            let b = schedule.get(1).unwrap();
            assert_eq!(b.start, a.end);
        }
    }

    #[test]
    fn test_cycle_is_broken_and_scheduled() {
        let graph = TaskGraph::new(vec![
            Task::new("A").with_worker_req(driver(1.0, 1, 1)).with_parent("C"),
            Task::new("B").with_worker_req(driver(1.0, 1, 1)).with_parent("A"),
            Task::new("C").with_worker_req(driver(1.0, 1, 1)).with_parent("B"),
        ])
        .unwrap();
        assert_eq!(graph.removed_edges().len(), 1);

        let (schedule, order) = TaskScheduler::default()
            .schedule_by_priority(&graph, &one_contractor(1), &ZoneConfiguration::default())
            .unwrap();
        assert!(schedule.is_complete());
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn test_service_unit_releases_children_immediately() {
        let graph = TaskGraph::new(vec![
            Task::new("P").with_worker_req(driver(2.0, 1, 1)),
            Task::new("S").with_parent("P"),
            Task::new("T").with_worker_req(driver(1.0, 1, 1)).with_parent("S"),
        ])
        .unwrap();
        let (schedule, _) = TaskScheduler::default()
            .schedule(&graph, &one_contractor(1), &[0, 1, 2], &ZoneConfiguration::default())
            .unwrap();

        let s = schedule.get(1).unwrap();
        let t = schedule.get(2).unwrap();
        assert_eq!((s.start, s.end), (3, 3));
        assert!(s.is_service_unit);
        assert_eq!(s.contractor_id, None);
        assert_eq!(t.start, s.start);
    }

    #[test]
    fn test_precedence_order_error() {
        let graph = TaskGraph::new(vec![
            Task::new("A").with_worker_req(driver(1.0, 1, 1)),
            Task::new("B").with_worker_req(driver(1.0, 1, 1)).with_parent("A"),
        ])
        .unwrap();
        let result = TaskScheduler::default().schedule(
            &graph,
            &one_contractor(1),
            &[1, 0],
            &ZoneConfiguration::default(),
        );
        assert!(matches!(result, Err(ScheduleError::PrecedenceOrder { .. })));
    }

    #[test]
    fn test_unknown_index_and_zone() {
        let graph = TaskGraph::new(vec![Task::new("A")
            .with_worker_req(driver(1.0, 1, 1))
            .with_zone_req(ZoneReq::new("nowhere", 1))])
        .unwrap();
        let scheduler = TaskScheduler::default();
        let zones = ZoneConfiguration::default();

        assert!(matches!(
            scheduler.schedule(&graph, &one_contractor(1), &[3], &zones),
            Err(ScheduleError::UnknownTask(_))
        ));
        assert_eq!(
            scheduler.schedule(&graph, &one_contractor(1), &[0], &zones).unwrap_err(),
            ScheduleError::UnknownZone("nowhere".into())
        );
    }

    #[test]
    fn test_zone_status_outside_table_is_rejected() {
        let graph = TaskGraph::new(vec![Task::new("A")
            .with_worker_req(driver(1.0, 1, 1))
            .with_zone_req(ZoneReq::new("gate", 3))])
        .unwrap();
        let zones = ZoneConfiguration::new(vec![vec![0; 3]; 3]).with_zone("gate", 1);

        match TaskScheduler::default().schedule(&graph, &one_contractor(1), &[0], &zones) {
            Err(ScheduleError::InvalidInput(errors)) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].kind, ValidationErrorKind::UnknownZoneStatus);
            }
            _ => panic!("expected InvalidInput"),
        }
    }

    #[test]
    fn test_no_sufficient_contractor_propagates() {
        let graph = TaskGraph::new(vec![Task::new("A").with_worker_req(driver(1.0, 4, 4))]).unwrap();
        let result = TaskScheduler::default().schedule(
            &graph,
            &one_contractor(3),
            &[0],
            &ZoneConfiguration::default(),
        );
        assert_eq!(
            result.unwrap_err(),
            ScheduleError::NoSufficientContractor { task_id: "A".into() }
        );
    }

    #[test]
    fn test_time_shift_bounds_every_start() {
        let graph = TaskGraph::new(vec![Task::new("A").with_worker_req(driver(1.0, 1, 1))]).unwrap();
        let config = SchedulerConfig::default().with_assigned_parent_time(10);
        let (schedule, _) = TaskScheduler::new(config)
            .schedule(&graph, &one_contractor(1), &[0], &ZoneConfiguration::default())
            .unwrap();
        assert_eq!(schedule.get(0).unwrap().start, 10);
    }

    #[test]
    fn test_between_fills_earlier_gap() {
        // A blocks the only driver on [0, 4); B waits for A; C has no
        // parent but comes last in the order.
        let graph = TaskGraph::new(vec![
            Task::new("A").with_worker_req(driver(4.0, 1, 1)),
            Task::new("W").with_worker_req(WorkerReq::new("welder", 9.0, 1, 1)),
            Task::new("B").with_worker_req(driver(2.0, 1, 1)).with_parent("W"),
            Task::new("C").with_worker_req(driver(3.0, 1, 1)),
        ])
        .unwrap();
        let contractors = vec![Contractor::new("C1")
            .with_workers("driver", 1)
            .with_workers("welder", 1)];
        let zones = ZoneConfiguration::default();

        let between = SchedulerConfig::default().with_scheduler_type(SchedulerType::Between);
        let (schedule, _) = TaskScheduler::new(between)
            .schedule(&graph, &contractors, &[0, 1, 2, 3], &zones)
            .unwrap();
        // driver is idle on [4, 10) so C fits there
        assert_eq!(schedule.get(2).unwrap().start, 10);
        assert_eq!(schedule.get(3).unwrap().start, 4);

        let (schedule, _) = TaskScheduler::default()
            .schedule(&graph, &contractors, &[0, 1, 2, 3], &zones)
            .unwrap();
        assert_eq!(schedule.get(3).unwrap().start, 12);
    }

    #[test]
    fn test_inserted_claim_keeps_later_switch_free() {
        // Y switches the gate 1 -> 2 on [10, 11); X wants the gate in 1
        // for 11 ticks and must not run into that switch.
        let zone_config = ZoneConfiguration::new(vec![vec![0, 0, 0], vec![0, 0, 1], vec![0, 1, 0]])
            .with_zone("gate", 1);
        let graph = TaskGraph::new(vec![
            Task::new("W").with_worker_req(WorkerReq::new("welder", 9.0, 1, 1)),
            Task::new("Y")
                .with_worker_req(driver(3.0, 1, 1))
                .with_zone_req(ZoneReq::new("gate", 2))
                .with_parent("W"),
            Task::new("X")
                .with_worker_req(driver(11.0, 1, 1))
                .with_zone_req(ZoneReq::new("gate", 1)),
        ])
        .unwrap();
        let contractors = vec![Contractor::new("C1")
            .with_workers("driver", 1)
            .with_workers("welder", 1)];

        for config in both_types() {
            let (schedule, _) = TaskScheduler::new(config.with_validate_result(true))
                .schedule(&graph, &contractors, &[0, 1, 2], &zone_config)
                .unwrap();
            let y = schedule.get(1).unwrap();
            let x = schedule.get(2).unwrap();
            assert_eq!((y.start, y.end), (11, 14));
            assert_eq!(y.zones_pre[0].start_time, 10);
            // after Y, plus the switch back to 1
            assert_eq!((x.start, x.end), (15, 26));
            assert_eq!(x.zones_pre[0].to_status, 1);
        }
    }

    #[test]
    fn test_optimizer_from_config() {
        let graph = TaskGraph::new(vec![Task::new("A").with_worker_req(driver(12.0, 1, 4))]).unwrap();
        let config = SchedulerConfig::default().with_optimizer(OptimizerKind::MaxCount);
        let (schedule, _) = TaskScheduler::new(config)
            .schedule(&graph, &one_contractor(4), &[0], &ZoneConfiguration::default())
            .unwrap();
        let a = schedule.get(0).unwrap();
        assert_eq!(a.worker_count("driver"), 4);
        assert_eq!(a.end, 3);
    }

    #[test]
    fn test_validate_result_passes_on_feasible_schedule() {
        let graph = TaskGraph::new(vec![
            Task::new("A").with_worker_req(driver(4.0, 1, 2)),
            Task::new("B").with_worker_req(driver(4.0, 1, 2)).with_parent("A"),
        ])
        .unwrap();
        let config = SchedulerConfig::default().with_validate_result(true);
        let result = TaskScheduler::new(config).schedule(
            &graph,
            &one_contractor(2),
            &[0, 1],
            &ZoneConfiguration::default(),
        );
        assert!(result.is_ok());
    }
}
