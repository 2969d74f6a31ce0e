//! Schedule ⇄ chromosome conversion.
//!
//! [`ChromosomeCodec::encode`] reads a schedule into a chromosome;
//! [`ChromosomeCodec::decode`] re-drives the scheduler with the encoded
//! order and teams. No optimizer search runs during decoding.
//!
//! Encoding orders tasks by start time within a topological order, so
//! decoding the encoding of a schedule yields the same teams. Without zone
//! claims, and with chain members depending only on their chain, the
//! finish time is also no later than the encoded one.

use std::cmp::Reverse;
use std::sync::Arc;

use super::ScheduleChromosome;
use crate::error::{Result, ScheduleError};
use crate::models::{Contractor, Schedule, TaskGraph, Worker, WorkerReq, ZoneConfiguration, TIME_INF};
use crate::scheduler::{can_staff, merge_worker_reqs, TaskScheduler};

/// Encodes and decodes chromosomes for one project.
///
/// Worker kinds are the graph's kinds sorted by name; contractor indices
/// are positions in the contractor slice.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use u_project::ga::ChromosomeCodec;
/// use u_project::models::{Contractor, Task, TaskGraph, WorkerReq, ZoneConfiguration};
/// use u_project::scheduler::TaskScheduler;
///
/// let graph = TaskGraph::new(vec![
///     Task::new("dig").with_worker_req(WorkerReq::new("driver", 6.0, 1, 3)),
/// ])
/// .unwrap();
/// let codec = ChromosomeCodec::new(
///     Arc::new(graph),
///     Arc::new(vec![Contractor::new("C1").with_workers("driver", 3)]),
///     Arc::new(ZoneConfiguration::default()),
///     TaskScheduler::default(),
/// );
///
/// let (schedule, _) = codec.schedule_by_priority().unwrap();
/// let chromosome = codec.encode(&schedule);
/// assert_eq!(chromosome.resources, vec![vec![3], vec![0]]);
/// assert_eq!(codec.decode(&chromosome).unwrap().makespan(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct ChromosomeCodec {
    graph: Arc<TaskGraph>,
    contractors: Arc<Vec<Contractor>>,
    zone_config: Arc<ZoneConfiguration>,
    scheduler: TaskScheduler,
    kinds: Vec<String>,
    /// Merged worker requirements per chain head (empty for sons).
    chain_reqs: Vec<Vec<WorkerReq>>,
}

impl ChromosomeCodec {
    /// Creates a codec for a project.
    pub fn new(
        graph: Arc<TaskGraph>,
        contractors: Arc<Vec<Contractor>>,
        zone_config: Arc<ZoneConfiguration>,
        scheduler: TaskScheduler,
    ) -> Self {
        let kinds = graph.worker_kinds();
        let chain_reqs = (0..graph.len())
            .map(|i| {
                if graph.is_inseparable_son(i) {
                    Vec::new()
                } else {
                    merge_worker_reqs(&graph, &graph.inseparable_chain(i))
                }
            })
            .collect();
        Self {
            graph,
            contractors,
            zone_config,
            scheduler,
            kinds,
            chain_reqs,
        }
    }

    /// The project graph.
    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    /// The contractors.
    pub fn contractors(&self) -> &[Contractor] {
        &self.contractors
    }

    /// The zone configuration.
    pub fn zone_config(&self) -> &ZoneConfiguration {
        &self.zone_config
    }

    /// The scheduler used for decoding.
    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    /// Worker kinds, in row order.
    pub fn kinds(&self) -> &[String] {
        &self.kinds
    }

    /// Number of matrix rows (kinds plus the contractor row).
    pub fn row_count(&self) -> usize {
        self.kinds.len() + 1
    }

    /// Row of a worker kind.
    pub fn kind_row(&self, kind: &str) -> Option<usize> {
        self.kinds.binary_search_by(|k| k.as_str().cmp(kind)).ok()
    }

    /// Worker requirements of the chain headed by `head`.
    pub(crate) fn chain_reqs(&self, head: usize) -> &[WorkerReq] {
        &self.chain_reqs[head]
    }

    /// Admissible count range of `req`.
    pub(crate) fn count_bounds(&self, req: &WorkerReq) -> (u32, u32) {
        (req.min_count, req.max_count)
    }

    /// Contractors able to staff the chain headed by `head`.
    pub(crate) fn feasible_contractors(&self, head: usize) -> Vec<usize> {
        let reqs = self.chain_reqs(head);
        (0..self.contractors.len())
            .filter(|&c| can_staff(&self.contractors[c], reqs))
            .collect()
    }

    /// Runs the scheduler in priority order with optimizer search.
    pub fn schedule_by_priority(&self) -> Result<(Schedule, Vec<usize>)> {
        self.scheduler
            .schedule_by_priority(&self.graph, &self.contractors, &self.zone_config)
    }

    /// Reads a schedule into a chromosome.
    ///
    /// Unplaced tasks sort last and carry zero counts.
    pub fn encode(&self, schedule: &Schedule) -> ScheduleChromosome {
        let n = self.graph.len();
        let start_of = |i: usize| schedule.get(i).map(|t| t.start).unwrap_or(TIME_INF);
        let order: Vec<usize> = self
            .graph
            .contracted_order_by(|head| Reverse((start_of(head), head)))
            .into_iter()
            .flat_map(|head| self.graph.inseparable_chain(head))
            .collect();

        let mut resources = vec![vec![0u32; n]; self.row_count()];
        for task in schedule.iter() {
            for worker in &task.workers {
                if let Some(row) = self.kind_row(&worker.kind) {
                    resources[row][task.task_index] = worker.count;
                }
            }
            let contractor = task
                .contractor_id
                .as_deref()
                .and_then(|id| self.contractors.iter().position(|c| c.id == id))
                .unwrap_or(0);
            resources[self.kinds.len()][task.task_index] = contractor as u32;
        }

        ScheduleChromosome::new(order, resources)
    }

    /// Builds the schedule a chromosome describes.
    ///
    /// # Errors
    /// - [`ScheduleError::InvalidChromosome`] when the shape, a contractor
    ///   index or a count does not fit the project
    /// - any error of [`TaskScheduler::schedule`], e.g.
    ///   [`ScheduleError::PrecedenceOrder`] for an infeasible order
    pub fn decode(&self, chromosome: &ScheduleChromosome) -> Result<Schedule> {
        self.decode_with_order(chromosome).map(|(schedule, _)| schedule)
    }

    /// Like [`decode`](Self::decode), also returning the placement order.
    pub fn decode_with_order(
        &self,
        chromosome: &ScheduleChromosome,
    ) -> Result<(Schedule, Vec<usize>)> {
        let teams = self.teams(chromosome)?;
        self.scheduler.schedule_with_teams(
            &self.graph,
            &self.contractors,
            &chromosome.order,
            &self.zone_config,
            &teams,
        )
    }

    fn teams(&self, chromosome: &ScheduleChromosome) -> Result<Vec<(Option<usize>, Vec<Worker>)>> {
        let n = self.graph.len();
        if !chromosome.has_shape(n, self.row_count()) {
            return Err(ScheduleError::InvalidChromosome(format!(
                "expected a permutation of {n} tasks and a {}x{n} matrix",
                self.row_count()
            )));
        }

        let mut teams = vec![(None, Vec::new()); n];
        for head in (0..n).filter(|&i| !self.graph.is_inseparable_son(i)) {
            let reqs = self.chain_reqs(head);
            if reqs.is_empty() {
                continue;
            }
            let contractor_index = chromosome.contractor(head);
            let Some(contractor) = self.contractors.get(contractor_index) else {
                return Err(ScheduleError::InvalidChromosome(format!(
                    "task '{}' uses unknown contractor #{contractor_index}",
                    self.graph.task(head).id
                )));
            };
            if !can_staff(contractor, reqs) {
                return Err(ScheduleError::InvalidChromosome(format!(
                    "contractor '{}' cannot staff task '{}'",
                    contractor.id,
                    self.graph.task(head).id
                )));
            }

            let mut team = Vec::with_capacity(reqs.len());
            for req in reqs {
                let count = self
                    .kind_row(&req.kind)
                    .map(|row| chromosome.count(row, head))
                    .unwrap_or(0);
                let (lo, hi) = self.count_bounds(req);
                if count < lo || count > hi {
                    return Err(ScheduleError::InvalidChromosome(format!(
                        "task '{}' has {count} '{}', allowed [{lo}, {hi}] at '{}'",
                        self.graph.task(head).id,
                        req.kind,
                        contractor.id
                    )));
                }
                if let Some(worker) = contractor.workers.get(&req.kind) {
                    team.push(worker.with_count(count));
                }
            }
            teams[head] = (Some(contractor_index), team);
        }
        Ok(teams)
    }
}
