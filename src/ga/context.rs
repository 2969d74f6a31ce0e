//! Shared evaluation state.
//!
//! Fitness evaluation decodes chromosomes independently, so an
//! [`EvaluationContext`] only holds read-only project data behind `Arc`.
//! Every decode builds fresh timelines; nothing is mutated concurrently.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::debug;

use super::{ChromosomeCodec, ScheduleChromosome};
use crate::config::{OptimizerKind, SchedulerConfig};
use crate::models::{Contractor, TaskGraph, ZoneConfiguration};
use crate::scheduler::{TaskScheduler, WorkTimeEstimator};

/// Read-only data needed to evaluate chromosomes.
///
/// Cloning is cheap; clones share the same data.
///
/// # Example
///
/// ```
/// use u_project::ga::EvaluationContext;
/// use u_project::models::{Contractor, Task, TaskGraph, WorkerReq, ZoneConfiguration};
/// use u_project::SchedulerConfig;
///
/// let graph = TaskGraph::new(vec![
///     Task::new("A").with_worker_req(WorkerReq::new("driver", 4.0, 1, 2)),
/// ])
/// .unwrap();
/// let ctx = EvaluationContext::new(
///     graph,
///     vec![Contractor::new("C1").with_workers("driver", 2)],
///     ZoneConfiguration::default(),
///     SchedulerConfig::default(),
/// );
///
/// let seeds = ctx.heuristic_seeds();
/// let fitness = ctx.evaluate(&seeds, None);
/// assert_eq!(fitness[0], Some(2.0));
/// ```
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    codec: Arc<ChromosomeCodec>,
}

impl EvaluationContext {
    /// Bundles a project with the default estimator.
    pub fn new(
        graph: TaskGraph,
        contractors: Vec<Contractor>,
        zone_config: ZoneConfiguration,
        config: SchedulerConfig,
    ) -> Self {
        Self::with_scheduler(graph, contractors, zone_config, TaskScheduler::new(config))
    }

    /// Bundles a project with a preconfigured scheduler.
    pub fn with_scheduler(
        graph: TaskGraph,
        contractors: Vec<Contractor>,
        zone_config: ZoneConfiguration,
        scheduler: TaskScheduler,
    ) -> Self {
        let codec = ChromosomeCodec::new(
            Arc::new(graph),
            Arc::new(contractors),
            Arc::new(zone_config),
            scheduler,
        );
        Self {
            codec: Arc::new(codec),
        }
    }

    /// The codec.
    pub fn codec(&self) -> &ChromosomeCodec {
        &self.codec
    }

    /// The project graph.
    pub fn graph(&self) -> &TaskGraph {
        self.codec.graph()
    }

    /// The contractors.
    pub fn contractors(&self) -> &[Contractor] {
        self.codec.contractors()
    }

    /// The zone configuration.
    pub fn zone_config(&self) -> &ZoneConfiguration {
        self.codec.zone_config()
    }

    /// The duration estimator.
    pub fn estimator(&self) -> &dyn WorkTimeEstimator {
        self.codec.scheduler().estimator().as_ref()
    }

    /// Makespan of the decoded chromosome; infinity when it cannot be
    /// decoded.
    pub fn fitness(&self, chromosome: &ScheduleChromosome) -> f64 {
        match self.codec.decode(chromosome) {
            Ok(schedule) => schedule.makespan() as f64,
            Err(e) => {
                debug!(error = %e, "chromosome rejected");
                f64::INFINITY
            }
        }
    }

    /// Evaluates chromosomes in parallel.
    ///
    /// Once `cancel` is set, chromosomes not yet started yield `None`.
    pub fn evaluate(
        &self,
        chromosomes: &[ScheduleChromosome],
        cancel: Option<&AtomicBool>,
    ) -> Vec<Option<f64>> {
        chromosomes
            .par_iter()
            .map(|ch| {
                if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                    None
                } else {
                    Some(self.fitness(ch))
                }
            })
            .collect()
    }

    /// Encoded heuristic schedules, one per optimizer strategy.
    ///
    /// Strategies whose run fails are skipped.
    pub fn heuristic_seeds(&self) -> Vec<ScheduleChromosome> {
        let base = self.codec.scheduler().config().clone();
        [
            base.optimizer,
            OptimizerKind::AverageReq { divisor: 2.0 },
            OptimizerKind::MaxCount,
        ]
        .into_iter()
        .enumerate()
        .filter(|&(i, kind)| i == 0 || kind != base.optimizer)
        .filter_map(|(_, kind)| {
            let scheduler = self
                .codec
                .scheduler()
                .clone()
                .with_optimizer(Arc::from(crate::scheduler::optimizer_from_kind(kind)));
            let (schedule, _) = scheduler
                .schedule_by_priority(self.graph(), self.contractors(), self.zone_config())
                .ok()?;
            let mut chromosome = self.codec.encode(&schedule);
            chromosome.fitness = schedule.makespan() as f64;
            Some(chromosome)
        })
        .collect()
    }
}
