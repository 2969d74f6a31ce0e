//! Project GA problem definition.
//!
//! Implements `u_metaheur::ga::GaProblem` for project scheduling. The
//! initial population starts with encoded heuristic schedules, then fills
//! up with random precedence-feasible orders and random counts.
//!
//! # Reference
//! Hartmann (1998), "A competitive genetic algorithm for
//! resource-constrained project scheduling", Naval Research Logistics 45

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::prelude::IndexedRandom;
use rand::Rng;
use u_metaheur::ga::GaProblem;

use super::operators::GeneticOperators;
use super::{ChromosomeCodec, EvaluationContext, ScheduleChromosome};

/// GA problem over a project.
///
/// Fitness is the makespan of the decoded schedule (infinity when the
/// chromosome cannot be decoded). Crossover is the framework default.
///
/// # Example
/// ```no_run
/// use u_project::ga::{EvaluationContext, ProjectGaProblem};
/// use u_project::models::{TaskGraph, ZoneConfiguration};
/// use u_project::SchedulerConfig;
/// use u_metaheur::ga::{GaConfig, GaRunner};
///
/// let graph = TaskGraph::new(vec![/* ... */]).unwrap();
/// let ctx = EvaluationContext::new(graph, vec![], ZoneConfiguration::default(), SchedulerConfig::default());
/// let problem = ProjectGaProblem::new(ctx).with_heuristic_seeds();
/// let result = GaRunner::run(&problem, &GaConfig::default());
/// ```
#[derive(Debug)]
pub struct ProjectGaProblem {
    context: EvaluationContext,
    seeds: Vec<ScheduleChromosome>,
    next_seed: AtomicUsize,
    operators: GeneticOperators,
}

impl ProjectGaProblem {
    /// Creates a problem without seeds.
    pub fn new(context: EvaluationContext) -> Self {
        Self {
            context,
            seeds: Vec::new(),
            next_seed: AtomicUsize::new(0),
            operators: GeneticOperators::default(),
        }
    }

    /// Adds chromosomes handed out first by `create_individual`.
    pub fn with_seeds(mut self, seeds: Vec<ScheduleChromosome>) -> Self {
        self.seeds.extend(seeds);
        self
    }

    /// Seeds the population with [`EvaluationContext::heuristic_seeds`].
    pub fn with_heuristic_seeds(self) -> Self {
        let seeds = self.context.heuristic_seeds();
        self.with_seeds(seeds)
    }

    /// Sets the mutation strategy.
    pub fn with_operators(mut self, operators: GeneticOperators) -> Self {
        self.operators = operators;
        self
    }

    /// The evaluation context.
    pub fn context(&self) -> &EvaluationContext {
        &self.context
    }

    /// The seeds.
    pub fn seeds(&self) -> &[ScheduleChromosome] {
        &self.seeds
    }
}

/// A random precedence-feasible order with chains contiguous.
fn random_order<R: Rng>(codec: &ChromosomeCodec, rng: &mut R) -> Vec<usize> {
    let graph = codec.graph();
    let n = graph.len();

    let mut indegree = vec![0usize; n];
    let mut unit_children: Vec<Vec<usize>> = vec![Vec::new(); n];
    for head in (0..n).filter(|&i| !graph.is_inseparable_son(i)) {
        for p in graph.chain_external_parents(head) {
            unit_children[graph.chain_head(p)].push(head);
            indegree[head] += 1;
        }
    }

    let mut ready: Vec<usize> = (0..n)
        .filter(|&i| !graph.is_inseparable_son(i) && indegree[i] == 0)
        .collect();
    let mut order = Vec::with_capacity(n);
    while !ready.is_empty() {
        let head = ready.swap_remove(rng.random_range(0..ready.len()));
        order.extend(graph.inseparable_chain(head));
        for &child in &unit_children[head] {
            indegree[child] -= 1;
            if indegree[child] == 0 {
                ready.push(child);
            }
        }
    }
    order
}

/// Random contractor and counts per chain, within bounds.
fn random_resources<R: Rng>(codec: &ChromosomeCodec, rng: &mut R) -> Vec<Vec<u32>> {
    let graph = codec.graph();
    let n = graph.len();
    let mut chromosome = ScheduleChromosome::new(Vec::new(), vec![vec![0; n]; codec.row_count()]);

    for head in (0..n).filter(|&i| !graph.is_inseparable_son(i)) {
        let reqs = codec.chain_reqs(head);
        if reqs.is_empty() {
            continue;
        }
        let contractor = codec
            .feasible_contractors(head)
            .choose(rng)
            .copied()
            .unwrap_or(0);

        let mut column = vec![0u32; codec.row_count()];
        for req in reqs {
            let (lo, hi) = codec.count_bounds(req);
            if let Some(row) = codec.kind_row(&req.kind) {
                column[row] = if lo < hi { rng.random_range(lo..=hi) } else { lo };
            }
        }
        column[codec.kinds().len()] = contractor as u32;
        chromosome.set_column(&graph.inseparable_chain(head), &column);
    }
    chromosome.resources
}

impl GaProblem for ProjectGaProblem {
    type Individual = ScheduleChromosome;

    fn create_individual<R: Rng>(&self, rng: &mut R) -> ScheduleChromosome {
        let i = self.next_seed.fetch_add(1, Ordering::Relaxed);
        if let Some(seed) = self.seeds.get(i) {
            return seed.clone();
        }
        let codec = self.context.codec();
        ScheduleChromosome::new(random_order(codec, rng), random_resources(codec, rng))
    }

    fn evaluate(&self, individual: &ScheduleChromosome) -> f64 {
        self.context.fitness(individual)
    }

    fn mutate<R: Rng>(&self, individual: &mut ScheduleChromosome, rng: &mut R) {
        self.operators.mutate(individual, self.context.codec(), rng);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;
    use crate::models::{Contractor, Task, TaskGraph, WorkerReq, ZoneConfiguration};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use u_metaheur::ga::{GaConfig, GaRunner};

    fn make_test_problem() -> ProjectGaProblem {
        let graph = TaskGraph::new(vec![
            Task::new("A").with_worker_req(WorkerReq::new("driver", 6.0, 1, 3)),
            Task::new("B")
                .with_worker_req(WorkerReq::new("welder", 4.0, 1, 2))
                .with_parent("A"),
            Task::new("C").with_worker_req(WorkerReq::new("driver", 3.0, 1, 3)),
            Task::new("D")
                .with_worker_req(WorkerReq::new("driver", 2.0, 1, 2))
                .with_inseparable_parent("C"),
            Task::new("E").with_parent("B").with_parent("D"),
        ])
        .unwrap();
        let contractors = vec![
            Contractor::new("C1").with_workers("driver", 3).with_workers("welder", 1),
            Contractor::new("C2").with_workers("driver", 2).with_workers("welder", 2),
        ];
        let ctx = EvaluationContext::new(
            graph,
            contractors,
            ZoneConfiguration::default(),
            SchedulerConfig::default(),
        );
        ProjectGaProblem::new(ctx)
    }

    #[test]
    fn test_random_individuals_decode() {
        let problem = make_test_problem();
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..50 {
            let ch = problem.create_individual(&mut rng);
            assert!(ch.has_shape(5, 3));
            assert!(problem.evaluate(&ch).is_finite());
        }
    }

    #[test]
    fn test_seeds_come_first() {
        let problem = make_test_problem().with_heuristic_seeds();
        let seeds = problem.seeds().to_vec();
        assert!(!seeds.is_empty());

        let mut rng = SmallRng::seed_from_u64(42);
        for seed in &seeds {
            assert_eq!(&problem.create_individual(&mut rng), seed);
        }
        // then random
        let ch = problem.create_individual(&mut rng);
        assert!(ch.fitness.is_infinite());
    }

    #[test]
    fn test_mutation_keeps_decodable() {
        let problem = make_test_problem();
        let mut rng = SmallRng::seed_from_u64(3);
        let mut ch = problem.create_individual(&mut rng);
        for _ in 0..100 {
            problem.mutate(&mut ch, &mut rng);
            assert!(problem.evaluate(&ch).is_finite());
        }
    }

    #[test]
    fn test_ga_runner_integration() {
        let problem = make_test_problem().with_heuristic_seeds();
        let best_seed = problem
            .seeds()
            .iter()
            .map(|s| problem.evaluate(s))
            .fold(f64::INFINITY, f64::min);

        let config = GaConfig::default()
            .with_population_size(20)
            .with_max_generations(10)
            .with_seed(42)
            .with_parallel(false);
        let result = GaRunner::run(&problem, &config).unwrap();

        assert!(result.best_fitness.is_finite());
        assert!(result.best_fitness <= best_seed);
        assert!(result.generations > 0);
        let schedule = problem.context().codec().decode(&result.best).unwrap();
        assert_eq!(schedule.makespan() as f64, result.best_fitness);
    }
}
