//! Priority ordering of tasks.
//!
//! # Algorithm
//! HEFT-style upward rank: a task's rank is its nominal duration plus the
//! largest rank among its children, i.e. the length of the longest path
//! from the task to the end of the project. Tasks are then emitted in a
//! topological order that always picks the ready chain with the highest
//! rank (ties to the lower index). Inseparable chains stay contiguous.
//!
//! Nominal durations use the midpoint team of every requirement.
//!
//! # Reference
//! Topcuoglu, Hariri & Wu (2002), "Performance-effective and
//! low-complexity task scheduling for heterogeneous computing", IEEE TPDS

use std::cmp::Reverse;

use super::WorkTimeEstimator;
use crate::models::{TaskGraph, Time, Worker};

/// Upward rank of every task.
pub fn upward_ranks(graph: &TaskGraph, estimator: &dyn WorkTimeEstimator) -> Vec<Time> {
    let n = graph.len();
    let durations: Vec<Time> = graph
        .tasks()
        .iter()
        .map(|task| {
            let team: Vec<Worker> = task
                .worker_reqs
                .iter()
                .map(|r| Worker::new(&r.kind, (r.min_count + r.max_count).div_ceil(2).max(1), ""))
                .collect();
            estimator.estimate_time(task, &team)
        })
        .collect();

    let mut ranks = vec![0; n];
    for &i in graph.topological_order().iter().rev() {
        let tail = graph
            .children(i)
            .iter()
            .map(|&c| ranks[c])
            .max()
            .unwrap_or(0);
        ranks[i] = durations[i].saturating_add(tail);
    }
    ranks
}

/// Placement order, highest priority first.
///
/// # Example
///
/// ```
/// use u_project::models::{Task, TaskGraph, WorkerReq};
/// use u_project::scheduler::{prioritization, DefaultWorkEstimator};
///
/// let graph = TaskGraph::new(vec![
///     Task::new("short").with_worker_req(WorkerReq::new("driver", 1.0, 1, 1)),
///     Task::new("long").with_worker_req(WorkerReq::new("driver", 9.0, 1, 1)),
/// ])
/// .unwrap();
///
/// assert_eq!(prioritization(&graph, &DefaultWorkEstimator), vec![1, 0]);
/// ```
pub fn prioritization(graph: &TaskGraph, estimator: &dyn WorkTimeEstimator) -> Vec<usize> {
    let ranks = upward_ranks(graph, estimator);
    graph
        .contracted_order_by(|head| (ranks[head], Reverse(head)))
        .into_iter()
        .flat_map(|head| graph.inseparable_chain(head))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Task, WorkerReq};
    use crate::scheduler::DefaultWorkEstimator;

    fn task(id: &str, volume: f64) -> Task {
        Task::new(id).with_worker_req(WorkerReq::new("driver", volume, 1, 1))
    }

    #[test]
    fn test_ranks_follow_longest_path() {
        let graph = TaskGraph::new(vec![
            task("A", 2.0),
            task("B", 3.0).with_parent("A"),
            task("C", 7.0).with_parent("A"),
            task("D", 1.0).with_parent("B").with_parent("C"),
        ])
        .unwrap();
        let ranks = upward_ranks(&graph, &DefaultWorkEstimator);
        assert_eq!(ranks, vec![10, 4, 8, 1]);
    }

    #[test]
    fn test_order_is_topological_and_ranked() {
        let graph = TaskGraph::new(vec![
            task("A", 2.0),
            task("B", 3.0).with_parent("A"),
            task("C", 7.0).with_parent("A"),
            task("D", 1.0).with_parent("B").with_parent("C"),
        ])
        .unwrap();
        assert_eq!(prioritization(&graph, &DefaultWorkEstimator), vec![0, 2, 1, 3]);
    }

    #[test]
    fn test_chain_stays_contiguous() {
        let graph = TaskGraph::new(vec![
            task("A", 1.0),
            task("B", 1.0).with_inseparable_parent("A"),
            task("C", 5.0),
        ])
        .unwrap();
        let order = prioritization(&graph, &DefaultWorkEstimator);
        assert_eq!(order, vec![2, 0, 1]);
    }
}
