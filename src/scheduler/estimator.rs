//! Work duration estimation.

use std::fmt::Debug;

use crate::models::{Task, Time, Worker, TIME_INF};

/// Execution time of a task given an assigned team.
///
/// Implementations must be pure: the same task and team always give the
/// same duration, since schedules are re-derived from chromosomes.
pub trait WorkTimeEstimator: Debug + Send + Sync {
    /// Duration of `task` performed by `team`.
    fn estimate_time(&self, task: &Task, team: &[Worker]) -> Time;
}

/// Volume over throughput, per worker kind.
///
/// For each requirement: `ceil(volume / (count × productivity))`. The task
/// takes as long as its slowest kind. A required kind missing from the
/// team makes the task take [`TIME_INF`]; service units take 0.
///
/// # Example
///
/// ```
/// use u_project::models::{Task, Worker, WorkerReq};
/// use u_project::scheduler::{DefaultWorkEstimator, WorkTimeEstimator};
///
/// let task = Task::new("dig").with_worker_req(WorkerReq::new("driver", 10.0, 1, 4));
/// let team = vec![Worker::new("driver", 3, "C1")];
/// assert_eq!(DefaultWorkEstimator.estimate_time(&task, &team), 4);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultWorkEstimator;

impl WorkTimeEstimator for DefaultWorkEstimator {
    fn estimate_time(&self, task: &Task, team: &[Worker]) -> Time {
        if task.is_service_unit() {
            return 0;
        }

        let mut time: Time = 0;
        for req in &task.worker_reqs {
            let throughput = team
                .iter()
                .find(|w| w.kind == req.kind)
                .map(|w| w.count as f64 * w.productivity)
                .unwrap_or(0.0);
            if throughput <= 0.0 {
                if req.min_count > 0 {
                    return TIME_INF;
                }
                continue;
            }
            let needed = (req.volume / throughput).ceil();
            let needed = if needed >= TIME_INF as f64 {
                TIME_INF
            } else {
                needed.max(0.0) as Time
            };
            time = time.max(needed);
        }
        time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WorkerReq;

    fn task() -> Task {
        Task::new("T")
            .with_worker_req(WorkerReq::new("driver", 10.0, 1, 4))
            .with_worker_req(WorkerReq::new("welder", 3.0, 1, 2))
    }

    #[test]
    fn test_slowest_kind_wins() {
        let team = vec![Worker::new("driver", 5, "C1"), Worker::new("welder", 1, "C1")];
        // driver: 10/5 = 2, welder: 3/1 = 3
        assert_eq!(DefaultWorkEstimator.estimate_time(&task(), &team), 3);
    }

    #[test]
    fn test_productivity() {
        let team = vec![
            Worker::new("driver", 2, "C1").with_productivity(2.5),
            Worker::new("welder", 2, "C1"),
        ];
        // driver: ceil(10/5) = 2, welder: ceil(3/2) = 2
        assert_eq!(DefaultWorkEstimator.estimate_time(&task(), &team), 2);
    }

    #[test]
    fn test_missing_kind_is_infinite() {
        let team = vec![Worker::new("driver", 2, "C1")];
        assert_eq!(DefaultWorkEstimator.estimate_time(&task(), &team), TIME_INF);
    }

    #[test]
    fn test_service_unit_is_instant() {
        assert_eq!(DefaultWorkEstimator.estimate_time(&Task::new("S"), &[]), 0);
    }
}
