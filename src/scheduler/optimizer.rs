//! Worker-count optimizers.
//!
//! An optimizer picks a count per worker kind within `[min, max]`. It
//! sees the timelines only through a [`FinishTimeQuery`], so it cannot
//! mutate scheduling state.
//!
//! | Optimizer | Strategy | Queries |
//! |-----------|----------|---------|
//! | [`CoordinateDescentOptimizer`] | per-kind integer dichotomy | O(k log n) |
//! | [`AverageReqOptimizer`] | fixed fraction of the range | 0 |
//! | [`MaxCountOptimizer`] | upper bound | 0 |

use std::fmt::Debug;

use crate::config::OptimizerKind;
use crate::models::{Time, Worker};

/// Finish time of the task being placed, for a candidate team.
pub trait FinishTimeQuery {
    /// Finish time if `team` were used.
    fn finish_time(&self, team: &[Worker]) -> Time;
}

/// Chooses worker counts within bounds.
pub trait ResourceOptimizer: Debug + Send + Sync {
    /// Sets `team[i].count` within `[min_counts[i], max_counts[i]]`.
    fn optimize(
        &self,
        team: &mut [Worker],
        min_counts: &[u32],
        max_counts: &[u32],
        finish: &dyn FinishTimeQuery,
    );
}

/// Builds the optimizer selected in the configuration.
pub fn optimizer_from_kind(kind: OptimizerKind) -> Box<dyn ResourceOptimizer> {
    match kind {
        OptimizerKind::CoordinateDescent => Box::new(CoordinateDescentOptimizer),
        OptimizerKind::AverageReq { divisor } => Box::new(AverageReqOptimizer::new(divisor)),
        OptimizerKind::MaxCount => Box::new(MaxCountOptimizer),
    }
}

/// One kind at a time, integer ternary search on the finish time.
///
/// The search narrows `[min, max]` while more than three candidates
/// remain, then scans the rest linearly. Among equal finish times the
/// smallest count wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinateDescentOptimizer;

impl ResourceOptimizer for CoordinateDescentOptimizer {
    fn optimize(
        &self,
        team: &mut [Worker],
        min_counts: &[u32],
        max_counts: &[u32],
        finish: &dyn FinishTimeQuery,
    ) {
        for i in 0..team.len() {
            let (lo, hi) = (min_counts[i], max_counts[i].max(min_counts[i]));
            let mut finish_with = |count: u32| {
                team[i].count = count;
                finish.finish_time(team)
            };
            let best = dichotomy_int(lo, hi, &mut finish_with);
            team[i].count = best;
        }
    }
}

/// Integer ternary search for the first minimizer of `f` on `[lo, hi]`.
fn dichotomy_int(mut lo: u32, mut hi: u32, f: &mut impl FnMut(u32) -> Time) -> u32 {
    while hi - lo > 2 {
        let m1 = lo + (hi - lo) / 3;
        let m2 = hi - (hi - lo) / 3;
        if f(m1) <= f(m2) {
            hi = m2 - 1;
        } else {
            lo = m1 + 1;
        }
    }

    let mut best = lo;
    let mut best_time = f(lo);
    for count in lo + 1..=hi {
        let time = f(count);
        if time < best_time {
            best = count;
            best_time = time;
        }
    }
    best
}

/// `(min + max) / divisor`, clamped into the bounds.
///
/// With the default divisor of 2 this is the middle of the range.
#[derive(Debug, Clone, Copy)]
pub struct AverageReqOptimizer {
    divisor: f64,
}

impl AverageReqOptimizer {
    /// Creates an optimizer with the given divisor.
    pub fn new(divisor: f64) -> Self {
        Self { divisor }
    }
}

impl Default for AverageReqOptimizer {
    fn default() -> Self {
        Self::new(2.0)
    }
}

impl ResourceOptimizer for AverageReqOptimizer {
    fn optimize(
        &self,
        team: &mut [Worker],
        min_counts: &[u32],
        max_counts: &[u32],
        _finish: &dyn FinishTimeQuery,
    ) {
        for (i, worker) in team.iter_mut().enumerate() {
            let (lo, hi) = (min_counts[i], max_counts[i].max(min_counts[i]));
            let count = ((lo + hi) as f64 / self.divisor).floor() as u32;
            worker.count = count.clamp(lo, hi);
        }
    }
}

/// Always staffs the upper bound.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxCountOptimizer;

impl ResourceOptimizer for MaxCountOptimizer {
    fn optimize(
        &self,
        team: &mut [Worker],
        _min_counts: &[u32],
        max_counts: &[u32],
        _finish: &dyn FinishTimeQuery,
    ) {
        for (worker, &max) in team.iter_mut().zip(max_counts) {
            worker.count = max;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Unimodal in the count, minimum at 6.
    #[derive(Default)]
    struct ConvexFinishTime {
        calls: Cell<usize>,
    }

    impl FinishTimeQuery for ConvexFinishTime {
        fn finish_time(&self, team: &[Worker]) -> Time {
            self.calls.set(self.calls.get() + 1);
            let count = team[0].count as Time;
            (count - 6) * (count - 6) + 10
        }
    }

    struct FlatFinishTime;

    impl FinishTimeQuery for FlatFinishTime {
        fn finish_time(&self, _team: &[Worker]) -> Time {
            10
        }
    }

    fn team() -> Vec<Worker> {
        vec![Worker::new("driver", 20, "C1")]
    }

    #[test]
    fn test_coordinate_descent_finds_minimum() {
        let finish = ConvexFinishTime::default();
        let mut team = team();
        CoordinateDescentOptimizer.optimize(&mut team, &[1], &[20], &finish);
        assert_eq!(team[0].count, 6);
        assert!(finish.calls.get() < 20);
    }

    #[test]
    fn test_coordinate_descent_prefers_fewer_on_ties() {
        let mut team = team();
        CoordinateDescentOptimizer.optimize(&mut team, &[3], &[9], &FlatFinishTime);
        assert_eq!(team[0].count, 3);
    }

    #[test]
    fn test_coordinate_descent_single_point() {
        let mut team = team();
        CoordinateDescentOptimizer.optimize(&mut team, &[4], &[4], &FlatFinishTime);
        assert_eq!(team[0].count, 4);
    }

    #[test]
    fn test_average_req() {
        let mut team = vec![Worker::new("a", 0, "C1"), Worker::new("b", 0, "C1")];
        AverageReqOptimizer::default().optimize(&mut team, &[1, 2], &[5, 2], &FlatFinishTime);
        assert_eq!(team[0].count, 3);
        assert_eq!(team[1].count, 2);

        AverageReqOptimizer::new(4.0).optimize(&mut team, &[1, 2], &[5, 2], &FlatFinishTime);
        // floor(6/4) = 1, floor(4/4) = 1 clamped to 2
        assert_eq!(team[0].count, 1);
        assert_eq!(team[1].count, 2);
    }

    #[test]
    fn test_max_count() {
        let mut team = team();
        MaxCountOptimizer.optimize(&mut team, &[1], &[7], &FlatFinishTime);
        assert_eq!(team[0].count, 7);
    }

    #[test]
    fn test_optimizer_from_kind() {
        let opt = optimizer_from_kind(OptimizerKind::MaxCount);
        let mut team = team();
        opt.optimize(&mut team, &[1], &[2], &FlatFinishTime);
        assert_eq!(team[0].count, 2);
    }
}
