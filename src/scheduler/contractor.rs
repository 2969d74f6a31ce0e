//! Contractor selection and worker-count bounds.

use std::fmt::Debug;

use crate::error::{Result, ScheduleError};
use crate::models::{Contractor, Worker, WorkerReq};

/// Chosen contractor with per-kind count bounds.
///
/// `team`, `min_counts` and `max_counts` follow the order of the
/// requirements they were computed for. The team starts at the upper
/// bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerBorders {
    /// Position of the contractor in the contractor slice.
    pub contractor_index: usize,
    /// Candidate team.
    pub team: Vec<Worker>,
    /// Lower count bound per kind.
    pub min_counts: Vec<u32>,
    /// Upper count bound per kind.
    pub max_counts: Vec<u32>,
}

/// Picks the contractor for a task and the admissible team sizes.
pub trait ContractorLookup: Debug + Send + Sync {
    /// # Errors
    /// [`ScheduleError::NoSufficientContractor`] when no contractor can
    /// ever staff the requirements.
    fn get_best_contractor_and_worker_borders(
        &self,
        task_id: &str,
        reqs: &[WorkerReq],
        contractors: &[Contractor],
    ) -> Result<WorkerBorders>;
}

/// Largest-capacity contractor among those able to staff every kind.
///
/// A contractor qualifies when its capacity reaches `max_count` for every
/// requirement. Among qualifying contractors the one with the most workers
/// of the required kinds wins; ties go to the earlier contractor. Bounds
/// are the requirements' own `[min_count, max_count]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultContractorLookup;

/// Whether `contractor` can supply the upper bound of every requirement.
pub(crate) fn can_staff(contractor: &Contractor, reqs: &[WorkerReq]) -> bool {
    reqs.iter().all(|r| contractor.capacity(&r.kind) >= r.max_count)
}

impl ContractorLookup for DefaultContractorLookup {
    fn get_best_contractor_and_worker_borders(
        &self,
        task_id: &str,
        reqs: &[WorkerReq],
        contractors: &[Contractor],
    ) -> Result<WorkerBorders> {
        let pool_size = |c: &Contractor| -> u32 { reqs.iter().map(|r| c.capacity(&r.kind)).sum() };

        let mut best: Option<(usize, u32)> = None;
        for (i, contractor) in contractors.iter().enumerate() {
            if !can_staff(contractor, reqs) {
                continue;
            }
            let total = pool_size(contractor);
            if best.map_or(true, |(_, b)| total > b) {
                best = Some((i, total));
            }
        }

        let Some((contractor_index, _)) = best else {
            return Err(ScheduleError::NoSufficientContractor {
                task_id: task_id.to_string(),
            });
        };
        let contractor = &contractors[contractor_index];

        let min_counts: Vec<u32> = reqs.iter().map(|r| r.min_count).collect();
        let max_counts: Vec<u32> = reqs.iter().map(|r| r.max_count).collect();
        let team = reqs
            .iter()
            .filter_map(|r| contractor.workers.get(&r.kind).map(|w| w.with_count(r.max_count)))
            .collect();

        Ok(WorkerBorders {
            contractor_index,
            team,
            min_counts,
            max_counts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reqs() -> Vec<WorkerReq> {
        vec![
            WorkerReq::new("driver", 10.0, 2, 4),
            WorkerReq::new("welder", 5.0, 1, 3),
        ]
    }

    #[test]
    fn test_picks_largest_pool() {
        let contractors = vec![
            Contractor::new("small").with_workers("driver", 2).with_workers("welder", 1),
            Contractor::new("mid").with_workers("driver", 4).with_workers("welder", 3),
            Contractor::new("big").with_workers("driver", 10).with_workers("welder", 3),
        ];
        let borders = DefaultContractorLookup
            .get_best_contractor_and_worker_borders("T", &reqs(), &contractors)
            .unwrap();

        assert_eq!(borders.contractor_index, 2);
        assert_eq!(borders.min_counts, vec![2, 1]);
        assert_eq!(borders.max_counts, vec![4, 3]);
        assert_eq!(borders.team[0].count, 4);
        assert_eq!(borders.team[1].count, 3);
        assert_eq!(borders.team[0].contractor_id, "big");
    }

    #[test]
    fn test_tie_keeps_first() {
        let contractors = vec![
            Contractor::new("a").with_workers("driver", 5).with_workers("welder", 3),
            Contractor::new("b").with_workers("driver", 4).with_workers("welder", 4),
        ];
        let borders = DefaultContractorLookup
            .get_best_contractor_and_worker_borders("T", &reqs(), &contractors)
            .unwrap();
        assert_eq!(borders.contractor_index, 0);
    }

    #[test]
    fn test_capacity_below_upper_bound_is_insufficient() {
        // Enough drivers for min_count, not for max_count
        let reqs = vec![WorkerReq::new("driver", 4.0, 1, 4)];
        let contractors = vec![Contractor::new("a").with_workers("driver", 3)];
        let result =
            DefaultContractorLookup.get_best_contractor_and_worker_borders("T", &reqs, &contractors);
        assert_eq!(
            result,
            Err(ScheduleError::NoSufficientContractor {
                task_id: "T".into()
            })
        );
    }

    #[test]
    fn test_no_sufficient_contractor() {
        let contractors = vec![Contractor::new("a").with_workers("driver", 1).with_workers("welder", 5)];
        let result =
            DefaultContractorLookup.get_best_contractor_and_worker_borders("T", &reqs(), &contractors);
        assert_eq!(
            result,
            Err(ScheduleError::NoSufficientContractor {
                task_id: "T".into()
            })
        );
    }
}
