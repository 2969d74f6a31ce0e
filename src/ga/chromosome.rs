//! Order/resource chromosome for project scheduling.
//!
//! # Encoding
//!
//! The chromosome consists of two parts:
//! - **Order**: a permutation of task indices. Decoding places tasks in
//!   this order, so it must list parents before children.
//! - **Resources**: a `(kinds + 1) × tasks` matrix. Row `k` holds the
//!   count of worker kind `k` (kinds sorted by name); the last row holds
//!   the contractor index. Tasks without requirements carry contractor 0.
//!
//! Members of an inseparable chain carry their head's team. Decoding
//! reads the head column only.
//!
//! # Reference
//! Hartmann (1998), "A competitive genetic algorithm for
//! resource-constrained project scheduling", Naval Research Logistics 45

use serde::{Deserialize, Serialize};
use u_metaheur::ga::Individual;

/// Order plus resource matrix.
///
/// Lower fitness = shorter makespan (minimization convention).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleChromosome {
    /// Task indices in placement order.
    pub order: Vec<usize>,
    /// `resources[kind][task]` = count; `resources[kinds][task]` =
    /// contractor index.
    pub resources: Vec<Vec<u32>>,
    /// Fitness value (lower = better).
    pub fitness: f64,
}

impl Individual for ScheduleChromosome {
    type Fitness = f64;

    fn fitness(&self) -> f64 {
        self.fitness
    }

    fn set_fitness(&mut self, fitness: f64) {
        self.fitness = fitness;
    }
}

impl ScheduleChromosome {
    /// Creates an unevaluated chromosome.
    pub fn new(order: Vec<usize>, resources: Vec<Vec<u32>>) -> Self {
        Self {
            order,
            resources,
            fitness: f64::INFINITY,
        }
    }

    /// Number of tasks encoded.
    #[inline]
    pub fn task_count(&self) -> usize {
        self.order.len()
    }

    /// Number of worker-kind rows (the contractor row excluded).
    #[inline]
    pub fn kind_count(&self) -> usize {
        self.resources.len().saturating_sub(1)
    }

    /// Contractor index assigned to a task.
    pub fn contractor(&self, task: usize) -> usize {
        self.resources
            .last()
            .and_then(|row| row.get(task))
            .map(|&c| c as usize)
            .unwrap_or(0)
    }

    /// Count of worker kind row `kind` assigned to a task.
    pub fn count(&self, kind: usize, task: usize) -> u32 {
        self.resources
            .get(kind)
            .and_then(|row| row.get(task))
            .copied()
            .unwrap_or(0)
    }

    /// Writes one column to every task of `members`.
    pub(crate) fn set_column(&mut self, members: &[usize], column: &[u32]) {
        for (row, &value) in self.resources.iter_mut().zip(column) {
            for &m in members {
                row[m] = value;
            }
        }
    }

    /// Whether the order is a permutation of `0..n` and the matrix has
    /// `rows × n` cells.
    pub fn has_shape(&self, n: usize, rows: usize) -> bool {
        if self.order.len() != n || self.resources.len() != rows {
            return false;
        }
        if self.resources.iter().any(|row| row.len() != n) {
            return false;
        }
        let mut seen = vec![false; n];
        for &task in &self.order {
            if task >= n || seen[task] {
                return false;
            }
            seen[task] = true;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ScheduleChromosome {
        // two kinds, three tasks
        ScheduleChromosome::new(vec![2, 0, 1], vec![vec![1, 0, 3], vec![0, 2, 2], vec![0, 1, 1]])
    }

    #[test]
    fn test_accessors() {
        let ch = sample();
        assert_eq!(ch.task_count(), 3);
        assert_eq!(ch.kind_count(), 2);
        assert_eq!(ch.count(0, 2), 3);
        assert_eq!(ch.count(1, 1), 2);
        assert_eq!(ch.contractor(1), 1);
        assert_eq!(ch.count(5, 0), 0);
        assert!(ch.fitness.is_infinite());
    }

    #[test]
    fn test_shape() {
        let ch = sample();
        assert!(ch.has_shape(3, 3));
        assert!(!ch.has_shape(3, 2));

        let mut dup = sample();
        dup.order = vec![0, 0, 1];
        assert!(!dup.has_shape(3, 3));

        let mut ragged = sample();
        ragged.resources[1].pop();
        assert!(!ragged.has_shape(3, 3));
    }

    #[test]
    fn test_set_column() {
        let mut ch = sample();
        ch.set_column(&[0, 1], &[4, 5, 0]);
        assert_eq!(ch.resources, vec![vec![4, 4, 3], vec![5, 5, 2], vec![0, 0, 1]]);
    }

    #[test]
    fn test_individual_fitness() {
        let mut ch = sample();
        ch.set_fitness(12.0);
        assert_eq!(Individual::fitness(&ch), 12.0);
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut ch = sample();
        ch.fitness = 7.0;
        let json = serde_json::to_string(&ch).unwrap();
        let back: ScheduleChromosome = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ch);
    }
}
