//! Mutation operators for project chromosomes.
//!
//! Both operators keep a chromosome decodable: counts stay within their
//! bounds and the order stays precedence-feasible with chains contiguous.
//!
//! # Usage
//!
//! ```
//! use u_project::ga::operators::{GeneticOperators, MutationType};
//!
//! let ops = GeneticOperators::default();
//! assert_eq!(ops.mutation_type, MutationType::Mixed);
//! ```

use rand::prelude::IndexedRandom;
use rand::Rng;

use super::{ChromosomeCodec, ScheduleChromosome};

/// Mutation strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MutationType {
    /// Re-draw one worker count of one chain.
    Count,
    /// Move one chain to another feasible position in the order.
    Shift,
    /// Either of the above with equal probability.
    #[default]
    Mixed,
}

/// Runtime-selectable mutation for the project GA.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeneticOperators {
    /// Mutation strategy.
    pub mutation_type: MutationType,
}

impl GeneticOperators {
    /// Applies the selected mutation. Returns whether anything changed.
    pub fn mutate<R: Rng>(
        &self,
        chromosome: &mut ScheduleChromosome,
        codec: &ChromosomeCodec,
        rng: &mut R,
    ) -> bool {
        match self.mutation_type {
            MutationType::Count => count_mutation(chromosome, codec, rng),
            MutationType::Shift => shift_mutation(chromosome, codec, rng),
            MutationType::Mixed => {
                if rng.random_bool(0.5) {
                    count_mutation(chromosome, codec, rng)
                } else {
                    shift_mutation(chromosome, codec, rng)
                }
            }
        }
    }
}

/// Re-draws the count of one worker kind of one chain within its bounds.
pub fn count_mutation<R: Rng>(
    chromosome: &mut ScheduleChromosome,
    codec: &ChromosomeCodec,
    rng: &mut R,
) -> bool {
    let graph = codec.graph();
    let staffed: Vec<usize> = (0..graph.len())
        .filter(|&i| !graph.is_inseparable_son(i) && !codec.chain_reqs(i).is_empty())
        .collect();
    let Some(&head) = staffed.choose(rng) else {
        return false;
    };
    let Some(req) = codec.chain_reqs(head).choose(rng) else {
        return false;
    };
    let Some(row) = codec.kind_row(&req.kind) else {
        return false;
    };

    let (lo, hi) = codec.count_bounds(req);
    if lo >= hi {
        return false;
    }
    let count = rng.random_range(lo..=hi);
    let changed = count != chromosome.count(row, head);
    for member in graph.inseparable_chain(head) {
        chromosome.resources[row][member] = count;
    }
    changed
}

/// Moves one chain to a random position between its last predecessor and
/// its first successor.
///
/// Orders that are not precedence-feasible are left untouched.
pub fn shift_mutation<R: Rng>(
    chromosome: &mut ScheduleChromosome,
    codec: &ChromosomeCodec,
    rng: &mut R,
) -> bool {
    let graph = codec.graph();
    let mut heads: Vec<usize> = chromosome
        .order
        .iter()
        .copied()
        .filter(|&i| !graph.is_inseparable_son(i))
        .collect();
    if heads.len() < 2 {
        return false;
    }

    let from = rng.random_range(0..heads.len());
    let unit = heads.remove(from);
    let parents: Vec<usize> = graph
        .chain_external_parents(unit)
        .into_iter()
        .map(|p| graph.chain_head(p))
        .collect();
    let is_child = |g: usize| {
        graph
            .chain_external_parents(g)
            .into_iter()
            .any(|p| graph.chain_head(p) == unit)
    };

    let lo = heads
        .iter()
        .rposition(|g| parents.contains(g))
        .map_or(0, |p| p + 1);
    let hi = heads
        .iter()
        .position(|&g| is_child(g))
        .unwrap_or(heads.len());
    if lo > hi {
        return false;
    }

    let to = rng.random_range(lo..=hi);
    heads.insert(to, unit);
    chromosome.order = heads
        .into_iter()
        .flat_map(|h| graph.inseparable_chain(h))
        .collect();
    to != from
}
