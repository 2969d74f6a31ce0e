//! GA-based project optimization.
//!
//! Implements a project encoding on top of `u-metaheur`'s generic GA
//! framework.
//!
//! # Encoding
//!
//! - **Order**: permutation of task indices; decoding places tasks in
//!   this order.
//! - **Resources**: worker count per kind and contractor index per task.
//!
//! # Submodules
//!
//! - [`operators`]: runtime-selectable mutation strategies
//!
//! # Reference
//! - Hartmann (1998), "A competitive genetic algorithm for
//!   resource-constrained project scheduling"

mod chromosome;
mod codec;
mod context;
pub mod operators;
mod problem;

pub use chromosome::ScheduleChromosome;
pub use codec::ChromosomeCodec;
pub use context::EvaluationContext;
pub use problem::ProjectGaProblem;
