//! Resource- and zone-constrained project scheduling for the U-Engine
//! ecosystem.
//!
//! Places the tasks of a precedence graph on contractor-owned worker
//! pools and stateful zones, and bridges the result to `u-metaheur`'s GA
//! through an order/resource chromosome.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Task`, `TaskGraph`, `Contractor`,
//!   `Worker`, `Zone`, `Schedule`, `ScheduledTask`
//! - **`timeline`**: Worker availability (`JustInTimeTimeline`,
//!   `MomentumTimeline`) and zone status (`ZoneTimeline`) ledgers
//! - **`scheduler`**: `TaskScheduler`, duration estimation, contractor
//!   lookup, worker-count optimizers, prioritization
//! - **`ga`**: `ChromosomeCodec`, `EvaluationContext`, `ProjectGaProblem`
//! - **`validation`**: Input integrity and schedule feasibility checks
//! - **`config`**: `SchedulerConfig`
//!
//! # Architecture
//!
//! This crate sits at Layer 3 (Frameworks) in the U-Engine ecosystem.
//! It depends on `u-metaheur` for the GA engine and contains only
//! project-scheduling domain logic.
//!
//! # References
//!
//! - Kolisch & Hartmann (1999), "Heuristic Algorithms for the
//!   Resource-Constrained Project Scheduling Problem"
//! - Hartmann (1998), "A competitive genetic algorithm for
//!   resource-constrained project scheduling"
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"

pub mod config;
pub mod error;
pub mod ga;
pub mod models;
pub mod scheduler;
pub mod timeline;
pub mod validation;

pub use config::{OptimizerKind, SchedulerConfig, SchedulerType};
pub use error::{Result, ScheduleError};
