//! Robust tree induction.
//!
//! This module contains the training core:
//!
//! ## Split Search
//!
//! - [`SplitOptimizer`]: per-node search over features and unique values,
//!   parallelized by chunking features over workers
//! - [`simulate_split`]: partition of a node's instances into
//!   certainly-left / certainly-right / uncertain sets for a candidate
//! - [`optimize_sse`] / [`SseSolver`]: the 2-D constrained minimization of
//!   worst-case squared error for the pair of child predictions
//! - [`Constraint`] / [`Direction`]: adversarial commitments threaded down
//!   the tree
//!
//! ## Drivers
//!
//! - [`TreeBuilder`]: depth-first recursive induction of one tree
//! - [`RobustTrainer`] / [`TrainParams`]: the ensemble driver (bootstrap
//!   sampling, thread-pool setup, logging)

mod constraint;
mod grower;
mod logger;
mod simulate;
mod slsqp;
mod sse;
mod split;
mod trainer;

pub use constraint::{Constraint, Direction};
pub use grower::{GrowParams, TreeBuilder};
pub use logger::{TrainingLogger, Verbosity};
pub use simulate::{simulate_split, SplitPartition};
pub use slsqp::{InequalityConstraint, Solution, SolverOptions, SolverStatus};
pub use sse::{optimize_sse, sum_squared_error, worst_case_sse, SlsqpSse, SseSolution, SseSolver};
pub use split::{CostMap, SplitOptimizer, SplitResult};
pub use trainer::{Impurity, RobustTrainer, TrainParams, TrainingAlgorithm};

// Startup errors are shared with the attack module.
pub use crate::error::ConfigError;
