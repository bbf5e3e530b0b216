//! treeward: robust decision-tree ensembles for Rust.
//!
//! Trains ensembles of regression trees whose splits minimize squared-error
//! loss under worst-case, cost-bounded adversarial perturbation of feature
//! values at inference time, instead of loss on the unperturbed data.
//!
//! # Key Types
//!
//! - [`RobustTrainer`] / [`TrainParams`] - High-level training driver
//! - [`Attacker`] - The threat model: per-feature perturbation rules + budget
//! - [`Dataset`] - Typed columnar data handling
//! - [`Forest`] / [`repr::Tree`] - Trained model representation
//!
//! # Training
//!
//! Build a [`Dataset`], declare an [`Attacker`], configure [`TrainParams`],
//! then call [`RobustTrainer::train`]. See the [`training`] module for the
//! split-search internals (simulation, constraints, the SSE sub-optimizer).
//!
//! # Persistence
//!
//! Models serialize to a versioned JSON schema; see the [`persist`] module.

pub mod attack;
pub mod data;
mod error;
pub mod persist;
pub mod repr;
pub mod testing;
pub mod training;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

// High-level training entry points
pub use training::{RobustTrainer, TrainParams, TrainingAlgorithm, Verbosity};

// Threat model
pub use attack::Attacker;

// Data types
pub use data::{DataError, Dataset, FeatureColumn, FeatureKind, FeatureValue, Record};

// Model types
pub use repr::{Forest, Tree};

// Configuration errors surfaced at startup
pub use error::ConfigError;

// Shared utilities
pub use utils::{run_with_threads, Parallelism};
