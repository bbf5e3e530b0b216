//! Ensemble training driver.
//!
//! [`RobustTrainer`] validates its parameters, sets up the worker pool, and
//! trains `n_trees` robust trees. With more than one estimator each tree is
//! grown on a bootstrap row sample (with replacement, all features) drawn
//! from a seeded generator; predictions aggregate by mean. A single
//! estimator trains on the full index set.

use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::attack::Attacker;
use crate::data::Dataset;
use crate::error::ConfigError;
use crate::repr::Forest;
use crate::utils::run_with_threads;

use super::grower::{GrowParams, TreeBuilder};
use super::logger::{TrainingLogger, Verbosity};

// =============================================================================
// Configuration
// =============================================================================

/// Which split-search algorithm to run.
///
/// Only [`Robust`](TrainingAlgorithm::Robust) is implemented; the fast
/// icml2019 variant is a recognized configuration slot whose semantics are
/// unspecified here, and selecting it fails parameter validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TrainingAlgorithm {
    #[default]
    Robust,
    Icml2019,
}

/// Impurity measure slot.
///
/// Squared error is the only measure with specified semantics; the other
/// variants exist so configurations can name them, and are rejected at
/// validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Impurity {
    #[default]
    Sse,
    Gini,
    Mse,
    Entropy,
}

/// Training parameters.
#[derive(Clone, Debug)]
pub struct TrainParams {
    /// Number of trees in the ensemble.
    pub n_trees: usize,
    /// Maximum depth per tree; 0 trains single-leaf trees.
    pub max_depth: usize,
    /// Nodes with fewer instances become leaves.
    pub min_per_node: usize,
    /// Worker threads for the per-node feature scan.
    pub n_workers: usize,
    /// Split-search algorithm variant.
    pub algorithm: TrainingAlgorithm,
    /// Impurity measure.
    pub impurity: Impurity,
    /// Seed for bootstrap sampling.
    pub seed: u64,
    /// Verbosity level for training output.
    pub verbosity: Verbosity,
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            n_trees: 1,
            max_depth: 1,
            min_per_node: 20,
            n_workers: 1,
            algorithm: TrainingAlgorithm::default(),
            impurity: Impurity::default(),
            seed: 42,
            verbosity: Verbosity::default(),
        }
    }
}

impl TrainParams {
    /// Validate parameters.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the violated rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_trees < 1 {
            return Err(ConfigError::InvalidParam {
                name: "n_trees",
                reason: "must be at least 1".into(),
            });
        }
        if self.n_workers < 1 {
            return Err(ConfigError::InvalidParam {
                name: "n_workers",
                reason: "must be at least 1".into(),
            });
        }
        if self.algorithm != TrainingAlgorithm::Robust {
            return Err(ConfigError::InvalidParam {
                name: "algorithm",
                reason: "the icml2019 variant is not implemented".into(),
            });
        }
        if self.impurity != Impurity::Sse {
            return Err(ConfigError::InvalidParam {
                name: "impurity",
                reason: format!("{:?} is not implemented, only Sse", self.impurity),
            });
        }
        Ok(())
    }

    fn grow_params(&self) -> GrowParams {
        GrowParams {
            max_depth: self.max_depth,
            min_per_node: self.min_per_node,
        }
    }
}

// =============================================================================
// RobustTrainer
// =============================================================================

/// High-level training driver.
pub struct RobustTrainer {
    params: TrainParams,
}

impl RobustTrainer {
    pub fn new(params: TrainParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TrainParams {
        &self.params
    }

    /// Train an ensemble on `dataset` against `attacker`.
    pub fn train(&self, dataset: &Dataset, attacker: &Attacker) -> Result<Forest, ConfigError> {
        self.params.validate()?;

        let logger = TrainingLogger::new(self.params.verbosity);
        logger.info(&format!(
            "training {} tree(s) on {} rows x {} features, budget {}",
            self.params.n_trees,
            dataset.n_rows(),
            dataset.n_features(),
            attacker.budget(),
        ));

        let params = &self.params;
        let forest = run_with_threads(params.n_workers, |parallelism| {
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(params.seed);
            let n_rows = dataset.n_rows();
            let grow = params.grow_params();
            let mut trees = Vec::with_capacity(params.n_trees);

            for index in 0..params.n_trees {
                let sample: Vec<usize> = if params.n_trees == 1 {
                    (0..n_rows).collect()
                } else {
                    (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect()
                };
                let builder =
                    TreeBuilder::new(dataset, attacker, grow, parallelism, params.n_workers)
                        .with_logger(logger);
                let tree = builder.build(sample);
                logger.log_tree(index, params.n_trees, tree.n_nodes());
                trees.push(tree);
            }

            Forest::new(trees, dataset.n_features())
        });

        logger.info(&format!("training complete: {} tree(s) built", forest.n_trees()));
        Ok(forest)
    }
}
