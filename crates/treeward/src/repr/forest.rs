//! Tree collection with mean aggregation.

use ndarray::Array1;

use crate::data::{Dataset, Record};

use super::tree::{Tree, TreeValidationError};

/// A trained ensemble.
///
/// Regression predictions are the mean of the per-tree predictions.
#[derive(Debug, Clone, PartialEq)]
pub struct Forest {
    trees: Vec<Tree>,
    n_features: usize,
}

impl Forest {
    pub fn new(trees: Vec<Tree>, n_features: usize) -> Self {
        debug_assert!(!trees.is_empty(), "a forest needs at least one tree");
        Self { trees, n_features }
    }

    #[inline]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    #[inline]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    /// Predict one record.
    pub fn predict_row(&self, record: &Record) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict_row(record)).sum();
        sum / self.trees.len() as f64
    }

    /// Predict every row of a dataset.
    pub fn predict_batch(&self, dataset: &Dataset) -> Array1<f64> {
        Array1::from_iter((0..dataset.n_rows()).map(|i| self.predict_row(&dataset.record(i))))
    }

    /// Validate the structural invariants of every tree.
    pub fn validate(&self) -> Result<(), TreeValidationError> {
        for tree in &self.trees {
            tree.validate()?;
        }
        Ok(())
    }
}
