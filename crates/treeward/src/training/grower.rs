//! Depth-first tree induction.
//!
//! [`TreeBuilder`] expands one node at a time: it asks the split search for
//! the best committed split, writes it into a [`MutableTree`], then recurses
//! into both children with the redistributed index sets, residual-cost maps,
//! constraint sets, and the optimizer's child predictions. A node becomes a
//! leaf on any stop condition, predicting the value inherited from its
//! parent's optimization (the empirical mean whenever nothing adversarial
//! bent the parent optimum).

use crate::attack::Attacker;
use crate::data::Dataset;
use crate::repr::{MutableTree, NodeId, Tree};
use crate::utils::Parallelism;

use super::constraint::Constraint;
use super::logger::TrainingLogger;
use super::split::{CostMap, SplitOptimizer, SplitResult};
use super::sse::{sum_squared_error, SlsqpSse};

/// Stop-condition knobs for a single tree.
#[derive(Clone, Copy, Debug)]
pub struct GrowParams {
    /// Maximum tree depth; 0 trains a single leaf.
    pub max_depth: usize,
    /// Nodes with fewer instances become leaves.
    pub min_per_node: usize,
}

impl Default for GrowParams {
    fn default() -> Self {
        Self {
            max_depth: 1,
            min_per_node: 20,
        }
    }
}

/// Recursive robust tree induction.
pub struct TreeBuilder<'a> {
    dataset: &'a Dataset,
    attacker: &'a Attacker,
    params: GrowParams,
    parallelism: Parallelism,
    n_workers: usize,
    logger: TrainingLogger,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(
        dataset: &'a Dataset,
        attacker: &'a Attacker,
        params: GrowParams,
        parallelism: Parallelism,
        n_workers: usize,
    ) -> Self {
        Self {
            dataset,
            attacker,
            params,
            parallelism,
            n_workers,
            logger: TrainingLogger::silent(),
        }
    }

    pub fn with_logger(mut self, logger: TrainingLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Train one tree over `valid` (row indices, duplicates allowed when the
    /// caller bootstrap-samples).
    pub fn build(&self, valid: Vec<usize>) -> Tree {
        assert!(!valid.is_empty(), "tree induction entered with no instances");

        let mut tree = MutableTree::new();
        let root = tree.init_root();

        let prediction = self.dataset.mean_label(&valid);
        let loss = sum_squared_error(self.dataset.labels(), &valid, prediction);
        // Every instance starts with the full adversarial budget.
        let costs: CostMap = valid.iter().map(|&i| (i, self.attacker.budget())).collect();

        let splitter = SplitOptimizer::new(self.dataset, self.attacker, self.parallelism)
            .with_logger(self.logger);
        let features: Vec<usize> = (0..self.dataset.n_features()).collect();
        self.expand(
            &splitter, &mut tree, root, &features, valid, costs,
            Vec::new(), prediction, loss, 0,
        );
        tree.freeze()
    }

    #[allow(clippy::too_many_arguments)]
    fn expand(
        &self,
        splitter: &SplitOptimizer<'a, SlsqpSse>,
        tree: &mut MutableTree,
        node: NodeId,
        features: &[usize],
        valid: Vec<usize>,
        costs: CostMap,
        constraints: Vec<Constraint>,
        prediction: f64,
        loss: f64,
        depth: usize,
    ) {
        assert!(!valid.is_empty(), "node entered with no valid instances");

        if depth >= self.params.max_depth || valid.len() < self.params.min_per_node {
            tree.make_leaf(node, prediction);
            return;
        }

        let Some(split) = splitter.find_best_split(
            &valid,
            features,
            &costs,
            &constraints,
            loss,
            prediction,
            self.n_workers,
        ) else {
            tree.make_leaf(node, prediction);
            return;
        };

        assert!(
            !(split.left.is_empty() && split.right.is_empty()),
            "committed split left both children empty"
        );
        self.logger.debug(&format!(
            "depth {depth}: split on feature {} at {:?}, gain {:.6}",
            split.feature, split.value, split.gain
        ));

        let SplitResult {
            feature,
            value,
            next_value,
            gain,
            left,
            right,
            pred_left,
            pred_right,
            costs_left,
            costs_right,
            constraints_left,
            constraints_right,
            ..
        } = split;

        let kind = self.dataset.kind(feature);
        let (left_id, right_id) =
            tree.apply_split(node, feature as u32, kind, value, next_value, gain);

        // Each child's baseline loss is its side's contribution to the
        // optimizer's worst-case SSE at (pred_left, pred_right).
        if left.is_empty() {
            tree.make_leaf(left_id, pred_left);
        } else {
            let loss_left = sum_squared_error(self.dataset.labels(), &left, pred_left);
            self.expand(
                splitter, tree, left_id, features, left, costs_left,
                constraints_left, pred_left, loss_left, depth + 1,
            );
        }
        if right.is_empty() {
            tree.make_leaf(right_id, pred_right);
        } else {
            let loss_right = sum_squared_error(self.dataset.labels(), &right, pred_right);
            self.expand(
                splitter, tree, right_id, features, right, costs_right,
                constraints_right, pred_right, loss_right, depth + 1,
            );
        }
    }
}
