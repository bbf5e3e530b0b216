//! Per-node split search.
//!
//! [`SplitOptimizer::find_best_split`] scans every valid feature and every
//! unique value of its column, simulating the split under attack and
//! solving the constrained SSE problem for each candidate. Features are
//! chunked contiguously over workers; the reduction applies a total order
//! (gain desc, feature asc, value asc) so the winner is identical for any
//! worker count.
//!
//! After a winner is selected the uncertain set is redistributed: each
//! uncertain instance goes to the side the adversary prefers, its residual
//! budget becomes the minimal cost of an attack reaching that side, and a
//! paired pair of constraints records the commitment for both children.

use std::collections::HashMap;

use crate::attack::Attacker;
use crate::data::{Dataset, FeatureValue};
use crate::utils::Parallelism;

use super::constraint::{Constraint, Direction};
use super::logger::TrainingLogger;
use super::simulate::{simulate_split, SplitPartition};
use super::sse::{SlsqpSse, SseSolver};

/// Residual adversarial budget per instance index.
pub type CostMap = HashMap<usize, f64>;

// =============================================================================
// SplitResult
// =============================================================================

/// Everything the tree builder needs to commit a split.
#[derive(Debug, Clone)]
pub struct SplitResult {
    pub gain: f64,
    pub feature: usize,
    pub value: FeatureValue,
    /// The next-greater unique value of the column at training time (equal
    /// to `value` when it is the greatest); downstream serialization uses it
    /// to place mid-split thresholds.
    pub next_value: FeatureValue,
    /// Left child index set, uncertain instances already appended.
    pub left: Vec<usize>,
    /// Right child index set, uncertain instances already appended.
    pub right: Vec<usize>,
    pub pred_left: f64,
    pub pred_right: f64,
    /// Worst-case SSE of the winning candidate.
    pub sse: f64,
    pub costs_left: CostMap,
    pub costs_right: CostMap,
    pub constraints_left: Vec<Constraint>,
    pub constraints_right: Vec<Constraint>,
}

/// A worker's best candidate: just the scalars, the rest is recovered
/// serially after the reduction.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    gain: f64,
    feature: usize,
    value: FeatureValue,
    next_value: FeatureValue,
    pred_left: f64,
    pred_right: f64,
    sse: f64,
}

/// Total order for the reduction: higher gain wins, ties go to the lower
/// feature index, then the lower value.
fn beats(a: &Candidate, b: &Candidate) -> bool {
    if a.gain != b.gain {
        return a.gain > b.gain;
    }
    if a.feature != b.feature {
        return a.feature < b.feature;
    }
    a.value.total_cmp(&b.value) == std::cmp::Ordering::Less
}

// =============================================================================
// Feature chunking
// =============================================================================

/// Contiguous chunks of approximately equal size, one per worker; when there
/// are more workers than features, one feature per worker.
fn chunk_features(features: &[usize], n_workers: usize) -> Vec<Vec<usize>> {
    assert!(n_workers >= 1, "worker count must be at least 1");
    if n_workers == 1 {
        return vec![features.to_vec()];
    }
    if n_workers >= features.len() {
        return features.iter().map(|&f| vec![f]).collect();
    }
    let chunk_size = features.len() / n_workers;
    (0..n_workers)
        .map(|w| {
            let start = chunk_size * w;
            let end = if w == n_workers - 1 {
                features.len()
            } else {
                start + chunk_size
            };
            features[start..end].to_vec()
        })
        .collect()
}

// =============================================================================
// SplitOptimizer
// =============================================================================

/// The per-node split search.
pub struct SplitOptimizer<'a, S: SseSolver = SlsqpSse> {
    dataset: &'a Dataset,
    attacker: &'a Attacker,
    parallelism: Parallelism,
    solver: S,
    logger: TrainingLogger,
}

impl<'a> SplitOptimizer<'a, SlsqpSse> {
    pub fn new(dataset: &'a Dataset, attacker: &'a Attacker, parallelism: Parallelism) -> Self {
        Self::with_solver(dataset, attacker, parallelism, SlsqpSse)
    }
}

impl<'a, S: SseSolver> SplitOptimizer<'a, S> {
    /// Build a search with a custom SSE solver (tests inject failing or
    /// instrumented solvers here).
    pub fn with_solver(
        dataset: &'a Dataset,
        attacker: &'a Attacker,
        parallelism: Parallelism,
        solver: S,
    ) -> Self {
        Self {
            dataset,
            attacker,
            parallelism,
            solver,
            logger: TrainingLogger::silent(),
        }
    }

    pub fn with_logger(mut self, logger: TrainingLogger) -> Self {
        self.logger = logger;
        self
    }

    /// Find the best split for a node, or `None` when no candidate improves
    /// on `current_loss`.
    #[allow(clippy::too_many_arguments)]
    pub fn find_best_split(
        &self,
        valid: &[usize],
        features: &[usize],
        costs: &CostMap,
        constraints: &[Constraint],
        current_loss: f64,
        current_prediction: f64,
        n_workers: usize,
    ) -> Option<SplitResult> {
        assert!(!valid.is_empty(), "split search entered with no instances");
        if features.is_empty() {
            return None;
        }

        let chunks = chunk_features(features, n_workers);
        let locals: Vec<Option<Candidate>> = self.parallelism.par_map(chunks, |chunk| {
            self.scan_chunk(&chunk, valid, costs, constraints, current_loss, current_prediction)
        });

        // Deterministic reduction over worker results.
        let mut best: Option<Candidate> = None;
        for cand in locals.into_iter().flatten() {
            best = match best {
                Some(incumbent) if !beats(&cand, &incumbent) => Some(incumbent),
                _ => Some(cand),
            };
        }
        let best = best?;
        debug_assert!(best.gain > 0.0);

        Some(self.commit(best, valid, costs, constraints))
    }

    /// Scan one contiguous chunk of features, returning the local best
    /// candidate with positive gain.
    fn scan_chunk(
        &self,
        features: &[usize],
        valid: &[usize],
        costs: &CostMap,
        constraints: &[Constraint],
        current_loss: f64,
        current_prediction: f64,
    ) -> Option<Candidate> {
        let labels = self.dataset.labels();
        let mut best: Option<Candidate> = None;

        for &feature in features {
            let kind = self.dataset.kind(feature);
            let unique = self.dataset.column(feature).unique_values();

            for (idx, &value) in unique.iter().enumerate() {
                let partition =
                    simulate_split(self.dataset, valid, self.attacker, costs, feature, value);

                // Re-direct the inherited constraints for this hypothesis.
                let mut candidate_constraints = Vec::with_capacity(constraints.len());
                for c in constraints {
                    let cl = c.propagate_left(self.attacker, feature, value, kind);
                    let cr = c.propagate_right(self.attacker, feature, value, kind);
                    match (cl.is_some(), cr.is_some()) {
                        (true, true) => {
                            candidate_constraints.push(c.with_direction(Direction::Unknown))
                        }
                        (true, false) => {
                            candidate_constraints.push(c.with_direction(Direction::Left))
                        }
                        (false, true) => {
                            candidate_constraints.push(c.with_direction(Direction::Right))
                        }
                        (false, false) => {}
                    }
                }

                let Some(solution) = self.solver.optimize(
                    feature,
                    value,
                    labels,
                    &partition,
                    &candidate_constraints,
                    current_prediction,
                ) else {
                    self.logger.debug(&format!(
                        "candidate ({feature}, {value:?}) skipped: SSE optimizer failed"
                    ));
                    continue;
                };

                let gain = current_loss - solution.sse;
                if gain <= 0.0 {
                    continue;
                }
                if best.as_ref().is_some_and(|b| gain <= b.gain) {
                    continue;
                }
                best = Some(Candidate {
                    gain,
                    feature,
                    value,
                    next_value: unique.get(idx + 1).copied().unwrap_or(value),
                    pred_left: solution.pred_left,
                    pred_right: solution.pred_right,
                    sse: solution.sse,
                });
            }
        }
        best
    }

    /// Serial post-selection work: recover the winning partition, propagate
    /// constraints into both children, redistribute the uncertain set.
    fn commit(
        &self,
        best: Candidate,
        valid: &[usize],
        costs: &CostMap,
        constraints: &[Constraint],
    ) -> SplitResult {
        let kind = self.dataset.kind(best.feature);
        let labels = self.dataset.labels();

        let SplitPartition {
            left: mut left_set,
            right: mut right_set,
            unknown,
        } = simulate_split(
            self.dataset,
            valid,
            self.attacker,
            costs,
            best.feature,
            best.value,
        );

        let mut constraints_left = Vec::new();
        let mut constraints_right = Vec::new();
        for c in constraints {
            if let Some(cl) = c.propagate_left(self.attacker, best.feature, best.value, kind) {
                constraints_left.push(cl);
            }
            if let Some(cr) = c.propagate_right(self.attacker, best.feature, best.value, kind) {
                constraints_right.push(cr);
            }
        }

        let mut costs_left: CostMap = CostMap::new();
        let mut costs_right: CostMap = CostMap::new();
        for &i in &left_set {
            costs_left.insert(i, costs[&i]);
        }
        for &i in &right_set {
            costs_right.insert(i, costs[&i]);
        }

        // Send each uncertain instance to the side the adversary prefers.
        for &i in &unknown {
            let record = self.dataset.record(i);
            let attacks = self.attacker.attack(&record, best.feature, costs[&i]);
            let to_left = (labels[i] - best.pred_left).abs();
            let to_right = (labels[i] - best.pred_right).abs();

            let goes_left = to_left > to_right;
            let min_cost = attacks
                .iter()
                .filter(|(atk, _)| {
                    let routed_left = kind.routes_left(atk[best.feature], best.value);
                    routed_left == goes_left
                })
                .map(|&(_, cost)| cost)
                .fold(f64::INFINITY, f64::min);
            assert!(
                min_cost.is_finite(),
                "uncertain instance {i} has no attack reaching its assigned side"
            );

            // The commitment bounds both children relative to the opposite
            // side's prediction.
            let bound = if goes_left {
                best.pred_right
            } else {
                best.pred_left
            };
            constraints_left.push(Constraint::new(
                record.clone(),
                labels[i],
                min_cost,
                goes_left,
                bound,
                Direction::Left,
            ));
            constraints_right.push(Constraint::new(
                record,
                labels[i],
                min_cost,
                !goes_left,
                bound,
                Direction::Right,
            ));

            if goes_left {
                costs_left.insert(i, min_cost);
                left_set.push(i);
            } else {
                costs_right.insert(i, min_cost);
                right_set.push(i);
            }
        }

        SplitResult {
            gain: best.gain,
            feature: best.feature,
            value: best.value,
            next_value: best.next_value,
            left: left_set,
            right: right_set,
            pred_left: best.pred_left,
            pred_right: best.pred_right,
            sse: best.sse,
            costs_left,
            costs_right,
            constraints_left,
            constraints_right,
        }
    }
}
