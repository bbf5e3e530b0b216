//! Worst-case SSE objective and its optimizer.
//!
//! For a fixed partition (L, R, U) the adversary sends every uncertain
//! instance to whichever side hurts more, so the loss of a candidate split
//! at child predictions `(l, r)` is
//!
//! ```text
//! f(l, r) = Σ_{i∈L} (y_i - l)^2 + Σ_{i∈R} (y_i - r)^2
//!         + Σ_{i∈U} max((y_i - l)^2, (y_i - r)^2)
//! ```
//!
//! minimized subject to the constraints inherited from ancestor splits.

use ndarray::Array1;

use crate::data::FeatureValue;

use super::constraint::Constraint;
use super::simulate::SplitPartition;
use super::slsqp::{self, SolverOptions, SolverStatus};

/// Sum of squared errors of `prediction` over `rows`.
pub fn sum_squared_error(labels: &Array1<f64>, rows: &[usize], prediction: f64) -> f64 {
    rows.iter()
        .map(|&i| {
            let diff = labels[i] - prediction;
            diff * diff
        })
        .sum()
}

/// The worst-case SSE objective at `x = (pred_left, pred_right)`.
pub fn worst_case_sse(labels: &Array1<f64>, partition: &SplitPartition, x: [f64; 2]) -> f64 {
    let mut total = sum_squared_error(labels, &partition.left, x[0]);
    total += sum_squared_error(labels, &partition.right, x[1]);
    for &i in &partition.unknown {
        let dl = labels[i] - x[0];
        let dr = labels[i] - x[1];
        total += (dl * dl).max(dr * dr);
    }
    total
}

/// Optimizer output for one candidate split.
#[derive(Clone, Copy, Debug)]
pub struct SseSolution {
    pub pred_left: f64,
    pub pred_right: f64,
    pub sse: f64,
}

/// Minimize worst-case SSE for `partition` under `constraints`, starting
/// both coordinates at `init` (the parent's prediction).
///
/// `None` means the candidate is infeasible for numerical reasons and must
/// be skipped; hitting the evaluation cap at a feasible point is a success.
pub fn optimize_sse(
    labels: &Array1<f64>,
    partition: &SplitPartition,
    constraints: &[Constraint],
    init: f64,
) -> Option<SseSolution> {
    // Inverse-curvature scaling: each side's quadratic term has second
    // derivative 2 per contributing instance (uncertain instances may
    // contribute to either side).
    let n_left = partition.left.len() + partition.unknown.len();
    let n_right = partition.right.len() + partition.unknown.len();
    let scale = [
        if n_left > 0 { 1.0 / (2.0 * n_left as f64) } else { 1.0 },
        if n_right > 0 { 1.0 / (2.0 * n_right as f64) } else { 1.0 },
    ];
    let opts = SolverOptions {
        scale,
        ..Default::default()
    };

    let solution = slsqp::minimize(
        |x| worst_case_sse(labels, partition, x),
        constraints,
        [init, init],
        &opts,
    );

    match solution.status {
        SolverStatus::Failed => None,
        SolverStatus::Converged | SolverStatus::EvalBudgetExhausted => Some(SseSolution {
            pred_left: solution.x[0],
            pred_right: solution.x[1],
            sse: solution.objective,
        }),
    }
}

// =============================================================================
// Solver seam
// =============================================================================

/// The SSE sub-optimizer as a seam.
///
/// The split search goes through this trait so tests can inject failing or
/// instrumented solvers; [`SlsqpSse`] is the production implementation.
pub trait SseSolver: Sync {
    fn optimize(
        &self,
        feature: usize,
        value: FeatureValue,
        labels: &Array1<f64>,
        partition: &SplitPartition,
        constraints: &[Constraint],
        init: f64,
    ) -> Option<SseSolution>;
}

/// Production SSE solver.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlsqpSse;

impl SseSolver for SlsqpSse {
    fn optimize(
        &self,
        _feature: usize,
        _value: FeatureValue,
        labels: &Array1<f64>,
        partition: &SplitPartition,
        constraints: &[Constraint],
        init: f64,
    ) -> Option<SseSolution> {
        optimize_sse(labels, partition, constraints, init)
    }
}
