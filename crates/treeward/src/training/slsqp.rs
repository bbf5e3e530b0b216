//! Constrained 2-D minimization for the SSE sub-problem.
//!
//! The split search needs, per candidate, the pair of child predictions
//! minimizing worst-case SSE subject to inequality constraints. The problem
//! is tiny (two variables, piecewise-quadratic objective, quadratic
//! constraints) and is solved here by a penalized sequential scheme:
//! forward-difference gradients, a diagonal curvature scaling supplied by
//! the caller, backtracking line search, and an augmented-Lagrangian
//! multiplier loop for the inequality constraints.
//!
//! Stopping behavior mirrors the classic SLSQP knobs: absolute objective
//! tolerance, a hard cap on objective evaluations (running out with a
//! feasible iterate still counts as success), and failure on non-finite
//! values or terminal constraint violation.

/// An inequality constraint in `g(x) <= 0` form over `x = (x0, x1)`.
pub trait InequalityConstraint {
    fn value(&self, x: [f64; 2]) -> f64;
    fn gradient(&self, x: [f64; 2]) -> [f64; 2];
}

// =============================================================================
// Options / result
// =============================================================================

/// Solver knobs.
#[derive(Clone, Copy, Debug)]
pub struct SolverOptions {
    /// Absolute objective-decrease tolerance.
    pub ftol: f64,
    /// Cap on objective evaluations.
    pub max_evals: usize,
    /// Forward-difference step for the objective gradient.
    pub fd_step: f64,
    /// Per-coordinate inverse-curvature scaling of the descent direction.
    pub scale: [f64; 2],
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            ftol: 1e-6,
            max_evals: 100,
            // sqrt of f64 machine epsilon, the classic choice.
            fd_step: 1.490_116_119_384_765_6e-8,
            scale: [1.0, 1.0],
        }
    }
}

/// Termination state of a solve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverStatus {
    /// Objective decrease fell below the tolerance at a feasible point.
    Converged,
    /// The evaluation cap was reached at a feasible point.
    EvalBudgetExhausted,
    /// Non-finite values, or the constraints could not be satisfied.
    Failed,
}

/// Result of a solve.
#[derive(Clone, Copy, Debug)]
pub struct Solution {
    pub x: [f64; 2],
    /// Raw objective at `x` (no penalty terms).
    pub objective: f64,
    pub evaluations: usize,
    pub status: SolverStatus,
}

// =============================================================================
// Solver
// =============================================================================

const FEAS_TOL: f64 = 1e-6;
const MU_INIT: f64 = 10.0;
const MU_GROWTH: f64 = 10.0;
const MU_MAX: f64 = 1e8;
const ARMIJO_C1: f64 = 1e-4;
const MAX_BACKTRACKS: usize = 25;
const MAX_INNER_ITERS: usize = 50;

/// Minimize `objective` over two variables subject to `constraints`,
/// starting from `x0`.
pub fn minimize<F, C>(objective: F, constraints: &[C], x0: [f64; 2], opts: &SolverOptions) -> Solution
where
    F: Fn([f64; 2]) -> f64,
    C: InequalityConstraint,
{
    let mut evals = 0usize;
    let eval = |x: [f64; 2], evals: &mut usize| {
        *evals += 1;
        objective(x)
    };

    let max_violation = |x: [f64; 2]| -> f64 {
        constraints
            .iter()
            .map(|c| c.value(x).max(0.0))
            .fold(0.0, f64::max)
    };
    // Augmented-Lagrangian term for inequalities:
    // (mu/2) * sum_i max(0, lambda_i/mu + g_i(x))^2
    let al_term = |x: [f64; 2], lambda: &[f64], mu: f64| -> f64 {
        constraints
            .iter()
            .zip(lambda)
            .map(|(c, &l)| {
                let s = (l / mu + c.value(x)).max(0.0);
                0.5 * mu * s * s
            })
            .sum()
    };

    let failed = |x: [f64; 2], objective: f64, evaluations: usize| Solution {
        x,
        objective,
        evaluations,
        status: SolverStatus::Failed,
    };

    let mut x = x0;
    let mut fx = eval(x, &mut evals);
    if !fx.is_finite() {
        return failed(x, fx, evals);
    }

    let mut mu = MU_INIT;
    let mut lambda = vec![0.0f64; constraints.len()];
    let mut prev_viol = f64::INFINITY;
    let mut out_of_budget = false;

    loop {
        // Inner descent on the merit function for the current multipliers.
        let mut merit = fx + al_term(x, &lambda, mu);
        let mut step = 1.0f64;

        for _ in 0..MAX_INNER_ITERS {
            if evals + 2 > opts.max_evals {
                out_of_budget = true;
                break;
            }

            // Forward-difference gradient of the raw objective.
            let h = opts.fd_step;
            let f0 = eval([x[0] + h, x[1]], &mut evals);
            let f1 = eval([x[0], x[1] + h], &mut evals);
            if !(f0.is_finite() && f1.is_finite()) {
                return failed(x, fx, evals);
            }
            let mut g = [(f0 - fx) / h, (f1 - fx) / h];

            // Analytic multiplier-term gradient.
            for (c, &l) in constraints.iter().zip(&lambda) {
                let s = l / mu + c.value(x);
                if s > 0.0 {
                    let cg = c.gradient(x);
                    g[0] += mu * s * cg[0];
                    g[1] += mu * s * cg[1];
                }
            }

            // Scaled descent direction.
            let d = [-g[0] * opts.scale[0], -g[1] * opts.scale[1]];
            let dir_deriv = g[0] * d[0] + g[1] * d[1];
            if dir_deriv >= -1e-18 {
                break; // stationary (or at a kink with no descent direction)
            }

            // Backtracking line search on the merit function.
            let mut t = step;
            let mut accepted = None;
            for _ in 0..MAX_BACKTRACKS {
                if evals >= opts.max_evals {
                    out_of_budget = true;
                    break;
                }
                let xt = [x[0] + t * d[0], x[1] + t * d[1]];
                let ft = eval(xt, &mut evals);
                if ft.is_finite() {
                    let mt = ft + al_term(xt, &lambda, mu);
                    if mt <= merit + ARMIJO_C1 * t * dir_deriv {
                        accepted = Some((xt, ft, mt, t));
                        break;
                    }
                }
                t *= 0.5;
            }

            let Some((xt, ft, mt, t)) = accepted else {
                break; // no decrease possible along the subgradient
            };
            let delta = merit - mt;
            x = xt;
            fx = ft;
            merit = mt;
            step = (t * 2.0).min(1e3);

            if delta <= opts.ftol {
                break;
            }
            if out_of_budget {
                break;
            }
        }

        // Feasibility decides whether this outer round is the last.
        let viol = max_violation(x);
        if viol <= FEAS_TOL {
            let status = if out_of_budget {
                SolverStatus::EvalBudgetExhausted
            } else {
                SolverStatus::Converged
            };
            return Solution {
                x,
                objective: fx,
                evaluations: evals,
                status,
            };
        }
        if out_of_budget {
            return failed(x, fx, evals);
        }

        // First-order multiplier update; raise the penalty only when
        // feasibility stalls.
        for (l, c) in lambda.iter_mut().zip(constraints) {
            *l = (*l + mu * c.value(x)).max(0.0);
        }
        if viol > 0.25 * prev_viol {
            mu *= MU_GROWTH;
            if mu > MU_MAX {
                return failed(x, fx, evals);
            }
        }
        prev_viol = viol;
    }
}
