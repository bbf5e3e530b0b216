//! Adversarial commitments threaded down the tree.
//!
//! When an uncertain instance is assigned to a side of a committed split,
//! the adversary's options are narrowed; the record of that narrowing is a
//! [`Constraint`]: "this instance's future leaf prediction is bounded
//! relative to the opposite side's prediction at the commitment point".
//! Constraints flow into descendant split searches, where they become
//! inequality constraints on the SSE sub-optimizer.

use crate::attack::Attacker;
use crate::data::{FeatureKind, FeatureValue, Record};

use super::slsqp::InequalityConstraint;

/// Which side of a candidate split a constraint currently binds.
///
/// The direction is ephemeral: it is set per candidate from the pair of
/// propagation outcomes before each SSE call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Unknown,
}

/// An adversarial commitment made at an ancestor split.
///
/// Fields: the constrained instance, its true label, the residual budget it
/// carried at the commitment, the inequality sense, the bound, and the side
/// it currently binds. `is_upper = false` caps the squared distance between
/// the bound prediction and the label from above; `true` forces it to stay
/// at least as large as the bound's.
#[derive(Clone, Debug)]
pub struct Constraint {
    record: Record,
    label: f64,
    cost: f64,
    is_upper: bool,
    bound: f64,
    direction: Direction,
}

impl Constraint {
    pub fn new(
        record: Record,
        label: f64,
        cost: f64,
        is_upper: bool,
        bound: f64,
        direction: Direction,
    ) -> Self {
        Self {
            record,
            label,
            cost,
            is_upper,
            bound,
            direction,
        }
    }

    #[inline]
    pub fn label(&self) -> f64 {
        self.label
    }

    #[inline]
    pub fn cost(&self) -> f64 {
        self.cost
    }

    #[inline]
    pub fn is_upper(&self) -> bool {
        self.is_upper
    }

    #[inline]
    pub fn bound(&self) -> f64 {
        self.bound
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Copy of this constraint with a new direction.
    pub fn with_direction(&self, direction: Direction) -> Self {
        let mut c = self.clone();
        c.direction = direction;
        c
    }

    // =========================================================================
    // Propagation
    // =========================================================================

    /// Restrict to the hypothesis that the instance lands in the left child
    /// of a split on (`feature`, `value`).
    ///
    /// `None` iff no attack on the instance within its residual budget can
    /// place it on the left. The caller decides the direction on the clone
    /// from the pair of left/right outcomes.
    pub fn propagate_left(
        &self,
        attacker: &Attacker,
        feature: usize,
        value: FeatureValue,
        kind: FeatureKind,
    ) -> Option<Constraint> {
        attacker
            .is_feasible(&self.record, feature, self.cost, |v| {
                kind.routes_left(v, value)
            })
            .then(|| self.clone())
    }

    /// Mirror of [`propagate_left`](Self::propagate_left) for the right child.
    pub fn propagate_right(
        &self,
        attacker: &Attacker,
        feature: usize,
        value: FeatureValue,
        kind: FeatureKind,
    ) -> Option<Constraint> {
        attacker
            .is_feasible(&self.record, feature, self.cost, |v| {
                !kind.routes_left(v, value)
            })
            .then(|| self.clone())
    }
}

// =============================================================================
// SSE inequality form
// =============================================================================

/// Constraint value in `g(x) <= 0` form, where `x = (pred_left, pred_right)`.
///
/// With `d_side = pred_side - label` and `b = (bound - label)^2`:
///
/// - `Left`,  lower: `d0^2 - b`;  upper: `b - d0^2`
/// - `Right`, lower: `d1^2 - b`;  upper: `b - d1^2`
/// - `Unknown`, lower: `min(d0^2, d1^2) - b`; upper: `max(d0^2, d1^2) - b`
impl InequalityConstraint for Constraint {
    fn value(&self, x: [f64; 2]) -> f64 {
        let b = (self.bound - self.label).powi(2);
        let d0 = x[0] - self.label;
        let d1 = x[1] - self.label;
        match self.direction {
            Direction::Left => {
                if self.is_upper {
                    b - d0 * d0
                } else {
                    d0 * d0 - b
                }
            }
            Direction::Right => {
                if self.is_upper {
                    b - d1 * d1
                } else {
                    d1 * d1 - b
                }
            }
            Direction::Unknown => {
                let s0 = d0 * d0;
                let s1 = d1 * d1;
                if self.is_upper {
                    s0.max(s1) - b
                } else {
                    s0.min(s1) - b
                }
            }
        }
    }

    fn gradient(&self, x: [f64; 2]) -> [f64; 2] {
        let d0 = x[0] - self.label;
        let d1 = x[1] - self.label;
        match self.direction {
            Direction::Left => {
                let g = if self.is_upper { -2.0 * d0 } else { 2.0 * d0 };
                [g, 0.0]
            }
            Direction::Right => {
                let g = if self.is_upper { -2.0 * d1 } else { 2.0 * d1 };
                [0.0, g]
            }
            Direction::Unknown => {
                // Subgradient at the kink: the active side keeps its
                // component, the other side is zeroed.
                let s0 = d0 * d0;
                let s1 = d1 * d1;
                let left_active = if self.is_upper { s0 >= s1 } else { s0 < s1 };
                if left_active {
                    [2.0 * d0, 0.0]
                } else {
                    [0.0, 2.0 * d1]
                }
            }
        }
    }
}
