//! Feature values and column kinds.
//!
//! A [`FeatureValue`] is a tagged scalar: boolean, integer, real, or
//! categorical symbol (interned to an id by the owning column). The split
//! routing predicate lives on [`FeatureKind`]: numerical kinds route left on
//! `value <= threshold`, categorical kinds on `value == threshold`.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// A single feature value.
///
/// `Float` values are always finite: the readers reject non-finite cells and
/// attacker rules only shift by finite amounts.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Categorical symbol id, interned by the owning column.
    Cat(u32),
}

// Floats are finite by construction, so equality is reflexive.
impl Eq for FeatureValue {}

impl FeatureValue {
    /// Total order within a variant.
    ///
    /// # Panics
    ///
    /// Panics when comparing values of different variants; values compared
    /// during training always come from the same column.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (FeatureValue::Bool(a), FeatureValue::Bool(b)) => a.cmp(b),
            (FeatureValue::Int(a), FeatureValue::Int(b)) => a.cmp(b),
            (FeatureValue::Float(a), FeatureValue::Float(b)) => a.total_cmp(b),
            (FeatureValue::Cat(a), FeatureValue::Cat(b)) => a.cmp(b),
            (a, b) => panic!("cannot compare feature values of different kinds: {a:?} vs {b:?}"),
        }
    }

    /// Numeric view of the value, when it has one.
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            FeatureValue::Int(v) => Some(v as f64),
            FeatureValue::Float(v) => Some(v),
            FeatureValue::Bool(_) | FeatureValue::Cat(_) => None,
        }
    }

    /// The kind this value belongs to.
    #[inline]
    pub fn kind(&self) -> FeatureKind {
        match self {
            FeatureValue::Bool(_) => FeatureKind::Bool,
            FeatureValue::Int(_) => FeatureKind::Int,
            FeatureValue::Float(_) => FeatureKind::Float,
            FeatureValue::Cat(_) => FeatureKind::Cat,
        }
    }
}

/// The declared type of a feature column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    Bool,
    Int,
    Float,
    Cat,
}

impl FeatureKind {
    /// Numerical columns split on `<=`; boolean and categorical columns
    /// split on equality.
    #[inline]
    pub fn is_numerical(self) -> bool {
        matches!(self, FeatureKind::Int | FeatureKind::Float)
    }

    /// Whether `value` is routed to the left child of a split at `threshold`.
    #[inline]
    pub fn routes_left(self, value: FeatureValue, threshold: FeatureValue) -> bool {
        if self.is_numerical() {
            value.total_cmp(&threshold) != Ordering::Greater
        } else {
            value == threshold
        }
    }
}

/// An ordered row of feature values, one per column.
pub type Record = Vec<FeatureValue>;
