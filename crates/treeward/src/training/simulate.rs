//! Split simulation under attack.
//!
//! For a candidate (feature, value), every instance of the node is classified
//! by exhausting its attack set: if every reachable perturbation routes left
//! the instance is *certainly left*, if every one routes right it is
//! *certainly right*, otherwise the adversary controls its side and it is
//! *uncertain*.

use crate::attack::Attacker;
use crate::data::{Dataset, FeatureValue};

use super::split::CostMap;

/// The three-way partition produced by [`simulate_split`].
#[derive(Debug, Clone, Default)]
pub struct SplitPartition {
    pub left: Vec<usize>,
    pub right: Vec<usize>,
    pub unknown: Vec<usize>,
}

impl SplitPartition {
    /// Total number of partitioned instances.
    pub fn len(&self) -> usize {
        self.left.len() + self.right.len() + self.unknown.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partition `valid` into (certainly-left, certainly-right, uncertain) for a
/// split of `feature` at `value`.
///
/// Pure function of its inputs; the relative order of `valid` is preserved
/// within each group.
pub fn simulate_split(
    dataset: &Dataset,
    valid: &[usize],
    attacker: &Attacker,
    costs: &CostMap,
    feature: usize,
    value: FeatureValue,
) -> SplitPartition {
    let kind = dataset.kind(feature);
    let column = dataset.column(feature);
    let mut partition = SplitPartition::default();

    for &i in valid {
        let residual = costs[&i];
        let attacks = attacker.attack_values(column.value(i), feature, residual);

        let mut all_left = true;
        let mut all_right = true;
        for &(v, _) in &attacks {
            if kind.routes_left(v, value) {
                all_right = false;
            } else {
                all_left = false;
            }
            if !all_left && !all_right {
                break;
            }
        }

        if all_left {
            partition.left.push(i);
        } else if all_right {
            partition.right.push(i);
        } else {
            partition.unknown.push(i);
        }
    }

    partition
}
