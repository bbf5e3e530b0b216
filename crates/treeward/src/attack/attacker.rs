//! Attack-set enumeration.
//!
//! [`Attacker::attack`] returns every perturbed version of an instance the
//! adversary can reach on one feature within a residual budget, each
//! annotated with its minimal cumulative cost. The unperturbed instance is
//! always reachable at cost zero.

use std::fs;
use std::path::Path;

use super::rules::{compile_rules, AttackerRule, RuleFileSchema};
use crate::data::{Dataset, FeatureValue, Record};
use crate::error::ConfigError;

/// The adversary: validated per-feature rules plus a global budget.
///
/// Read-only after construction; shared by reference across split-search
/// workers.
#[derive(Debug, Clone)]
pub struct Attacker {
    /// Rules grouped by target feature.
    rules: Vec<Vec<AttackerRule>>,
    budget: f64,
}

impl Attacker {
    /// Build an attacker from already-validated rules.
    pub fn new(rules: Vec<AttackerRule>, n_features: usize, budget: f64) -> Self {
        let mut by_feature: Vec<Vec<AttackerRule>> = vec![Vec::new(); n_features];
        for rule in rules {
            by_feature[rule.feature()].push(rule);
        }
        Self {
            rules: by_feature,
            budget,
        }
    }

    /// Build an attacker with no rules (the budget is then irrelevant).
    pub fn unarmed(n_features: usize) -> Self {
        Self::new(Vec::new(), n_features, 0.0)
    }

    /// Read and validate a JSON rule file against the dataset schema.
    pub fn from_file(
        path: impl AsRef<Path>,
        dataset: &Dataset,
        budget: f64,
    ) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let schema: RuleFileSchema = serde_json::from_str(&text)?;
        let rules = compile_rules(schema.rules, dataset)?;
        Ok(Self::new(rules, dataset.n_features(), budget))
    }

    /// The global perturbation budget.
    #[inline]
    pub fn budget(&self) -> f64 {
        self.budget
    }

    /// Perturbed values of `value` on `feature` reachable within
    /// `residual_cost`, each with its minimal cumulative cost, sorted by
    /// (cost asc, value asc). The first entry is `(value, 0.0)`.
    ///
    /// Rules chain: a rule applies to the value produced by earlier rules as
    /// long as the accumulated cost stays within the residual. Rule costs
    /// are strictly positive, so the closure is finite.
    pub fn attack_values(
        &self,
        value: FeatureValue,
        feature: usize,
        residual_cost: f64,
    ) -> Vec<(FeatureValue, f64)> {
        let mut reached: Vec<(FeatureValue, f64)> = vec![(value, 0.0)];
        let rules = &self.rules[feature];
        if !rules.is_empty() {
            // Fixpoint over minimal costs: re-expansion is needed when a
            // cheaper chain to an already-seen value is found.
            loop {
                let mut changed = false;
                let mut idx = 0;
                while idx < reached.len() {
                    let (v, c) = reached[idx];
                    for rule in rules {
                        if !rule.applies_to(v) {
                            continue;
                        }
                        let c2 = c + rule.cost();
                        if c2 > residual_cost {
                            continue;
                        }
                        let v2 = rule.apply(v);
                        match reached.iter().position(|(u, _)| *u == v2) {
                            Some(pos) => {
                                if c2 < reached[pos].1 {
                                    reached[pos].1 = c2;
                                    changed = true;
                                }
                            }
                            None => {
                                reached.push((v2, c2));
                                changed = true;
                            }
                        }
                    }
                    idx += 1;
                }
                if !changed {
                    break;
                }
            }
            reached.sort_by(|(va, ca), (vb, cb)| {
                ca.partial_cmp(cb)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| va.total_cmp(vb))
            });
        }
        debug_assert_eq!(reached[0].1, 0.0);
        reached
    }

    /// The attack set for a full record: [`attack_values`](Self::attack_values)
    /// materialized as perturbed records.
    pub fn attack(
        &self,
        record: &Record,
        feature: usize,
        residual_cost: f64,
    ) -> Vec<(Record, f64)> {
        self.attack_values(record[feature], feature, residual_cost)
            .into_iter()
            .map(|(v, cost)| {
                let mut perturbed = record.clone();
                perturbed[feature] = v;
                (perturbed, cost)
            })
            .collect()
    }

    /// Is there any attack on (record, feature) within `residual_cost` whose
    /// resulting value satisfies `predicate`?
    pub fn is_feasible(
        &self,
        record: &Record,
        feature: usize,
        residual_cost: f64,
        predicate: impl Fn(FeatureValue) -> bool,
    ) -> bool {
        self.attack_values(record[feature], feature, residual_cost)
            .iter()
            .any(|&(v, _)| predicate(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attack::rules::{Perturbation, Precondition};

    fn shift_rule(feature: usize, lo: f64, hi: f64, delta: f64, cost: f64) -> AttackerRule {
        AttackerRule::new(
            feature,
            Precondition::Interval { lo, hi },
            Perturbation::Shift(delta),
            cost,
        )
    }

    #[test]
    fn identity_attack_is_first_and_free() {
        let atk = Attacker::new(vec![shift_rule(0, 0.0, 10.0, 1.0, 1.0)], 1, 5.0);
        let attacks = atk.attack_values(FeatureValue::Int(3), 0, 2.0);
        assert_eq!(attacks[0], (FeatureValue::Int(3), 0.0));
    }

    #[test]
    fn chains_respect_budget() {
        let atk = Attacker::new(vec![shift_rule(0, 0.0, 100.0, 1.0, 1.0)], 1, 10.0);
        // Residual 2.5 allows two chained +1 shifts.
        let attacks = atk.attack_values(FeatureValue::Int(0), 0, 2.5);
        assert_eq!(
            attacks,
            vec![
                (FeatureValue::Int(0), 0.0),
                (FeatureValue::Int(1), 1.0),
                (FeatureValue::Int(2), 2.0),
            ]
        );
    }

    #[test]
    fn residual_zero_yields_singleton() {
        let atk = Attacker::new(vec![shift_rule(0, 0.0, 100.0, 1.0, 1.0)], 1, 10.0);
        let attacks = atk.attack_values(FeatureValue::Int(0), 0, 0.0);
        assert_eq!(attacks, vec![(FeatureValue::Int(0), 0.0)]);
    }

    #[test]
    fn dedups_to_minimal_cost() {
        // Two routes to 2: direct (cost 3) and two chained +1 (cost 2).
        let rules = vec![
            AttackerRule::new(
                0,
                Precondition::Interval { lo: 0.0, hi: 0.0 },
                Perturbation::Assign(FeatureValue::Int(2)),
                3.0,
            ),
            shift_rule(0, 0.0, 1.0, 1.0, 1.0),
        ];
        let atk = Attacker::new(rules, 1, 10.0);
        let attacks = atk.attack_values(FeatureValue::Int(0), 0, 5.0);
        let two = attacks
            .iter()
            .find(|(v, _)| *v == FeatureValue::Int(2))
            .unwrap();
        assert_eq!(two.1, 2.0);
    }

    #[test]
    fn sorted_by_cost_then_value() {
        let rules = vec![
            shift_rule(0, 0.0, 0.0, 5.0, 1.0),
            shift_rule(0, 0.0, 0.0, -5.0, 1.0),
        ];
        let atk = Attacker::new(rules, 1, 10.0);
        let attacks = atk.attack_values(FeatureValue::Int(0), 0, 1.0);
        assert_eq!(
            attacks,
            vec![
                (FeatureValue::Int(0), 0.0),
                (FeatureValue::Int(-5), 1.0),
                (FeatureValue::Int(5), 1.0),
            ]
        );
    }

    #[test]
    fn attack_materializes_records() {
        let atk = Attacker::new(vec![shift_rule(1, 0.0, 10.0, 1.0, 1.0)], 2, 1.0);
        let record = vec![FeatureValue::Int(7), FeatureValue::Int(0)];
        let attacks = atk.attack(&record, 1, 1.0);
        assert_eq!(attacks.len(), 2);
        assert_eq!(attacks[0].0, record);
        assert_eq!(
            attacks[1].0,
            vec![FeatureValue::Int(7), FeatureValue::Int(1)]
        );
        // Untouched feature stays put.
        assert_eq!(attacks[1].0[0], FeatureValue::Int(7));
    }

    #[test]
    fn feasibility_probe() {
        let atk = Attacker::new(vec![shift_rule(0, 0.0, 10.0, 1.0, 1.0)], 1, 1.0);
        let record = vec![FeatureValue::Int(0)];
        assert!(atk.is_feasible(&record, 0, 1.0, |v| v == FeatureValue::Int(1)));
        assert!(!atk.is_feasible(&record, 0, 0.5, |v| v == FeatureValue::Int(1)));
    }

    #[test]
    fn unarmed_attacker_only_returns_identity() {
        let atk = Attacker::unarmed(2);
        let record = vec![FeatureValue::Float(1.5), FeatureValue::Bool(false)];
        assert_eq!(atk.attack(&record, 0, 100.0), vec![(record.clone(), 0.0)]);
    }
}
