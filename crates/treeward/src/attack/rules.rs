//! Attacker rule file parsing and validation.
//!
//! The rule file is JSON:
//!
//! ```json
//! { "rules": [
//!   { "feature": 0, "pre": [0.0, 10.0], "shift": 1.0, "cost": 1.0 },
//!   { "feature": 2, "among": ["A", "B"], "assign": "C", "cost": 5.0 }
//! ] }
//! ```
//!
//! Each rule targets one feature and carries a pre-condition (`pre` numeric
//! interval or `among` symbol list; absent means any value), exactly one
//! perturbation (`shift` for numerical columns, `assign` otherwise), and a
//! strictly positive cost. Rules are validated against the dataset schema at
//! attacker construction; every mismatch is a [`ConfigError`].

use serde::Deserialize;

use crate::data::{Dataset, FeatureKind, FeatureValue};
use crate::error::ConfigError;

// =============================================================================
// Raw file schema
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct RuleFileSchema {
    pub rules: Vec<RuleSpec>,
}

/// One rule as written in the file, before validation.
#[derive(Debug, Deserialize)]
pub(crate) struct RuleSpec {
    pub feature: usize,
    #[serde(default)]
    pub pre: Option<[f64; 2]>,
    #[serde(default)]
    pub among: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub shift: Option<f64>,
    #[serde(default)]
    pub assign: Option<serde_json::Value>,
    pub cost: f64,
}

// =============================================================================
// Compiled rules
// =============================================================================

/// A rule pre-condition, checked against the current value of the target
/// feature.
#[derive(Debug, Clone, PartialEq)]
pub enum Precondition {
    /// Applies to any value.
    Any,
    /// Inclusive numeric interval.
    Interval { lo: f64, hi: f64 },
    /// Applies when the value is one of these.
    Among(Vec<FeatureValue>),
}

/// The effect of applying a rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Perturbation {
    /// Add a delta to a numerical value.
    Shift(f64),
    /// Replace the value outright.
    Assign(FeatureValue),
}

/// A validated attacker rule for one feature.
#[derive(Debug, Clone)]
pub struct AttackerRule {
    feature: usize,
    pre: Precondition,
    perturb: Perturbation,
    cost: f64,
}

impl AttackerRule {
    /// Build a rule directly (test and embedding entry point; file rules go
    /// through [`compile_rules`]).
    pub fn new(feature: usize, pre: Precondition, perturb: Perturbation, cost: f64) -> Self {
        debug_assert!(cost > 0.0 && cost.is_finite());
        Self {
            feature,
            pre,
            perturb,
            cost,
        }
    }

    #[inline]
    pub fn feature(&self) -> usize {
        self.feature
    }

    #[inline]
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// Whether the pre-condition holds for `value`.
    pub fn applies_to(&self, value: FeatureValue) -> bool {
        match &self.pre {
            Precondition::Any => true,
            Precondition::Interval { lo, hi } => match value.as_f64() {
                Some(x) => *lo <= x && x <= *hi,
                None => false,
            },
            Precondition::Among(set) => set.contains(&value),
        }
    }

    /// The perturbed value.
    pub fn apply(&self, value: FeatureValue) -> FeatureValue {
        match self.perturb {
            Perturbation::Shift(delta) => match value {
                FeatureValue::Int(v) => FeatureValue::Int(v + delta as i64),
                FeatureValue::Float(v) => FeatureValue::Float(v + delta),
                other => panic!("shift perturbation applied to non-numerical value {other:?}"),
            },
            Perturbation::Assign(new_value) => new_value,
        }
    }
}

// =============================================================================
// Validation
// =============================================================================

fn kind_err(rule: usize, feature: usize, reason: impl Into<String>) -> ConfigError {
    ConfigError::RuleKind {
        rule,
        feature,
        reason: reason.into(),
    }
}

/// Resolve an `among`/`assign` JSON value against a column's kind.
fn resolve_value(
    dataset: &Dataset,
    rule: usize,
    feature: usize,
    raw: &serde_json::Value,
) -> Result<FeatureValue, ConfigError> {
    let kind = dataset.kind(feature);
    match kind {
        FeatureKind::Bool => raw
            .as_bool()
            .map(FeatureValue::Bool)
            .ok_or_else(|| kind_err(rule, feature, format!("expected a boolean, got {raw}"))),
        FeatureKind::Int => raw
            .as_i64()
            .map(FeatureValue::Int)
            .ok_or_else(|| kind_err(rule, feature, format!("expected an integer, got {raw}"))),
        FeatureKind::Float => raw
            .as_f64()
            .filter(|x| x.is_finite())
            .map(FeatureValue::Float)
            .ok_or_else(|| kind_err(rule, feature, format!("expected a finite number, got {raw}"))),
        FeatureKind::Cat => {
            let symbol = raw
                .as_str()
                .ok_or_else(|| kind_err(rule, feature, format!("expected a symbol, got {raw}")))?;
            let id = dataset
                .column(feature)
                .symbol_id(symbol)
                .ok_or_else(|| ConfigError::RuleSymbol {
                    rule,
                    symbol: symbol.to_string(),
                })?;
            Ok(FeatureValue::Cat(id))
        }
    }
}

/// Validate raw rule specs against the dataset schema.
pub(crate) fn compile_rules(
    specs: Vec<RuleSpec>,
    dataset: &Dataset,
) -> Result<Vec<AttackerRule>, ConfigError> {
    let mut rules = Vec::with_capacity(specs.len());
    for (idx, spec) in specs.into_iter().enumerate() {
        if spec.feature >= dataset.n_features() {
            return Err(ConfigError::RuleFeature {
                rule: idx,
                feature: spec.feature,
                n_features: dataset.n_features(),
            });
        }
        let feature = spec.feature;
        let kind = dataset.kind(feature);

        if !(spec.cost > 0.0 && spec.cost.is_finite()) {
            return Err(ConfigError::RuleCost {
                rule: idx,
                cost: spec.cost,
            });
        }

        let pre = match (spec.pre, spec.among) {
            (Some(_), Some(_)) => {
                return Err(kind_err(idx, feature, "rule has both 'pre' and 'among'"));
            }
            (Some([lo, hi]), None) => {
                if !kind.is_numerical() {
                    return Err(kind_err(idx, feature, "'pre' interval on a non-numerical column"));
                }
                if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
                    return Err(kind_err(idx, feature, format!("bad interval [{lo}, {hi}]")));
                }
                Precondition::Interval { lo, hi }
            }
            (None, Some(raw_values)) => {
                if kind.is_numerical() {
                    return Err(kind_err(idx, feature, "'among' list on a numerical column"));
                }
                let values = raw_values
                    .iter()
                    .map(|raw| resolve_value(dataset, idx, feature, raw))
                    .collect::<Result<Vec<_>, _>>()?;
                Precondition::Among(values)
            }
            (None, None) => Precondition::Any,
        };

        let perturb = match (spec.shift, spec.assign) {
            (Some(_), Some(_)) => {
                return Err(kind_err(idx, feature, "rule has both 'shift' and 'assign'"));
            }
            (Some(delta), None) => {
                if !kind.is_numerical() {
                    return Err(kind_err(idx, feature, "'shift' on a non-numerical column"));
                }
                if !delta.is_finite() {
                    return Err(kind_err(idx, feature, "'shift' must be finite"));
                }
                if kind == FeatureKind::Int && delta.fract() != 0.0 {
                    return Err(kind_err(idx, feature, "'shift' on an INT column must be integral"));
                }
                Perturbation::Shift(delta)
            }
            (None, Some(raw)) => Perturbation::Assign(resolve_value(dataset, idx, feature, &raw)?),
            (None, None) => {
                return Err(kind_err(idx, feature, "rule needs 'shift' or 'assign'"));
            }
        };

        rules.push(AttackerRule::new(feature, pre, perturb, spec.cost));
    }
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FeatureColumn;

    fn dataset() -> Dataset {
        Dataset::new(
            vec![
                FeatureColumn::Int(vec![0, 1, 2]),
                FeatureColumn::Cat {
                    values: vec![0, 1, 2],
                    symbols: vec!["A".into(), "B".into(), "C".into()],
                },
                FeatureColumn::Bool(vec![true, false, true]),
            ],
            vec![0.0, 1.0, 2.0],
            None,
        )
        .unwrap()
    }

    fn parse(json: &str) -> Vec<RuleSpec> {
        serde_json::from_str::<RuleFileSchema>(json).unwrap().rules
    }

    #[test]
    fn compiles_shift_rule_with_interval() {
        let rules = compile_rules(
            parse(r#"{"rules":[{"feature":0,"pre":[0,1],"shift":1,"cost":0.5}]}"#),
            &dataset(),
        )
        .unwrap();
        assert_eq!(rules.len(), 1);
        assert!(rules[0].applies_to(FeatureValue::Int(1)));
        assert!(!rules[0].applies_to(FeatureValue::Int(2)));
        assert_eq!(rules[0].apply(FeatureValue::Int(1)), FeatureValue::Int(2));
    }

    #[test]
    fn compiles_categorical_assign() {
        let rules = compile_rules(
            parse(r#"{"rules":[{"feature":1,"among":["A","B"],"assign":"C","cost":2.0}]}"#),
            &dataset(),
        )
        .unwrap();
        assert!(rules[0].applies_to(FeatureValue::Cat(0)));
        assert!(!rules[0].applies_to(FeatureValue::Cat(2)));
        assert_eq!(rules[0].apply(FeatureValue::Cat(0)), FeatureValue::Cat(2));
    }

    #[test]
    fn compiles_bool_assign() {
        let rules = compile_rules(
            parse(r#"{"rules":[{"feature":2,"assign":false,"cost":1.0}]}"#),
            &dataset(),
        )
        .unwrap();
        assert!(rules[0].applies_to(FeatureValue::Bool(true)));
        assert_eq!(rules[0].apply(FeatureValue::Bool(true)), FeatureValue::Bool(false));
    }

    #[test]
    fn rejects_unknown_feature() {
        let err = compile_rules(
            parse(r#"{"rules":[{"feature":9,"shift":1,"cost":1}]}"#),
            &dataset(),
        );
        assert!(matches!(err, Err(ConfigError::RuleFeature { feature: 9, .. })));
    }

    #[test]
    fn rejects_shift_on_categorical() {
        let err = compile_rules(
            parse(r#"{"rules":[{"feature":1,"shift":1,"cost":1}]}"#),
            &dataset(),
        );
        assert!(matches!(err, Err(ConfigError::RuleKind { .. })));
    }

    #[test]
    fn rejects_unknown_symbol() {
        let err = compile_rules(
            parse(r#"{"rules":[{"feature":1,"assign":"Z","cost":1}]}"#),
            &dataset(),
        );
        assert!(matches!(err, Err(ConfigError::RuleSymbol { .. })));
    }

    #[test]
    fn rejects_non_positive_cost() {
        let err = compile_rules(
            parse(r#"{"rules":[{"feature":0,"shift":1,"cost":0.0}]}"#),
            &dataset(),
        );
        assert!(matches!(err, Err(ConfigError::RuleCost { .. })));
    }

    #[test]
    fn rejects_fractional_shift_on_int() {
        let err = compile_rules(
            parse(r#"{"rules":[{"feature":0,"shift":0.5,"cost":1}]}"#),
            &dataset(),
        );
        assert!(matches!(err, Err(ConfigError::RuleKind { .. })));
    }
}
