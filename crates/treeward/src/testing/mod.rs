//! Test fixtures: small datasets and attackers shared by unit and
//! integration tests.

use rand::prelude::*;

use crate::attack::{Attacker, AttackerRule, Perturbation, Precondition};
use crate::data::{Dataset, FeatureColumn};

/// Dataset of integer columns.
pub fn int_dataset(columns: &[Vec<i64>], labels: Vec<f64>) -> Dataset {
    let columns = columns
        .iter()
        .map(|c| FeatureColumn::Int(c.clone()))
        .collect();
    Dataset::new(columns, labels, None).expect("fixture dataset must be valid")
}

/// A categorical column from string tokens, interned in order of first
/// appearance.
pub fn cat_column(tokens: &[&str]) -> FeatureColumn {
    let mut symbols: Vec<String> = Vec::new();
    let values = tokens
        .iter()
        .map(|t| {
            match symbols.iter().position(|s| s == t) {
                Some(p) => p as u32,
                None => {
                    symbols.push((*t).to_string());
                    (symbols.len() - 1) as u32
                }
            }
        })
        .collect();
    FeatureColumn::Cat { values, symbols }
}

/// An attacker with a single unconditional `+delta` shift on one feature.
pub fn shift_attacker(
    n_features: usize,
    feature: usize,
    delta: f64,
    cost: f64,
    budget: f64,
) -> Attacker {
    Attacker::new(
        vec![AttackerRule::new(
            feature,
            Precondition::Any,
            Perturbation::Shift(delta),
            cost,
        )],
        n_features,
        budget,
    )
}

/// An attacker that can flip a {0, 1} integer feature in either direction.
pub fn flip01_attacker(n_features: usize, feature: usize, cost: f64, budget: f64) -> Attacker {
    Attacker::new(
        vec![
            AttackerRule::new(
                feature,
                Precondition::Interval { lo: 0.0, hi: 0.0 },
                Perturbation::Shift(1.0),
                cost,
            ),
            AttackerRule::new(
                feature,
                Precondition::Interval { lo: 1.0, hi: 1.0 },
                Perturbation::Shift(-1.0),
                cost,
            ),
        ],
        n_features,
        budget,
    )
}

/// Seeded synthetic regression data: integer features in `0..10`, labels
/// linear in the features plus uniform noise.
pub fn synthetic_regression(n_rows: usize, n_features: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let columns: Vec<Vec<i64>> = (0..n_features)
        .map(|_| (0..n_rows).map(|_| rng.gen_range(0..10)).collect())
        .collect();
    let weights: Vec<f64> = (0..n_features).map(|_| rng.gen::<f64>() * 2.0 - 1.0).collect();
    let labels: Vec<f64> = (0..n_rows)
        .map(|i| {
            let signal: f64 = (0..n_features).map(|j| weights[j] * columns[j][i] as f64).sum();
            signal + (rng.gen::<f64>() - 0.5) * 0.1
        })
        .collect();
    int_dataset(&columns, labels)
}
