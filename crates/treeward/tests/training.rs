//! End-to-end training scenarios.
//!
//! Each test exercises the full pipeline (attacker, simulation, constrained
//! SSE optimization, tree induction) on a dataset small enough to check the
//! expected tree by hand.

use approx::assert_abs_diff_eq;

use treeward::data::{Dataset, FeatureValue};
use treeward::testing::{cat_column, flip01_attacker, int_dataset, shift_attacker, synthetic_regression};
use treeward::training::{
    simulate_split, sum_squared_error, CostMap, Direction, SplitOptimizer,
};
use treeward::{
    Attacker, Parallelism, RobustTrainer, TrainParams, Verbosity,
};

fn silent(max_depth: usize) -> TrainParams {
    TrainParams {
        max_depth,
        min_per_node: 1,
        verbosity: Verbosity::Silent,
        ..Default::default()
    }
}

fn uniform_costs(n: usize, residual: f64) -> CostMap {
    (0..n).map(|i| (i, residual)).collect()
}

fn root_stats(dataset: &Dataset) -> (Vec<usize>, f64, f64) {
    let valid: Vec<usize> = (0..dataset.n_rows()).collect();
    let mean = dataset.mean_label(&valid);
    let loss = sum_squared_error(dataset.labels(), &valid, mean);
    (valid, mean, loss)
}

// =============================================================================
// Scenario: trivial regression, no adversary
// =============================================================================

#[test]
fn trivial_regression_splits_on_the_signal_feature() {
    // Labels equal feature 0; feature 1 carries no signal.
    let ds = int_dataset(
        &[vec![0, 0, 1, 1], vec![0, 1, 0, 1]],
        vec![0.0, 0.0, 1.0, 1.0],
    );
    let atk = Attacker::unarmed(2);
    let forest = RobustTrainer::new(silent(1)).train(&ds, &atk).unwrap();
    let tree = &forest.trees()[0];

    assert_eq!(tree.n_nodes(), 3);
    assert_eq!(tree.split_index(0), 0);
    assert_eq!(tree.split_value(0), FeatureValue::Int(0));
    assert_eq!(tree.next_value(0), FeatureValue::Int(1));
    // Gain is the whole root variance.
    assert_abs_diff_eq!(tree.gain(0), 1.0, epsilon = 1e-3);
    // Leaves recover the group means.
    assert_abs_diff_eq!(tree.predict_row(&ds.record(0)), 0.0, epsilon = 1e-3);
    assert_abs_diff_eq!(tree.predict_row(&ds.record(2)), 1.0, epsilon = 1e-3);
}

// =============================================================================
// Scenario: the budget hides the signal
// =============================================================================

#[test]
fn budget_hides_signal_and_training_falls_back_to_the_mean() {
    let ds = int_dataset(
        &[vec![0, 0, 1, 1], vec![0, 1, 0, 1]],
        vec![0.0, 0.0, 1.0, 1.0],
    );
    // The adversary can flip feature 0 in either direction within budget.
    let atk = flip01_attacker(2, 0, 1.0, 1.0);
    let forest = RobustTrainer::new(silent(1)).train(&ds, &atk).unwrap();
    let tree = &forest.trees()[0];

    assert_eq!(tree.n_nodes(), 1, "no split should survive the adversary");
    assert_abs_diff_eq!(tree.predict_row(&ds.record(0)), 0.5, epsilon = 1e-6);
}

#[test]
fn with_the_budget_exhausted_training_reduces_to_cart() {
    let ds = int_dataset(
        &[vec![0, 0, 1, 1], vec![0, 1, 0, 1]],
        vec![0.0, 0.0, 1.0, 1.0],
    );
    // Same rules, zero budget: every attack set is a singleton.
    let armed_but_broke = flip01_attacker(2, 0, 1.0, 0.0);
    let unarmed = Attacker::unarmed(2);

    let a = RobustTrainer::new(silent(1)).train(&ds, &armed_but_broke).unwrap();
    let b = RobustTrainer::new(silent(1)).train(&ds, &unarmed).unwrap();
    assert_eq!(a, b);
}

// =============================================================================
// Scenario: categorical equality split
// =============================================================================

#[test]
fn categorical_split_isolates_the_odd_symbol() {
    let ds = Dataset::new(
        vec![cat_column(&["A", "A", "B", "B", "C", "C"])],
        vec![1.0, 1.0, 1.0, 1.0, 0.0, 0.0],
        None,
    )
    .unwrap();
    let atk = Attacker::unarmed(1);
    let forest = RobustTrainer::new(silent(1)).train(&ds, &atk).unwrap();
    let tree = &forest.trees()[0];

    assert_eq!(tree.n_nodes(), 3);
    assert_eq!(tree.split_index(0), 0);
    // "C" interned as id 2; equality split sends C left.
    assert_eq!(tree.split_value(0), FeatureValue::Cat(2));
    assert_abs_diff_eq!(tree.gain(0), 4.0 / 3.0, epsilon = 1e-3);
    assert_abs_diff_eq!(tree.predict_row(&ds.record(4)), 0.0, epsilon = 1e-3);
    assert_abs_diff_eq!(tree.predict_row(&ds.record(0)), 1.0, epsilon = 1e-3);
}

// =============================================================================
// Scenario: constraint propagation through an uncertain commitment
// =============================================================================

#[test]
fn uncertain_commitment_emits_paired_constraints() {
    // One integer feature the adversary can push up by one at cost 1.
    let ds = int_dataset(&[vec![0, 1, 2, 3]], vec![0.0, 0.0, 10.0, 11.0]);
    let atk = shift_attacker(1, 0, 1.0, 1.0, 1.0);
    let optimizer = SplitOptimizer::new(&ds, &atk, Parallelism::Sequential);

    let (valid, mean, loss) = root_stats(&ds);
    let result = optimizer
        .find_best_split(&valid, &[0], &uniform_costs(4, 1.0), &[], loss, mean, 1)
        .unwrap();

    // The winning split isolates the two low labels plus the uncertain
    // instance 2, which the adversary prefers on the left (further from
    // the right prediction of ~11).
    assert_eq!(result.feature, 0);
    assert_eq!(result.value, FeatureValue::Int(2));
    assert_eq!(result.left, vec![0, 1, 2]);
    assert_eq!(result.right, vec![3]);
    assert_abs_diff_eq!(result.pred_left, 10.0 / 3.0, epsilon = 1e-2);
    assert_abs_diff_eq!(result.pred_right, 11.0, epsilon = 1e-2);

    // The commitment shows up in both children, bounded by the opposite
    // side's prediction.
    assert_eq!(result.constraints_left.len(), 1);
    assert_eq!(result.constraints_right.len(), 1);
    let cl = &result.constraints_left[0];
    let cr = &result.constraints_right[0];
    assert_eq!(cl.direction(), Direction::Left);
    assert!(cl.is_upper());
    assert_abs_diff_eq!(cl.bound(), result.pred_right, epsilon = 1e-9);
    assert_eq!(cr.direction(), Direction::Right);
    assert!(!cr.is_upper());
    assert_abs_diff_eq!(cr.bound(), result.pred_right, epsilon = 1e-9);
    // The identity attack keeps the instance left, so the committed
    // residual cost is zero.
    assert_abs_diff_eq!(cl.cost(), 0.0);
    assert_eq!(result.costs_left[&2], 0.0);
    // Certainly-routed instances keep their residual budget.
    assert_eq!(result.costs_left[&0], 1.0);
    assert_eq!(result.costs_right[&3], 1.0);
}

#[test]
fn gain_reconciles_with_the_children_sse() {
    let ds = int_dataset(&[vec![0, 1, 2, 3]], vec![0.0, 0.0, 10.0, 11.0]);
    let atk = shift_attacker(1, 0, 1.0, 1.0, 1.0);
    let optimizer = SplitOptimizer::new(&ds, &atk, Parallelism::Sequential);

    let (valid, mean, loss) = root_stats(&ds);
    let result = optimizer
        .find_best_split(&valid, &[0], &uniform_costs(4, 1.0), &[], loss, mean, 1)
        .unwrap();

    // The uncertain instance was assigned to its worst-case side, so the
    // post-commit per-side SSE sums back to the optimizer's objective.
    let children_sse = sum_squared_error(ds.labels(), &result.left, result.pred_left)
        + sum_squared_error(ds.labels(), &result.right, result.pred_right);
    assert_abs_diff_eq!(children_sse, result.sse, epsilon = 1e-6);
    assert_abs_diff_eq!(result.gain, loss - result.sse, epsilon = 1e-9);
}

// =============================================================================
// Scenario: determinism across worker counts
// =============================================================================

#[test]
fn worker_count_does_not_change_the_model() {
    let ds = synthetic_regression(60, 5, 1234);
    let atk = shift_attacker(5, 0, 1.0, 1.0, 2.0);

    let train = |n_workers: usize| {
        let params = TrainParams {
            n_workers,
            ..silent(3)
        };
        RobustTrainer::new(params).train(&ds, &atk).unwrap()
    };

    let sequential = train(1);
    let parallel = train(8);
    assert_eq!(sequential, parallel);
    assert!(sequential.trees()[0].n_nodes() > 1, "the fixture should actually split");
}

// =============================================================================
// Boundary behaviors
// =============================================================================

#[test]
fn max_depth_zero_yields_the_global_mean_leaf() {
    let ds = int_dataset(&[vec![0, 1, 2]], vec![1.0, 2.0, 6.0]);
    let atk = Attacker::unarmed(1);
    let forest = RobustTrainer::new(silent(0)).train(&ds, &atk).unwrap();
    let tree = &forest.trees()[0];
    assert_eq!(tree.n_nodes(), 1);
    assert_abs_diff_eq!(tree.predict_row(&ds.record(0)), 3.0, epsilon = 1e-9);
}

#[test]
fn min_per_node_above_n_yields_a_single_leaf() {
    let ds = int_dataset(&[vec![0, 1, 2]], vec![1.0, 2.0, 6.0]);
    let atk = Attacker::unarmed(1);
    let params = TrainParams {
        min_per_node: 100,
        ..silent(5)
    };
    let forest = RobustTrainer::new(params).train(&ds, &atk).unwrap();
    assert_eq!(forest.trees()[0].n_nodes(), 1);
}

#[test]
fn equal_labels_never_split() {
    let ds = int_dataset(&[vec![0, 1, 2, 3]], vec![4.0; 4]);
    let atk = Attacker::unarmed(1);
    let forest = RobustTrainer::new(silent(4)).train(&ds, &atk).unwrap();
    assert_eq!(forest.trees()[0].n_nodes(), 1);
}

#[test]
fn constant_features_never_split() {
    let ds = int_dataset(&[vec![5, 5, 5, 5]], vec![0.0, 1.0, 2.0, 3.0]);
    let atk = Attacker::unarmed(1);
    let forest = RobustTrainer::new(silent(4)).train(&ds, &atk).unwrap();
    assert_eq!(forest.trees()[0].n_nodes(), 1);
}

// =============================================================================
// Partition invariants on a larger instance
// =============================================================================

#[test]
fn simulation_partitions_every_candidate() {
    let ds = synthetic_regression(50, 3, 7);
    let atk = shift_attacker(3, 1, 2.0, 1.0, 3.0);
    let valid: Vec<usize> = (0..ds.n_rows()).collect();
    let costs = uniform_costs(ds.n_rows(), 3.0);

    for feature in 0..ds.n_features() {
        for value in ds.column(feature).unique_values() {
            let p = simulate_split(&ds, &valid, &atk, &costs, feature, value);
            assert_eq!(p.len(), valid.len());
            let mut seen: Vec<usize> =
                p.left.iter().chain(&p.right).chain(&p.unknown).copied().collect();
            seen.sort_unstable();
            assert_eq!(seen, valid);
        }
    }
}

#[test]
fn attacked_feature_produces_uncertainty_where_expected() {
    let ds = int_dataset(&[vec![0, 1, 2, 3]], vec![0.0; 4]);
    let atk = shift_attacker(1, 0, 1.0, 1.0, 1.0);
    let valid = vec![0, 1, 2, 3];
    let costs = uniform_costs(4, 1.0);

    // Split at 1: only the instance sitting exactly on the threshold can be
    // pushed across.
    let p = simulate_split(&ds, &valid, &atk, &costs, 0, FeatureValue::Int(1));
    assert_eq!(p.left, vec![0]);
    assert_eq!(p.right, vec![2, 3]);
    assert_eq!(p.unknown, vec![1]);
}

// =============================================================================
// Deeper adversarial training stays consistent
// =============================================================================

#[test]
fn depth_two_adversarial_training_completes_and_validates() {
    let ds = int_dataset(&[vec![0, 1, 2, 3, 4, 5, 6, 7]], vec![0.0, 0.0, 1.0, 1.0, 5.0, 5.0, 9.0, 9.0]);
    let atk = shift_attacker(1, 0, 1.0, 1.0, 1.0);
    let forest = RobustTrainer::new(silent(2)).train(&ds, &atk).unwrap();
    let tree = &forest.trees()[0];
    assert!(tree.validate().is_ok());
    assert!(tree.n_nodes() >= 3);
    for i in 0..ds.n_rows() {
        let p = tree.predict_row(&ds.record(i));
        assert!(p.is_finite(), "prediction for row {i} is not finite");
    }
}
