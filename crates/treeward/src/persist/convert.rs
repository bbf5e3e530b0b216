//! Runtime <-> schema conversion and file IO.

use std::fs;
use std::path::Path;

use crate::data::{Dataset, FeatureKind};
use crate::repr::{Forest, NodeId, Tree, TreeValidationError};

use super::schema::{ModelMetaSchema, ModelSchema, TreeSchema, SCHEMA_VERSION};

/// Serialization / deserialization errors.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("unsupported schema version {0} (expected {SCHEMA_VERSION})")]
    Version(u32),

    #[error("tree {tree}: array '{field}' has wrong length")]
    LengthMismatch { tree: usize, field: &'static str },

    #[error("tree {tree}, node {node}: split feature {feature} out of range")]
    FeatureOutOfRange {
        tree: usize,
        node: u32,
        feature: u32,
    },

    #[error("tree {tree}: invalid structure: {error:?}")]
    Structure {
        tree: usize,
        error: TreeValidationError,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Runtime -> schema
// =============================================================================

fn dataset_meta(dataset: &Dataset) -> ModelMetaSchema {
    let n = dataset.n_features();
    ModelMetaSchema {
        n_features: n,
        feature_names: dataset.names().to_vec(),
        feature_kinds: (0..n).map(|j| dataset.kind(j)).collect(),
        symbols: (0..n)
            .map(|j| dataset.column(j).symbols().map(|s| s.to_vec()))
            .collect(),
    }
}

/// Flatten a tree into pre-order arrays with remapped ids.
fn tree_to_schema(tree: &Tree) -> TreeSchema {
    // Pre-order visitation: node, left subtree, right subtree.
    let mut order: Vec<NodeId> = Vec::with_capacity(tree.n_nodes());
    let mut stack: Vec<NodeId> = vec![0];
    while let Some(node) = stack.pop() {
        order.push(node);
        if !tree.is_leaf(node) {
            stack.push(tree.right_child(node));
            stack.push(tree.left_child(node));
        }
    }
    debug_assert_eq!(order.len(), tree.n_nodes());

    let mut remap = vec![0u32; tree.n_nodes()];
    for (new_id, &old_id) in order.iter().enumerate() {
        remap[old_id as usize] = new_id as u32;
    }

    let mut schema = TreeSchema {
        num_nodes: order.len() as u32,
        split_indices: Vec::with_capacity(order.len()),
        split_values: Vec::with_capacity(order.len()),
        next_values: Vec::with_capacity(order.len()),
        children_left: Vec::with_capacity(order.len()),
        children_right: Vec::with_capacity(order.len()),
        is_leaf: Vec::with_capacity(order.len()),
        leaf_values: Vec::with_capacity(order.len()),
        gains: Vec::with_capacity(order.len()),
    };
    for &old_id in &order {
        let leaf = tree.is_leaf(old_id);
        schema.split_indices.push(tree.split_index(old_id));
        schema.split_values.push(tree.split_value(old_id));
        schema.next_values.push(tree.next_value(old_id));
        schema
            .children_left
            .push(if leaf { 0 } else { remap[tree.left_child(old_id) as usize] });
        schema
            .children_right
            .push(if leaf { 0 } else { remap[tree.right_child(old_id) as usize] });
        schema.is_leaf.push(leaf);
        schema.leaf_values.push(tree.leaf_value(old_id));
        schema.gains.push(tree.gain(old_id));
    }
    schema
}

// =============================================================================
// Schema -> runtime
// =============================================================================

fn tree_from_schema(
    schema: &TreeSchema,
    meta: &ModelMetaSchema,
    tree_index: usize,
) -> Result<Tree, PersistError> {
    let n = schema.num_nodes as usize;
    let check = |len: usize, field: &'static str| {
        if len != n {
            Err(PersistError::LengthMismatch {
                tree: tree_index,
                field,
            })
        } else {
            Ok(())
        }
    };
    check(schema.split_indices.len(), "split_indices")?;
    check(schema.split_values.len(), "split_values")?;
    check(schema.next_values.len(), "next_values")?;
    check(schema.children_left.len(), "children_left")?;
    check(schema.children_right.len(), "children_right")?;
    check(schema.is_leaf.len(), "is_leaf")?;
    check(schema.leaf_values.len(), "leaf_values")?;
    check(schema.gains.len(), "gains")?;

    // Split kinds are recovered from the feature metadata; leaves get a
    // placeholder kind that routing never consults.
    let mut split_kinds = Vec::with_capacity(n);
    for node in 0..n {
        if schema.is_leaf[node] {
            split_kinds.push(FeatureKind::Int);
            continue;
        }
        let feature = schema.split_indices[node];
        let kind = meta
            .feature_kinds
            .get(feature as usize)
            .copied()
            .ok_or(PersistError::FeatureOutOfRange {
                tree: tree_index,
                node: node as u32,
                feature,
            })?;
        split_kinds.push(kind);
    }

    let tree = Tree::new(
        schema.split_indices.clone(),
        split_kinds,
        schema.split_values.clone(),
        schema.next_values.clone(),
        schema.children_left.clone(),
        schema.children_right.clone(),
        schema.is_leaf.clone(),
        schema.leaf_values.clone(),
        schema.gains.clone(),
    );
    tree.validate().map_err(|error| PersistError::Structure {
        tree: tree_index,
        error,
    })?;
    Ok(tree)
}

// =============================================================================
// File IO
// =============================================================================

/// Serialize a trained forest (with the dataset's feature metadata) to JSON.
pub fn save_model(
    path: impl AsRef<Path>,
    forest: &Forest,
    dataset: &Dataset,
) -> Result<(), PersistError> {
    let schema = ModelSchema {
        version: SCHEMA_VERSION,
        meta: dataset_meta(dataset),
        trees: forest.trees().iter().map(tree_to_schema).collect(),
    };
    let file = fs::File::create(path)?;
    serde_json::to_writer_pretty(file, &schema)?;
    Ok(())
}

/// Load a model file back into a forest plus its feature metadata.
pub fn load_model(path: impl AsRef<Path>) -> Result<(Forest, ModelMetaSchema), PersistError> {
    let text = fs::read_to_string(path)?;
    let schema: ModelSchema = serde_json::from_str(&text)?;
    if schema.version != SCHEMA_VERSION {
        return Err(PersistError::Version(schema.version));
    }
    let trees = schema
        .trees
        .iter()
        .enumerate()
        .map(|(i, t)| tree_from_schema(t, &schema.meta, i))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((Forest::new(trees, schema.meta.n_features), schema.meta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FeatureColumn, FeatureValue};
    use crate::repr::MutableTree;

    fn dataset() -> Dataset {
        Dataset::new(
            vec![
                FeatureColumn::Int(vec![0, 1, 2]),
                FeatureColumn::Cat {
                    values: vec![0, 1, 0],
                    symbols: vec!["A".into(), "B".into()],
                },
            ],
            vec![0.0, 1.0, 2.0],
            None,
        )
        .unwrap()
    }

    fn depth2_tree() -> Tree {
        let mut t = MutableTree::new();
        let root = t.init_root();
        let (l, r) = t.apply_split(
            root,
            0,
            FeatureKind::Int,
            FeatureValue::Int(1),
            FeatureValue::Int(2),
            2.0,
        );
        let (ll, lr) = t.apply_split(
            l,
            1,
            FeatureKind::Cat,
            FeatureValue::Cat(0),
            FeatureValue::Cat(0),
            0.5,
        );
        t.make_leaf(ll, 0.0);
        t.make_leaf(lr, 1.0);
        t.make_leaf(r, 2.0);
        t.freeze()
    }

    #[test]
    fn schema_is_preorder() {
        let schema = tree_to_schema(&depth2_tree());
        assert_eq!(schema.num_nodes, 5);
        // Pre-order: root, left interior, its two leaves, right leaf.
        assert!(!schema.is_leaf[0]);
        assert!(!schema.is_leaf[1]);
        assert!(schema.is_leaf[2] && schema.is_leaf[3] && schema.is_leaf[4]);
        assert_eq!(schema.children_left[0], 1);
        assert_eq!(schema.children_right[0], 4);
        assert_eq!(schema.children_left[1], 2);
        assert_eq!(schema.children_right[1], 3);
    }

    #[test]
    fn round_trip_preserves_routing() {
        let ds = dataset();
        let forest = Forest::new(vec![depth2_tree()], 2);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        save_model(&path, &forest, &ds).unwrap();
        let (loaded, meta) = load_model(&path).unwrap();

        assert_eq!(meta.n_features, 2);
        assert_eq!(meta.feature_kinds, vec![FeatureKind::Int, FeatureKind::Cat]);
        assert_eq!(meta.symbols[1].as_deref(), Some(&["A".to_string(), "B".to_string()][..]));
        assert!(loaded.validate().is_ok());

        for i in 0..ds.n_rows() {
            let record = ds.record(i);
            assert_eq!(forest.predict_row(&record), loaded.predict_row(&record));
        }
    }

    #[test]
    fn rejects_wrong_version() {
        let ds = dataset();
        let forest = Forest::new(vec![depth2_tree()], 2);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        save_model(&path, &forest, &ds).unwrap();

        let mut value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        value["version"] = serde_json::json!(99);
        fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();

        assert!(matches!(load_model(&path), Err(PersistError::Version(99))));
    }

    #[test]
    fn rejects_out_of_range_feature() {
        let ds = dataset();
        let forest = Forest::new(vec![depth2_tree()], 2);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        save_model(&path, &forest, &ds).unwrap();

        let mut value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        value["trees"][0]["split_indices"][0] = serde_json::json!(7);
        fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();

        assert!(matches!(
            load_model(&path),
            Err(PersistError::FeatureOutOfRange { feature: 7, .. })
        ));
    }

    #[test]
    fn rejects_truncated_arrays() {
        let ds = dataset();
        let forest = Forest::new(vec![depth2_tree()], 2);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        save_model(&path, &forest, &ds).unwrap();

        let mut value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        value["trees"][0]["gains"] = serde_json::json!([0.0]);
        fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();

        assert!(matches!(
            load_model(&path),
            Err(PersistError::LengthMismatch { field: "gains", .. })
        ));
    }
}
