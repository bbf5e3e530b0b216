//! Schema types for model serialization.
//!
//! Container types are separate from runtime types so the on-disk layout can
//! evolve independently and be validated during deserialization. The scalar
//! enums ([`FeatureValue`], [`FeatureKind`]) serialize stably and are reused
//! as-is.

use serde::{Deserialize, Serialize};

use crate::data::{FeatureKind, FeatureValue};

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Model metadata: everything a consumer needs to route records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetaSchema {
    /// Number of features.
    pub n_features: usize,
    /// Feature names, index-aligned.
    pub feature_names: Vec<String>,
    /// Feature kinds, index-aligned.
    pub feature_kinds: Vec<FeatureKind>,
    /// Per-feature symbol tables; `None` for non-categorical columns.
    pub symbols: Vec<Option<Vec<String>>>,
}

/// One tree as flat pre-order arrays.
///
/// Interior nodes carry `(feature, split value, next split value, children)`;
/// leaves carry the prediction. The root is node 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeSchema {
    pub num_nodes: u32,
    pub split_indices: Vec<u32>,
    pub split_values: Vec<FeatureValue>,
    pub next_values: Vec<FeatureValue>,
    pub children_left: Vec<u32>,
    pub children_right: Vec<u32>,
    pub is_leaf: Vec<bool>,
    pub leaf_values: Vec<f64>,
    pub gains: Vec<f64>,
}

/// The serialized model envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSchema {
    pub version: u32,
    pub meta: ModelMetaSchema,
    pub trees: Vec<TreeSchema>,
}
