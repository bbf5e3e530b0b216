//! Trained model representation.
//!
//! - [`Tree`]: Immutable SoA tree storage for efficient traversal
//! - [`MutableTree`]: Builder for constructing trees during training
//! - [`Forest`]: Tree collection with mean aggregation

mod forest;
mod tree;

pub use forest::Forest;
pub use tree::{MutableTree, NodeId, Tree, TreeValidationError};
