//! Model serialization.
//!
//! Models persist as a versioned JSON envelope: feature metadata (kinds,
//! names, categorical symbol tables) plus one SoA block per tree with nodes
//! written in pre-order. Loading validates array lengths, feature ranges,
//! and tree structure before handing back a [`Forest`](crate::Forest).

mod convert;
mod schema;

pub use convert::{load_model, save_model, PersistError};
pub use schema::{ModelMetaSchema, ModelSchema, TreeSchema, SCHEMA_VERSION};
