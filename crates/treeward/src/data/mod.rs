//! Typed columnar data handling.
//!
//! This module provides the training-time data container and its file
//! readers.
//!
//! # Overview
//!
//! Features are stored column-wise with one [`FeatureColumn`] per feature;
//! every column is a closed variant (boolean / integer / real / categorical
//! symbol) and the routing predicate for a split lives on the column kind.
//! Labels are a parallel `f64` vector.
//!
//! # File Format
//!
//! [`load_dataset`] reads a whitespace-separated feature file whose first
//! line is a type header (`BOOL`, `INT`, `DOUBLE`, `CAT`) plus a sibling
//! label file with one real per line. See [`io`] for details.

mod dataset;
pub mod io;
mod value;

pub use dataset::{DataError, Dataset, FeatureColumn};
pub use io::load_dataset;
pub use value::{FeatureKind, FeatureValue, Record};
