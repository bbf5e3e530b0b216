//! Dataset container.
//!
//! [`Dataset`] owns one typed [`FeatureColumn`] per feature plus a parallel
//! label vector. It is immutable during training and shared by reference
//! across split-search workers.

use ndarray::Array1;

use super::value::{FeatureKind, FeatureValue, Record};

// =============================================================================
// Errors
// =============================================================================

/// Ingestion errors. Fatal at dataset construction.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// The dataset has no rows or no columns.
    #[error("dataset is empty")]
    Empty,

    /// Columns have differing lengths.
    #[error("column {column} has {got} rows, expected {expected}")]
    ColumnLength {
        column: usize,
        expected: usize,
        got: usize,
    },

    /// A record line has the wrong number of cells.
    #[error("line {line}: expected {expected} cells, found {got}")]
    RaggedRow {
        line: usize,
        expected: usize,
        got: usize,
    },

    /// Label count differs from record count.
    #[error("label file has {labels} entries for {rows} records")]
    LabelCount { labels: usize, rows: usize },

    /// A type-header token is not one of BOOL, INT, DOUBLE, CAT.
    #[error("unknown type token '{0}' in header (expected BOOL, INT, DOUBLE or CAT)")]
    UnknownTypeToken(String),

    /// A cell failed to parse as its column's declared type.
    #[error("line {line}, column {column}: cannot parse '{token}' as {kind:?}")]
    ParseCell {
        line: usize,
        column: usize,
        token: String,
        kind: FeatureKind,
    },

    /// A label line failed to parse as a real number.
    #[error("label line {line}: cannot parse '{token}'")]
    ParseLabel { line: usize, token: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// =============================================================================
// FeatureColumn
// =============================================================================

/// A typed feature column.
///
/// Closed set of variants; the routing predicate for splits lives on
/// [`FeatureKind`], which every variant maps to.
#[derive(Debug, Clone)]
pub enum FeatureColumn {
    Bool(Vec<bool>),
    Int(Vec<i64>),
    Float(Vec<f64>),
    /// Categorical symbols interned in order of first appearance.
    Cat { values: Vec<u32>, symbols: Vec<String> },
}

impl FeatureColumn {
    /// The declared kind of this column.
    #[inline]
    pub fn kind(&self) -> FeatureKind {
        match self {
            FeatureColumn::Bool(_) => FeatureKind::Bool,
            FeatureColumn::Int(_) => FeatureKind::Int,
            FeatureColumn::Float(_) => FeatureKind::Float,
            FeatureColumn::Cat { .. } => FeatureKind::Cat,
        }
    }

    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            FeatureColumn::Bool(v) => v.len(),
            FeatureColumn::Int(v) => v.len(),
            FeatureColumn::Float(v) => v.len(),
            FeatureColumn::Cat { values, .. } => values.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at `row`.
    #[inline]
    pub fn value(&self, row: usize) -> FeatureValue {
        match self {
            FeatureColumn::Bool(v) => FeatureValue::Bool(v[row]),
            FeatureColumn::Int(v) => FeatureValue::Int(v[row]),
            FeatureColumn::Float(v) => FeatureValue::Float(v[row]),
            FeatureColumn::Cat { values, .. } => FeatureValue::Cat(values[row]),
        }
    }

    /// Distinct values in ascending order.
    pub fn unique_values(&self) -> Vec<FeatureValue> {
        let mut values: Vec<FeatureValue> = (0..self.len()).map(|i| self.value(i)).collect();
        values.sort_by(|a, b| a.total_cmp(b));
        values.dedup();
        values
    }

    /// Symbol table for categorical columns, `None` otherwise.
    pub fn symbols(&self) -> Option<&[String]> {
        match self {
            FeatureColumn::Cat { symbols, .. } => Some(symbols),
            _ => None,
        }
    }

    /// Resolve a symbol name to its interned id (categorical columns only).
    pub fn symbol_id(&self, name: &str) -> Option<u32> {
        self.symbols()?
            .iter()
            .position(|s| s == name)
            .map(|p| p as u32)
    }
}

// =============================================================================
// Dataset
// =============================================================================

/// The training dataset: typed columns plus labels.
///
/// # Construction
///
/// Use [`Dataset::new`] with pre-built columns, or
/// [`load_dataset`](super::load_dataset) to read the on-disk format.
#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<FeatureColumn>,
    labels: Array1<f64>,
    names: Vec<String>,
}

impl Dataset {
    /// Create a dataset from columns and labels.
    ///
    /// Column names default to `f0`, `f1`, ... when `names` is `None`.
    pub fn new(
        columns: Vec<FeatureColumn>,
        labels: Vec<f64>,
        names: Option<Vec<String>>,
    ) -> Result<Self, DataError> {
        if columns.is_empty() || columns[0].is_empty() {
            return Err(DataError::Empty);
        }
        let n_rows = columns[0].len();
        for (j, col) in columns.iter().enumerate() {
            if col.len() != n_rows {
                return Err(DataError::ColumnLength {
                    column: j,
                    expected: n_rows,
                    got: col.len(),
                });
            }
        }
        if labels.len() != n_rows {
            return Err(DataError::LabelCount {
                labels: labels.len(),
                rows: n_rows,
            });
        }
        let names =
            names.unwrap_or_else(|| (0..columns.len()).map(|j| format!("f{j}")).collect());
        debug_assert_eq!(names.len(), columns.len());

        Ok(Self {
            columns,
            labels: Array1::from_vec(labels),
            names,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Number of rows.
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.labels.len()
    }

    /// Number of feature columns.
    #[inline]
    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    /// Column `j`.
    #[inline]
    pub fn column(&self, j: usize) -> &FeatureColumn {
        &self.columns[j]
    }

    /// Kind of column `j`.
    #[inline]
    pub fn kind(&self, j: usize) -> FeatureKind {
        self.columns[j].kind()
    }

    /// Column names.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Label of row `i`.
    #[inline]
    pub fn label(&self, i: usize) -> f64 {
        self.labels[i]
    }

    /// All labels.
    #[inline]
    pub fn labels(&self) -> &Array1<f64> {
        &self.labels
    }

    /// Materialize row `i` as a [`Record`].
    pub fn record(&self, i: usize) -> Record {
        self.columns.iter().map(|c| c.value(i)).collect()
    }

    /// Mean label over `rows`.
    ///
    /// # Panics
    ///
    /// Panics on an empty index set; callers never ask for the mean of
    /// nothing.
    pub fn mean_label(&self, rows: &[usize]) -> f64 {
        assert!(!rows.is_empty(), "mean_label over empty index set");
        rows.iter().map(|&i| self.labels[i]).sum::<f64>() / rows.len() as f64
    }
}
