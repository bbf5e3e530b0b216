//! Readers for the on-disk dataset format.
//!
//! The feature file is whitespace-separated. Its first line is a type header
//! with one token per column out of `BOOL`, `INT`, `DOUBLE`, `CAT`; every
//! following line is one record. Booleans accept `0 | 1 | true | false`.
//! `CAT` cells are arbitrary tokens, interned per column in order of first
//! appearance.
//!
//! The label file holds one real number per line; its line count must equal
//! the record count.

use std::fs;
use std::path::Path;

use super::dataset::{DataError, Dataset, FeatureColumn};
use super::value::FeatureKind;

/// Column accumulator matching the header-declared kind.
enum ColumnBuilder {
    Bool(Vec<bool>),
    Int(Vec<i64>),
    Float(Vec<f64>),
    Cat { values: Vec<u32>, symbols: Vec<String> },
}

impl ColumnBuilder {
    fn new(kind: FeatureKind) -> Self {
        match kind {
            FeatureKind::Bool => ColumnBuilder::Bool(Vec::new()),
            FeatureKind::Int => ColumnBuilder::Int(Vec::new()),
            FeatureKind::Float => ColumnBuilder::Float(Vec::new()),
            FeatureKind::Cat => ColumnBuilder::Cat {
                values: Vec::new(),
                symbols: Vec::new(),
            },
        }
    }

    fn kind(&self) -> FeatureKind {
        match self {
            ColumnBuilder::Bool(_) => FeatureKind::Bool,
            ColumnBuilder::Int(_) => FeatureKind::Int,
            ColumnBuilder::Float(_) => FeatureKind::Float,
            ColumnBuilder::Cat { .. } => FeatureKind::Cat,
        }
    }

    fn push(&mut self, token: &str, line: usize, column: usize) -> Result<(), DataError> {
        let kind = self.kind();
        let parse_err = || DataError::ParseCell {
            line,
            column,
            token: token.to_string(),
            kind,
        };
        match self {
            ColumnBuilder::Bool(v) => {
                let b = match token {
                    "0" | "false" => false,
                    "1" | "true" => true,
                    _ => return Err(parse_err()),
                };
                v.push(b);
            }
            ColumnBuilder::Int(v) => {
                v.push(token.parse::<i64>().map_err(|_| parse_err())?);
            }
            ColumnBuilder::Float(v) => {
                let x = token.parse::<f64>().map_err(|_| parse_err())?;
                if !x.is_finite() {
                    return Err(parse_err());
                }
                v.push(x);
            }
            ColumnBuilder::Cat { values, symbols } => {
                let id = match symbols.iter().position(|s| s == token) {
                    Some(p) => p as u32,
                    None => {
                        symbols.push(token.to_string());
                        (symbols.len() - 1) as u32
                    }
                };
                values.push(id);
            }
        }
        Ok(())
    }

    fn finish(self) -> FeatureColumn {
        match self {
            ColumnBuilder::Bool(v) => FeatureColumn::Bool(v),
            ColumnBuilder::Int(v) => FeatureColumn::Int(v),
            ColumnBuilder::Float(v) => FeatureColumn::Float(v),
            ColumnBuilder::Cat { values, symbols } => FeatureColumn::Cat { values, symbols },
        }
    }
}

fn parse_header_token(token: &str) -> Result<FeatureKind, DataError> {
    match token {
        "BOOL" => Ok(FeatureKind::Bool),
        "INT" => Ok(FeatureKind::Int),
        "DOUBLE" => Ok(FeatureKind::Float),
        "CAT" => Ok(FeatureKind::Cat),
        other => Err(DataError::UnknownTypeToken(other.to_string())),
    }
}

/// Read a feature file plus its sibling label file into a [`Dataset`].
pub fn load_dataset(
    feature_path: impl AsRef<Path>,
    label_path: impl AsRef<Path>,
) -> Result<Dataset, DataError> {
    let text = fs::read_to_string(feature_path)?;
    let mut lines = text.lines().enumerate();

    let (_, header) = lines.next().ok_or(DataError::Empty)?;
    let mut builders: Vec<ColumnBuilder> = header
        .split_whitespace()
        .map(|tok| parse_header_token(tok).map(ColumnBuilder::new))
        .collect::<Result<_, _>>()?;
    if builders.is_empty() {
        return Err(DataError::Empty);
    }

    let mut n_rows = 0usize;
    for (line_idx, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let cells: Vec<&str> = line.split_whitespace().collect();
        if cells.len() != builders.len() {
            return Err(DataError::RaggedRow {
                line: line_idx + 1,
                expected: builders.len(),
                got: cells.len(),
            });
        }
        for (j, (builder, cell)) in builders.iter_mut().zip(&cells).enumerate() {
            builder.push(cell, line_idx + 1, j)?;
        }
        n_rows += 1;
    }
    if n_rows == 0 {
        return Err(DataError::Empty);
    }

    let labels = load_labels(label_path)?;
    let columns: Vec<FeatureColumn> = builders.into_iter().map(ColumnBuilder::finish).collect();
    Dataset::new(columns, labels, None)
}

/// Read the label file: one real per non-empty line.
pub fn load_labels(path: impl AsRef<Path>) -> Result<Vec<f64>, DataError> {
    let text = fs::read_to_string(path)?;
    let mut labels = Vec::new();
    for (line_idx, line) in text.lines().enumerate() {
        let token = line.trim();
        if token.is_empty() {
            continue;
        }
        let y = token.parse::<f64>().map_err(|_| DataError::ParseLabel {
            line: line_idx + 1,
            token: token.to_string(),
        })?;
        labels.push(y);
    }
    Ok(labels)
}
