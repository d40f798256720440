//! Error types for dataset access and statistics.
//!
//! Every failure the core can hit is converted into one of these values and
//! handed back to the caller; nothing here aborts the process.

use thiserror::Error;

use crate::data::model::{ColumnType, SpecialColumn};

/// Errors raised by the tabular data layer.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// A column index past the end of the schema.
    #[error("column {column} out of range (dataset has {count} columns)")]
    ColumnOutOfRange { column: usize, count: usize },

    /// A typed accessor called on a column of another type.
    #[error("column {column} is {actual}, accessor expects {expected}")]
    ColumnTypeMismatch {
        column: usize,
        expected: ColumnType,
        actual: ColumnType,
    },

    /// Active-column mask does not cover the schema.
    #[error("active column mask has {actual} entries, dataset has {expected} columns")]
    ActiveMaskLength { expected: usize, actual: usize },

    /// Data requested before `initialize` succeeded.
    #[error("dataset has not been initialized")]
    NotInitialized,

    /// The tabular source was already closed by a previous full load.
    #[error("tabular source already released")]
    SourceReleased,

    /// Projection needs a tagged column that is not present.
    #[error("no column tagged as {0}")]
    MissingSpecialColumn(SpecialColumn),

    /// A persisted schema no longer describes the data.
    #[error("schema cache mismatch: {0}")]
    SchemaMismatch(String),

    /// CSV reading error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error from std::io
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error from serde_json
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Format-specific failure reported by a tabular source.
    #[error("source error: {0}")]
    Source(String),
}

/// Result type alias for dataset operations
pub type DatasetResult<T> = Result<T, DatasetError>;

/// Errors raised by the statistics pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    #[error("Empty input: {field} cannot be empty")]
    EmptyInput { field: &'static str },

    /// Least-squares denominator is zero: fewer than two distinct x values.
    #[error("regression undefined for {n} points sharing a single x value")]
    RegressionUndefined { n: usize },
}

/// Result type for statistical operations
pub type StatsResult<T> = Result<T, StatsError>;
