//! Error types for the sales classification pipeline.
//!
//! - [`LoadError`] - CSV loading errors
//! - [`RulesError`] - Classification rule errors
//! - [`PipelineError`] - Top-level `process` errors
//! - [`ExportError`] - CSV / ZIP export errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use std::fmt;

use polars::prelude::PolarsError;
use thiserror::Error;

// =============================================================================
// Table roles
// =============================================================================

/// Which input table a column was expected in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableRole {
    Sales,
    Master,
}

impl fmt::Display for TableRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableRole::Sales => write!(f, "sales"),
            TableRole::Master => write!(f, "master"),
        }
    }
}

// =============================================================================
// Loading Errors
// =============================================================================

/// Errors while loading a CSV export into a `DataFrame`.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed record.
    #[error("Line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,

    /// The CSV reader rejected the content.
    #[error("CSV read error: {0}")]
    Polars(#[from] PolarsError),
}

// =============================================================================
// Rule Errors
// =============================================================================

/// Errors in a classification rules document.
#[derive(Debug, Error)]
pub enum RulesError {
    /// A pattern failed to compile.
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// A rule references a customer group that is not defined.
    #[error("Unknown customer group: {0}")]
    UnknownGroup(String),

    /// The canonical type order is not a permutation of the six types.
    #[error("Invalid type order: {0}")]
    InvalidTypeOrder(String),

    /// Schema validation failed.
    #[error("Rules failed schema validation: {errors:?}")]
    Schema { errors: Vec<String> },

    /// JSON error.
    #[error("Rules JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("Rules IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
///
/// This is the error type returned by [`crate::transform::pipeline::process`].
/// Only a missing required column is a data error; everything else the
/// pipeline meets in the inputs degrades to partial output.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A column with no sound default is absent.
    #[error("Required column '{column}' is missing from the {table} table")]
    MissingColumn { table: TableRole, column: String },

    /// Rules could not be compiled.
    #[error("Rules error: {0}")]
    Rules(#[from] RulesError),

    /// A stage's frame operation failed.
    #[error("Frame error: {0}")]
    Polars(#[from] PolarsError),

    /// An output invariant does not hold.
    #[error("Output invariant violated: {}", .0.join("; "))]
    Invariant(Vec<String>),
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors writing report outputs.
#[derive(Debug, Error)]
pub enum ExportError {
    /// IO error.
    #[error("Export IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writer error.
    #[error("CSV write error: {0}")]
    Csv(#[from] PolarsError),

    /// ZIP writer error.
    #[error("ZIP write error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Output was not valid UTF-8.
    #[error("Encoding error: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for rules operations.
pub type RulesResult<T> = Result<T, RulesError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_column_names_table_and_column() {
        let err = PipelineError::MissingColumn {
            table: TableRole::Master,
            column: "Product Code".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Product Code"));
        assert!(msg.contains("master"));
    }

    #[test]
    fn test_error_conversion_chain() {
        let rules_err = RulesError::UnknownGroup("ic".into());
        let pipeline_err: PipelineError = rules_err.into();
        assert!(pipeline_err.to_string().contains("ic"));

        let frame_err = PolarsError::ColumnNotFound("Type".into());
        let pipeline_err: PipelineError = frame_err.into();
        assert!(matches!(pipeline_err, PipelineError::Polars(_)));
        assert!(pipeline_err.to_string().contains("Type"));
    }

    #[test]
    fn test_invariant_message_joins_violations() {
        let err = PipelineError::Invariant(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "Output invariant violated: a; b");
    }
}
