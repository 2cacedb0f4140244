//! # Sales Engine - sales classification and pivot summary
//!
//! Sales Engine joins a sales export to a product master, labels every line
//! with a transaction Type and summarizes quantities and values per product
//! group and Type.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Sales CSV  │────▶│   Parser    │────▶│  Transform  │────▶│  Enriched   │
//! │ Master CSV  │     │  (auto-enc) │     │ (2-pass+pvt)│     │  + Pivot    │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use salesengine::{load_csv_file, process};
//!
//! let sales = load_csv_file("sales.csv")?.frame;
//! let master = load_csv_file("master.csv")?.frame;
//! let report = process(&sales, &master)?;
//! println!("{} pivot groups", report.pivot.height());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Transaction types and column names
//! - [`parser`] - CSV loading with auto-detection
//! - [`transform`] - Rules, polars pipeline stages and `process`
//! - [`validation`] - Rules schema and report invariants
//! - [`export`] - CSV and ZIP report output
//! - [`logs`] - Progress log broadcasting

// Core modules
pub mod error;
pub mod models;

// Loading
pub mod parser;

// Transformation
pub mod transform;

// Validation
pub mod validation;

// Output
pub mod export;

// Progress logs
pub mod logs;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ExportError,
    LoadError,
    PipelineError,
    RulesError,
    TableRole,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::TxnType;

// =============================================================================
// Re-exports - Loading
// =============================================================================

pub use parser::{
    decode_content,
    detect_delimiter,
    detect_encoding,
    load_bytes_auto,
    load_csv_file,
    load_str,
    LoadedTable,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::{
    default_rules,
    process,
    process_with_rules,
    ClassificationRules,
    CompiledRules,
    ProcessOptions,
    Report,
    ReportSummary,
    TypeCount,
};

// =============================================================================
// Re-exports - Validation and export
// =============================================================================

pub use validation::{validate_report, validate_rules_json};

pub use export::{report_zip_bytes, to_csv_string, write_report_dir, write_report_zip};
