//! Validation for rules documents and report outputs.
//!
//! # Rules documents
//!
//! Rules files are checked against an embedded JSON Schema (Draft 7),
//! `schemas/classification-rules.json`, before they are deserialized, so a
//! malformed file reports every problem at once instead of the first serde
//! error.
//!
//! # Report invariants
//!
//! [`validate_report`] checks the structural guarantees of a finished run:
//!
//! - the enriched table has exactly one row per sales row
//! - every `Type` is one of the six labels
//! - no two pivot rows share a `(Year, PLI APP, PLI CAT, PLI HSN, UQM)` key
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use salesengine::validation::validate;
//!
//! let schema = json!({
//!     "type": "object",
//!     "required": ["name"],
//!     "properties": { "name": { "type": "string" } }
//! });
//!
//! assert!(validate(&schema, &json!({ "name": "test" })).is_ok());
//! assert!(validate(&schema, &json!({ "age": 42 })).is_err());
//! ```

use polars::prelude::*;
use serde_json::Value;

use crate::models::{columns, TxnType};

const RULES_SCHEMA: &str = include_str!("../../schemas/classification-rules.json");

/// Validate a JSON value against a JSON schema.
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(Vec<String>)` with every error otherwise
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a rules document against the embedded rules schema.
pub fn validate_rules_json(data: &Value) -> Result<(), Vec<String>> {
    let schema: Value = serde_json::from_str(RULES_SCHEMA)
        .map_err(|e| vec![format!("Invalid embedded schema: {}", e)])?;
    validate(&schema, data)
}

/// Check the output invariants of a run.
pub fn validate_report(
    sales_height: usize,
    enriched: &DataFrame,
    pivot: &DataFrame,
) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if enriched.height() != sales_height {
        errors.push(format!(
            "enriched table has {} rows but the sales table has {}",
            enriched.height(),
            sales_height
        ));
    }

    match enriched.column(columns::TYPE).and_then(|c| c.str().cloned()) {
        Ok(types) => {
            let invalid = (&types)
                .into_iter()
                .filter(|t| t.and_then(TxnType::parse).is_none())
                .count();
            if invalid > 0 {
                errors.push(format!("{} rows have a Type outside the six labels", invalid));
            }
        }
        Err(_) => errors.push("enriched table has no text Type column".to_string()),
    }

    match repeated_keys(pivot) {
        Ok(0) => {}
        Ok(repeats) => errors.push(format!("{} pivot rows repeat a group key", repeats)),
        Err(_) => errors.push("pivot table is missing group key columns".to_string()),
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Pivot rows beyond the first for each group key. Null keys compare equal.
fn repeated_keys(pivot: &DataFrame) -> PolarsResult<usize> {
    let keys: Vec<Expr> = columns::PIVOT_KEY.iter().map(|name| col(*name)).collect();
    let distinct = pivot
        .clone()
        .lazy()
        .select(keys)
        .unique_stable(None, UniqueKeepStrategy::First)
        .collect()?;
    Ok(pivot.height() - distinct.height())
}
