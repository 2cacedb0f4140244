//! Measure coercion and the Type pivot.
//!
//! # Architecture
//!
//! ```text
//! Enriched rows (flat)                       Pivot (one row per group)
//! ┌──────────────────────────────┐          ┌──────────────────────────────────────┐
//! │ 2024 Spices KG  Domestic  10 │          │ 2024 Spices KG │ Qty_Domestic │ Qty_Export │
//! │ 2024 Spices KG  Export     5 │    →     │                │      12      │     5      │
//! │ 2024 Spices KG  Domestic   2 │          └──────────────────────────────────────┘
//! └──────────────────────────────┘
//! ```
//!
//! Pivot column names are `<Measure>_<Type>`. Types follow the canonical
//! order and only Types seen somewhere in the data get columns; a group that
//! never saw a Type gets `0.0` there.

use polars::prelude::*;

use crate::logs::log_warning_indent;
use crate::models::{columns, TxnType};

/// Coerce both measure columns to `Float64`.
///
/// The cast is non-strict: anything that does not read as a number becomes
/// null, and nulls become `0.0`. Absent measure columns are left absent.
pub fn coerce_measures(df: &DataFrame) -> PolarsResult<DataFrame> {
    let present: Vec<&str> = columns::MEASURES
        .iter()
        .copied()
        .filter(|name| {
            let found = columns::exists(df, name);
            if !found {
                log_warning_indent(format!("Measure column '{}' not found, skipped", name), 1);
            }
            found
        })
        .collect();

    let cast = df
        .clone()
        .lazy()
        .with_columns(
            present
                .iter()
                .map(|name| col(*name).cast(DataType::Float64))
                .collect::<Vec<_>>(),
        )
        .collect()?;

    for name in &present {
        let invalid = cast
            .column(name)?
            .null_count()
            .saturating_sub(df.column(name)?.null_count());
        if invalid > 0 {
            log_warning_indent(
                format!("{} non-numeric '{}' values counted as 0", invalid, name),
                1,
            );
        }
    }

    cast.lazy()
        .with_columns(
            present
                .iter()
                .map(|name| col(*name).fill_null(lit(0.0)))
                .collect::<Vec<_>>(),
        )
        .collect()
}

/// Group by `(Year, PLI APP, PLI CAT, PLI HSN, UQM)` and pivot `Type`.
///
/// Groups appear in first-seen order. Null key values form their own group.
/// Expects measures already coerced.
pub fn pivot_summary(df: &DataFrame, type_order: &[TxnType]) -> PolarsResult<DataFrame> {
    let measures: Vec<&str> = columns::MEASURES
        .iter()
        .copied()
        .filter(|name| columns::exists(df, name))
        .collect();
    let observed = observed_types(df)?;
    let keys: Vec<Expr> = columns::PIVOT_KEY.iter().map(|name| col(*name)).collect();

    let mut cells = Vec::new();
    let mut order: Vec<Expr> = keys.clone();
    for txn in type_order.iter().filter(|t| observed.contains(*t)) {
        for measure in &measures {
            let name = pivot_column_name(measure, *txn);
            cells.push(
                col(*measure)
                    .filter(col(columns::TYPE).eq(lit(txn.as_str())))
                    .sum()
                    .alias(name.as_str()),
            );
            order.push(col(name.as_str()).fill_null(lit(0.0)));
        }
    }

    let grouped = df.clone().lazy();
    if cells.is_empty() {
        return grouped
            .select(keys)
            .unique_stable(None, UniqueKeepStrategy::First)
            .collect();
    }
    grouped.group_by_stable(keys).agg(cells).select(order).collect()
}

/// `Billed Qty(KG)` + `Export` → `Billed Qty(KG)_Export`.
pub fn pivot_column_name(measure: &str, txn: TxnType) -> String {
    format!("{}_{}", measure, txn.as_str())
}

/// Types present in the `Type` column.
fn observed_types(df: &DataFrame) -> PolarsResult<Vec<TxnType>> {
    if !columns::exists(df, columns::TYPE) {
        return Ok(Vec::new());
    }
    let mut seen = Vec::new();
    for label in df.column(columns::TYPE)?.str()?.into_iter().flatten() {
        if let Some(txn) = TxnType::parse(label) {
            if !seen.contains(&txn) {
                seen.push(txn);
            }
        }
    }
    Ok(seen)
}
