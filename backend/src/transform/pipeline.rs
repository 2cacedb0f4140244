//! High-level pipeline API: sales + master in, enriched table + pivot out.
//!
//! ```text
//! sales ─┐
//!        ├─▶ normalize ─▶ resolve ─▶ classify ─▶ coerce ─▶ pivot
//! master ┘                                         │         │
//!                                               enriched   pivot
//! ```
//!
//! Each stage returns a new `DataFrame`; the inputs are never modified, so
//! calling [`process`] again with the same tables gives the same report.
//!
//! # Example
//!
//! ```rust,ignore
//! use salesengine::parser::load_csv_file;
//! use salesengine::transform::process;
//!
//! let sales = load_csv_file("sales.csv")?.frame;
//! let master = load_csv_file("master.csv")?.frame;
//! let (enriched, pivot) = process(&sales, &master)?.into_parts();
//! println!("{} rows, {} groups", enriched.height(), pivot.height());
//! ```

use std::path::Path;

use polars::prelude::DataFrame;
use serde::Serialize;

use crate::error::{PipelineError, PipelineResult, RulesResult, TableRole};
use crate::logs::{log_error, log_info, log_success};
use crate::models::{columns, TxnType};
use crate::validation::validate_report;

use super::aggregate::{coerce_measures, pivot_summary};
use super::classify::classify;
use super::normalize::normalize_tables;
use super::resolve::attach_master;
use super::rules::{ClassificationRules, CompiledRules};

/// Environment variable naming a rules file.
pub const RULES_ENV: &str = "SALESENGINE_RULES";

/// Options for a pipeline run
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Rules file to use instead of the built-in table
    pub rules_path: Option<String>,

    /// Number of enriched rows to preview
    pub preview_rows: usize,

    /// Directory receiving `Detailed_Sales.csv` and `Pivot_Summary.csv`
    pub output_dir: Option<String>,

    /// ZIP archive receiving both reports
    pub zip_path: Option<String>,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            rules_path: None,
            preview_rows: 5,
            output_dir: None,
            zip_path: None,
        }
    }
}

impl ProcessOptions {
    /// Resolve the rules for this run: explicit path, then `SALESENGINE_RULES`,
    /// then the built-in table.
    pub fn load_rules(&self) -> RulesResult<CompiledRules> {
        let path = self
            .rules_path
            .clone()
            .or_else(|| std::env::var(RULES_ENV).ok().filter(|p| !p.trim().is_empty()));

        match path {
            Some(path) => {
                log_info(format!("Using rules file: {}", path));
                ClassificationRules::load(Path::new(&path))?.compile()
            }
            None => ClassificationRules::default().compile(),
        }
    }
}

/// The two output tables of a run.
#[derive(Debug, Clone)]
pub struct Report {
    /// One row per sales row, with taxonomy attributes and `Type`
    pub enriched: DataFrame,
    /// One row per `(Year, PLI APP, PLI CAT, PLI HSN, UQM)` group
    pub pivot: DataFrame,
}

/// Headline numbers of a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_rows: usize,
    pub pivot_groups: usize,
    /// Rows per Type, canonical order, zero counts omitted
    pub type_counts: Vec<TypeCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub txn: TxnType,
    pub rows: usize,
}

impl Report {
    pub fn into_parts(self) -> (DataFrame, DataFrame) {
        (self.enriched, self.pivot)
    }

    pub fn summary(&self) -> ReportSummary {
        let labels: Vec<Option<TxnType>> = match self.enriched.column(columns::TYPE).and_then(|c| c.str()) {
            Ok(types) => types.into_iter().map(|t| t.and_then(TxnType::parse)).collect(),
            Err(_) => Vec::new(),
        };

        let type_counts = TxnType::ALL
            .iter()
            .map(|t| TypeCount {
                txn: *t,
                rows: labels.iter().filter(|l| **l == Some(*t)).count(),
            })
            .filter(|c| c.rows > 0)
            .collect();

        ReportSummary {
            total_rows: self.enriched.height(),
            pivot_groups: self.pivot.height(),
            type_counts,
        }
    }
}

/// Run the pipeline with the built-in rules.
pub fn process(sales: &DataFrame, master: &DataFrame) -> PipelineResult<Report> {
    let rules = ClassificationRules::default().compile()?;
    process_with_rules(sales, master, &rules)
}

/// Run the pipeline with the given rules.
///
/// Fails only when a required column is absent or an output invariant does
/// not hold. Every other data problem degrades gracefully and is logged.
pub fn process_with_rules(
    sales: &DataFrame,
    master: &DataFrame,
    rules: &CompiledRules,
) -> PipelineResult<Report> {
    require_columns(
        sales,
        TableRole::Sales,
        &[columns::PRODUCT_CODE, columns::CUSTOMER_NAME, columns::BILLING_DESCRIPTION],
    )?;
    require_columns(master, TableRole::Master, &[columns::PRODUCT_CODE])?;

    log_info(format!("🧹 Normalizing {} sales rows, {} master rows...", sales.height(), master.height()));
    let (sales_norm, master_norm) = normalize_tables(sales, master, rules)?;

    log_info("🔗 Attaching master attributes...");
    let (joined, stats) = attach_master(&sales_norm, &master_norm)?;
    log_success(format!(
        "{} of {} rows matched a product code",
        joined.height() - stats.unmatched,
        joined.height()
    ));

    log_info("🏷️  Classifying transactions...");
    let classified = classify(&joined, rules)?;

    log_info("📊 Building pivot summary...");
    let enriched = coerce_measures(&classified)?;
    let pivot = pivot_summary(&enriched, rules.type_order())?;

    if let Err(errors) = validate_report(sales.height(), &enriched, &pivot) {
        for e in &errors {
            log_error(e.clone());
        }
        return Err(PipelineError::Invariant(errors));
    }
    log_success(format!("{} rows, {} pivot groups", enriched.height(), pivot.height()));

    Ok(Report { enriched, pivot })
}

fn require_columns(table: &DataFrame, role: TableRole, required: &[&str]) -> PipelineResult<()> {
    match required.iter().find(|name| !columns::exists(table, name)) {
        Some(missing) => Err(PipelineError::MissingColumn {
            table: role,
            column: missing.to_string(),
        }),
        None => Ok(()),
    }
}
