//! Two-pass `Type` classification and the customer taxonomy override.
//!
//! Pass 1 reads `Billing Description`, pass 2 reads `Customer Name` and may
//! replace what pass 1 produced. Both passes are ordered `(mask, label)`
//! chains folded into `when/then/otherwise` expressions over whole columns:
//! the first true mask wins and rows no rule selects fall through to the
//! previous value.

use polars::prelude::*;
use regex::Regex;

use crate::logs::log_info_indent;
use crate::models::{columns, TxnType};

use super::rules::CompiledRules;

/// Pass 1: billing-description rules.
pub fn billing_expr(df: &DataFrame, rules: &CompiledRules) -> Expr {
    let branches: Vec<(Expr, TxnType)> = rules
        .billing()
        .iter()
        .map(|(pattern, label)| (text_mask(df, columns::BILLING_DESCRIPTION, pattern), *label))
        .collect();
    first_match(branches, lit(rules.billing_default().as_str()))
}

/// Pass 2: customer-identity rules over the pass 1 result in `prior`.
pub fn customer_expr(df: &DataFrame, rules: &CompiledRules, prior: Expr) -> Expr {
    let branches: Vec<(Expr, TxnType)> = rules
        .customer_rules()
        .iter()
        .filter_map(|rule| {
            let group = rules.groups().get(&rule.group)?;
            let mask = text_mask(df, columns::CUSTOMER_NAME, group);
            let mask = match rule.when {
                Some(required) => mask.and(prior.clone().eq(lit(required.as_str()))),
                None => mask,
            };
            Some((mask, rule.label))
        })
        .collect();
    first_match(branches, prior)
}

/// Compute `Type` and apply the taxonomy override, adding a `Type` column.
///
/// A missing `Customer Name` or `Billing Description` column behaves as an
/// all-null column: no rule on it matches.
pub fn classify(df: &DataFrame, rules: &CompiledRules) -> PolarsResult<DataFrame> {
    let pass1 = billing_expr(df, rules).alias(columns::TYPE);
    let pass2 = customer_expr(df, rules, col(columns::TYPE)).alias(columns::TYPE);
    let overrides = taxonomy_override_exprs(df, rules)?;

    df.clone()
        .lazy()
        .with_column(pass1)
        .with_column(pass2)
        .with_columns(overrides)
        .collect()
}

/// Constant attribute values for customers in the override group.
///
/// Only columns present in the frame are touched.
pub fn taxonomy_override_exprs(df: &DataFrame, rules: &CompiledRules) -> PolarsResult<Vec<Expr>> {
    let Some(ov) = rules.taxonomy_override() else {
        return Ok(Vec::new());
    };
    let Some(pattern) = rules.groups().get(&ov.group) else {
        return Ok(Vec::new());
    };

    let mask = text_mask(df, columns::CUSTOMER_NAME, pattern);
    let hits = df.clone().lazy().filter(mask.clone()).collect()?.height();
    if hits == 0 {
        return Ok(Vec::new());
    }
    log_info_indent(format!("Taxonomy override applied to {} '{}' rows", hits, ov.group), 1);

    Ok(ov
        .values
        .iter()
        .filter(|(name, _)| columns::exists(df, name))
        .map(|(name, value)| {
            when(mask.clone())
                .then(lit(value.clone()))
                .otherwise(col(name.as_str()).cast(DataType::String))
                .alias(name.as_str())
        })
        .collect())
}

/// Fold `(mask, label)` pairs so the first true mask wins.
fn first_match(branches: Vec<(Expr, TxnType)>, otherwise: Expr) -> Expr {
    branches
        .into_iter()
        .rev()
        .fold(otherwise, |rest, (mask, label)| {
            when(mask).then(lit(label.as_str())).otherwise(rest)
        })
}

/// Regex mask over a string column. Absent or non-string columns and null
/// cells never match.
fn text_mask(df: &DataFrame, column: &str, pattern: &Regex) -> Expr {
    match df.column(column) {
        Ok(c) if c.dtype() == &DataType::String => col(column)
            .str()
            .contains(lit(pattern.as_str()), true)
            .fill_null(lit(false)),
        _ => lit(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::rules::default_rules;
    use polars::df;

    fn rules() -> CompiledRules {
        default_rules().compile().unwrap()
    }

    fn rows(data: &[(Option<&str>, Option<&str>)]) -> DataFrame {
        let customers: Vec<Option<&str>> = data.iter().map(|(c, _)| *c).collect();
        let billing: Vec<Option<&str>> = data.iter().map(|(_, b)| *b).collect();
        let app = vec![Some("Spices"); data.len()];
        let cate: Vec<Option<&str>> = vec![None; data.len()];
        df!(
            "Customer Name" => customers,
            "Billing Description" => billing,
            "PLI APP" => app,
            "CATE ALL" => cate
        )
        .unwrap()
    }

    fn text(df: &DataFrame, name: &str) -> Vec<Option<String>> {
        df.column(name)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect()
    }

    fn types(df: &DataFrame) -> Vec<String> {
        text(df, columns::TYPE).into_iter().map(|t| t.unwrap()).collect()
    }

    #[test]
    fn test_billing_pass() {
        let df = rows(&[
            (None, Some("SRN 0042")),
            (None, Some("Credit Rate Diff billing")),
            (None, Some("Export Direct Billing")),
            (None, Some("srn lowercase")),
            (None, Some("SRN Export Direct Billing")),
            (None, None),
        ]);
        let out = df
            .clone()
            .lazy()
            .select([billing_expr(&df, &rules()).alias("pass1")])
            .collect()
            .unwrap();
        assert_eq!(
            text(&out, "pass1"),
            ["Credit Note", "Credit Note", "Export", "Domestic", "Credit Note", "Domestic"]
                .iter()
                .map(|s| Some(s.to_string()))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_pravin_customer_is_inter_with_override() {
        let out = classify(&rows(&[(Some("Pravin Masalewale Traders"), Some("Regular Sale"))]), &rules())
            .unwrap();
        assert_eq!(types(&out), vec!["inter"]);
        assert_eq!(text(&out, "PLI APP"), vec![Some("inter".to_string())]);
        assert_eq!(text(&out, "CATE ALL"), vec![Some("N/A".to_string())]);
        // Absent override columns are not created.
        assert!(!columns::exists(&out, "UQM"));
    }

    #[test]
    fn test_ic_credit_note() {
        let out = classify(&rows(&[(Some("Aveer Foods Ltd"), Some("SRN Adjustment"))]), &rules()).unwrap();
        assert_eq!(types(&out), vec!["Credit Note IC"]);
        assert_eq!(text(&out, "PLI APP"), vec![Some("Spices".to_string())]);
    }

    #[test]
    fn test_export_survives_without_identity_match() {
        let out = classify(&rows(&[(Some("Retail Co"), Some("Export  Direct Billing"))]), &rules()).unwrap();
        assert_eq!(types(&out), vec!["Export"]);
    }

    #[test]
    fn test_ic_overrides_export_and_domestic() {
        let out = classify(
            &rows(&[
                (Some("PRAVIN SALES DIVISION"), Some("Export Direct Billing")),
                (Some("pravin sales division pune"), Some("Regular Sale")),
            ]),
            &rules(),
        )
        .unwrap();
        assert_eq!(types(&out), vec!["Domestic IC", "Domestic IC"]);
    }

    #[test]
    fn test_pravin_credit_note_becomes_inter() {
        let out = classify(&rows(&[(Some("Pravin Masalewale"), Some("SRN 7"))]), &rules()).unwrap();
        assert_eq!(types(&out), vec!["inter"]);
    }

    #[test]
    fn test_null_customer_keeps_pass1() {
        let out = classify(&rows(&[(None, Some("SRN 1")), (None, None)]), &rules()).unwrap();
        assert_eq!(types(&out), vec!["Credit Note", "Domestic"]);
        assert_eq!(text(&out, "PLI APP"), vec![Some("Spices".to_string()); 2]);
    }

    #[test]
    fn test_missing_text_columns_are_non_matching() {
        let df = df!("Product Code" => ["P1"]).unwrap();
        let out = classify(&df, &rules()).unwrap();
        assert_eq!(types(&out), vec!["Domestic"]);
    }

    #[test]
    fn test_override_keeps_unmatched_nulls() {
        let out = classify(
            &rows(&[(Some("Retail Co"), Some("Sale")), (Some("Pravin Masalewale"), Some("Sale"))]),
            &rules(),
        )
        .unwrap();
        assert_eq!(text(&out, "CATE ALL"), vec![None, Some("N/A".to_string())]);
    }
}
