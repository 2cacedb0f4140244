//! Schema normalization ahead of the master join.
//!
//! - whitespace trimmed from every text column of both tables
//! - sales columns that collide with master attributes renamed with a `" 1"` suffix
//! - a `Year` column derived when the sales table has none

use std::borrow::Cow;

use polars::prelude::*;

use crate::logs::{log_info_indent, log_warning_indent};
use crate::models::columns;

use super::dates::{serial_year, text_year};
use super::rules::CompiledRules;

/// Normalize both inputs. Returns `(sales, master)`.
pub fn normalize_tables(
    sales: &DataFrame,
    master: &DataFrame,
    rules: &CompiledRules,
) -> PolarsResult<(DataFrame, DataFrame)> {
    let sales = trim_text(sales)?;
    let master = trim_text(master)?;
    let sales = rename_collisions(sales)?;
    let sales = derive_year(sales, rules)?;
    Ok((sales, master))
}

/// Strip leading and trailing whitespace from every string column.
pub fn trim_text(df: &DataFrame) -> PolarsResult<DataFrame> {
    let mut out = df.clone();
    for column in df.get_columns() {
        if column.dtype() != &DataType::String {
            continue;
        }
        let trimmed = column
            .str()?
            .apply(|v| v.map(|s| Cow::Borrowed(s.trim())));
        out.replace(column.name(), trimmed.into_series())?;
    }
    Ok(out)
}

/// Move sales-side taxonomy columns out of the way of the master join.
///
/// `PLI APP` becomes `PLI APP 1` (or `PLI APP 1 1` if that is taken too).
/// The renamed values are carried through untouched and never read again.
pub fn rename_collisions(sales: DataFrame) -> PolarsResult<DataFrame> {
    let mut sales = sales;
    for name in columns::TAXONOMY {
        if !columns::exists(&sales, name) {
            continue;
        }
        let mut renamed = format!("{}{}", name, columns::COLLISION_SUFFIX);
        while columns::exists(&sales, &renamed) {
            renamed.push_str(columns::COLLISION_SUFFIX);
        }
        log_info_indent(format!("Sales column '{}' kept as '{}'", name, renamed), 1);
        sales.rename(name, renamed.into())?;
    }
    Ok(sales)
}

/// Add an `Int32` `Year` column unless one exists.
///
/// The first candidate date column present is used; when none is present
/// every row gets the fallback year.
pub fn derive_year(sales: DataFrame, rules: &CompiledRules) -> PolarsResult<DataFrame> {
    if columns::exists(&sales, columns::YEAR) {
        return Ok(sales);
    }

    let Some(source) = rules
        .date_columns()
        .iter()
        .find(|name| columns::exists(&sales, name))
    else {
        log_warning_indent(
            format!("No date column found, using fallback year {}", rules.fallback_year()),
            1,
        );
        return sales
            .lazy()
            .with_column(
                lit(rules.fallback_year())
                    .cast(DataType::Int32)
                    .alias(columns::YEAR),
            )
            .collect();
    };

    let years = column_years(&sales, source)?;
    let failed = years
        .null_count()
        .saturating_sub(sales.column(source)?.null_count());
    log_info_indent(format!("Year derived from '{}'", source), 1);
    if failed > 0 {
        log_warning_indent(
            format!("{} '{}' values could not be read as dates", failed, source),
            1,
        );
    }

    let mut sales = sales;
    sales.with_column(years.with_name(columns::YEAR.into()).into_series())?;
    Ok(sales)
}

/// Calendar years of one date-like column, null where unreadable.
///
/// Temporal columns are read directly, numbers are spreadsheet serial dates
/// and text is parsed leniently.
fn column_years(df: &DataFrame, name: &str) -> PolarsResult<Int32Chunked> {
    let column = df.column(name)?;
    match column.dtype() {
        DataType::Date | DataType::Datetime(_, _) => {
            let out = df
                .clone()
                .lazy()
                .select([col(name).dt().year()])
                .collect()?;
            let years = out.column(name)?.i32()?.clone();
            Ok(years)
        }
        DataType::String => {
            let years: Int32Chunked = column
                .str()?
                .into_iter()
                .map(|v| v.and_then(text_year))
                .collect();
            Ok(years)
        }
        dtype if dtype.is_integer() || dtype.is_float() => {
            let serials = column.cast(&DataType::Float64)?;
            let years: Int32Chunked = serials
                .f64()?
                .into_iter()
                .map(|v| v.and_then(serial_year))
                .collect();
            Ok(years)
        }
        _ => Ok(Int32Chunked::full_null(name.into(), column.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::rules::default_rules;
    use chrono::NaiveDate;
    use polars::df;

    fn rules() -> CompiledRules {
        default_rules().compile().unwrap()
    }

    fn years(df: &DataFrame) -> Vec<Option<i32>> {
        df.column(columns::YEAR).unwrap().i32().unwrap().into_iter().collect()
    }

    fn names(df: &DataFrame) -> Vec<String> {
        df.get_column_names().iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_trim_text_only_touches_strings() {
        let df = df!(
            "name" => [Some("  Retail Co "), None],
            "qty" => [3i64, 1]
        )
        .unwrap();
        let trimmed = trim_text(&df).unwrap();
        let name = trimmed.column("name").unwrap().str().unwrap();
        assert_eq!(name.get(0), Some("Retail Co"));
        assert_eq!(name.get(1), None);
        assert_eq!(trimmed.column("qty").unwrap().i64().unwrap().get(0), Some(3));
    }

    #[test]
    fn test_collisions_renamed_with_suffix() {
        let sales = df!(
            "Product Code" => ["P1"],
            "PLI APP" => ["old app"],
            "UQM" => ["old uqm"],
            "UQM 1" => ["taken"]
        )
        .unwrap();
        let renamed = rename_collisions(sales).unwrap();
        assert_eq!(names(&renamed), vec!["Product Code", "PLI APP 1", "UQM 1 1", "UQM 1"]);
        assert_eq!(
            renamed.column("PLI APP 1").unwrap().str().unwrap().get(0),
            Some("old app")
        );
    }

    #[test]
    fn test_existing_year_kept() {
        let sales = df!(
            "Year" => [2023i64],
            "Billing Date" => ["2024-01-01"]
        )
        .unwrap();
        let out = derive_year(sales.clone(), &rules()).unwrap();
        assert!(out.equals(&sales));
    }

    #[test]
    fn test_year_from_date_column() {
        let dates = Series::new(
            "Billing Date".into(),
            [NaiveDate::from_ymd_opt(2024, 9, 30), None],
        );
        let sales = DataFrame::new(vec![dates.into()]).unwrap();
        let out = derive_year(sales, &rules()).unwrap();
        assert_eq!(years(&out), vec![Some(2024), None]);
    }

    #[test]
    fn test_year_from_text_dates_is_lenient() {
        let sales = df!("Invoice Date" => ["15/07/2025", "pending", "2024-02-01"]).unwrap();
        let out = derive_year(sales, &rules()).unwrap();
        assert_eq!(years(&out), vec![Some(2025), None, Some(2024)]);
    }

    #[test]
    fn test_year_from_spreadsheet_serials() {
        let sales = df!("Posting Date" => [45292.0, 45658.5]).unwrap();
        let out = derive_year(sales, &rules()).unwrap();
        assert_eq!(years(&out), vec![Some(2024), Some(2025)]);
    }

    #[test]
    fn test_candidate_order_respected() {
        let sales = df!(
            "Date" => ["2020-01-01"],
            "Billing Date" => ["2024-01-01"]
        )
        .unwrap();
        let out = derive_year(sales, &rules()).unwrap();
        assert_eq!(years(&out), vec![Some(2024)]);
    }

    #[test]
    fn test_fallback_year_without_date_column() {
        let sales = df!("Product Code" => ["P1", "P2"]).unwrap();
        let out = derive_year(sales, &rules()).unwrap();
        assert_eq!(years(&out), vec![Some(2024), Some(2024)]);
    }
}
