//! Master resolution: keep-first dedup of the product master, then a left
//! join that attaches the taxonomy attributes to every sales row.
//!
//! ```text
//! master (deduped)                      sales
//! ┌──────┬─────────┐                    ┌──────┬─────┐
//! │ P1   │ Spices  │ ◀── Product Code ──│ P1   │ ... │
//! │ P2   │ Pickles │                    │ P9   │ ... │ → taxonomy null
//! └──────┴─────────┘                    └──────┴─────┘
//! ```

use polars::prelude::*;

use crate::logs::log_warning_indent;
use crate::models::columns;

// Scratch columns, dropped before the joined frame is returned.
const ROW: &str = "__row";
const KEY: &str = "__code";
const MATCHED: &str = "__matched";

/// Row counts from a join, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JoinStats {
    /// Master rows discarded as later duplicates of a product code
    pub duplicates_dropped: usize,
    /// Sales rows with no master match
    pub unmatched: usize,
}

/// Keep the first master row for each product code, preserving order.
pub fn dedup_master(master: &DataFrame) -> PolarsResult<(DataFrame, usize)> {
    let deduped = master
        .clone()
        .lazy()
        .unique_stable(
            Some(vec![columns::PRODUCT_CODE.into()]),
            UniqueKeepStrategy::First,
        )
        .collect()?;
    let dropped = master.height() - deduped.height();
    Ok((deduped, dropped))
}

/// Left-join `sales` to the deduplicated `master` on `Product Code`.
///
/// All five taxonomy columns are appended to the sales frame as strings. A
/// column the master lacks is appended as all-null; an unmatched sales row
/// gets nulls. Codes compare by their text form, so an integer `90019` in
/// one file matches `"90019"` in the other. The result keeps the sales row
/// order and has exactly `sales.height()` rows.
pub fn attach_master(sales: &DataFrame, master: &DataFrame) -> PolarsResult<(DataFrame, JoinStats)> {
    let (mut master, duplicates_dropped) = dedup_master(master)?;

    for name in columns::TAXONOMY {
        if !columns::exists(&master, name) {
            log_warning_indent(format!("Master has no '{}' column, filled with nulls", name), 1);
            master.with_column(Series::full_null(name.into(), master.height(), &DataType::String))?;
        }
    }

    let mut lookup = vec![
        col(columns::PRODUCT_CODE).cast(DataType::String).alias(KEY),
        lit(true).alias(MATCHED),
    ];
    lookup.extend(
        columns::TAXONOMY
            .iter()
            .map(|name| col(*name).cast(DataType::String)),
    );

    let joined = sales
        .clone()
        .lazy()
        .with_row_index(ROW, None)
        .with_column(col(columns::PRODUCT_CODE).cast(DataType::String).alias(KEY))
        .join(
            master.lazy().select(lookup),
            [col(KEY)],
            [col(KEY)],
            JoinArgs::new(JoinType::Left),
        )
        .sort([ROW], Default::default())
        .collect()?;

    let unmatched = joined.column(MATCHED)?.null_count();
    let joined = joined.drop(ROW)?.drop(KEY)?.drop(MATCHED)?;

    if duplicates_dropped > 0 {
        log_warning_indent(
            format!("{} duplicate product codes in master ignored (first kept)", duplicates_dropped),
            1,
        );
    }
    if unmatched > 0 {
        log_warning_indent(format!("{} sales rows have no master match", unmatched), 1);
    }

    Ok((
        joined,
        JoinStats {
            duplicates_dropped,
            unmatched,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    fn master() -> DataFrame {
        df!(
            "Product Code" => ["P1", "P2", "P1"],
            "PLI APP" => ["Spices", "Pickles", "WRONG"],
            "PLI CAT" => ["Blend", "Mango", "WRONG"],
            "CATE ALL" => ["A", "B", "WRONG"],
            "PLI HSN" => ["0910", "2001", "WRONG"],
            "UQM" => ["KG", "KG", "WRONG"],
            "Notes" => ["x", "y", "z"]
        )
        .unwrap()
    }

    fn sales(codes: &[Option<&str>]) -> DataFrame {
        df!("Product Code" => codes).unwrap()
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

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let (deduped, dropped) = dedup_master(&master()).unwrap();
        assert_eq!(dropped, 1);
        assert_eq!(deduped.height(), 2);
        assert_eq!(text(&deduped, "PLI APP"), vec![Some("Spices".into()), Some("Pickles".into())]);
    }

    #[test]
    fn test_left_join_preserves_rows_and_uses_first_duplicate() {
        let sales = sales(&[Some("P1"), Some("P9"), Some("P1"), None]);
        let (joined, stats) = attach_master(&sales, &master()).unwrap();

        assert_eq!(joined.height(), 4);
        assert_eq!(stats.unmatched, 2);
        assert_eq!(stats.duplicates_dropped, 1);
        assert_eq!(
            text(&joined, "PLI APP"),
            vec![Some("Spices".into()), None, Some("Spices".into()), None]
        );
        assert_eq!(
            text(&joined, "Product Code"),
            vec![Some("P1".into()), Some("P9".into()), Some("P1".into()), None]
        );
    }

    #[test]
    fn test_only_taxonomy_columns_are_brought_in() {
        let (joined, _) = attach_master(&sales(&[Some("P2")]), &master()).unwrap();
        let names: Vec<String> = joined.get_column_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(
            names,
            vec!["Product Code", "PLI APP", "PLI CAT", "CATE ALL", "PLI HSN", "UQM"]
        );
    }

    #[test]
    fn test_missing_master_columns_become_null() {
        let master = df!(
            "Product Code" => ["P1"],
            "PLI APP" => ["Spices"]
        )
        .unwrap();
        let (joined, _) = attach_master(&sales(&[Some("P1")]), &master).unwrap();
        assert_eq!(text(&joined, "PLI APP"), vec![Some("Spices".into())]);
        assert_eq!(text(&joined, "UQM"), vec![None]);
        assert_eq!(joined.column("PLI CAT").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_numeric_and_text_codes_match() {
        let master = df!(
            "Product Code" => ["90019"],
            "PLI APP" => ["Spices"],
            "PLI HSN" => [910i64]
        )
        .unwrap();
        let sales = df!("Product Code" => [90019i64, 12i64]).unwrap();
        let (joined, stats) = attach_master(&sales, &master).unwrap();
        assert_eq!(stats.unmatched, 1);
        assert_eq!(text(&joined, "PLI APP"), vec![Some("Spices".into()), None]);
        assert_eq!(text(&joined, "PLI HSN"), vec![Some("910".into()), None]);
        // The sales key keeps its own type.
        assert_eq!(joined.column("Product Code").unwrap().dtype(), &DataType::Int64);
    }
}
