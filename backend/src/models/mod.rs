//! Domain models for the sales classification pipeline.
//!
//! - [`TxnType`] - the six transaction categories assigned by the classifier
//! - [`columns`] - column names the pipeline reads and writes

use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Transaction Type
// =============================================================================

/// Transaction category of a sales row.
///
/// Serialized with the labels that appear in reports and pivot column names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxnType {
    #[serde(rename = "Domestic")]
    Domestic,
    #[serde(rename = "Domestic IC")]
    DomesticIc,
    #[serde(rename = "inter")]
    Inter,
    #[serde(rename = "Credit Note")]
    CreditNote,
    #[serde(rename = "Credit Note IC")]
    CreditNoteIc,
    #[serde(rename = "Export")]
    Export,
}

impl TxnType {
    /// All types in canonical report order.
    pub const ALL: [TxnType; 6] = [
        TxnType::Domestic,
        TxnType::DomesticIc,
        TxnType::Inter,
        TxnType::CreditNote,
        TxnType::CreditNoteIc,
        TxnType::Export,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TxnType::Domestic => "Domestic",
            TxnType::DomesticIc => "Domestic IC",
            TxnType::Inter => "inter",
            TxnType::CreditNote => "Credit Note",
            TxnType::CreditNoteIc => "Credit Note IC",
            TxnType::Export => "Export",
        }
    }

    /// Parse a report label. Matching is exact.
    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == label)
    }
}

impl fmt::Display for TxnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Column Names
// =============================================================================

/// Column names shared by the input exports and the report outputs.
pub mod columns {
    use polars::prelude::DataFrame;

    pub const PRODUCT_CODE: &str = "Product Code";
    pub const CUSTOMER_NAME: &str = "Customer Name";
    pub const BILLING_DESCRIPTION: &str = "Billing Description";
    pub const BILLED_QTY: &str = "Billed Qty(KG)";
    pub const TAXABLE_VALUE: &str = "Taxable Value";
    pub const YEAR: &str = "Year";
    pub const TYPE: &str = "Type";

    pub const PLI_APP: &str = "PLI APP";
    pub const PLI_CAT: &str = "PLI CAT";
    pub const CATE_ALL: &str = "CATE ALL";
    pub const PLI_HSN: &str = "PLI HSN";
    pub const UQM: &str = "UQM";

    /// Attributes brought in from the product master.
    pub const TAXONOMY: [&str; 5] = [PLI_APP, PLI_CAT, CATE_ALL, PLI_HSN, UQM];

    /// Measures summed into the pivot, in output order.
    pub const MEASURES: [&str; 2] = [BILLED_QTY, TAXABLE_VALUE];

    /// Pivot group key.
    pub const PIVOT_KEY: [&str; 5] = [YEAR, PLI_APP, PLI_CAT, PLI_HSN, UQM];

    /// Suffix given to sales-side columns that collide with master attributes.
    pub const COLLISION_SUFFIX: &str = " 1";

    pub fn exists(df: &DataFrame, name: &str) -> bool {
        df.get_column_index(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_round_trip_through_parse() {
        for t in TxnType::ALL {
            assert_eq!(TxnType::parse(t.as_str()), Some(t));
        }
        assert_eq!(TxnType::parse("domestic"), None);
        assert_eq!(TxnType::parse("Inter"), None);
    }

    #[test]
    fn test_serde_uses_report_labels() {
        let json = serde_json::to_string(&TxnType::CreditNoteIc).unwrap();
        assert_eq!(json, "\"Credit Note IC\"");
        let parsed: TxnType = serde_json::from_str("\"inter\"").unwrap();
        assert_eq!(parsed, TxnType::Inter);
    }
}
