//! Classification rules.
//!
//! Every constant the classifier and aggregator depend on lives in one
//! [`ClassificationRules`] document: billing-description patterns, customer
//! identity groups, the taxonomy override, canonical type order, date column
//! candidates and the fallback year. The document is plain JSON so a rules
//! file can replace the built-in table without a rebuild.

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RulesError, RulesResult};
use crate::models::{columns, TxnType};
use crate::validation::validate_rules_json;

/// The full rule table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRules {
    /// Version of the rules format
    #[serde(default = "default_version")]
    pub version: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Pass 1: ordered billing-description rules, first match wins
    pub billing_rules: Vec<BillingRule>,

    /// Pass 1 result when no billing rule matches
    #[serde(default = "default_billing_type")]
    pub billing_default: TxnType,

    /// Named customer lists, matched case-insensitively as substrings
    pub customer_groups: BTreeMap<String, Vec<String>>,

    /// Pass 2: ordered customer identity rules, first match wins
    pub customer_rules: Vec<CustomerRule>,

    /// Attribute values forced for one customer group
    #[serde(default)]
    pub taxonomy_override: Option<TaxonomyOverride>,

    /// Type order used for pivot columns
    #[serde(default = "default_type_order")]
    pub type_order: Vec<TxnType>,

    /// Date columns searched, in order, when the sales table has no `Year`
    #[serde(default = "default_date_columns")]
    pub date_columns: Vec<String>,

    /// Year given to every row when no date column exists
    #[serde(default = "default_fallback_year")]
    pub fallback_year: i32,
}

/// A pass 1 rule: regex over `Billing Description` (case-sensitive).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingRule {
    pub pattern: String,
    pub label: TxnType,
}

/// A pass 2 rule over `Customer Name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRule {
    /// Customer group that must match
    pub group: String,

    /// Only fire when pass 1 produced this type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<TxnType>,

    pub label: TxnType,
}

/// Columns overwritten with constants for customers in `group`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyOverride {
    pub group: String,
    pub values: BTreeMap<String, String>,
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_billing_type() -> TxnType {
    TxnType::Domestic
}

fn default_type_order() -> Vec<TxnType> {
    TxnType::ALL.to_vec()
}

fn default_date_columns() -> Vec<String> {
    ["Billing Date", "Invoice Date", "Posting Date", "Document Date", "Date"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_fallback_year() -> i32 {
    2024
}

impl ClassificationRules {
    /// Parse rules from a JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Parse rules from a JSON value
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load a rules file, checking it against the rules schema first.
    pub fn load(path: impl AsRef<Path>) -> RulesResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let value: Value = serde_json::from_str(&content)?;
        validate_rules_json(&value).map_err(|errors| RulesError::Schema { errors })?;
        Ok(Self::from_value(&value)?)
    }

    /// Validate the rules and compile every pattern.
    pub fn compile(&self) -> RulesResult<CompiledRules> {
        let billing = self
            .billing_rules
            .iter()
            .map(|rule| Ok((compile_pattern(&rule.pattern)?, rule.label)))
            .collect::<RulesResult<Vec<_>>>()?;

        let mut groups = BTreeMap::new();
        for (name, names) in &self.customer_groups {
            if names.is_empty() {
                return Err(RulesError::InvalidPattern {
                    pattern: name.clone(),
                    message: "customer group has no names".to_string(),
                });
            }
            let alternation = names
                .iter()
                .map(|n| regex::escape(n))
                .collect::<Vec<_>>()
                .join("|");
            // The flag travels inside the pattern so column expressions see it too.
            groups.insert(name.clone(), compile_pattern(&format!("(?i)(?:{})", alternation))?);
        }

        for rule in &self.customer_rules {
            if !groups.contains_key(&rule.group) {
                return Err(RulesError::UnknownGroup(rule.group.clone()));
            }
        }
        if let Some(ref ov) = self.taxonomy_override {
            if !groups.contains_key(&ov.group) {
                return Err(RulesError::UnknownGroup(ov.group.clone()));
            }
        }

        let mut sorted = self.type_order.clone();
        sorted.sort_by_key(|t| TxnType::ALL.iter().position(|a| a == t));
        if sorted != TxnType::ALL {
            let labels: Vec<&str> = self.type_order.iter().map(TxnType::as_str).collect();
            return Err(RulesError::InvalidTypeOrder(labels.join(", ")));
        }

        Ok(CompiledRules {
            billing,
            billing_default: self.billing_default,
            groups,
            customer_rules: self.customer_rules.clone(),
            taxonomy_override: self.taxonomy_override.clone(),
            type_order: self.type_order.clone(),
            date_columns: self.date_columns.clone(),
            fallback_year: self.fallback_year,
        })
    }
}

impl Default for ClassificationRules {
    fn default() -> Self {
        default_rules()
    }
}

fn compile_pattern(pattern: &str) -> RulesResult<Regex> {
    Regex::new(pattern).map_err(|e| RulesError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// Rules with every pattern compiled, ready for the classifier.
#[derive(Debug, Clone)]
pub struct CompiledRules {
    billing: Vec<(Regex, TxnType)>,
    billing_default: TxnType,
    groups: BTreeMap<String, Regex>,
    customer_rules: Vec<CustomerRule>,
    taxonomy_override: Option<TaxonomyOverride>,
    type_order: Vec<TxnType>,
    date_columns: Vec<String>,
    fallback_year: i32,
}

impl CompiledRules {
    pub fn billing(&self) -> &[(Regex, TxnType)] {
        &self.billing
    }

    pub fn billing_default(&self) -> TxnType {
        self.billing_default
    }

    pub fn groups(&self) -> &BTreeMap<String, Regex> {
        &self.groups
    }

    pub fn customer_rules(&self) -> &[CustomerRule] {
        &self.customer_rules
    }

    pub fn taxonomy_override(&self) -> Option<&TaxonomyOverride> {
        self.taxonomy_override.as_ref()
    }

    pub fn type_order(&self) -> &[TxnType] {
        &self.type_order
    }

    pub fn date_columns(&self) -> &[String] {
        &self.date_columns
    }

    pub fn fallback_year(&self) -> i32 {
        self.fallback_year
    }
}

/// The built-in rule table.
pub fn default_rules() -> ClassificationRules {
    let mut customer_groups = BTreeMap::new();
    customer_groups.insert(
        "ic".to_string(),
        vec![
            "Pravin Sales Division".to_string(),
            "Aveer Foods Ltd".to_string(),
            "PRAVIN SALES DIVISION".to_string(),
        ],
    );
    customer_groups.insert("pravin".to_string(), vec!["Pravin Masalewale".to_string()]);

    let mut override_values = BTreeMap::new();
    override_values.insert(columns::PLI_APP.to_string(), "inter".to_string());
    override_values.insert(columns::PLI_CAT.to_string(), "inter".to_string());
    override_values.insert(columns::CATE_ALL.to_string(), "N/A".to_string());
    override_values.insert(columns::PLI_HSN.to_string(), "N/A".to_string());
    override_values.insert(columns::UQM.to_string(), "N/A".to_string());

    ClassificationRules {
        version: default_version(),
        description: "Sales type classification".to_string(),
        billing_rules: vec![
            BillingRule {
                pattern: "SRN|Credit Rate Diff billing".to_string(),
                label: TxnType::CreditNote,
            },
            // Exports pad the description with a variable run of spaces.
            BillingRule {
                pattern: r"Export\s+Direct Billing".to_string(),
                label: TxnType::Export,
            },
        ],
        billing_default: default_billing_type(),
        customer_groups,
        customer_rules: vec![
            CustomerRule {
                group: "ic".to_string(),
                when: Some(TxnType::CreditNote),
                label: TxnType::CreditNoteIc,
            },
            CustomerRule {
                group: "ic".to_string(),
                when: None,
                label: TxnType::DomesticIc,
            },
            CustomerRule {
                group: "pravin".to_string(),
                when: None,
                label: TxnType::Inter,
            },
        ],
        taxonomy_override: Some(TaxonomyOverride {
            group: "pravin".to_string(),
            values: override_values,
        }),
        type_order: default_type_order(),
        date_columns: default_date_columns(),
        fallback_year: default_fallback_year(),
    }
}
