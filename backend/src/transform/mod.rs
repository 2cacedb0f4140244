//! Transformation module.
//!
//! The sales pipeline, one stage per file:
//! - Rules: the classification rule table
//! - Dates: lenient date text and spreadsheet serials
//! - Normalize: trimming, collision renames, `Year` derivation
//! - Resolve: master dedup and left join
//! - Classify: two-pass `Type` and taxonomy override
//! - Aggregate: measure coercion and the Type pivot
//! - Pipeline: `process` and the report types

pub mod aggregate;
pub mod classify;
pub mod dates;
pub mod normalize;
pub mod pipeline;
pub mod resolve;
pub mod rules;

pub use aggregate::{coerce_measures, pivot_summary};
pub use classify::classify;
pub use normalize::normalize_tables;
pub use pipeline::*;
pub use resolve::{attach_master, dedup_master, JoinStats};
pub use rules::{default_rules, ClassificationRules, CompiledRules};
