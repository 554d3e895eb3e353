//! Anomaly explanation module
//!
//! Attributes a flagged row to the numeric features that deviate most from
//! the scored population, measured in standard deviations.

mod deviation;

pub use deviation::{
    explain, explain_deviations, ColumnReference, Explanation, FeatureDeviation, ReferenceStats,
    FALLBACK_EXPLANATION, NORMAL_LABEL,
};
