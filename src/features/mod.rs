//! Feature engineering module.
//!
//! Provides:
//! - Forward excess-return and residual-alpha targets
//! - Lag, diff, rolling mean, z-score, momentum and step-change features
//! - Up-front validation of every column reference and window
//! - Correlated feature pair screening

pub mod builder;
pub mod correlation;
pub mod registry;
pub mod target;
pub mod transforms;

use thiserror::Error;

use crate::data::TableError;

pub use builder::FeatureSet;
pub use correlation::{top_correlated_pairs, CorrelatedPair};
pub use registry::FeatureKind;
pub use target::TargetSpec;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeatureError {
    #[error("Column {column} referenced by {feature} does not exist")]
    UnknownColumn { feature: String, column: String },

    #[error("Invalid feature parameter: {0}")]
    InvalidParameter(String),

    #[error("Table error: {0}")]
    Table(#[from] TableError),
}
