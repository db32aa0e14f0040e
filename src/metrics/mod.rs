//! Out-of-sample metrics module.
//!
//! Provides:
//! - Out-of-sample R² (population variance denominator)
//! - Root mean squared error and evaluated row count
//! - Zero-prediction baseline over the same positions

pub mod calculator;

pub use calculator::{MetricsCalculator, MetricsReport};
