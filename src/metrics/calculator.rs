//! Out-of-sample metrics calculator.
//!
//! Computes error and skill of stitched walk-forward predictions, and the same
//! metrics for an always-zero baseline over the same positions.

use serde::{Deserialize, Deserializer, Serialize};
use statrs::statistics::Statistics;

use crate::walkforward::OosResult;

/// Aggregate out-of-sample metrics.
///
/// `r2_oos` and `rmse_oos` are NaN when nothing was evaluated, and `r2_oos` is
/// NaN when the truths have zero variance. NaN serializes as JSON `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Out-of-sample R² against the population variance of the truths.
    #[serde(deserialize_with = "nan_if_null")]
    pub r2_oos: f64,
    /// Root mean squared error.
    #[serde(deserialize_with = "nan_if_null")]
    pub rmse_oos: f64,
    /// Number of evaluated positions.
    pub n_oos: usize,
}

impl MetricsReport {
    /// No position was evaluated.
    pub fn is_empty(&self) -> bool {
        self.n_oos == 0
    }

    /// Generate a summary line.
    pub fn summary(&self) -> String {
        format!(
            "R² OOS: {:.4}, RMSE OOS: {:.6}, N OOS: {}",
            self.r2_oos, self.rmse_oos, self.n_oos
        )
    }
}

fn nan_if_null<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

/// Metrics calculator.
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Metrics over every position of a walk-forward result that holds a truth.
    pub fn aggregate(result: &OosResult) -> MetricsReport {
        let (predictions, truths): (Vec<f64>, Vec<f64>) = result.evaluated_pairs().unzip();
        Self::from_pairs(&predictions, &truths)
    }

    /// Metrics for predicting zero excess return at each of `oos_positions`.
    pub fn baseline(target: &[f64], oos_positions: &[usize]) -> MetricsReport {
        let truths: Vec<f64> = oos_positions
            .iter()
            .filter_map(|&pos| {
                debug_assert!(pos < target.len(), "position {pos} outside target");
                target.get(pos).copied()
            })
            .collect();
        let predictions = vec![0.0; truths.len()];
        Self::from_pairs(&predictions, &truths)
    }

    /// Metrics from aligned prediction and truth slices.
    pub fn from_pairs(predictions: &[f64], truths: &[f64]) -> MetricsReport {
        debug_assert_eq!(predictions.len(), truths.len());

        let mse = Self::mean_squared_error(predictions, truths);
        MetricsReport {
            r2_oos: Self::r2_oos(mse, truths),
            rmse_oos: mse.sqrt(),
            n_oos: truths.len(),
        }
    }

    /// Mean of squared errors; NaN for empty input.
    pub fn mean_squared_error(predictions: &[f64], truths: &[f64]) -> f64 {
        predictions
            .iter()
            .zip(truths)
            .map(|(p, t)| (p - t).powi(2))
            .collect::<Vec<f64>>()
            .mean()
    }

    /// `1 - mse / population_variance(truths)`.
    ///
    /// NaN for empty or constant truths, where the variance is zero.
    pub fn r2_oos(mse: f64, truths: &[f64]) -> f64 {
        let Some(&first) = truths.first() else {
            return f64::NAN;
        };
        if truths.iter().all(|&t| t == first) {
            return f64::NAN;
        }
        let variance = truths.iter().population_variance();
        if !(variance > 0.0) {
            return f64::NAN;
        }
        1.0 - mse / variance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_known_metrics() {
        let truths = [1.0, 2.0, 3.0, 4.0];
        let predictions = [1.0, 2.0, 3.0, 5.0];

        let mse = MetricsCalculator::mean_squared_error(&predictions, &truths);
        assert_relative_eq!(mse, 0.25);

        let report = MetricsCalculator::from_pairs(&predictions, &truths);
        assert_relative_eq!(report.rmse_oos, 0.5);
        assert_relative_eq!(report.r2_oos, 0.8, epsilon = 1e-12);
        assert_eq!(report.n_oos, 4);
    }

    #[test]
    fn test_r2_can_be_negative() {
        let truths = [1.0, 2.0, 3.0];
        let predictions = [3.0, 2.0, 1.0];
        let report = MetricsCalculator::from_pairs(&predictions, &truths);
        // mse = 8/3, var = 2/3
        assert_relative_eq!(report.r2_oos, -3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_is_undefined_not_zero() {
        let report = MetricsCalculator::from_pairs(&[], &[]);
        assert_eq!(report.n_oos, 0);
        assert!(report.is_empty());
        assert!(report.r2_oos.is_nan());
        assert!(report.rmse_oos.is_nan());
    }

    #[test]
    fn test_constant_truth_r2_is_nan() {
        let report = MetricsCalculator::from_pairs(&[0.5, 0.5, 0.5], &[2.0, 2.0, 2.0]);
        assert!(report.r2_oos.is_nan());
        assert_relative_eq!(report.rmse_oos, 1.5);
        assert!(!report.is_empty());
    }

    #[test]
    fn test_inexact_constant_truth_r2_is_nan() {
        let truths = [0.1; 10];
        let report = MetricsCalculator::from_pairs(&[0.6; 10], &truths);
        assert!(report.r2_oos.is_nan());
        assert_relative_eq!(report.rmse_oos, 0.5, epsilon = 1e-12);

        let exact = MetricsCalculator::from_pairs(&truths, &truths);
        assert!(exact.r2_oos.is_nan());

        let target = [0.7; 20];
        let positions: Vec<usize> = (4..20).collect();
        let baseline = MetricsCalculator::baseline(&target, &positions);
        assert_eq!(baseline.n_oos, 16);
        assert!(baseline.r2_oos.is_nan());
        assert_relative_eq!(baseline.rmse_oos, 0.7, epsilon = 1e-12);
    }

    #[test]
    fn test_baseline_formula() {
        let target = [0.3, -0.1, 0.2, 0.05, -0.4, 0.1];
        let positions = [2, 3, 4, 5];
        let report = MetricsCalculator::baseline(&target, &positions);

        let truths: Vec<f64> = positions.iter().map(|&p| target[p]).collect();
        let mean_sq = truths.iter().map(|t| t * t).sum::<f64>() / truths.len() as f64;
        let mean = truths.iter().sum::<f64>() / truths.len() as f64;
        let var = truths.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / truths.len() as f64;

        assert_eq!(report.n_oos, 4);
        assert_relative_eq!(report.rmse_oos, mean_sq.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(report.r2_oos, 1.0 - mean_sq / var, epsilon = 1e-12);
    }

    #[test]
    fn test_baseline_empty_index() {
        let report = MetricsCalculator::baseline(&[1.0, 2.0], &[]);
        assert!(report.is_empty());
        assert!(report.r2_oos.is_nan());
    }

    #[test]
    fn test_aggregate_ignores_unset_positions() {
        let result = OosResult::new(5);
        let report = MetricsCalculator::aggregate(&result);
        assert_eq!(report.n_oos, 0);
    }

    #[test]
    fn test_report_json_nan_round_trip() {
        let report = MetricsCalculator::from_pairs(&[], &[]);
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(json, r#"{"r2_oos":null,"rmse_oos":null,"n_oos":0}"#);

        let restored: MetricsReport = serde_json::from_str(&json).unwrap();
        assert!(restored.r2_oos.is_nan());
        assert_eq!(restored.n_oos, 0);
    }
}
