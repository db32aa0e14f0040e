//! Pairwise feature correlation screening.

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelatedPair {
    pub first: String,
    pub second: String,
    /// Absolute Pearson correlation.
    pub correlation: f64,
}

/// The `top_n` most correlated distinct column pairs, strongest first.
///
/// Pairs involving a constant column have no defined correlation and are skipped.
pub fn top_correlated_pairs<S: AsRef<str>>(
    x: ArrayView2<'_, f64>,
    names: &[S],
    top_n: usize,
) -> Vec<CorrelatedPair> {
    let columns: Vec<Vec<f64>> = x.columns().into_iter().map(|c| c.to_vec()).collect();

    let mut pairs = Vec::new();
    for i in 0..columns.len() {
        for j in (i + 1)..columns.len() {
            let correlation = pearson(&columns[i], &columns[j]).abs();
            if correlation.is_nan() {
                continue;
            }
            pairs.push(CorrelatedPair {
                first: names.get(i).map_or_else(|| format!("x{i}"), |n| n.as_ref().to_string()),
                second: names.get(j).map_or_else(|| format!("x{j}"), |n| n.as_ref().to_string()),
                correlation,
            });
        }
    }

    pairs.sort_by(|a, b| b.correlation.total_cmp(&a.correlation));
    pairs.truncate(top_n);
    pairs
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let denominator = a.iter().std_dev() * b.iter().std_dev();
    if !(denominator > 0.0) {
        return f64::NAN;
    }
    a.iter().covariance(b.iter()) / denominator
}
