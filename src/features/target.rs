//! Forward-looking prediction targets.

use serde::{Deserialize, Serialize};

use crate::data::TimeSeriesTable;

use super::transforms::{pct_change, rolling_cov, rolling_var, shift};
use super::FeatureError;

fn default_beta_window() -> usize {
    52
}

/// Target construction, tagged by `"type"` in JSON.
///
/// ```json
/// { "type": "excess_return", "asset": "SBUX", "benchmark": "SPY" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetSpec {
    /// Next-period asset return minus next-period benchmark return.
    ExcessReturn { asset: String, benchmark: String },

    /// Next-period residual of the asset return after removing rolling beta
    /// exposure to the benchmark.
    ResidualAlpha {
        asset: String,
        benchmark: String,
        #[serde(default = "default_beta_window")]
        window: usize,
    },
}

impl TargetSpec {
    /// Name of the column models are trained to predict.
    pub fn target_column(&self) -> &'static str {
        match self {
            Self::ExcessReturn { .. } => "excess_ret_fwd_1",
            Self::ResidualAlpha { .. } => "alpha_fwd_1",
        }
    }

    pub fn input_columns(&self) -> Vec<&str> {
        match self {
            Self::ExcessReturn { asset, benchmark } | Self::ResidualAlpha { asset, benchmark, .. } => {
                vec![asset.as_str(), benchmark.as_str()]
            }
        }
    }

    /// Every column `apply` writes, target last.
    pub fn output_columns(&self) -> Vec<String> {
        match self {
            Self::ExcessReturn { asset, benchmark } => vec![
                format!("{asset}_ret_fwd_1"),
                format!("{benchmark}_ret_fwd_1"),
                self.target_column().to_string(),
            ],
            Self::ResidualAlpha { .. } => ["beta_roll", "asset_ret", "bench_ret", "alpha", "alpha_fwd_1"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    pub fn validate(&self) -> Result<(), FeatureError> {
        if let Self::ResidualAlpha { window, .. } = self {
            if *window < 2 {
                return Err(FeatureError::InvalidParameter(format!(
                    "residual_alpha window must be at least 2, got {window}"
                )));
            }
        }
        Ok(())
    }

    /// Add the target (and its intermediate columns) to `table`.
    pub fn apply(&self, table: &mut TimeSeriesTable) -> Result<(), FeatureError> {
        match self {
            Self::ExcessReturn { asset, benchmark } => {
                let asset_fwd = shift(&pct_change(table.column(asset)?, 1), -1);
                let bench_fwd = shift(&pct_change(table.column(benchmark)?, 1), -1);
                let excess = asset_fwd.iter().zip(&bench_fwd).map(|(a, b)| a - b).collect();

                table.insert_column(format!("{asset}_ret_fwd_1"), asset_fwd)?;
                table.insert_column(format!("{benchmark}_ret_fwd_1"), bench_fwd)?;
                table.insert_column(self.target_column(), excess)?;
            }
            Self::ResidualAlpha {
                asset,
                benchmark,
                window,
            } => {
                let asset_ret = pct_change(table.column(asset)?, 1);
                let bench_ret = pct_change(table.column(benchmark)?, 1);

                let beta: Vec<f64> = rolling_cov(&asset_ret, &bench_ret, *window)
                    .iter()
                    .zip(rolling_var(&bench_ret, *window))
                    .map(|(cov, var)| cov / var)
                    .collect();
                let alpha: Vec<f64> = asset_ret
                    .iter()
                    .zip(&bench_ret)
                    .zip(&beta)
                    .map(|((a, b), beta)| a - beta * b)
                    .collect();
                let alpha_fwd = shift(&alpha, -1);

                table.insert_column("beta_roll", beta)?;
                table.insert_column("asset_ret", asset_ret)?;
                table.insert_column("bench_ret", bench_ret)?;
                table.insert_column("alpha", alpha)?;
                table.insert_column(self.target_column(), alpha_fwd)?;
            }
        }
        Ok(())
    }
}
