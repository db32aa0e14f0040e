//! Feature table construction.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::data::TimeSeriesTable;

use super::registry::FeatureKind;
use super::target::TargetSpec;
use super::FeatureError;

fn default_true() -> bool {
    true
}

/// Target plus ordered feature definitions.
///
/// Features may read columns written by the target or by earlier features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub target: TargetSpec,

    #[serde(default)]
    pub features: Vec<FeatureKind>,

    /// Drop rows with any missing value once every column is built.
    #[serde(default = "default_true")]
    pub drop_incomplete: bool,
}

impl FeatureSet {
    /// Check every parameter and column reference against `table`.
    ///
    /// Nothing is computed; a configuration that passes can only fail later on
    /// data content, never on a missing column or a zero window.
    pub fn validate(&self, table: &TimeSeriesTable) -> Result<(), FeatureError> {
        let mut available: HashSet<String> =
            table.column_names().into_iter().map(str::to_string).collect();

        self.target.validate()?;
        for column in self.target.input_columns() {
            if !available.contains(column) {
                return Err(FeatureError::UnknownColumn {
                    feature: "target".to_string(),
                    column: column.to_string(),
                });
            }
        }
        available.extend(self.target.output_columns());

        for feature in &self.features {
            feature.validate()?;
            if !available.contains(feature.input_column()) {
                return Err(FeatureError::UnknownColumn {
                    feature: feature.kind().to_string(),
                    column: feature.input_column().to_string(),
                });
            }
            available.extend(feature.output_columns());
        }
        Ok(())
    }

    /// Validate, then add the target and every feature to a copy of `table`.
    pub fn build(&self, table: &TimeSeriesTable) -> Result<TimeSeriesTable, FeatureError> {
        self.validate(table)?;

        let mut built = table.clone();
        self.target.apply(&mut built)?;
        debug!("Built target column {}", self.target.target_column());

        for feature in &self.features {
            feature.apply(&mut built)?;
            debug!("Built {:?}", feature.output_columns());
        }

        if !self.drop_incomplete {
            return Ok(built);
        }

        let complete = built.drop_incomplete_rows();
        info!(
            "Feature table: {} columns, {} of {} rows complete",
            complete.columns().len(),
            complete.len(),
            built.len()
        );
        Ok(complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::data::Column;

    fn prices(n: usize) -> TimeSeriesTable {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let dates = (0..n).map(|i| start + chrono::Duration::weeks(i as i64)).collect();
        let sbux = (0..n).map(|i| 100.0 + (i as f64 * 0.9).sin() * 5.0 + i as f64).collect();
        let spy = (0..n).map(|i| 400.0 + (i as f64 * 0.4).cos() * 8.0 + 2.0 * i as f64).collect();
        let vix = (0..n).map(|i| 15.0 + (i as f64 * 1.3).sin() * 3.0).collect();
        TimeSeriesTable::from_columns(
            dates,
            vec![
                Column::new("SBUX", sbux),
                Column::new("SPY", spy),
                Column::new("VIX", vix),
            ],
        )
        .unwrap()
    }

    fn config(json: &str) -> FeatureSet {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_build_drops_leading_and_trailing_rows() {
        let set = config(
            r#"{
                "target": {"type": "excess_return", "asset": "SBUX", "benchmark": "SPY"},
                "features": [
                    {"type": "lag", "column": "VIX", "lag": 1},
                    {"type": "rolling_mean", "column": "VIX", "window": 4},
                    {"type": "zscore", "column": "VIX", "window": 4}
                ]
            }"#,
        );
        let table = prices(20);
        let built = set.build(&table).unwrap();

        // Rolling window of 4 loses 3 leading rows, forward target loses the last
        assert_eq!(built.len(), 16);
        assert_eq!(built.first_date(), Some(table.dates()[3]));
        assert_eq!(built.last_date(), Some(table.dates()[18]));
        assert!(built.has_column("excess_ret_fwd_1"));
        assert!(built.has_column("VIX_z_4"));
        assert!(built.target("excess_ret_fwd_1").is_ok());
    }

    #[test]
    fn test_features_may_use_target_outputs() {
        let set = config(
            r#"{
                "target": {"type": "residual_alpha", "asset": "SBUX", "benchmark": "SPY", "window": 8},
                "features": [
                    {"type": "lagged_alpha", "lags": [1, 2], "mas": [4]}
                ]
            }"#,
        );
        let built = set.build(&prices(40)).unwrap();
        assert!(built.has_column("alpha_lag2"));
        assert!(built.has_column("alpha_ma4"));
        assert!(!built.is_empty());
    }

    #[test]
    fn test_missing_column_reported_before_compute() {
        let set = config(
            r#"{
                "target": {"type": "excess_return", "asset": "SBUX", "benchmark": "SPY"},
                "features": [
                    {"type": "lag", "column": "VIX", "lag": 1},
                    {"type": "momentum", "column": "DXY", "window": 4}
                ]
            }"#,
        );
        let err = set.build(&prices(10)).unwrap_err();
        assert_eq!(
            err,
            FeatureError::UnknownColumn {
                feature: "momentum".to_string(),
                column: "DXY".to_string()
            }
        );
    }

    #[test]
    fn test_zero_window_rejected() {
        let set = config(
            r#"{
                "target": {"type": "excess_return", "asset": "SBUX", "benchmark": "SPY"},
                "features": [{"type": "rolling_mean", "column": "VIX", "window": 0}]
            }"#,
        );
        assert!(matches!(
            set.validate(&prices(10)),
            Err(FeatureError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_keep_incomplete_rows() {
        let set = config(
            r#"{
                "target": {"type": "excess_return", "asset": "SBUX", "benchmark": "SPY"},
                "drop_incomplete": false
            }"#,
        );
        let built = set.build(&prices(10)).unwrap();
        assert_eq!(built.len(), 10);
    }
}
