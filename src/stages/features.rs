//! Weekly table -> target and feature table.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::data::{StageStore, TimeSeriesTable};
use crate::features::FeatureSet;

use super::{explicit_filename, FileSpec, StageError};

fn default_stage_name() -> String {
    "features".to_string()
}

fn default_input_stage() -> String {
    "preprocessing".to_string()
}

/// Feature stage configuration.
///
/// ```json
/// {
///   "target": { "type": "excess_return", "asset": "SBUX", "benchmark": "SPY" },
///   "features": [
///     { "type": "lag", "column": "VIX", "lag": 1 },
///     { "type": "momentum", "column": "SBUX", "window": 4 }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default = "default_stage_name")]
    pub stage_name: String,
    #[serde(default = "default_input_stage")]
    pub input_stage: String,
    #[serde(default)]
    pub input: Option<FileSpec>,
    #[serde(flatten)]
    pub feature_set: FeatureSet,
    #[serde(default)]
    pub output: Option<FileSpec>,
}

impl FeaturesConfig {
    /// Check the target and every feature against the input table's columns.
    pub fn validate(&self, table: &TimeSeriesTable) -> Result<(), StageError> {
        Ok(self.feature_set.validate(table)?)
    }
}

pub fn run_features(store: &StageStore, config: &FeaturesConfig) -> Result<PathBuf, StageError> {
    let (table, input_path) = store.read_table(&config.input_stage, explicit_filename(&config.input))?;
    info!(
        "Building {} features from {}",
        config.feature_set.features.len(),
        input_path.display()
    );

    config.validate(&table)?;
    let built = config.feature_set.build(&table)?;
    Ok(store.save_table(&config.stage_name, &built, explicit_filename(&config.output))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    use crate::data::Column;
    use crate::features::FeatureError;

    fn weekly(n: usize) -> TimeSeriesTable {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        TimeSeriesTable::from_columns(
            (0..n).map(|i| start + chrono::Duration::weeks(i as i64)).collect(),
            vec![
                Column::new("SBUX", (0..n).map(|i| 90.0 + i as f64).collect()),
                Column::new("SPY", (0..n).map(|i| 380.0 + 1.5 * i as f64).collect()),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_run_features_reads_latest_preprocessing() {
        let dir = TempDir::new().unwrap();
        let store = StageStore::new(dir.path());
        store
            .save_table("preprocessing", &weekly(12), Some("preprocessing_20240101_000000.csv"))
            .unwrap();

        let config: FeaturesConfig = serde_json::from_str(
            r#"{
                "target": {"type": "excess_return", "asset": "SBUX", "benchmark": "SPY"},
                "features": [{"type": "momentum", "column": "SBUX", "window": 2}],
                "output": {"filename": "features.csv"}
            }"#,
        )
        .unwrap();
        assert_eq!(config.input_stage, "preprocessing");

        run_features(&store, &config).unwrap();
        let (table, _) = store.read_table("features", Some("features.csv")).unwrap();
        // Two leading momentum rows and the final forward row are dropped
        assert_eq!(table.len(), 9);
        assert!(table.has_column("SBUX_mom_2"));
        assert!(table.has_column("excess_ret_fwd_1"));
    }

    #[test]
    fn test_unknown_column_fails_before_writing() {
        let dir = TempDir::new().unwrap();
        let store = StageStore::new(dir.path());
        store.save_table("preprocessing", &weekly(12), None).unwrap();

        let config: FeaturesConfig = serde_json::from_str(
            r#"{
                "target": {"type": "excess_return", "asset": "SBUX", "benchmark": "SPY"},
                "features": [{"type": "lag", "column": "VIX", "lag": 1}]
            }"#,
        )
        .unwrap();

        let err = run_features(&store, &config).unwrap_err();
        assert!(matches!(
            err,
            StageError::Feature(FeatureError::UnknownColumn { .. })
        ));
        assert!(!store.stage_dir("features").exists());
    }
}
