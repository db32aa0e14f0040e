//! Feature table -> walk-forward evaluation, final model and metrics.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::data::{timestamped_filename, StageStore, TimeSeriesTable};
use crate::features::{top_correlated_pairs, CorrelatedPair};
use crate::metrics::{MetricsCalculator, MetricsReport};
use crate::model::{Estimator, ModelSpec, RegressionPipeline};
use crate::walkforward::{OosResult, WalkForwardConfig, WalkForwardEvaluator};

use super::{explicit_filename, FileSpec, StageError};

/// Pairs logged and recorded by the correlation screen.
const TOP_CORRELATED_PAIRS: usize = 10;

fn default_stage_name() -> String {
    "model".to_string()
}

fn default_input_stage() -> String {
    "features".to_string()
}

/// Training stage configuration.
///
/// ```json
/// {
///   "target": "excess_ret_fwd_1",
///   "feature_columns": ["VIX_lag_1", "SBUX_mom_4"],
///   "model": { "type": "ridge", "alpha": 1.0 },
///   "test": { "train_window": 156, "horizon": 4, "expanding": false }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    #[serde(default = "default_stage_name")]
    pub stage_name: String,
    #[serde(default = "default_input_stage")]
    pub input_stage: String,
    #[serde(default)]
    pub input: Option<FileSpec>,

    pub target: String,
    pub feature_columns: Vec<String>,

    #[serde(default)]
    pub model: ModelSpec,
    /// Walk-forward window settings.
    #[serde(default)]
    pub test: WalkForwardConfig,
    /// Fit windows on the rayon pool.
    #[serde(default)]
    pub parallel: bool,

    #[serde(default)]
    pub output_predictions: Option<FileSpec>,
    #[serde(default)]
    pub output_model: Option<FileSpec>,
}

impl TrainConfig {
    pub fn predicted_column(&self) -> String {
        format!("pred_{}", self.target)
    }

    pub fn oos_predicted_column(&self) -> String {
        format!("oos_pred_{}", self.target)
    }

    /// Reject configurations no run could succeed with.
    pub fn validate(&self) -> Result<(), StageError> {
        if self.feature_columns.is_empty() {
            return Err(StageError::Config(
                "feature_columns must not be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for column in &self.feature_columns {
            if !seen.insert(column) {
                return Err(StageError::Config(format!(
                    "feature column {column} listed twice"
                )));
            }
        }
        if seen.contains(&self.target) {
            return Err(StageError::Config(format!(
                "target {} is also a feature column",
                self.target
            )));
        }

        self.model.validate()?;
        self.test.validate()?;
        Ok(())
    }
}

/// Everything a training run produces, before anything is written.
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub oos: OosResult,
    pub walk_forward: MetricsReport,
    pub baseline: MetricsReport,
    /// Model fitted on every row.
    pub model: RegressionPipeline,
    /// Target, final-model predictions, walk-forward predictions and features.
    pub predictions: TimeSeriesTable,
    pub correlated_pairs: Vec<CorrelatedPair>,
    /// Last date the first evaluation window trained on.
    pub oos_cutoff_date: Option<NaiveDate>,
}

/// Run the walk-forward evaluation, baseline and final fit on `table`.
pub fn train_on_table(table: &TimeSeriesTable, config: &TrainConfig) -> Result<TrainOutcome, StageError> {
    config.validate()?;

    let x = table.select(&config.feature_columns)?;
    let y = table.target(&config.target)?;

    let correlated_pairs = top_correlated_pairs(x.view(), &config.feature_columns, TOP_CORRELATED_PAIRS);
    for pair in &correlated_pairs {
        info!(
            "Correlated features: {} / {} = {:.4}",
            pair.first, pair.second, pair.correlation
        );
    }

    info!(
        "Training {} model on {} rows x {} features",
        config.model.model_type(),
        x.nrows(),
        x.ncols()
    );
    let evaluator = WalkForwardEvaluator::new(config.test.clone())?;
    let oos = if config.parallel {
        evaluator.evaluate_parallel(x.view(), y.view(), &config.model)?
    } else {
        evaluator.evaluate(x.view(), y.view(), &config.model)?
    };

    let walk_forward = oos.metrics();
    let baseline = MetricsCalculator::baseline(table.column(&config.target)?, &oos.oos_positions());
    info!("Walk-forward  {}", walk_forward.summary());
    info!("Zero baseline {}", baseline.summary());

    let model = WalkForwardEvaluator::final_fit(x.view(), y.view(), &config.model)?;
    let fitted = model.predict(x.view())?;

    let oos_cutoff_date = oos
        .first_oos_position()
        .and_then(|pos| pos.checked_sub(1))
        .and_then(|pos| table.dates().get(pos).copied());

    let predictions = predictions_table(table, config, &y, &fitted, &oos)?;

    Ok(TrainOutcome {
        oos,
        walk_forward,
        baseline,
        model,
        predictions,
        correlated_pairs,
        oos_cutoff_date,
    })
}

fn predictions_table(
    table: &TimeSeriesTable,
    config: &TrainConfig,
    y: &Array1<f64>,
    fitted: &Array1<f64>,
    oos: &OosResult,
) -> Result<TimeSeriesTable, StageError> {
    let mut predictions = TimeSeriesTable::new(table.dates().to_vec())?;
    predictions.insert_column(config.target.clone(), y.to_vec())?;
    predictions.insert_column(config.predicted_column(), fitted.to_vec())?;
    predictions.insert_column(config.oos_predicted_column(), oos.predictions_or_nan())?;
    for column in &config.feature_columns {
        predictions.insert_column(column.clone(), table.column(column)?.to_vec())?;
    }
    Ok(predictions)
}

/// Metrics file written next to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainMetrics {
    pub walk_forward: MetricsReport,
    pub baseline: MetricsReport,
    pub model_type: String,
    pub model_params: ModelSpec,
    pub n_rows: usize,
    pub train_window: usize,
    pub horizon: usize,
    pub expanding: bool,
    pub windows: usize,
    pub features_used: Vec<String>,
    pub target_col: String,
    pub predicted_col: String,
    pub oos_pred_col: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oos_cutoff_date: Option<NaiveDate>,
    pub input_path: String,
    #[serde(default)]
    pub top_correlated_pairs: Vec<CorrelatedPair>,
}

impl TrainMetrics {
    pub fn new(config: &TrainConfig, outcome: &TrainOutcome, input_path: &Path) -> Self {
        Self {
            walk_forward: outcome.walk_forward,
            baseline: outcome.baseline,
            model_type: config.model.model_type().to_string(),
            model_params: config.model.clone(),
            n_rows: outcome.oos.len(),
            train_window: config.test.train_window,
            horizon: config.test.horizon,
            expanding: config.test.expanding,
            windows: outcome.oos.windows_run(),
            features_used: config.feature_columns.clone(),
            target_col: config.target.clone(),
            predicted_col: config.predicted_column(),
            oos_pred_col: config.oos_predicted_column(),
            oos_cutoff_date: outcome.oos_cutoff_date,
            input_path: input_path.display().to_string(),
            top_correlated_pairs: outcome.correlated_pairs.clone(),
        }
    }
}

/// Persisted final model with the columns it expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedModel {
    pub spec: ModelSpec,
    pub target: String,
    pub feature_columns: Vec<String>,
    /// Last date of the training data.
    pub trained_through: Option<NaiveDate>,
    pub pipeline: RegressionPipeline,
}

impl SavedModel {
    pub fn load(path: &Path) -> Result<Self, StageError> {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }

    /// Predict every row of `table` from the model's feature columns.
    pub fn predict(&self, table: &TimeSeriesTable) -> Result<Array1<f64>, StageError> {
        let x = table.select(&self.feature_columns)?;
        Ok(self.pipeline.predict(x.view())?)
    }
}

/// Paths and metrics of a completed training run.
#[derive(Debug, Clone)]
pub struct TrainArtifacts {
    pub predictions_path: PathBuf,
    pub model_path: PathBuf,
    pub metrics_path: PathBuf,
    pub metrics: TrainMetrics,
}

/// Read the feature table, train, and write predictions, model and metrics.
pub fn run_train(store: &StageStore, config: &TrainConfig) -> Result<TrainArtifacts, StageError> {
    config.validate()?;
    let (table, input_path) = store.read_table(&config.input_stage, explicit_filename(&config.input))?;

    let outcome = train_on_table(&table, config)?;
    let metrics = TrainMetrics::new(config, &outcome, &input_path);

    let predictions_path = store.save_table(
        &config.stage_name,
        &outcome.predictions,
        explicit_filename(&config.output_predictions),
    )?;

    let model_filename = explicit_filename(&config.output_model)
        .map(str::to_string)
        .unwrap_or_else(|| timestamped_filename(&config.stage_name, "json"));
    let saved = SavedModel {
        spec: config.model.clone(),
        target: config.target.clone(),
        feature_columns: config.feature_columns.clone(),
        trained_through: table.last_date(),
        pipeline: outcome.model,
    };
    let model_path = store.write_json(&config.stage_name, &model_filename, &saved)?;

    let stem = Path::new(&model_filename)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| model_filename.clone());
    let metrics_path = store.write_json(&config.stage_name, &format!("{stem}_metrics.json"), &metrics)?;

    Ok(TrainArtifacts {
        predictions_path,
        model_path,
        metrics_path,
        metrics,
    })
}
