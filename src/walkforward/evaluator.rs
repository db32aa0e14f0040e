//! Walk-forward evaluation of a regression model.
//!
//! For each window a fresh estimator is fitted on the training span and
//! predicts the test span. Predictions and truths are written back at their
//! original positions, so the stitched out-of-sample series stays aligned
//! with the input table.

use ndarray::{s, Array1, ArrayView1, ArrayView2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::metrics::{MetricsCalculator, MetricsReport};
use crate::model::{Estimator, EstimatorFactory};

use super::errors::WalkForwardError;
use super::periods::{WalkForwardConfig, Window, WindowScheduler};

/// Out-of-sample predictions and truths, one slot per input row.
///
/// Only positions covered by a window's test span are set. Both values at a
/// position are always written together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OosResult {
    predictions: Vec<Option<f64>>,
    truths: Vec<Option<f64>>,
    windows_run: usize,
    first_oos: Option<usize>,
}

impl OosResult {
    /// Create an all-unset result for `len` rows.
    pub fn new(len: usize) -> Self {
        Self {
            predictions: vec![None; len],
            truths: vec![None; len],
            windows_run: 0,
            first_oos: None,
        }
    }

    /// Number of rows in the original table.
    pub fn len(&self) -> usize {
        self.truths.len()
    }

    /// True when the original table had no rows.
    pub fn is_empty(&self) -> bool {
        self.truths.is_empty()
    }

    /// Number of positions that received an out-of-sample prediction.
    pub fn n_evaluated(&self) -> usize {
        self.truths.iter().filter(|t| t.is_some()).count()
    }

    /// Number of windows fitted and predicted.
    pub fn windows_run(&self) -> usize {
        self.windows_run
    }

    /// First position predicted out of sample, if any window ran.
    pub fn first_oos_position(&self) -> Option<usize> {
        self.first_oos
    }

    /// Out-of-sample prediction at `position`, if one was recorded.
    pub fn prediction(&self, position: usize) -> Option<f64> {
        self.predictions.get(position).copied().flatten()
    }

    /// Truth value at `position`, if it was predicted out of sample.
    pub fn truth(&self, position: usize) -> Option<f64> {
        self.truths.get(position).copied().flatten()
    }

    /// Get all predictions by position.
    pub fn predictions(&self) -> &[Option<f64>] {
        &self.predictions
    }

    /// Get all truths by position.
    pub fn truths(&self) -> &[Option<f64>] {
        &self.truths
    }

    /// Positions with a recorded truth, in ascending order.
    pub fn oos_positions(&self) -> Vec<usize> {
        self.truths
            .iter()
            .enumerate()
            .filter_map(|(pos, t)| t.map(|_| pos))
            .collect()
    }

    /// `(prediction, truth)` pairs at every evaluated position.
    pub fn evaluated_pairs(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.truths
            .iter()
            .zip(&self.predictions)
            .filter_map(|(truth, prediction)| {
                let truth = (*truth)?;
                debug_assert!(prediction.is_some(), "truth recorded without prediction");
                prediction.map(|p| (p, truth))
            })
    }

    /// Predictions as a dense column, NaN where unset.
    pub fn predictions_or_nan(&self) -> Vec<f64> {
        self.predictions
            .iter()
            .map(|p| p.unwrap_or(f64::NAN))
            .collect()
    }

    /// Aggregate error and skill over the evaluated positions.
    pub fn metrics(&self) -> MetricsReport {
        MetricsCalculator::aggregate(self)
    }

    fn record(&mut self, window: &Window, predictions: &Array1<f64>, truths: ArrayView1<'_, f64>) {
        for ((pos, &pred), &truth) in window.test.clone().zip(predictions).zip(truths) {
            debug_assert!(self.truths[pos].is_none(), "position {pos} written twice");
            self.predictions[pos] = Some(pred);
            self.truths[pos] = Some(truth);
        }
        self.windows_run += 1;
        if self.first_oos.is_none() {
            self.first_oos = Some(window.test.start);
        }
    }
}

/// Drives the window scheduler and the estimator factory.
pub struct WalkForwardEvaluator {
    config: WalkForwardConfig,
}

impl WalkForwardEvaluator {
    /// Create an evaluator, rejecting zero-sized windows.
    pub fn new(config: WalkForwardConfig) -> Result<Self, WalkForwardError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &WalkForwardConfig {
        &self.config
    }

    /// Windows for a table of `n_rows` rows.
    pub fn schedule(&self, n_rows: usize) -> Result<Vec<Window>, WalkForwardError> {
        Ok(WindowScheduler::new(self.config.clone(), n_rows)?.generate())
    }

    /// Evaluate windows sequentially, one fresh estimator per window.
    pub fn evaluate<F>(
        &self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        factory: &F,
    ) -> Result<OosResult, WalkForwardError>
    where
        F: EstimatorFactory,
    {
        let windows = self.prepare(x, y)?;
        let mut result = OosResult::new(y.len());

        for window in &windows {
            let predictions = fit_predict_window(window, x, y, factory)?;
            result.record(window, &predictions, y.slice(s![window.test.clone()]));
        }

        info!(
            "Walk-forward complete: {} windows, {} out-of-sample rows",
            result.windows_run(),
            result.n_evaluated()
        );
        Ok(result)
    }

    /// Evaluate windows on the rayon pool.
    ///
    /// Every window gets its own estimator and results are written in window
    /// order, so the output is identical to [`evaluate`](Self::evaluate).
    pub fn evaluate_parallel<F>(
        &self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        factory: &F,
    ) -> Result<OosResult, WalkForwardError>
    where
        F: EstimatorFactory + Sync,
    {
        let windows = self.prepare(x, y)?;

        // Collected per window so the first failure in window order is reported
        let outcomes: Vec<Result<Array1<f64>, WalkForwardError>> = windows
            .par_iter()
            .map(|window| fit_predict_window(window, x, y, factory))
            .collect();
        let predictions = outcomes.into_iter().collect::<Result<Vec<_>, _>>()?;

        let mut result = OosResult::new(y.len());
        for (window, preds) in windows.iter().zip(&predictions) {
            result.record(window, preds, y.slice(s![window.test.clone()]));
        }

        info!(
            "Parallel walk-forward complete: {} windows, {} out-of-sample rows",
            result.windows_run(),
            result.n_evaluated()
        );
        Ok(result)
    }

    /// Fit a fresh estimator on every row.
    ///
    /// This is the model to persist or deploy; no estimator used during
    /// evaluation is ever returned.
    pub fn final_fit<F>(
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        factory: &F,
    ) -> Result<F::Output, WalkForwardError>
    where
        F: EstimatorFactory,
    {
        check_dimensions(x, y)?;
        let mut estimator = factory.create();
        estimator.fit(x, y).map_err(WalkForwardError::FinalFit)?;
        Ok(estimator)
    }

    fn prepare(
        &self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
    ) -> Result<Vec<Window>, WalkForwardError> {
        check_dimensions(x, y)?;
        let windows = self.schedule(y.len())?;

        if windows.is_empty() {
            warn!(
                "No walk-forward windows fit {} rows (train_window={}, horizon={})",
                y.len(),
                self.config.train_window,
                self.config.horizon
            );
        } else {
            info!(
                "Evaluating {} {:?} windows over {} rows (train_window={}, horizon={})",
                windows.len(),
                self.config.mode(),
                y.len(),
                self.config.train_window,
                self.config.horizon
            );
        }

        Ok(windows)
    }
}

fn check_dimensions(x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<(), WalkForwardError> {
    if x.nrows() != y.len() {
        return Err(WalkForwardError::DimensionMismatch {
            features: x.nrows(),
            target: y.len(),
        });
    }
    Ok(())
}

fn fit_predict_window<F>(
    window: &Window,
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, f64>,
    factory: &F,
) -> Result<Array1<f64>, WalkForwardError>
where
    F: EstimatorFactory,
{
    let estimator_error = |source| WalkForwardError::Estimator {
        window: window.index,
        source,
    };

    let mut estimator = factory.create();
    estimator
        .fit(
            x.slice(s![window.train.clone(), ..]),
            y.slice(s![window.train.clone()]),
        )
        .map_err(estimator_error)?;

    let predictions = estimator
        .predict(x.slice(s![window.test.clone(), ..]))
        .map_err(estimator_error)?;

    if predictions.len() != window.test_len() {
        return Err(WalkForwardError::PredictionLength {
            window: window.index,
            expected: window.test_len(),
            got: predictions.len(),
        });
    }

    debug!(
        "Window {}: train {:?}, test {:?}",
        window.index, window.train, window.test
    );
    Ok(predictions)
}
