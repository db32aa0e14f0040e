//! Fit/predict capability consumed by the walk-forward evaluator.

use ndarray::{Array1, ArrayView1, ArrayView2};
use thiserror::Error;

/// Errors raised while fitting or applying a model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Model has not been fitted yet")]
    NotFitted,

    #[error("Cannot fit on an empty training set")]
    EmptyTrainingSet,

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Matrix is singular and cannot be inverted")]
    SingularMatrix,

    #[error("Invalid alpha value: {0}")]
    InvalidAlpha(f64),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// A regression model that learns from a feature matrix and target vector.
///
/// `fit` overwrites any previously learned parameters. `predict` returns one
/// value per row of `x`.
pub trait Estimator {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<(), ModelError>;

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, ModelError>;
}

/// Produces fresh, unfitted estimators.
///
/// The walk-forward evaluator asks for a new instance per window, so no
/// learned state is ever shared between windows.
pub trait EstimatorFactory {
    type Output: Estimator;

    fn create(&self) -> Self::Output;
}

impl<F, E> EstimatorFactory for F
where
    F: Fn() -> E,
    E: Estimator,
{
    type Output = E;

    fn create(&self) -> E {
        self()
    }
}
