use thiserror::Error;

use crate::model::ModelError;

/// Errors raised by window scheduling and walk-forward evaluation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WalkForwardError {
    #[error("Invalid walk-forward configuration: {0}")]
    InvalidConfig(String),

    #[error("Dimension mismatch: {features} feature rows but {target} target values")]
    DimensionMismatch { features: usize, target: usize },

    #[error("Estimator failed in window {window}: {source}")]
    Estimator {
        window: usize,
        #[source]
        source: ModelError,
    },

    #[error("Window {window} produced {got} predictions for {expected} test rows")]
    PredictionLength {
        window: usize,
        expected: usize,
        got: usize,
    },

    #[error("Final fit on the full dataset failed: {0}")]
    FinalFit(#[source] ModelError),
}
