//! Regression models evaluated by the walk-forward engine.
//!
//! Provides:
//! - The `Estimator` fit/predict capability and `EstimatorFactory`
//! - Standardization (`StandardScaler`)
//! - OLS, Ridge and Lasso regressors
//! - `ModelSpec` configuration and the fitted `RegressionPipeline`

pub mod estimator;
pub mod linear;
pub mod pipeline;
pub mod scaler;

pub use estimator::{Estimator, EstimatorFactory, ModelError};
pub use linear::{FittedLinear, LassoRegression, LinearRegression, RidgeRegression};
pub use pipeline::{ModelSpec, RegressionPipeline, Regressor, RegressorSpec};
pub use scaler::StandardScaler;
