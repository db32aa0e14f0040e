//! Model configuration and the fitted scaler + regressor pipeline.

use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use super::estimator::{Estimator, EstimatorFactory, ModelError};
use super::linear::{FittedLinear, LassoRegression, LinearRegression, RidgeRegression};
use super::scaler::StandardScaler;

fn default_true() -> bool {
    true
}

fn default_alpha() -> f64 {
    1.0
}

fn default_max_iter() -> usize {
    1000
}

fn default_tol() -> f64 {
    1e-4
}

/// Regressor type and hyperparameters, tagged by `"type"` in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RegressorSpec {
    Linear {
        #[serde(default = "default_true")]
        fit_intercept: bool,
    },
    Ridge {
        #[serde(default = "default_alpha")]
        alpha: f64,
        #[serde(default = "default_true")]
        fit_intercept: bool,
    },
    Lasso {
        #[serde(default = "default_alpha")]
        alpha: f64,
        #[serde(default = "default_true")]
        fit_intercept: bool,
        #[serde(default = "default_max_iter")]
        max_iter: usize,
        #[serde(default = "default_tol")]
        tol: f64,
    },
}

impl Default for RegressorSpec {
    fn default() -> Self {
        Self::Ridge {
            alpha: default_alpha(),
            fit_intercept: true,
        }
    }
}

/// Full model configuration.
///
/// ```json
/// { "type": "ridge", "alpha": 1.0, "fit_intercept": true, "standardize": true }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    #[serde(flatten)]
    pub regressor: RegressorSpec,

    /// Standardize features before regressing.
    #[serde(default = "default_true")]
    pub standardize: bool,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            regressor: RegressorSpec::default(),
            standardize: true,
        }
    }
}

impl ModelSpec {
    pub fn model_type(&self) -> &'static str {
        match self.regressor {
            RegressorSpec::Linear { .. } => "linear",
            RegressorSpec::Ridge { .. } => "ridge",
            RegressorSpec::Lasso { .. } => "lasso",
        }
    }

    /// Reject hyperparameters no fit could succeed with.
    pub fn validate(&self) -> Result<(), ModelError> {
        match self.regressor {
            RegressorSpec::Linear { .. } => Ok(()),
            RegressorSpec::Ridge { alpha, .. } => check_alpha(alpha),
            RegressorSpec::Lasso {
                alpha,
                max_iter,
                tol,
                ..
            } => {
                check_alpha(alpha)?;
                if max_iter == 0 {
                    return Err(ModelError::InvalidParameter(
                        "max_iter must be positive".to_string(),
                    ));
                }
                if !(tol > 0.0) {
                    return Err(ModelError::InvalidParameter(format!(
                        "tol must be positive, got {tol}"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Build an unfitted pipeline.
    pub fn build(&self) -> RegressionPipeline {
        let regressor = match self.regressor {
            RegressorSpec::Linear { fit_intercept } => {
                Regressor::Linear(LinearRegression::new(fit_intercept))
            }
            RegressorSpec::Ridge {
                alpha,
                fit_intercept,
            } => Regressor::Ridge(RidgeRegression::new(alpha, fit_intercept)),
            RegressorSpec::Lasso {
                alpha,
                fit_intercept,
                max_iter,
                tol,
            } => Regressor::Lasso(LassoRegression::new(alpha, fit_intercept, max_iter, tol)),
        };

        RegressionPipeline {
            scaler: self.standardize.then(StandardScaler::new),
            regressor,
        }
    }
}

fn check_alpha(alpha: f64) -> Result<(), ModelError> {
    if alpha >= 0.0 && alpha.is_finite() {
        Ok(())
    } else {
        Err(ModelError::InvalidAlpha(alpha))
    }
}

impl EstimatorFactory for ModelSpec {
    type Output = RegressionPipeline;

    fn create(&self) -> RegressionPipeline {
        self.build()
    }
}

/// One of the supported regressors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Regressor {
    Linear(LinearRegression),
    Ridge(RidgeRegression),
    Lasso(LassoRegression),
}

impl Regressor {
    pub fn fitted(&self) -> Option<&FittedLinear> {
        match self {
            Self::Linear(m) => m.fitted(),
            Self::Ridge(m) => m.fitted(),
            Self::Lasso(m) => m.fitted(),
        }
    }
}

impl Estimator for Regressor {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<(), ModelError> {
        match self {
            Self::Linear(m) => m.fit(x, y),
            Self::Ridge(m) => m.fit(x, y),
            Self::Lasso(m) => m.fit(x, y),
        }
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, ModelError> {
        match self {
            Self::Linear(m) => m.predict(x),
            Self::Ridge(m) => m.predict(x),
            Self::Lasso(m) => m.predict(x),
        }
    }
}

/// Optional standardization followed by a linear regressor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionPipeline {
    scaler: Option<StandardScaler>,
    regressor: Regressor,
}

impl RegressionPipeline {
    pub fn scaler(&self) -> Option<&StandardScaler> {
        self.scaler.as_ref()
    }

    pub fn regressor(&self) -> &Regressor {
        &self.regressor
    }
}

impl Estimator for RegressionPipeline {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<(), ModelError> {
        match self.scaler.as_mut() {
            Some(scaler) => {
                let scaled = scaler.fit_transform(x)?;
                self.regressor.fit(scaled.view(), y)
            }
            None => self.regressor.fit(x, y),
        }
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, ModelError> {
        match self.scaler.as_ref() {
            Some(scaler) => {
                let scaled = scaler.transform(x)?;
                self.regressor.predict(scaled.view())
            }
            None => self.regressor.predict(x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_parse_ridge_spec() {
        let spec: ModelSpec =
            serde_json::from_str(r#"{"type": "ridge", "alpha": 0.5}"#).unwrap();
        assert_eq!(spec.model_type(), "ridge");
        assert!(spec.standardize);
        assert_eq!(
            spec.regressor,
            RegressorSpec::Ridge {
                alpha: 0.5,
                fit_intercept: true
            }
        );
    }

    #[test]
    fn test_parse_lasso_defaults() {
        let spec: ModelSpec =
            serde_json::from_str(r#"{"type": "lasso", "standardize": false}"#).unwrap();
        assert!(!spec.standardize);
        match spec.regressor {
            RegressorSpec::Lasso { alpha, max_iter, tol, .. } => {
                assert_eq!(alpha, 1.0);
                assert_eq!(max_iter, 1000);
                assert_eq!(tol, 1e-4);
            }
            other => panic!("unexpected regressor {other:?}"),
        }
    }

    #[test]
    fn test_unknown_model_type_rejected() {
        let parsed: Result<ModelSpec, _> = serde_json::from_str(r#"{"type": "xgboost"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_validate_negative_alpha() {
        let spec = ModelSpec {
            regressor: RegressorSpec::Lasso {
                alpha: -0.1,
                fit_intercept: true,
                max_iter: 10,
                tol: 1e-4,
            },
            standardize: true,
        };
        assert_eq!(spec.validate().unwrap_err(), ModelError::InvalidAlpha(-0.1));
    }

    #[test]
    fn test_default_spec_is_standardized_ridge() {
        let spec = ModelSpec::default();
        assert_eq!(spec.model_type(), "ridge");
        assert!(spec.build().scaler().is_some());
    }

    #[test]
    fn test_pipeline_fit_predict() {
        let x = array![[1.0, 100.0], [2.0, 300.0], [3.0, 200.0], [4.0, 500.0], [5.0, 400.0]];
        let y = array![3.0, 5.0, 7.0, 9.0, 11.0];

        let spec = ModelSpec {
            regressor: RegressorSpec::Linear { fit_intercept: true },
            standardize: true,
        };
        let mut pipeline = spec.create();
        pipeline.fit(x.view(), y.view()).unwrap();

        let preds = pipeline.predict(array![[6.0, 600.0]].view()).unwrap();
        assert_relative_eq!(preds[0], 13.0, epsilon = 1e-6);
    }

    #[test]
    fn test_fitted_pipeline_serde() {
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![1.0, 2.0, 3.0];
        let mut pipeline = ModelSpec::default().build();
        pipeline.fit(x.view(), y.view()).unwrap();

        let json = serde_json::to_string(&pipeline).unwrap();
        let restored: RegressionPipeline = serde_json::from_str(&json).unwrap();
        let sample = array![[4.0]];
        assert_relative_eq!(
            restored.predict(sample.view()).unwrap()[0],
            pipeline.predict(sample.view()).unwrap()[0],
            epsilon = 1e-12
        );
    }
}
