//! Linear regressors: ordinary least squares, Ridge (L2) and Lasso (L1).
//!
//! All three center the data when fitting an intercept and recover the
//! intercept afterwards as `mean(y) - mean(x) · coefficients`.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use super::estimator::{Estimator, ModelError};

/// Diagonal jitter added to the OLS normal equations.
const OLS_JITTER: f64 = 1e-10;

/// Learned parameters shared by every linear regressor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedLinear {
    pub coefficients: Array1<f64>,
    pub intercept: f64,
}

impl FittedLinear {
    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, ModelError> {
        if x.ncols() != self.coefficients.len() {
            return Err(ModelError::DimensionMismatch {
                expected: self.coefficients.len(),
                got: x.ncols(),
            });
        }
        Ok(x.dot(&self.coefficients) + self.intercept)
    }
}

/// Ordinary least squares via the normal equations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    fit_intercept: bool,
    fitted: Option<FittedLinear>,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new(true)
    }
}

impl LinearRegression {
    pub fn new(fit_intercept: bool) -> Self {
        Self {
            fit_intercept,
            fitted: None,
        }
    }

    pub fn fitted(&self) -> Option<&FittedLinear> {
        self.fitted.as_ref()
    }
}

impl Estimator for LinearRegression {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<(), ModelError> {
        let data = CenteredData::new(x, y, self.fit_intercept)?;

        let mut xtx = data.x.t().dot(&data.x);
        for i in 0..xtx.nrows() {
            xtx[[i, i]] += OLS_JITTER;
        }
        let xty = data.x.t().dot(&data.y);

        let coefficients = cholesky_solve(&xtx, &xty)?;
        self.fitted = Some(data.finish(coefficients));
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, ModelError> {
        self.fitted.as_ref().ok_or(ModelError::NotFitted)?.predict(x)
    }
}

/// Ridge regression.
///
/// Minimizes: ||y - Xβ||² + α||β||²
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RidgeRegression {
    alpha: f64,
    fit_intercept: bool,
    fitted: Option<FittedLinear>,
}

impl Default for RidgeRegression {
    fn default() -> Self {
        Self::new(1.0, true)
    }
}

impl RidgeRegression {
    pub fn new(alpha: f64, fit_intercept: bool) -> Self {
        Self {
            alpha,
            fit_intercept,
            fitted: None,
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn fitted(&self) -> Option<&FittedLinear> {
        self.fitted.as_ref()
    }
}

impl Estimator for RidgeRegression {
    /// Closed form: β = (X'X + αI)^(-1) X'y
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<(), ModelError> {
        if !(self.alpha >= 0.0) {
            return Err(ModelError::InvalidAlpha(self.alpha));
        }
        let data = CenteredData::new(x, y, self.fit_intercept)?;

        let mut xtx = data.x.t().dot(&data.x);
        for i in 0..xtx.nrows() {
            xtx[[i, i]] += self.alpha;
        }
        let xty = data.x.t().dot(&data.y);

        let coefficients = cholesky_solve(&xtx, &xty)?;
        self.fitted = Some(data.finish(coefficients));
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, ModelError> {
        self.fitted.as_ref().ok_or(ModelError::NotFitted)?.predict(x)
    }
}

/// Lasso regression fitted by cyclic coordinate descent.
///
/// Minimizes: (1/2n)||y - Xβ||² + α||β||₁
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LassoRegression {
    alpha: f64,
    fit_intercept: bool,
    max_iter: usize,
    tol: f64,
    fitted: Option<FittedLinear>,
}

impl Default for LassoRegression {
    fn default() -> Self {
        Self::new(1.0, true, 1000, 1e-4)
    }
}

impl LassoRegression {
    pub fn new(alpha: f64, fit_intercept: bool, max_iter: usize, tol: f64) -> Self {
        Self {
            alpha,
            fit_intercept,
            max_iter,
            tol,
            fitted: None,
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn fitted(&self) -> Option<&FittedLinear> {
        self.fitted.as_ref()
    }
}

impl Estimator for LassoRegression {
    fn fit(&mut self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<(), ModelError> {
        if !(self.alpha >= 0.0) {
            return Err(ModelError::InvalidAlpha(self.alpha));
        }
        let data = CenteredData::new(x, y, self.fit_intercept)?;

        let n_samples = data.x.nrows() as f64;
        let n_features = data.x.ncols();
        let threshold = n_samples * self.alpha;

        let col_sq: Vec<f64> = data
            .x
            .columns()
            .into_iter()
            .map(|col| col.dot(&col))
            .collect();

        let mut coef = Array1::<f64>::zeros(n_features);
        let mut residual = data.y.clone();

        for _ in 0..self.max_iter {
            let mut max_update = 0.0_f64;

            for j in 0..n_features {
                if col_sq[j] == 0.0 {
                    continue;
                }
                let column = data.x.column(j);
                let old = coef[j];
                let rho = column.dot(&residual) + col_sq[j] * old;
                let new = soft_threshold(rho, threshold) / col_sq[j];

                if new != old {
                    residual.scaled_add(old - new, &column);
                    coef[j] = new;
                    max_update = max_update.max((new - old).abs());
                }
            }

            if max_update < self.tol {
                break;
            }
        }

        self.fitted = Some(data.finish(coef));
        Ok(())
    }

    fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<f64>, ModelError> {
        self.fitted.as_ref().ok_or(ModelError::NotFitted)?.predict(x)
    }
}

/// Training data, centered when an intercept is fitted.
struct CenteredData {
    x: Array2<f64>,
    y: Array1<f64>,
    x_mean: Array1<f64>,
    y_mean: f64,
}

impl CenteredData {
    fn new(
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, f64>,
        fit_intercept: bool,
    ) -> Result<Self, ModelError> {
        if x.nrows() != y.len() {
            return Err(ModelError::DimensionMismatch {
                expected: x.nrows(),
                got: y.len(),
            });
        }
        if x.nrows() == 0 {
            return Err(ModelError::EmptyTrainingSet);
        }

        if !fit_intercept {
            return Ok(Self {
                x: x.to_owned(),
                y: y.to_owned(),
                x_mean: Array1::zeros(x.ncols()),
                y_mean: 0.0,
            });
        }

        let x_mean = x.mean_axis(Axis(0)).ok_or(ModelError::EmptyTrainingSet)?;
        let y_mean = y.mean().ok_or(ModelError::EmptyTrainingSet)?;
        Ok(Self {
            x: &x - &x_mean,
            y: &y - y_mean,
            x_mean,
            y_mean,
        })
    }

    fn finish(self, coefficients: Array1<f64>) -> FittedLinear {
        let intercept = self.y_mean - self.x_mean.dot(&coefficients);
        FittedLinear {
            coefficients,
            intercept,
        }
    }
}

fn soft_threshold(value: f64, threshold: f64) -> f64 {
    if value > threshold {
        value - threshold
    } else if value < -threshold {
        value + threshold
    } else {
        0.0
    }
}

/// Solve `a · x = b` for symmetric positive definite `a`.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>, ModelError> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    // A = L * L^T
    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }

            if i == j {
                let diag = a[[i, i]] - sum;
                if !(diag > 0.0) {
                    return Err(ModelError::SingularMatrix);
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // Forward substitution: L * z = b
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * z[j];
        }
        z[i] = (b[i] - sum) / l[[i, i]];
    }

    // Backward substitution: L^T * x = z
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (z[i] - sum) / l[[i, i]];
    }

    Ok(x)
}
