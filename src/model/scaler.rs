//! Per-column standardization.

use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use super::estimator::ModelError;

/// Columns with a standard deviation below this are left unscaled.
const MIN_SCALE: f64 = 1e-12;

/// Centers each column on its mean and divides by its population standard deviation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Option<Array1<f64>>,
    scales: Option<Array1<f64>>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn column means and scales.
    pub fn fit(&mut self, x: ArrayView2<'_, f64>) -> Result<(), ModelError> {
        if x.nrows() == 0 {
            return Err(ModelError::EmptyTrainingSet);
        }

        let means = x.mean_axis(Axis(0)).ok_or(ModelError::EmptyTrainingSet)?;
        let scales = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s < MIN_SCALE { 1.0 } else { s });

        self.means = Some(means);
        self.scales = Some(scales);
        Ok(())
    }

    /// Apply the learned transformation.
    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, ModelError> {
        let means = self.means.as_ref().ok_or(ModelError::NotFitted)?;
        let scales = self.scales.as_ref().ok_or(ModelError::NotFitted)?;

        if x.ncols() != means.len() {
            return Err(ModelError::DimensionMismatch {
                expected: means.len(),
                got: x.ncols(),
            });
        }

        let centered = &x - means;
        Ok(centered / scales)
    }

    pub fn fit_transform(&mut self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, ModelError> {
        self.fit(x)?;
        self.transform(x)
    }

    pub fn means(&self) -> Option<&Array1<f64>> {
        self.means.as_ref()
    }

    pub fn scales(&self) -> Option<&Array1<f64>> {
        self.scales.as_ref()
    }
}
