//! Pipeline stages.
//!
//! Each stage reads one JSON configuration file, pulls its input from the
//! previous stage's folder in the [`StageStore`](crate::data::StageStore) and
//! writes a timestamped output into its own folder:
//!
//! `preprocess` -> `features` -> `train` -> `dashboard`

pub mod clean;
pub mod dashboard;
pub mod features;
pub mod preprocess;
pub mod train;

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::{StoreError, TableError};
use crate::features::FeatureError;
use crate::model::ModelError;
use crate::walkforward::WalkForwardError;

pub use clean::{clean_stages, DEFAULT_STAGES};
pub use dashboard::{build_dashboard_table, run_dashboard, DashboardConfig};
pub use features::{run_features, FeaturesConfig};
pub use preprocess::{preprocess_tables, run_preprocess, PreprocessConfig, RawFileSpec};
pub use train::{run_train, train_on_table, SavedModel, TrainArtifacts, TrainConfig, TrainMetrics, TrainOutcome};

#[derive(Error, Debug)]
pub enum StageError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Table error: {0}")]
    Table(#[from] TableError),

    #[error("Feature error: {0}")]
    Feature(#[from] FeatureError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Walk-forward error: {0}")]
    WalkForward(#[from] WalkForwardError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Optional explicit filename for a stage input or output.
///
/// An absent or empty filename selects the default (latest input, or a
/// timestamped output).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FileSpec {
    #[serde(default)]
    pub filename: Option<String>,
}

impl FileSpec {
    pub fn named(filename: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
        }
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref().filter(|name| !name.is_empty())
    }
}

pub(crate) fn explicit_filename(spec: &Option<FileSpec>) -> Option<&str> {
    spec.as_ref().and_then(FileSpec::filename)
}

/// Parse a stage configuration file.
pub fn load_config<T: DeserializeOwned>(path: &Path) -> Result<T, StageError> {
    let text = fs::read_to_string(path)
        .map_err(|e| StageError::Config(format!("cannot read {}: {}", path.display(), e)))?;
    Ok(serde_json::from_str(&text)?)
}
