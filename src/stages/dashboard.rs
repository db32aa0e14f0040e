//! Model predictions + selected preprocessing columns -> dashboard table.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::data::{StageStore, TimeSeriesTable};

use super::{explicit_filename, FileSpec, StageError};

fn default_stage_name() -> String {
    "dashboard".to_string()
}

fn default_model_stage() -> String {
    "model".to_string()
}

fn default_preproc_stage() -> String {
    "preprocessing".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_stage_name")]
    pub stage_name: String,
    #[serde(default = "default_model_stage")]
    pub model_stage: String,
    #[serde(default = "default_preproc_stage")]
    pub preproc_stage: String,
    /// Preprocessing columns to attach; empty means all of them.
    #[serde(default)]
    pub preproc_columns: Vec<String>,
    #[serde(default)]
    pub input_model: Option<FileSpec>,
    #[serde(default)]
    pub input_preproc: Option<FileSpec>,
    #[serde(default)]
    pub output: Option<FileSpec>,
}

/// Left-join `preproc` onto `model` by date.
///
/// Columns already in the model table are never overwritten.
pub fn build_dashboard_table(
    model: &TimeSeriesTable,
    preproc: &TimeSeriesTable,
    preproc_columns: &[String],
) -> Result<TimeSeriesTable, StageError> {
    let selected = if preproc_columns.is_empty() {
        preproc.clone()
    } else {
        preproc.project(preproc_columns)?
    };
    Ok(model.left_join(&selected))
}

pub fn run_dashboard(store: &StageStore, config: &DashboardConfig) -> Result<PathBuf, StageError> {
    let (model, _) = store.read_table(&config.model_stage, explicit_filename(&config.input_model))?;
    let (preproc, _) =
        store.read_table(&config.preproc_stage, explicit_filename(&config.input_preproc))?;

    let dashboard = build_dashboard_table(&model, &preproc, &config.preproc_columns)?;
    Ok(store.save_table(&config.stage_name, &dashboard, explicit_filename(&config.output))?)
}
