//! Raw series -> weekly merged table.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::data::{merge_tables, read_raw_csv, ResampleMethod, StageStore, TimeSeriesTable};

use super::{explicit_filename, FileSpec, StageError};

fn default_stage_name() -> String {
    "preprocessing".to_string()
}

/// One raw input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFileSpec {
    /// Label used in logs; defaults to the file name.
    #[serde(default)]
    pub name: Option<String>,
    pub filename: PathBuf,
    #[serde(default)]
    pub method: ResampleMethod,
}

impl RawFileSpec {
    pub fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.filename.display().to_string())
    }
}

/// Preprocessing stage configuration.
///
/// ```json
/// {
///   "stage_name": "preprocessing",
///   "raw_files": [
///     { "name": "prices", "filename": "data/raw/prices.csv" },
///     { "name": "cpi", "filename": "data/raw/cpi.csv", "method": "ffill" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessConfig {
    #[serde(default = "default_stage_name")]
    pub stage_name: String,
    pub raw_files: Vec<RawFileSpec>,
    #[serde(default)]
    pub output: Option<FileSpec>,
}

/// Read, align and merge every raw file. Relative paths resolve against `base`.
pub fn preprocess_tables(config: &PreprocessConfig, base: &Path) -> Result<TimeSeriesTable, StageError> {
    if config.raw_files.is_empty() {
        return Err(StageError::Config("raw_files must not be empty".to_string()));
    }

    let tables = config
        .raw_files
        .iter()
        .map(|raw| -> Result<TimeSeriesTable, StageError> {
            let table = read_raw_csv(&base.join(&raw.filename))?;
            let aligned = raw.method.apply(&table)?;
            info!(
                "{}: {} rows -> {} rows ({:?})",
                raw.label(),
                table.len(),
                aligned.len(),
                raw.method
            );
            Ok(aligned)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let merged = merge_tables(&tables);
    info!(
        "Merged {} inputs into {} complete rows x {} columns",
        tables.len(),
        merged.len(),
        merged.columns().len()
    );
    Ok(merged)
}

pub fn run_preprocess(
    store: &StageStore,
    config: &PreprocessConfig,
    base: &Path,
) -> Result<PathBuf, StageError> {
    let merged = preprocess_tables(config, base)?;
    Ok(store.save_table(&config.stage_name, &merged, explicit_filename(&config.output))?)
}
