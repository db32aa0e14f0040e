//! Staged CSV/JSON file store.
//!
//! Every pipeline stage owns a folder under the data root:
//! `<root>/<stage>/<stage>_<YYYYmmdd_HHMMSS>.csv`. Readers take the
//! lexicographically latest file unless a filename is given.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use polars::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use super::types::{Column, TableError, TimeSeriesTable};

/// Header written for the date index.
pub const DATE_COLUMN: &str = "Date";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("No {stage} files found in {dir}")]
    NoStageFiles { stage: String, dir: String },

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("Table error: {0}")]
    Table(#[from] TableError),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Root of the staged data layout.
#[derive(Debug, Clone)]
pub struct StageStore {
    root: PathBuf,
}

impl StageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stage_dir(&self, stage: &str) -> PathBuf {
        self.root.join(stage)
    }

    /// Write `table` into the stage folder and return the written path.
    ///
    /// Without a filename the file is named `<stage>_<YYYYmmdd_HHMMSS>.csv`.
    pub fn save_table(
        &self,
        stage: &str,
        table: &TimeSeriesTable,
        filename: Option<&str>,
    ) -> Result<PathBuf, StoreError> {
        let dir = self.stage_dir(stage);
        fs::create_dir_all(&dir)?;

        let filename = match filename {
            Some(name) => name.to_string(),
            None => timestamped_filename(stage, "csv"),
        };
        let path = dir.join(filename);

        write_csv(&path, table)?;
        info!(
            "Saved {} rows x {} columns to {}",
            table.len(),
            table.columns().len(),
            path.display()
        );
        Ok(path)
    }

    /// Path of the stage input: `filename` if given, else the latest `<stage>*.csv`.
    pub fn resolve_input(&self, stage: &str, filename: Option<&str>) -> Result<PathBuf, StoreError> {
        let dir = self.stage_dir(stage);

        if let Some(name) = filename {
            let path = dir.join(name);
            if !path.exists() {
                return Err(StoreError::FileNotFound(path.display().to_string()));
            }
            return Ok(path);
        }

        let mut candidates = Vec::new();
        if dir.exists() {
            for entry in fs::read_dir(&dir)? {
                let name = entry?.file_name().to_string_lossy().to_string();
                if name.starts_with(stage) && name.ends_with(".csv") {
                    candidates.push(name);
                }
            }
        }
        candidates.sort();

        candidates
            .pop()
            .map(|name| dir.join(name))
            .ok_or_else(|| StoreError::NoStageFiles {
                stage: stage.to_string(),
                dir: dir.display().to_string(),
            })
    }

    /// Read a stage table and the path it came from.
    pub fn read_table(
        &self,
        stage: &str,
        filename: Option<&str>,
    ) -> Result<(TimeSeriesTable, PathBuf), StoreError> {
        let path = self.resolve_input(stage, filename)?;
        let table = read_csv(&path)?;
        info!(
            "Loaded {} rows x {} columns from {}",
            table.len(),
            table.columns().len(),
            path.display()
        );
        Ok((table, path))
    }

    /// Pretty-print `value` as JSON into the stage folder.
    pub fn write_json<T: Serialize>(
        &self,
        stage: &str,
        filename: &str,
        value: &T,
    ) -> Result<PathBuf, StoreError> {
        let dir = self.stage_dir(stage);
        fs::create_dir_all(&dir)?;
        let path = dir.join(filename);
        fs::write(&path, serde_json::to_string_pretty(value)?)?;
        info!("Wrote {}", path.display());
        Ok(path)
    }

    /// Delete every entry of the stage folder; returns how many were removed.
    pub fn clean_stage(&self, stage: &str) -> Result<usize, StoreError> {
        let dir = self.stage_dir(stage);
        if !dir.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
            debug!("Removed {}", path.display());
            removed += 1;
        }
        info!("Cleaned {} entries from {}", removed, dir.display());
        Ok(removed)
    }
}

/// `<stage>_<YYYYmmdd_HHMMSS>.<extension>` in local time.
pub fn timestamped_filename(stage: &str, extension: &str) -> String {
    format!("{}_{}.{}", stage, Local::now().format("%Y%m%d_%H%M%S"), extension)
}

/// Read a raw input CSV whose first column holds dates.
///
/// Rows may arrive unsorted or with repeated dates; the last row per date wins.
pub fn read_raw_csv(path: &Path) -> Result<TimeSeriesTable, StoreError> {
    let (dates, columns) = load_frame(path)?;
    Ok(TimeSeriesTable::from_unordered(dates, columns)?)
}

/// Read a stage CSV; dates must already be strictly increasing.
pub fn read_csv(path: &Path) -> Result<TimeSeriesTable, StoreError> {
    let (dates, columns) = load_frame(path)?;
    Ok(TimeSeriesTable::from_columns(dates, columns)?)
}

/// Write `table` with the date index first; NaN is written as an empty field.
pub fn write_csv(path: &Path, table: &TimeSeriesTable) -> Result<(), StoreError> {
    let mut series = Vec::with_capacity(table.columns().len() + 1);
    series.push(Series::new(
        DATE_COLUMN,
        table
            .dates()
            .iter()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .collect::<Vec<_>>(),
    ));
    for column in table.columns() {
        let values: Vec<Option<f64>> = column
            .values
            .iter()
            .map(|v| (!v.is_nan()).then_some(*v))
            .collect();
        series.push(Series::new(&column.name, values));
    }

    let mut df = DataFrame::new(series)?;
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;
    Ok(())
}

fn load_frame(path: &Path) -> Result<(Vec<NaiveDate>, Vec<Column>), StoreError> {
    if !path.exists() {
        return Err(StoreError::FileNotFound(path.display().to_string()));
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let mut series = df.get_columns().iter();
    let date_series = series
        .next()
        .ok_or_else(|| StoreError::InvalidData(format!("{} has no columns", path.display())))?;
    let dates = parse_dates(date_series)?;

    let columns = series
        .map(|s| {
            let values = s
                .cast(&DataType::Float64)?
                .f64()?
                .into_iter()
                .map(|v| v.unwrap_or(f64::NAN))
                .collect();
            Ok(Column::new(s.name(), values))
        })
        .collect::<Result<Vec<_>, StoreError>>()?;

    debug!("Parsed {} rows from {}", dates.len(), path.display());
    Ok((dates, columns))
}

/// Dates in `YYYY-MM-DD` form, optionally followed by a time part.
fn parse_dates(series: &Series) -> Result<Vec<NaiveDate>, StoreError> {
    let strings = series.cast(&DataType::String)?;
    strings
        .str()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            let value = value.ok_or_else(|| {
                StoreError::InvalidData(format!("Missing date in row {}", row + 1))
            })?;
            let day = value.get(..10).unwrap_or(value);
            NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| {
                StoreError::InvalidData(format!("Invalid date '{}' in row {}: {}", value, row + 1, e))
            })
        })
        .collect()
}
