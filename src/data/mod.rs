//! Data module.
//!
//! Provides:
//! - `TimeSeriesTable`, the date-indexed table every stage exchanges
//! - Staged CSV/JSON store with latest-file input resolution
//! - Weekly resampling, forward fill and merging of raw series

pub mod preprocess;
pub mod store;
pub mod types;

pub use preprocess::{
    forward_fill, merge_tables, resample_weekly, week_ending_monday, Aggregation, ResampleMethod,
};
pub use store::{
    read_csv, read_raw_csv, timestamped_filename, write_csv, StageStore, StoreError, DATE_COLUMN,
};
pub use types::{Column, TableError, TimeSeriesTable};
