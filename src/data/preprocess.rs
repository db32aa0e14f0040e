//! Weekly alignment of raw series.
//!
//! Raw inputs arrive at daily, weekly or monthly frequency. They are brought
//! onto a common Monday-labelled weekly grid, then merged into one table.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::types::{Column, TableError, TimeSeriesTable};

/// How values inside a weekly bin are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Last non-missing value in the bin.
    Last,
    /// Mean of the non-missing values in the bin.
    Mean,
}

/// Preprocessing applied to one raw input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResampleMethod {
    #[default]
    WeeklyLast,
    WeeklyMean,
    /// Keep the original dates and forward-fill gaps.
    Ffill,
}

impl ResampleMethod {
    pub fn apply(&self, table: &TimeSeriesTable) -> Result<TimeSeriesTable, TableError> {
        match self {
            Self::WeeklyLast => resample_weekly(table, Aggregation::Last),
            Self::WeeklyMean => resample_weekly(table, Aggregation::Mean),
            Self::Ffill => forward_fill(table),
        }
    }
}

/// Monday closing the week that contains `date`; a Monday maps to itself.
pub fn week_ending_monday(date: NaiveDate) -> NaiveDate {
    let offset = (7 - date.weekday().num_days_from_monday()) % 7;
    date + Duration::days(i64::from(offset))
}

/// Resample onto weekly bins labelled by their closing Monday.
///
/// Bins run contiguously from the first to the last label; bins without any
/// observation are NaN rows.
pub fn resample_weekly(
    table: &TimeSeriesTable,
    aggregation: Aggregation,
) -> Result<TimeSeriesTable, TableError> {
    let (Some(first), Some(last)) = (table.first_date(), table.last_date()) else {
        return Ok(table.clone());
    };

    let first_label = week_ending_monday(first);
    let n_bins = ((week_ending_monday(last) - first_label).num_days() / 7 + 1) as usize;
    let labels: Vec<NaiveDate> = (0..n_bins)
        .map(|i| first_label + Duration::weeks(i as i64))
        .collect();
    let bins: Vec<usize> = table
        .dates()
        .iter()
        .map(|d| ((week_ending_monday(*d) - first_label).num_days() / 7) as usize)
        .collect();

    let columns = table
        .columns()
        .iter()
        .map(|column| {
            let mut sums = vec![0.0; n_bins];
            let mut counts = vec![0usize; n_bins];
            let mut lasts = vec![f64::NAN; n_bins];

            for (&bin, &v) in bins.iter().zip(&column.values) {
                if v.is_nan() {
                    continue;
                }
                sums[bin] += v;
                counts[bin] += 1;
                lasts[bin] = v;
            }

            let values = match aggregation {
                Aggregation::Last => lasts,
                Aggregation::Mean => sums
                    .iter()
                    .zip(&counts)
                    .map(|(&s, &c)| if c == 0 { f64::NAN } else { s / c as f64 })
                    .collect(),
            };
            Column::new(column.name.clone(), values)
        })
        .collect();

    TimeSeriesTable::from_columns(labels, columns)
}

/// Carry the last observed value of each column forward over gaps.
///
/// Leading gaps stay missing.
pub fn forward_fill(table: &TimeSeriesTable) -> Result<TimeSeriesTable, TableError> {
    let mut filled = table.clone();
    for column in table.columns() {
        let mut last = f64::NAN;
        let values = column
            .values
            .iter()
            .map(|&v| {
                if !v.is_nan() {
                    last = v;
                }
                last
            })
            .collect();
        filled.insert_column(column.name.clone(), values)?;
    }
    Ok(filled)
}

/// Outer-join `tables` on date, later tables winning on duplicate column
/// names, then drop every row with a missing value.
pub fn merge_tables(tables: &[TimeSeriesTable]) -> TimeSeriesTable {
    let merged = tables
        .iter()
        .fold(TimeSeriesTable::default(), |acc, table| acc.outer_join(table));
    merged.drop_incomplete_rows()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_week_ending_monday() {
        // 2024-01-01 is a Monday
        assert_eq!(week_ending_monday(ymd(2024, 1, 1)), ymd(2024, 1, 1));
        assert_eq!(week_ending_monday(ymd(2024, 1, 2)), ymd(2024, 1, 8));
        assert_eq!(week_ending_monday(ymd(2024, 1, 7)), ymd(2024, 1, 8));
        assert_eq!(week_ending_monday(ymd(2023, 12, 31)), ymd(2024, 1, 1));
    }

    #[test]
    fn test_resample_last_and_mean() {
        let table = TimeSeriesTable::from_columns(
            vec![ymd(2024, 1, 2), ymd(2024, 1, 4), ymd(2024, 1, 5), ymd(2024, 1, 9)],
            vec![Column::new("px", vec![1.0, 2.0, f64::NAN, 5.0])],
        )
        .unwrap();

        let last = resample_weekly(&table, Aggregation::Last).unwrap();
        assert_eq!(last.dates(), &[ymd(2024, 1, 8), ymd(2024, 1, 15)]);
        assert_eq!(last.column("px").unwrap(), &[2.0, 5.0]);

        let mean = resample_weekly(&table, Aggregation::Mean).unwrap();
        assert_relative_eq!(mean.column("px").unwrap()[0], 1.5);
        assert_relative_eq!(mean.column("px").unwrap()[1], 5.0);
    }

    #[test]
    fn test_resample_empty_bins_are_missing() {
        let table = TimeSeriesTable::from_columns(
            vec![ymd(2024, 1, 1), ymd(2024, 1, 22)],
            vec![Column::new("m", vec![1.0, 2.0])],
        )
        .unwrap();

        let weekly = resample_weekly(&table, Aggregation::Last).unwrap();
        assert_eq!(weekly.len(), 4);
        let m = weekly.column("m").unwrap();
        assert_eq!(m[0], 1.0);
        assert!(m[1].is_nan() && m[2].is_nan());
        assert_eq!(m[3], 2.0);

        let filled = forward_fill(&weekly).unwrap();
        assert_eq!(filled.column("m").unwrap(), &[1.0, 1.0, 1.0, 2.0]);
    }

    #[test]
    fn test_forward_fill_keeps_leading_gap() {
        let table = TimeSeriesTable::from_columns(
            vec![ymd(2024, 1, 1), ymd(2024, 1, 8), ymd(2024, 1, 15)],
            vec![Column::new("x", vec![f64::NAN, 3.0, f64::NAN])],
        )
        .unwrap();
        let filled = ResampleMethod::Ffill.apply(&table).unwrap();
        let x = filled.column("x").unwrap();
        assert!(x[0].is_nan());
        assert_eq!(&x[1..], &[3.0, 3.0]);
    }

    #[test]
    fn test_merge_drops_incomplete_rows() {
        let a = TimeSeriesTable::from_columns(
            vec![ymd(2024, 1, 1), ymd(2024, 1, 8), ymd(2024, 1, 15)],
            vec![Column::new("a", vec![1.0, 2.0, 3.0])],
        )
        .unwrap();
        let b = TimeSeriesTable::from_columns(
            vec![ymd(2024, 1, 8), ymd(2024, 1, 15), ymd(2024, 1, 22)],
            vec![Column::new("b", vec![20.0, 30.0, 40.0])],
        )
        .unwrap();

        let merged = merge_tables(&[a, b]);
        assert_eq!(merged.dates(), &[ymd(2024, 1, 8), ymd(2024, 1, 15)]);
        assert_eq!(merged.column_names(), vec!["a", "b"]);
        assert_eq!(merged.column("b").unwrap(), &[20.0, 30.0]);
    }

    #[test]
    fn test_method_parses_snake_case() {
        let method: ResampleMethod = serde_json::from_str("\"weekly_mean\"").unwrap();
        assert_eq!(method, ResampleMethod::WeeklyMean);
        assert_eq!(ResampleMethod::default(), ResampleMethod::WeeklyLast);
    }
}
