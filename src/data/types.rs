//! Date-indexed table of numeric series.
//!
//! Every stage reads and writes a [`TimeSeriesTable`]: a strictly increasing
//! date index plus ordered named `f64` columns. Missing values are NaN.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("Dates must be strictly increasing: {previous} is followed by {next}")]
    UnorderedDates { previous: NaiveDate, next: NaiveDate },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Column {column} has {got} values for {expected} dates")]
    LengthMismatch {
        column: String,
        expected: usize,
        got: usize,
    },

    #[error("Missing value in column {column} on {date}")]
    MissingValue { column: String, date: NaiveDate },
}

/// A named numeric series aligned with the table's dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TimeSeriesTable {
    dates: Vec<NaiveDate>,
    columns: Vec<Column>,
}

impl TimeSeriesTable {
    /// Empty-column table over `dates`, which must be strictly increasing.
    pub fn new(dates: Vec<NaiveDate>) -> Result<Self, TableError> {
        if let Some(pair) = dates.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(TableError::UnorderedDates {
                previous: pair[0],
                next: pair[1],
            });
        }
        Ok(Self {
            dates,
            columns: Vec::new(),
        })
    }

    pub fn from_columns(dates: Vec<NaiveDate>, columns: Vec<Column>) -> Result<Self, TableError> {
        let mut table = Self::new(dates)?;
        for column in columns {
            table.insert_column(column.name, column.values)?;
        }
        Ok(table)
    }

    /// Sort rows by date; on duplicate dates the last row wins.
    pub fn from_unordered(dates: Vec<NaiveDate>, columns: Vec<Column>) -> Result<Self, TableError> {
        for column in &columns {
            check_length(&column.name, dates.len(), column.values.len())?;
        }

        let mut latest: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        for (row, date) in dates.iter().enumerate() {
            latest.insert(*date, row);
        }

        let rows: Vec<usize> = latest.values().copied().collect();
        let columns = columns
            .into_iter()
            .map(|c| Column::new(c.name, rows.iter().map(|&r| c.values[r]).collect()))
            .collect();

        Self::from_columns(latest.into_keys().collect(), columns)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Result<&[f64], TableError> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
            .ok_or_else(|| TableError::ColumnNotFound(name.to_string()))
    }

    /// Replace the column called `name`, or append it if absent.
    pub fn insert_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<(), TableError> {
        let name = name.into();
        check_length(&name, self.len(), values.len())?;

        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.values = values,
            None => self.columns.push(Column::new(name, values)),
        }
        Ok(())
    }

    /// Feature matrix with one column per name, in the given order.
    ///
    /// Any missing value is an error; no imputation happens here.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Array2<f64>, TableError> {
        let mut matrix = Array2::zeros((self.len(), names.len()));
        for (j, name) in names.iter().enumerate() {
            let values = self.complete_column(name.as_ref())?;
            for (i, &v) in values.iter().enumerate() {
                matrix[[i, j]] = v;
            }
        }
        Ok(matrix)
    }

    /// Target vector; any missing value is an error.
    pub fn target(&self, name: &str) -> Result<Array1<f64>, TableError> {
        Ok(Array1::from(self.complete_column(name)?.to_vec()))
    }

    /// Table restricted to `names`, keeping every row.
    pub fn project<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, TableError> {
        let columns = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.column(name).map(|values| Column::new(name, values.to_vec()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            dates: self.dates.clone(),
            columns,
        })
    }

    /// Drop every row with a missing value in any column.
    pub fn drop_incomplete_rows(&self) -> Self {
        let keep: Vec<usize> = (0..self.len())
            .filter(|&row| self.columns.iter().all(|c| !c.values[row].is_nan()))
            .collect();
        self.take_rows(&keep)
    }

    /// Keep this table's dates; append `other`'s columns not already present.
    ///
    /// Dates absent from `other` get NaN.
    pub fn left_join(&self, other: &Self) -> Self {
        let positions: BTreeMap<NaiveDate, usize> =
            other.dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();

        let mut joined = self.clone();
        for column in other.columns.iter().filter(|c| !self.has_column(&c.name)) {
            let values = self
                .dates
                .iter()
                .map(|d| positions.get(d).map_or(f64::NAN, |&i| column.values[i]))
                .collect();
            joined.columns.push(Column::new(column.name.clone(), values));
        }
        joined
    }

    /// Union of both date indexes; `other` wins on duplicate column names.
    pub fn outer_join(&self, other: &Self) -> Self {
        let dates: Vec<NaiveDate> = self
            .dates
            .iter()
            .chain(&other.dates)
            .copied()
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        let positions: BTreeMap<NaiveDate, usize> =
            dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();

        let mut joined = Self {
            dates,
            columns: Vec::new(),
        };
        for source in [self, other] {
            for column in &source.columns {
                let mut values = vec![f64::NAN; joined.len()];
                for (date, &v) in source.dates.iter().zip(&column.values) {
                    values[positions[date]] = v;
                }
                match joined.columns.iter_mut().find(|c| c.name == column.name) {
                    Some(existing) => existing.values = values,
                    None => joined.columns.push(Column::new(column.name.clone(), values)),
                }
            }
        }
        joined
    }

    fn complete_column(&self, name: &str) -> Result<&[f64], TableError> {
        let values = self.column(name)?;
        if let Some(row) = values.iter().position(|v| v.is_nan()) {
            return Err(TableError::MissingValue {
                column: name.to_string(),
                date: self.dates[row],
            });
        }
        Ok(values)
    }

    fn take_rows(&self, rows: &[usize]) -> Self {
        Self {
            dates: rows.iter().map(|&r| self.dates[r]).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), rows.iter().map(|&r| c.values[r]).collect()))
                .collect(),
        }
    }
}

fn check_length(column: &str, expected: usize, got: usize) -> Result<(), TableError> {
    if expected != got {
        return Err(TableError::LengthMismatch {
            column: column.to_string(),
            expected,
            got,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn sample() -> TimeSeriesTable {
        TimeSeriesTable::from_columns(
            vec![date(1), date(8), date(15), date(22)],
            vec![
                Column::new("a", vec![1.0, 2.0, f64::NAN, 4.0]),
                Column::new("b", vec![10.0, 20.0, 30.0, 40.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_unordered_dates() {
        let err = TimeSeriesTable::new(vec![date(8), date(1)]).unwrap_err();
        assert_eq!(
            err,
            TableError::UnorderedDates {
                previous: date(8),
                next: date(1)
            }
        );
        assert!(TimeSeriesTable::new(vec![date(1), date(1)]).is_err());
    }

    #[test]
    fn test_from_unordered_sorts_and_keeps_last() {
        let table = TimeSeriesTable::from_unordered(
            vec![date(8), date(1), date(8)],
            vec![Column::new("a", vec![1.0, 2.0, 3.0])],
        )
        .unwrap();
        assert_eq!(table.dates(), &[date(1), date(8)]);
        assert_eq!(table.column("a").unwrap(), &[2.0, 3.0]);
    }

    #[test]
    fn test_insert_column_replaces_and_checks_length() {
        let mut table = sample();
        table.insert_column("a", vec![0.0; 4]).unwrap();
        assert_eq!(table.column_names(), vec!["a", "b"]);
        assert_eq!(table.column("a").unwrap(), &[0.0; 4]);

        let err = table.insert_column("c", vec![1.0]).unwrap_err();
        assert!(matches!(err, TableError::LengthMismatch { expected: 4, got: 1, .. }));
    }

    #[test]
    fn test_select_rejects_missing() {
        let table = sample();
        let err = table.select(&["b", "a"]).unwrap_err();
        assert_eq!(
            err,
            TableError::MissingValue {
                column: "a".to_string(),
                date: date(15)
            }
        );

        let matrix = table.select(&["b"]).unwrap();
        assert_eq!(matrix.shape(), &[4, 1]);
        assert_eq!(matrix[[3, 0]], 40.0);
    }

    #[test]
    fn test_drop_incomplete_rows() {
        let table = sample().drop_incomplete_rows();
        assert_eq!(table.dates(), &[date(1), date(8), date(22)]);
        assert_eq!(table.column("b").unwrap(), &[10.0, 20.0, 40.0]);
        assert_eq!(table.first_date(), Some(date(1)));
        assert_eq!(table.last_date(), Some(date(22)));
    }

    #[test]
    fn test_left_join_keeps_left_dates_and_columns() {
        let left = sample();
        let right = TimeSeriesTable::from_columns(
            vec![date(8), date(22), date(29)],
            vec![Column::new("b", vec![0.0; 3]), Column::new("c", vec![5.0, 6.0, 7.0])],
        )
        .unwrap();

        let joined = left.left_join(&right);
        assert_eq!(joined.len(), 4);
        assert_eq!(joined.column("b").unwrap(), left.column("b").unwrap());
        let c = joined.column("c").unwrap();
        assert!(c[0].is_nan());
        assert_eq!(c[1], 5.0);
        assert!(c[2].is_nan());
        assert_eq!(c[3], 6.0);
    }

    #[test]
    fn test_outer_join_unions_dates() {
        let left = TimeSeriesTable::from_columns(
            vec![date(1), date(8)],
            vec![Column::new("x", vec![1.0, 2.0])],
        )
        .unwrap();
        let right = TimeSeriesTable::from_columns(
            vec![date(8), date(15)],
            vec![Column::new("x", vec![20.0, 30.0]), Column::new("y", vec![3.0, 4.0])],
        )
        .unwrap();

        let joined = left.outer_join(&right);
        assert_eq!(joined.dates(), &[date(1), date(8), date(15)]);
        let x = joined.column("x").unwrap();
        assert!(x[0].is_nan());
        assert_eq!(&x[1..], &[20.0, 30.0]);
        let y = joined.column("y").unwrap();
        assert!(y[0].is_nan());
    }

    #[test]
    fn test_project_and_missing_column() {
        let table = sample();
        let projected = table.project(&["b"]).unwrap();
        assert_eq!(projected.column_names(), vec!["b"]);
        assert_eq!(
            table.project(&["zzz"]).unwrap_err(),
            TableError::ColumnNotFound("zzz".to_string())
        );
    }
}
