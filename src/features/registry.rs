//! Closed set of feature transforms selectable from configuration.
//!
//! Each kind is a variant of [`FeatureKind`]; an unknown `"type"` fails when
//! the configuration is parsed, before any data is touched.

use serde::{Deserialize, Serialize};

use crate::data::TimeSeriesTable;

use super::transforms;
use super::FeatureError;

fn default_lag() -> usize {
    1
}

fn default_alpha_col() -> String {
    "alpha".to_string()
}

fn default_alpha_lags() -> Vec<usize> {
    vec![1]
}

fn default_epsilon() -> f64 {
    1e-8
}

/// One feature definition, tagged by `"type"` in JSON.
///
/// ```json
/// { "type": "zscore", "column": "VIX", "window": 12 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeatureKind {
    /// `<column>_lag_<lag>`
    Lag { column: String, lag: usize },

    /// `<column>_diff_<lag>`
    Diff {
        column: String,
        #[serde(default = "default_lag")]
        lag: usize,
    },

    /// `<column>_rm_<window>`
    RollingMean { column: String, window: usize },

    /// `<column>_z_<window>`
    Zscore { column: String, window: usize },

    /// `<column>_mom_<window>`: percent change over the window.
    Momentum { column: String, window: usize },

    /// `<alpha_col>_lag<k>` for each lag and `<alpha_col>_ma<m>` for each
    /// moving-average length.
    LaggedAlpha {
        #[serde(default = "default_alpha_col")]
        alpha_col: String,
        #[serde(default = "default_alpha_lags")]
        lags: Vec<usize>,
        #[serde(default)]
        mas: Vec<usize>,
    },

    /// `<column>_latest_pct_change`
    LatestPctChange {
        column: String,
        #[serde(default = "default_epsilon")]
        epsilon: f64,
    },
}

impl FeatureKind {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Lag { .. } => "lag",
            Self::Diff { .. } => "diff",
            Self::RollingMean { .. } => "rolling_mean",
            Self::Zscore { .. } => "zscore",
            Self::Momentum { .. } => "momentum",
            Self::LaggedAlpha { .. } => "lagged_alpha",
            Self::LatestPctChange { .. } => "latest_pct_change",
        }
    }

    /// Column the transform reads.
    pub fn input_column(&self) -> &str {
        match self {
            Self::Lag { column, .. }
            | Self::Diff { column, .. }
            | Self::RollingMean { column, .. }
            | Self::Zscore { column, .. }
            | Self::Momentum { column, .. }
            | Self::LatestPctChange { column, .. } => column.as_str(),
            Self::LaggedAlpha { alpha_col, .. } => alpha_col.as_str(),
        }
    }

    /// Columns the transform writes, in insertion order.
    pub fn output_columns(&self) -> Vec<String> {
        match self {
            Self::Lag { column, lag } => vec![format!("{column}_lag_{lag}")],
            Self::Diff { column, lag } => vec![format!("{column}_diff_{lag}")],
            Self::RollingMean { column, window } => vec![format!("{column}_rm_{window}")],
            Self::Zscore { column, window } => vec![format!("{column}_z_{window}")],
            Self::Momentum { column, window } => vec![format!("{column}_mom_{window}")],
            Self::LaggedAlpha {
                alpha_col,
                lags,
                mas,
            } => lags
                .iter()
                .map(|k| format!("{alpha_col}_lag{k}"))
                .chain(mas.iter().map(|m| format!("{alpha_col}_ma{m}")))
                .collect(),
            Self::LatestPctChange { column, .. } => vec![format!("{column}_latest_pct_change")],
        }
    }

    /// Reject zero or oversized lags, zero windows and invalid thresholds.
    pub fn validate(&self) -> Result<(), FeatureError> {
        let positive = |name: &str, value: usize| {
            if value == 0 {
                Err(FeatureError::InvalidParameter(format!(
                    "{} feature on {}: {} must be positive",
                    self.kind(),
                    self.input_column(),
                    name
                )))
            } else {
                Ok(())
            }
        };
        let valid_lag = |lag: usize| {
            positive("lag", lag)?;
            shift_periods(lag).map(|_| ())
        };

        match self {
            Self::Lag { lag, .. } | Self::Diff { lag, .. } => valid_lag(*lag),
            Self::RollingMean { window, .. } | Self::Momentum { window, .. } => {
                positive("window", *window)
            }
            Self::Zscore { window, .. } => {
                if *window < 2 {
                    return Err(FeatureError::InvalidParameter(format!(
                        "zscore feature on {}: window must be at least 2, got {}",
                        self.input_column(),
                        window
                    )));
                }
                Ok(())
            }
            Self::LaggedAlpha { lags, mas, .. } => {
                lags.iter().try_for_each(|&k| valid_lag(k))?;
                mas.iter().try_for_each(|&m| positive("moving average", m))
            }
            Self::LatestPctChange { epsilon, .. } => {
                if *epsilon >= 0.0 && epsilon.is_finite() {
                    Ok(())
                } else {
                    Err(FeatureError::InvalidParameter(format!(
                        "latest_pct_change epsilon must be non-negative, got {epsilon}"
                    )))
                }
            }
        }
    }

    /// Compute the feature and write its columns into `table`.
    pub fn apply(&self, table: &mut TimeSeriesTable) -> Result<(), FeatureError> {
        let source = table.column(self.input_column())?;

        let computed: Vec<Vec<f64>> = match self {
            Self::Lag { lag, .. } => vec![transforms::shift(source, shift_periods(*lag)?)],
            Self::Diff { lag, .. } => vec![transforms::diff(source, *lag)],
            Self::RollingMean { window, .. } => vec![transforms::rolling_mean(source, *window)],
            Self::Zscore { window, .. } => vec![transforms::zscore(source, *window)],
            Self::Momentum { window, .. } => vec![transforms::pct_change(source, *window)],
            Self::LaggedAlpha { lags, mas, .. } => {
                let mut columns = lags
                    .iter()
                    .map(|&k| Ok(transforms::shift(source, shift_periods(k)?)))
                    .collect::<Result<Vec<_>, FeatureError>>()?;
                columns.extend(mas.iter().map(|&m| transforms::rolling_mean(source, m)));
                columns
            }
            Self::LatestPctChange { epsilon, .. } => {
                vec![transforms::latest_pct_change(source, *epsilon)]
            }
        };

        for (name, values) in self.output_columns().into_iter().zip(computed) {
            table.insert_column(name, values)?;
        }
        Ok(())
    }
}

/// Positive shift for a lag; lags beyond `isize::MAX` would wrap into leads.
fn shift_periods(lag: usize) -> Result<isize, FeatureError> {
    isize::try_from(lag)
        .map_err(|_| FeatureError::InvalidParameter(format!("lag {lag} is too large")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::data::Column;

    fn table() -> TimeSeriesTable {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dates = (0..6).map(|i| start + chrono::Duration::weeks(i)).collect();
        TimeSeriesTable::from_columns(
            dates,
            vec![
                Column::new("VIX", vec![10.0, 12.0, 11.0, 15.0, 14.0, 13.0]),
                Column::new("alpha", vec![0.01, -0.02, 0.0, 0.03, 0.01, -0.01]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_unknown_kind_rejected_at_parse() {
        let parsed: Result<FeatureKind, _> =
            serde_json::from_str(r#"{"type": "ewma", "column": "VIX", "window": 4}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_parse_defaults() {
        let diff: FeatureKind = serde_json::from_str(r#"{"type": "diff", "column": "VIX"}"#).unwrap();
        assert_eq!(
            diff,
            FeatureKind::Diff {
                column: "VIX".to_string(),
                lag: 1
            }
        );

        let alpha: FeatureKind = serde_json::from_str(r#"{"type": "lagged_alpha"}"#).unwrap();
        assert_eq!(alpha.output_columns(), vec!["alpha_lag1"]);
    }

    #[test]
    fn test_output_names() {
        let cases = [
            (r#"{"type": "lag", "column": "VIX", "lag": 2}"#, "VIX_lag_2"),
            (r#"{"type": "rolling_mean", "column": "VIX", "window": 4}"#, "VIX_rm_4"),
            (r#"{"type": "zscore", "column": "VIX", "window": 12}"#, "VIX_z_12"),
            (r#"{"type": "momentum", "column": "VIX", "window": 3}"#, "VIX_mom_3"),
            (r#"{"type": "latest_pct_change", "column": "CPI"}"#, "CPI_latest_pct_change"),
        ];
        for (json, expected) in cases {
            let kind: FeatureKind = serde_json::from_str(json).unwrap();
            assert_eq!(kind.output_columns(), vec![expected]);
        }
    }

    #[test]
    fn test_apply_lag_and_momentum() {
        let mut t = table();
        FeatureKind::Lag {
            column: "VIX".to_string(),
            lag: 1,
        }
        .apply(&mut t)
        .unwrap();
        FeatureKind::Momentum {
            column: "VIX".to_string(),
            window: 2,
        }
        .apply(&mut t)
        .unwrap();

        let lag = t.column("VIX_lag_1").unwrap();
        assert!(lag[0].is_nan());
        assert_eq!(&lag[1..], &[10.0, 12.0, 11.0, 15.0, 14.0]);

        let mom = t.column("VIX_mom_2").unwrap();
        assert!(mom[1].is_nan());
        assert!((mom[2] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_apply_lagged_alpha() {
        let mut t = table();
        FeatureKind::LaggedAlpha {
            alpha_col: "alpha".to_string(),
            lags: vec![1, 2],
            mas: vec![3],
        }
        .apply(&mut t)
        .unwrap();

        assert_eq!(
            t.column_names(),
            vec!["VIX", "alpha", "alpha_lag1", "alpha_lag2", "alpha_ma3"]
        );
        assert_eq!(t.column("alpha_lag2").unwrap()[2], 0.01);
        assert!((t.column("alpha_ma3").unwrap()[3] - 0.01 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let zero = FeatureKind::RollingMean {
            column: "VIX".to_string(),
            window: 0,
        };
        assert!(matches!(zero.validate(), Err(FeatureError::InvalidParameter(_))));

        let alpha = FeatureKind::LaggedAlpha {
            alpha_col: "alpha".to_string(),
            lags: vec![1, 0],
            mas: vec![],
        };
        assert!(alpha.validate().is_err());

        let zscore = FeatureKind::Zscore {
            column: "VIX".to_string(),
            window: 1,
        };
        assert!(zscore.validate().is_err());
    }

    #[test]
    fn test_oversized_lag_never_becomes_a_lead() {
        let huge = FeatureKind::Lag {
            column: "VIX".to_string(),
            lag: usize::MAX,
        };
        assert!(matches!(huge.validate(), Err(FeatureError::InvalidParameter(_))));

        let mut t = table();
        assert!(huge.apply(&mut t).is_err());
        assert!(!t.has_column(&format!("VIX_lag_{}", usize::MAX)));

        let alpha = FeatureKind::LaggedAlpha {
            alpha_col: "alpha".to_string(),
            lags: vec![1, usize::MAX],
            mas: vec![],
        };
        assert!(alpha.validate().is_err());
    }
}
