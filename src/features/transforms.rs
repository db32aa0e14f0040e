//! Column transforms over NaN-marked series.
//!
//! Rolling statistics need a full window of observations; any missing value
//! inside the window makes the output missing.

use statrs::statistics::Statistics;

/// Shift by `periods` rows; positive lags, negative leads.
pub fn shift(values: &[f64], periods: isize) -> Vec<f64> {
    let n = values.len() as isize;
    (0..n)
        .map(|t| {
            let source = t - periods;
            if (0..n).contains(&source) {
                values[source as usize]
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// `x[t] - x[t - lag]`.
pub fn diff(values: &[f64], lag: usize) -> Vec<f64> {
    lagged_map(values, lag, |current, previous| current - previous)
}

/// `x[t] / x[t - periods] - 1`; a non-finite ratio is missing.
pub fn pct_change(values: &[f64], periods: usize) -> Vec<f64> {
    lagged_map(values, periods, |current, previous| {
        let change = current / previous - 1.0;
        if change.is_finite() {
            change
        } else {
            f64::NAN
        }
    })
}

/// Simple return realised over the next row, aligned at `t`.
pub fn forward_return(values: &[f64]) -> Vec<f64> {
    shift(&pct_change(values, 1), -1)
}

pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, |w| w.iter().mean())
}

/// Rolling sample standard deviation (n - 1 divisor).
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, |w| w.iter().std_dev())
}

/// Rolling sample variance (n - 1 divisor).
pub fn rolling_var(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, |w| w.iter().variance())
}

/// Rolling sample covariance of two aligned series.
pub fn rolling_cov(a: &[f64], b: &[f64], window: usize) -> Vec<f64> {
    debug_assert_eq!(a.len(), b.len());
    (0..a.len().min(b.len()))
        .map(|t| {
            if window == 0 || t + 1 < window {
                return f64::NAN;
            }
            let wa = &a[t + 1 - window..=t];
            let wb = &b[t + 1 - window..=t];
            if wa.iter().chain(wb).any(|v| v.is_nan()) {
                return f64::NAN;
            }
            wa.iter().covariance(wb.iter())
        })
        .collect()
}

/// `(x - rolling_mean) / rolling_std`; missing where the window is constant.
pub fn zscore(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, |w| {
        let last = w[w.len() - 1];
        if w.iter().all(|&v| v == last) {
            return f64::NAN;
        }
        (last - w.iter().mean()) / w.iter().std_dev()
    })
}

/// Most recent one-row percentage change larger than `epsilon` in magnitude,
/// carried forward until the next such change.
pub fn latest_pct_change(values: &[f64], epsilon: f64) -> Vec<f64> {
    let mut latest = f64::NAN;
    pct_change(values, 1)
        .into_iter()
        .map(|change| {
            if change.abs() > epsilon {
                latest = change;
            }
            latest
        })
        .collect()
}

fn lagged_map(values: &[f64], lag: usize, f: impl Fn(f64, f64) -> f64) -> Vec<f64> {
    (0..values.len())
        .map(|t| {
            if lag == 0 || t < lag {
                return f64::NAN;
            }
            f(values[t], values[t - lag])
        })
        .collect()
}

fn rolling(values: &[f64], window: usize, stat: impl Fn(&[f64]) -> f64) -> Vec<f64> {
    (0..values.len())
        .map(|t| {
            if window == 0 || t + 1 < window {
                return f64::NAN;
            }
            let w = &values[t + 1 - window..=t];
            if w.iter().any(|v| v.is_nan()) {
                f64::NAN
            } else {
                stat(w)
            }
        })
        .collect()
}
