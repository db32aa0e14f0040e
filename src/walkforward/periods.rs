//! Walk-forward window generation.
//!
//! Generates (train, test) position ranges for rolling or expanding evaluation.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::errors::WalkForwardError;

/// How the training span evolves between windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    /// Fixed-size training span sliding forward.
    #[default]
    Rolling,
    /// Training span anchored at position 0, growing each step.
    Expanding,
}

/// A single walk-forward window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    /// Window number (0-indexed).
    pub index: usize,
    /// Positions used for fitting.
    pub train: Range<usize>,
    /// Positions predicted out of sample.
    pub test: Range<usize>,
}

impl Window {
    /// Get training span length in rows.
    pub fn train_len(&self) -> usize {
        self.train.len()
    }

    /// Get test span length in rows.
    pub fn test_len(&self) -> usize {
        self.test.len()
    }
}

fn default_train_window() -> usize {
    156
}

fn default_horizon() -> usize {
    4
}

/// Configuration for walk-forward windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkForwardConfig {
    /// Training rows per window; also the position of the first test row.
    #[serde(default = "default_train_window")]
    pub train_window: usize,
    /// Consecutive rows predicted per window.
    #[serde(default = "default_horizon")]
    pub horizon: usize,
    /// Grow the training span from position 0 instead of sliding it.
    #[serde(default)]
    pub expanding: bool,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            train_window: default_train_window(),
            horizon: default_horizon(),
            expanding: false,
        }
    }
}

impl WalkForwardConfig {
    /// Create a configuration for the given window mode.
    pub fn new(train_window: usize, horizon: usize, mode: WindowMode) -> Self {
        Self {
            train_window,
            horizon,
            expanding: mode == WindowMode::Expanding,
        }
    }

    /// Get the window mode encoded by `expanding`.
    pub fn mode(&self) -> WindowMode {
        if self.expanding {
            WindowMode::Expanding
        } else {
            WindowMode::Rolling
        }
    }

    /// Reject a zero `train_window` or `horizon`.
    pub fn validate(&self) -> Result<(), WalkForwardError> {
        if self.train_window == 0 {
            return Err(WalkForwardError::InvalidConfig(
                "train_window must be positive".to_string(),
            ));
        }
        if self.horizon == 0 {
            return Err(WalkForwardError::InvalidConfig(
                "horizon must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Generator for walk-forward windows over `n_rows` positions.
pub struct WindowScheduler {
    config: WalkForwardConfig,
    n_rows: usize,
}

impl WindowScheduler {
    /// Create a scheduler, rejecting zero-sized windows.
    pub fn new(config: WalkForwardConfig, n_rows: usize) -> Result<Self, WalkForwardError> {
        config.validate()?;
        Ok(Self { config, n_rows })
    }

    /// Generate all windows whose full test span fits in the table.
    ///
    /// Test spans start at `train_window` and advance by `horizon`. A trailing
    /// partial span is never emitted.
    pub fn generate(&self) -> Vec<Window> {
        let train_window = self.config.train_window;
        let horizon = self.config.horizon;
        let mode = self.config.mode();

        let mut windows = Vec::with_capacity(self.expected_windows());
        let mut start = train_window;

        while let Some(end) = start.checked_add(horizon).filter(|&end| end <= self.n_rows) {
            let train = match mode {
                WindowMode::Rolling => start - train_window..start,
                WindowMode::Expanding => 0..start,
            };

            windows.push(Window {
                index: windows.len(),
                train,
                test: start..end,
            });

            start = end;
        }

        windows
    }

    /// Number of windows `generate` will emit.
    pub fn expected_windows(&self) -> usize {
        if self.config.train_window >= self.n_rows {
            return 0;
        }
        (self.n_rows - self.config.train_window) / self.config.horizon
    }

    pub fn config(&self) -> &WalkForwardConfig {
        &self.config
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }
}
