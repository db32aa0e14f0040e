//! Walk-forward evaluation module.
//!
//! Implements leakage-safe backtesting of a regression model:
//! - Window generation: rolling or expanding train span, fixed test horizon
//! - Evaluation: fresh estimator per window, predictions written at their original positions
//! - Explicit final fit on the full dataset

pub mod errors;
pub mod evaluator;
pub mod periods;

pub use errors::WalkForwardError;
pub use evaluator::{OosResult, WalkForwardEvaluator};
pub use periods::{WalkForwardConfig, Window, WindowMode, WindowScheduler};
