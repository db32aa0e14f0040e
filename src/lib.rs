pub mod data;
pub mod features;
pub mod metrics;
pub mod model;
pub mod stages;
pub mod walkforward;

// Re-export commonly used types
pub use data::{StageStore, TimeSeriesTable};
pub use features::{FeatureKind, FeatureSet, TargetSpec};
pub use metrics::{MetricsCalculator, MetricsReport};
pub use model::{Estimator, EstimatorFactory, ModelSpec, RegressionPipeline};
pub use stages::{TrainConfig, TrainMetrics};
pub use walkforward::{OosResult, WalkForwardConfig, WalkForwardEvaluator, WindowMode, WindowScheduler};
