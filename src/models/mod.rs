//! Model-side components: artifacts, scaling, inference and aggregation

pub mod aggregator;
pub mod inference;
pub mod loader;
pub mod scaler;

pub use aggregator::RiskAggregator;
pub use inference::{FixedNoise, InferenceEngine, NoiseSource, PredictionHeuristic, RandomNoise};
pub use loader::{ModelArtifacts, ModelLoader};
pub use scaler::{RobustScaler, ScalerParameters};
