//! Feature engineering building blocks

pub mod encodings;
pub mod sequence;
pub mod static_features;
pub mod statistics;

pub use sequence::{BehavioralFeatureBuilder, SequenceFeatures};
pub use static_features::{StaticFeatureBuilder, StaticFeatures};
