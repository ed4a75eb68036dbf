//! Invoice Payment Predictor Library
//!
//! Feature engineering over invoices and customer payment history, robust
//! scaling against exported model artifacts, and a fallback days-to-payment
//! predictor with risk banding

pub mod config;
pub mod consumer;
pub mod error;
pub mod feature_extractor;
pub mod features;
pub mod history;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod producer;
pub mod types;

pub use config::AppConfig;
pub use consumer::PredictionConsumer;
pub use error::{FeatureError, FeatureResult};
pub use feature_extractor::FeatureExtractor;
pub use history::{CompanyHistoryStore, EvictionPolicy};
pub use models::inference::InferenceEngine;
pub use pipeline::PredictionPipeline;
pub use producer::PredictionProducer;
pub use types::{InvoiceFeatureInput, PaymentRecord, PredictionResponse, PredictionResult};
