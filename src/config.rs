//! Configuration management for the payment predictor service

use crate::history::{EvictionPolicy, DEFAULT_MAX_RECORDS};
use crate::types::prediction::RiskRatioThresholds;
use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub prediction: PredictionConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming prediction requests
    pub request_subject: String,
    /// Subject for recorded payments
    pub payment_subject: String,
    /// Subject for outgoing predictions
    pub response_subject: String,
    /// Subject for portfolio forecast requests (request-reply)
    #[serde(default = "default_forecast_subject")]
    pub forecast_subject: String,
    /// Subject for customer risk requests (request-reply)
    #[serde(default = "default_customer_risk_subject")]
    pub customer_risk_subject: String,
}

fn default_forecast_subject() -> String {
    "invoices.forecast".to_string()
}

fn default_customer_risk_subject() -> String {
    "customers.risk".to_string()
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// JSON file with fitted scalers and feature names
    pub artifacts_path: String,
}

/// Fallback predictor settings
#[derive(Debug, Clone, Deserialize)]
pub struct PredictionConfig {
    /// Delay-ratio risk band boundaries
    #[serde(default)]
    pub risk_thresholds: RiskRatioThresholds,
    /// Maximum noise added to a prediction, in days
    #[serde(default = "default_jitter_days")]
    pub jitter_days: f64,
    /// Seed for reproducible noise; entropy when unset
    #[serde(default)]
    pub noise_seed: Option<u64>,
}

fn default_jitter_days() -> f64 {
    2.0
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            risk_thresholds: RiskRatioThresholds::default(),
            jitter_days: default_jitter_days(),
            noise_seed: None,
        }
    }
}

/// Payment history store settings
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_max_records")]
    pub max_records_per_company: usize,
    #[serde(default)]
    pub eviction: EvictionPolicy,
}

fn default_max_records() -> usize {
    DEFAULT_MAX_RECORDS
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_records_per_company: DEFAULT_MAX_RECORDS,
            eviction: EvictionPolicy::default(),
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum requests processed concurrently
    pub workers: usize,
    /// Seconds between metrics summaries
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,
}

fn default_report_interval() -> u64 {
    30
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                request_subject: "invoices.predict".to_string(),
                payment_subject: "payments.recorded".to_string(),
                response_subject: "invoices.predictions".to_string(),
                forecast_subject: default_forecast_subject(),
                customer_risk_subject: default_customer_risk_subject(),
            },
            model: ModelConfig {
                artifacts_path: "config/model_artifacts.json".to_string(),
            },
            prediction: PredictionConfig::default(),
            history: HistoryConfig::default(),
            pipeline: PipelineConfig {
                workers: 4,
                report_interval_secs: default_report_interval(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "json".to_string(),
            },
        }
    }
}
