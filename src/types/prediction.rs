//! Prediction result data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Risk band classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Classify by the ratio of predicted days to agreed payment terms
    pub fn from_delay_ratio(ratio: f64, thresholds: &RiskRatioThresholds) -> Self {
        if ratio <= thresholds.low {
            RiskLevel::Low
        } else if ratio > thresholds.high {
            RiskLevel::High
        } else {
            RiskLevel::Medium
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

/// Delay-ratio boundaries for risk banding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskRatioThresholds {
    /// Ratios at or below this are low risk
    pub low: f64,
    /// Ratios above this are high risk
    pub high: f64,
}

impl Default for RiskRatioThresholds {
    fn default() -> Self {
        Self {
            low: 1.1,
            high: 1.3,
        }
    }
}

/// Output of the fallback predictor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    /// Predicted days until payment, within [1, 120]
    pub predicted_days_to_payment: f64,
    /// Confidence in [0.6, 0.95]
    pub confidence_score: f64,
    /// Risk band
    pub risk_level: RiskLevel,
}

impl PredictionResult {
    /// Predicted days relative to the agreed payment terms
    pub fn delay_ratio(&self, payment_due_days: u32) -> f64 {
        self.predicted_days_to_payment / f64::from(payment_due_days.max(1))
    }
}

/// Outcome of handling one prediction request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    Ok,
    Unavailable,
}

/// Response published for every prediction request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResponse {
    /// Unique response identifier
    pub response_id: String,
    /// Correlation id copied from the request
    pub request_id: Option<String>,
    /// Invoice the prediction belongs to
    pub invoice_id: String,
    /// Customer the prediction belongs to
    pub customer_id: String,
    /// Whether a prediction was produced
    pub status: PredictionStatus,
    /// The prediction, present when status is ok
    pub prediction: Option<PredictionResult>,
    /// Predicted days / payment terms, present when status is ok
    pub delay_ratio: Option<f64>,
    /// Generic failure text, present when status is unavailable
    pub error: Option<String>,
    /// History records the prediction was based on
    pub company_history_records: usize,
    /// Version of the scaler artifacts used
    pub model_version: String,
    /// Response generation timestamp
    pub timestamp: DateTime<Utc>,
}

impl PredictionResponse {
    /// Successful prediction response
    pub fn ok(
        request_id: Option<String>,
        invoice_id: String,
        customer_id: String,
        prediction: PredictionResult,
        delay_ratio: f64,
    ) -> Self {
        Self {
            response_id: uuid::Uuid::new_v4().to_string(),
            request_id,
            invoice_id,
            customer_id,
            status: PredictionStatus::Ok,
            prediction: Some(prediction),
            delay_ratio: Some(delay_ratio),
            error: None,
            company_history_records: 0,
            model_version: String::new(),
            timestamp: Utc::now(),
        }
    }

    /// "Prediction unavailable" response; failure details stay in the logs
    pub fn unavailable(request_id: Option<String>, invoice_id: String, customer_id: String) -> Self {
        Self {
            response_id: uuid::Uuid::new_v4().to_string(),
            request_id,
            invoice_id,
            customer_id,
            status: PredictionStatus::Unavailable,
            prediction: None,
            delay_ratio: None,
            error: Some("prediction unavailable".to_string()),
            company_history_records: 0,
            model_version: String::new(),
            timestamp: Utc::now(),
        }
    }

    /// Attach history and model context
    pub fn with_context(mut self, company_history_records: usize, model_version: &str) -> Self {
        self.company_history_records = company_history_records;
        self.model_version = model_version.to_string();
        self
    }
}
