//! Cash-flow forecast and customer risk messages

use crate::features::statistics::round_to;
use crate::types::invoice::InvoiceFeatureInput;
use crate::types::prediction::{PredictionResult, PredictionStatus, RiskLevel};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Forecast request covering several open invoices
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastRequest {
    #[serde(default, alias = "request_id")]
    pub request_id: Option<String>,

    /// Invoices to forecast, possibly for different customers
    #[serde(default)]
    pub invoices: Vec<InvoiceFeatureInput>,
}

/// Forecast for a single invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastEntry {
    pub invoice_id: String,
    pub customer_id: String,
    pub amount: f64,
    pub predicted_days: f64,
    pub risk_level: RiskLevel,
    /// `now` plus the predicted days
    pub expected_payment_date: DateTime<Utc>,
}

impl ForecastEntry {
    pub fn new(
        invoice: &InvoiceFeatureInput,
        prediction: &PredictionResult,
        now: DateTime<Utc>,
    ) -> Self {
        let seconds = (prediction.predicted_days_to_payment * 86_400.0).round() as i64;
        Self {
            invoice_id: invoice.invoice_id.clone(),
            customer_id: invoice.customer_id.clone(),
            amount: invoice.amount,
            predicted_days: prediction.predicted_days_to_payment,
            risk_level: prediction.risk_level,
            expected_payment_date: now + Duration::seconds(seconds),
        }
    }
}

/// Invoice counts per risk band
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskDistribution {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl RiskDistribution {
    pub fn add(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::Low => self.low += 1,
            RiskLevel::Medium => self.medium += 1,
            RiskLevel::High => self.high += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.low + self.medium + self.high
    }
}

/// Portfolio forecast answered for a `ForecastRequest`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastSummary {
    pub response_id: String,
    pub request_id: Option<String>,
    pub status: PredictionStatus,
    /// Sum of forecasted invoice amounts
    pub total_amount: f64,
    /// Number of invoices forecasted
    pub total_invoices: usize,
    /// Mean predicted days, one decimal
    pub average_predicted_days: f64,
    pub risk_distribution: RiskDistribution,
    /// Forecasts in request order
    pub individual_forecasts: Vec<ForecastEntry>,
    /// Invoices no prediction could be made for
    #[serde(default)]
    pub unavailable: Vec<String>,
    pub error: Option<String>,
    pub model_version: String,
    pub generated_at: DateTime<Utc>,
}

impl ForecastSummary {
    /// Totals and distribution over the produced forecasts
    pub fn from_entries(
        request_id: Option<String>,
        entries: Vec<ForecastEntry>,
        unavailable: Vec<String>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let mut distribution = RiskDistribution::default();
        let mut total_amount = 0.0;
        let mut total_days = 0.0;
        for entry in &entries {
            distribution.add(entry.risk_level);
            total_amount += entry.amount;
            total_days += entry.predicted_days;
        }
        let average_predicted_days = if entries.is_empty() {
            0.0
        } else {
            round_to(total_days / entries.len() as f64, 1)
        };

        let (status, error) = if entries.is_empty() {
            (PredictionStatus::Unavailable, Some("forecast unavailable".to_string()))
        } else {
            (PredictionStatus::Ok, None)
        };

        Self {
            response_id: uuid::Uuid::new_v4().to_string(),
            request_id,
            status,
            total_amount,
            total_invoices: entries.len(),
            average_predicted_days,
            risk_distribution: distribution,
            individual_forecasts: entries,
            unavailable,
            error,
            model_version: String::new(),
            generated_at,
        }
    }

    pub fn with_model_version(mut self, model_version: &str) -> Self {
        self.model_version = model_version.to_string();
        self
    }
}

/// Request for a customer's behavioural risk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRiskRequest {
    #[serde(default, alias = "request_id")]
    pub request_id: Option<String>,
    #[serde(alias = "customer_id")]
    pub customer_id: String,
}

/// Behavioural features behind a risk assessment, three decimals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyFeatureSummary {
    pub efficiency: f64,
    pub consistency: f64,
    pub trend: f64,
}

/// Reply to a `CustomerRiskRequest`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRiskResponse {
    pub response_id: String,
    pub request_id: Option<String>,
    pub customer_id: String,
    pub status: PredictionStatus,
    pub risk_level: Option<RiskLevel>,
    /// 0 (best) to 100 (worst), one decimal
    pub risk_score: Option<f64>,
    pub average_delay_days: Option<f64>,
    pub payment_reliability: Option<f64>,
    pub history_records: usize,
    pub company_features: Option<CompanyFeatureSummary>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl CustomerRiskResponse {
    /// Assessment that could not be computed; details stay in the logs
    pub fn unavailable(
        request_id: Option<String>,
        customer_id: String,
        history_records: usize,
    ) -> Self {
        Self {
            response_id: uuid::Uuid::new_v4().to_string(),
            request_id,
            customer_id,
            status: PredictionStatus::Unavailable,
            risk_level: None,
            risk_score: None,
            average_delay_days: None,
            payment_reliability: None,
            history_records,
            company_features: None,
            error: Some("risk assessment unavailable".to_string()),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(id: &str, amount: f64, days: f64, risk_level: RiskLevel) -> ForecastEntry {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
        let invoice = InvoiceFeatureInput::new(id, "acme", amount, 30, 700.0);
        let prediction = PredictionResult {
            predicted_days_to_payment: days,
            confidence_score: 0.8,
            risk_level,
        };
        ForecastEntry::new(&invoice, &prediction, now)
    }

    #[test]
    fn test_expected_payment_date() {
        let forecast = entry("inv-1", 1_000.0, 12.5, RiskLevel::Low);
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
        assert_eq!(forecast.expected_payment_date, now + Duration::hours(300));
    }

    #[test]
    fn test_summary_totals() {
        let now = Utc::now();
        let summary = ForecastSummary::from_entries(
            Some("req-1".to_string()),
            vec![
                entry("inv-1", 1_000.0, 20.0, RiskLevel::Low),
                entry("inv-2", 2_500.0, 35.0, RiskLevel::Medium),
                entry("inv-3", 500.0, 45.0, RiskLevel::High),
                entry("inv-4", 4_000.0, 26.0, RiskLevel::Low),
            ],
            vec!["inv-5".to_string()],
            now,
        );

        assert_eq!(summary.status, PredictionStatus::Ok);
        assert_eq!(summary.total_amount, 8_000.0);
        assert_eq!(summary.total_invoices, 4);
        assert_eq!(summary.average_predicted_days, 31.5);
        assert_eq!(
            summary.risk_distribution,
            RiskDistribution {
                low: 2,
                medium: 1,
                high: 1
            }
        );
        assert_eq!(summary.risk_distribution.total(), summary.total_invoices);
        assert_eq!(summary.unavailable, vec!["inv-5"]);
        assert_eq!(summary.generated_at, now);

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"riskDistribution\":{\"low\":2,\"medium\":1,\"high\":1}"));
        assert!(json.contains("\"individualForecasts\""));
        assert!(json.contains("\"expectedPaymentDate\""));
    }

    #[test]
    fn test_empty_summary_is_unavailable() {
        let summary = ForecastSummary::from_entries(None, Vec::new(), Vec::new(), Utc::now());
        assert_eq!(summary.status, PredictionStatus::Unavailable);
        assert_eq!(summary.total_invoices, 0);
        assert_eq!(summary.average_predicted_days, 0.0);
        assert_eq!(summary.error.as_deref(), Some("forecast unavailable"));
    }

    #[test]
    fn test_decode_customer_risk_request() {
        let request: CustomerRiskRequest =
            serde_json::from_str(r#"{"customer_id": "acme"}"#).unwrap();
        assert_eq!(request.customer_id, "acme");
        assert!(request.request_id.is_none());
    }
}
