//! Invoice data structures for payment-delay prediction

use crate::error::{FeatureError, FeatureResult};
use crate::types::payment::PaymentRecord;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of one invoice and its customer's static attributes at prediction time
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceFeatureInput {
    /// Invoice identifier
    #[serde(alias = "invoice_id")]
    pub invoice_id: String,

    /// Stable customer identifier (history store key)
    #[serde(alias = "customer_id")]
    pub customer_id: String,

    /// Invoice amount
    pub amount: f64,

    /// Agreed payment terms in days
    #[serde(alias = "payment_due_days")]
    pub payment_due_days: u32,

    /// Contract type (e.g. "Fixed", "Retainer")
    #[serde(default, alias = "contract_type")]
    pub contract_type: String,

    /// Payment method (e.g. "Bank Transfer", "UPI")
    #[serde(default, alias = "payment_method")]
    pub payment_method: String,

    /// Whether an early-payment discount is offered
    #[serde(default, alias = "has_early_discount")]
    pub has_early_discount: bool,

    /// Market condition multiplier (~1.0 = neutral)
    #[serde(default = "default_market_condition", alias = "market_condition")]
    pub market_condition: f64,

    /// Payment urgency in [0, 1]
    #[serde(default = "default_payment_urgency", alias = "payment_urgency")]
    pub payment_urgency: f64,

    /// Customer credit score (typically 300-850)
    #[serde(alias = "customer_credit_score")]
    pub customer_credit_score: f64,

    /// Customer segment ("Reliable", "Average", "At-risk")
    #[serde(default, alias = "customer_segment")]
    pub customer_segment: String,

    /// Customer city
    #[serde(default, alias = "customer_location")]
    pub customer_location: String,

    /// Customer industry
    #[serde(default, alias = "customer_industry")]
    pub customer_industry: String,

    /// Invoice issue date
    #[serde(default = "Utc::now", alias = "invoice_date")]
    pub invoice_date: DateTime<Utc>,

    /// Day of month used for seasonality; falls back to the invoice date's day
    #[serde(default, alias = "day_of_month")]
    pub day_of_month: Option<u32>,
}

fn default_market_condition() -> f64 {
    1.0
}

fn default_payment_urgency() -> f64 {
    0.5
}

impl InvoiceFeatureInput {
    /// Create an invoice input with neutral defaults for the optional attributes
    pub fn new(
        invoice_id: impl Into<String>,
        customer_id: impl Into<String>,
        amount: f64,
        payment_due_days: u32,
        customer_credit_score: f64,
    ) -> Self {
        Self {
            invoice_id: invoice_id.into(),
            customer_id: customer_id.into(),
            amount,
            payment_due_days,
            contract_type: "Fixed".to_string(),
            payment_method: "Bank Transfer".to_string(),
            has_early_discount: false,
            market_condition: default_market_condition(),
            payment_urgency: default_payment_urgency(),
            customer_credit_score,
            customer_segment: "Average".to_string(),
            customer_location: String::new(),
            customer_industry: String::new(),
            invoice_date: Utc::now(),
            day_of_month: None,
        }
    }

    /// Set industry and location
    pub fn with_profile(mut self, industry: &str, location: &str) -> Self {
        self.customer_industry = industry.to_string();
        self.customer_location = location.to_string();
        self
    }

    /// Set the invoice date (and clear any explicit day-of-month override)
    pub fn with_invoice_date(mut self, invoice_date: DateTime<Utc>) -> Self {
        self.invoice_date = invoice_date;
        self.day_of_month = None;
        self
    }

    /// Day of month used for seasonality features
    pub fn day_of_month(&self) -> u32 {
        self.day_of_month.unwrap_or_else(|| self.invoice_date.day())
    }

    /// Reject inputs that would produce non-finite features
    pub fn validate(&self) -> FeatureResult<()> {
        let numeric = [
            ("amount", self.amount),
            ("marketCondition", self.market_condition),
            ("paymentUrgency", self.payment_urgency),
            ("customerCreditScore", self.customer_credit_score),
        ];
        for (field, value) in numeric {
            if !value.is_finite() {
                return Err(FeatureError::validation(field, "not finite"));
            }
        }

        if self.amount <= 0.0 {
            return Err(FeatureError::InvalidAmount {
                amount: self.amount,
            });
        }

        if self.payment_due_days == 0 {
            return Err(FeatureError::validation(
                "paymentDueDays",
                "must be at least one day",
            ));
        }

        if let Some(day) = self.day_of_month {
            if !(1..=31).contains(&day) {
                return Err(FeatureError::validation(
                    "dayOfMonth",
                    format!("{} is outside 1..=31", day),
                ));
            }
        }

        Ok(())
    }
}

/// Prediction request consumed by the service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRequest {
    /// Caller correlation id
    #[serde(default, alias = "request_id")]
    pub request_id: Option<String>,

    /// Invoice to predict
    pub invoice: InvoiceFeatureInput,

    /// Ledger records to seed the customer's history with before predicting
    #[serde(default)]
    pub history: Vec<PaymentRecord>,
}
