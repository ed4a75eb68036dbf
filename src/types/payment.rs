//! Payment history records

use crate::error::{FeatureError, FeatureResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observed (or synthetic) payment event for a customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    /// When the payment was recorded
    #[serde(alias = "payment_date", alias = "created_at")]
    pub date: DateTime<Utc>,

    /// Invoice amount the payment settled
    pub amount: f64,

    /// Days between invoice issuance and payment
    #[serde(alias = "days_to_payment")]
    pub days_to_payment: u32,

    /// Relative payment performance in [0, 1], higher is better
    #[serde(alias = "payment_efficiency")]
    pub payment_efficiency: f64,
}

impl PaymentRecord {
    /// Create a record, clamping efficiency into [0, 1]
    pub fn new(
        date: DateTime<Utc>,
        amount: f64,
        days_to_payment: u32,
        payment_efficiency: f64,
    ) -> Self {
        Self {
            date,
            amount,
            days_to_payment,
            payment_efficiency: clamp_efficiency(payment_efficiency),
        }
    }

    /// Check the record is usable for feature engineering
    pub fn validate(&self) -> FeatureResult<()> {
        if !self.amount.is_finite() {
            return Err(FeatureError::validation("amount", "not finite"));
        }
        if self.amount <= 0.0 {
            return Err(FeatureError::InvalidAmount {
                amount: self.amount,
            });
        }
        if !self.payment_efficiency.is_finite() {
            return Err(FeatureError::validation("paymentEfficiency", "not finite"));
        }
        Ok(())
    }

    /// Copy of this record with efficiency clamped into [0, 1]
    pub fn normalized(mut self) -> Self {
        self.payment_efficiency = clamp_efficiency(self.payment_efficiency);
        self
    }
}

fn clamp_efficiency(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        value
    }
}

/// Payment ledger event appended to a customer's history
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecordedEvent {
    /// Stable customer identifier
    #[serde(alias = "customer_id")]
    pub customer_id: String,

    /// Recorded payment
    pub record: PaymentRecord,
}
