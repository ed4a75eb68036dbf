//! NATS message consumer for prediction, forecast and risk requests and payment events

use crate::config::NatsConfig;
use crate::types::forecast::{CustomerRiskRequest, ForecastRequest};
use crate::types::invoice::PredictionRequest;
use crate::types::payment::PaymentRecordedEvent;
use anyhow::{Context, Result};
use async_nats::{Client, Subscriber};
use tracing::info;

/// Consumer for receiving requests and payments from NATS
pub struct PredictionConsumer {
    client: Client,
    request_subject: String,
    payment_subject: String,
    forecast_subject: String,
    customer_risk_subject: String,
}

impl PredictionConsumer {
    /// Create a new consumer for the configured subjects
    pub fn new(client: Client, nats: &NatsConfig) -> Self {
        Self {
            client,
            request_subject: nats.request_subject.clone(),
            payment_subject: nats.payment_subject.clone(),
            forecast_subject: nats.forecast_subject.clone(),
            customer_risk_subject: nats.customer_risk_subject.clone(),
        }
    }

    /// Subscribe to the prediction request subject
    pub async fn subscribe_requests(&self) -> Result<Subscriber> {
        self.subscribe(&self.request_subject, "prediction request").await
    }

    /// Subscribe to the payment event subject
    pub async fn subscribe_payments(&self) -> Result<Subscriber> {
        self.subscribe(&self.payment_subject, "payment").await
    }

    /// Subscribe to the forecast request subject
    pub async fn subscribe_forecasts(&self) -> Result<Subscriber> {
        self.subscribe(&self.forecast_subject, "forecast request").await
    }

    /// Subscribe to the customer risk request subject
    pub async fn subscribe_customer_risk(&self) -> Result<Subscriber> {
        self.subscribe(&self.customer_risk_subject, "customer risk request")
            .await
    }

    async fn subscribe(&self, subject: &str, kind: &str) -> Result<Subscriber> {
        let subscriber = self
            .client
            .subscribe(subject.to_string())
            .await
            .with_context(|| format!("Failed to subscribe to {}", subject))?;
        info!(subject = %subject, kind = kind, "Subscribed to subject");
        Ok(subscriber)
    }

    pub fn request_subject(&self) -> &str {
        &self.request_subject
    }

    pub fn payment_subject(&self) -> &str {
        &self.payment_subject
    }

    pub fn forecast_subject(&self) -> &str {
        &self.forecast_subject
    }

    pub fn customer_risk_subject(&self) -> &str {
        &self.customer_risk_subject
    }
}

/// Decode a prediction request payload
pub fn decode_request(payload: &[u8]) -> Result<PredictionRequest> {
    serde_json::from_slice(payload).context("Failed to parse prediction request")
}

/// Decode a payment event payload
pub fn decode_payment(payload: &[u8]) -> Result<PaymentRecordedEvent> {
    serde_json::from_slice(payload).context("Failed to parse payment event")
}

/// Decode a forecast request payload
pub fn decode_forecast(payload: &[u8]) -> Result<ForecastRequest> {
    serde_json::from_slice(payload).context("Failed to parse forecast request")
}

/// Decode a customer risk request payload
pub fn decode_customer_risk(payload: &[u8]) -> Result<CustomerRiskRequest> {
    serde_json::from_slice(payload).context("Failed to parse customer risk request")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_request() {
        let payload = br#"{
            "requestId": "req-1",
            "invoice": {
                "invoiceId": "inv-1",
                "customerId": "acme",
                "amount": 100000.0,
                "paymentDueDays": 30,
                "customerCreditScore": 750
            },
            "history": [
                {"date": "2024-01-10T00:00:00Z", "amount": 5000.0, "daysToPayment": 10, "paymentEfficiency": 0.9}
            ]
        }"#;

        let request = decode_request(payload).unwrap();
        assert_eq!(request.request_id.as_deref(), Some("req-1"));
        assert_eq!(request.invoice.customer_id, "acme");
        assert_eq!(request.history.len(), 1);
        assert_eq!(request.history[0].days_to_payment, 10);
    }

    #[test]
    fn test_decode_payment() {
        let payload = br#"{
            "customerId": "acme",
            "record": {"date": "2024-01-10T00:00:00Z", "amount": 5000.0, "daysToPayment": 12, "paymentEfficiency": 0.85}
        }"#;

        let event = decode_payment(payload).unwrap();
        assert_eq!(event.customer_id, "acme");
        assert_eq!(event.record.payment_efficiency, 0.85);
    }

    #[test]
    fn test_decode_forecast() {
        let payload = br#"{
            "requestId": "fc-1",
            "invoices": [
                {"invoiceId": "inv-1", "customerId": "acme", "amount": 1000.0, "paymentDueDays": 30, "customerCreditScore": 700},
                {"invoiceId": "inv-2", "customerId": "globex", "amount": 2500.0, "paymentDueDays": 45, "customerCreditScore": 640}
            ]
        }"#;

        let request = decode_forecast(payload).unwrap();
        assert_eq!(request.request_id.as_deref(), Some("fc-1"));
        assert_eq!(request.invoices.len(), 2);
        assert_eq!(request.invoices[1].payment_due_days, 45);

        let risk = decode_customer_risk(br#"{"customerId": "acme"}"#).unwrap();
        assert_eq!(risk.customer_id, "acme");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_request(b"not json").is_err());
        assert!(decode_payment(br#"{"customerId": "acme"}"#).is_err());
        assert!(decode_customer_risk(br#"{"requestId": "r"}"#).is_err());
    }

    // Subscription tests would require a running NATS server
}
