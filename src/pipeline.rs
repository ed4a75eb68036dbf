//! Request handling: history, features, prediction and response in one place

use crate::config::AppConfig;
use crate::error::FeatureResult;
use crate::history::CompanyHistoryStore;
use crate::metrics::PipelineMetrics;
use crate::models::aggregator::{BehavioralRisk, CustomerRisk, RiskAggregator, ScoredInvoice};
use crate::models::inference::InferenceEngine;
use crate::models::loader::ModelArtifacts;
use crate::features::statistics::round_to;
use crate::types::forecast::{
    CompanyFeatureSummary, CustomerRiskRequest, CustomerRiskResponse, ForecastEntry,
    ForecastRequest, ForecastSummary,
};
use crate::types::invoice::{InvoiceFeatureInput, PredictionRequest};
use crate::types::payment::PaymentRecordedEvent;
use crate::types::prediction::{PredictionResponse, PredictionResult, PredictionStatus};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Predictions kept per customer for track-record risk
const SCORED_INVOICES_PER_CUSTOMER: usize = 50;

/// Shared request handler used by every worker task
pub struct PredictionPipeline {
    store: Arc<CompanyHistoryStore>,
    engine: InferenceEngine,
    metrics: Arc<PipelineMetrics>,
    aggregator: RiskAggregator,
    scored: RwLock<HashMap<String, VecDeque<ScoredInvoice>>>,
}

impl PredictionPipeline {
    pub fn new(
        store: Arc<CompanyHistoryStore>,
        engine: InferenceEngine,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            store,
            engine,
            metrics,
            aggregator: RiskAggregator::new(),
            scored: RwLock::new(HashMap::new()),
        }
    }

    /// Build the store and engine described by the configuration
    pub fn from_config(
        config: &AppConfig,
        artifacts: &ModelArtifacts,
        metrics: Arc<PipelineMetrics>,
    ) -> FeatureResult<Self> {
        let store = Arc::new(CompanyHistoryStore::new(
            config.history.max_records_per_company,
            config.history.eviction,
        ));
        let engine = InferenceEngine::new(artifacts, &config.prediction)?;
        Ok(Self::new(store, engine, metrics))
    }

    /// Answer one request as of now
    pub fn handle_request(&self, request: PredictionRequest) -> PredictionResponse {
        self.handle_request_at(request, Utc::now())
    }

    /// Answer one request as of `now`
    ///
    /// Failures become an "unavailable" response; the cause is only logged
    pub fn handle_request_at(
        &self,
        request: PredictionRequest,
        now: DateTime<Utc>,
    ) -> PredictionResponse {
        let start = Instant::now();
        let PredictionRequest {
            request_id,
            invoice,
            history,
        } = request;
        let customer_id = invoice.customer_id.clone();

        let outcome = self
            .store
            .merge(&customer_id, history)
            .and_then(|_| {
                let history = self.store.get(&customer_id);
                self.engine
                    .predict(&invoice, &history, now)
                    .map(|prediction| (prediction, history.len()))
            });

        self.metrics
            .set_zero_scale_substitutions(self.engine.zero_scale_substitutions());

        match outcome {
            Ok((prediction, history_len)) => {
                self.metrics.record_prediction(start.elapsed(), &prediction);
                let ratio = prediction.delay_ratio(invoice.payment_due_days);
                self.remember(&customer_id, ScoredInvoice {
                    prediction: prediction.clone(),
                    payment_due_days: invoice.payment_due_days,
                });

                debug!(
                    invoice_id = %invoice.invoice_id,
                    customer_id = %customer_id,
                    predicted_days = prediction.predicted_days_to_payment,
                    risk_level = prediction.risk_level.as_str(),
                    history_records = history_len,
                    "Prediction produced"
                );

                PredictionResponse::ok(
                    request_id,
                    invoice.invoice_id,
                    customer_id,
                    prediction,
                    ratio,
                )
                .with_context(history_len, self.engine.model_version())
            }
            Err(e) => {
                self.metrics.record_failure(start.elapsed());
                warn!(
                    invoice_id = %invoice.invoice_id,
                    customer_id = %customer_id,
                    error = %e,
                    "Prediction unavailable"
                );

                let history_len = self.store.len(&customer_id);
                PredictionResponse::unavailable(request_id, invoice.invoice_id, customer_id)
                    .with_context(history_len, self.engine.model_version())
            }
        }
    }

    /// Forecast a set of open invoices as of now
    pub fn forecast(&self, request: ForecastRequest) -> ForecastSummary {
        self.forecast_at(request, Utc::now())
    }

    /// Forecast a set of open invoices as of `now`
    ///
    /// Each customer's history is read once and shared by all of that
    /// customer's invoices. Invoices that cannot be predicted are listed
    /// as unavailable and left out of the totals
    pub fn forecast_at(&self, request: ForecastRequest, now: DateTime<Utc>) -> ForecastSummary {
        let start = Instant::now();
        let ForecastRequest {
            request_id,
            invoices,
        } = request;

        let mut by_customer: Vec<(String, Vec<usize>)> = Vec::new();
        for (index, invoice) in invoices.iter().enumerate() {
            match by_customer
                .iter_mut()
                .find(|(customer_id, _)| *customer_id == invoice.customer_id)
            {
                Some((_, indices)) => indices.push(index),
                None => by_customer.push((invoice.customer_id.clone(), vec![index])),
            }
        }

        let mut results: Vec<Option<FeatureResult<PredictionResult>>> =
            invoices.iter().map(|_| None).collect();
        for (customer_id, indices) in &by_customer {
            let history = self.store.get(customer_id);
            let batch: Vec<InvoiceFeatureInput> =
                indices.iter().map(|&i| invoices[i].clone()).collect();
            for (&i, result) in indices
                .iter()
                .zip(self.engine.predict_batch(&batch, &history, now))
            {
                results[i] = Some(result);
            }
        }

        let mut entries = Vec::with_capacity(invoices.len());
        let mut unavailable = Vec::new();
        for (invoice, result) in invoices.iter().zip(results) {
            match result {
                Some(Ok(prediction)) => {
                    self.metrics.record_prediction(start.elapsed(), &prediction);
                    self.remember(&invoice.customer_id, ScoredInvoice {
                        prediction: prediction.clone(),
                        payment_due_days: invoice.payment_due_days,
                    });
                    entries.push(ForecastEntry::new(invoice, &prediction, now));
                }
                Some(Err(e)) => {
                    self.metrics.record_failure(start.elapsed());
                    warn!(
                        invoice_id = %invoice.invoice_id,
                        customer_id = %invoice.customer_id,
                        error = %e,
                        "Forecast unavailable for invoice"
                    );
                    unavailable.push(invoice.invoice_id.clone());
                }
                None => unavailable.push(invoice.invoice_id.clone()),
            }
        }
        self.metrics
            .set_zero_scale_substitutions(self.engine.zero_scale_substitutions());

        let summary = ForecastSummary::from_entries(request_id, entries, unavailable, now)
            .with_model_version(self.engine.model_version());

        debug!(
            invoices = invoices.len(),
            customers = by_customer.len(),
            forecasted = summary.total_invoices,
            average_predicted_days = summary.average_predicted_days,
            "Forecast produced"
        );

        summary
    }

    /// Append a recorded payment to the customer's history
    pub fn record_payment(&self, event: PaymentRecordedEvent) -> FeatureResult<()> {
        self.store.append(&event.customer_id, event.record)?;
        self.metrics.record_payment();
        Ok(())
    }

    /// Behavioural risk from the customer's stored history
    pub fn customer_risk(&self, customer_id: &str) -> FeatureResult<BehavioralRisk> {
        self.customer_risk_at(customer_id, Utc::now())
    }

    pub fn customer_risk_at(
        &self,
        customer_id: &str,
        now: DateTime<Utc>,
    ) -> FeatureResult<BehavioralRisk> {
        let history = self.store.get(customer_id);
        let behaviour = self.engine.prepare_behaviour(&history, now)?;
        Ok(self.aggregator.behavioral_risk(&behaviour))
    }

    /// Answer a customer risk request as of now
    pub fn customer_risk_report(&self, request: CustomerRiskRequest) -> CustomerRiskResponse {
        self.customer_risk_report_at(request, Utc::now())
    }

    /// Behavioural risk with the features behind it, rounded for display
    pub fn customer_risk_report_at(
        &self,
        request: CustomerRiskRequest,
        now: DateTime<Utc>,
    ) -> CustomerRiskResponse {
        let CustomerRiskRequest {
            request_id,
            customer_id,
        } = request;
        let history = self.store.get(&customer_id);
        let history_records = history.len();

        let behaviour = match self.engine.prepare_behaviour(&history, now) {
            Ok(behaviour) => behaviour,
            Err(e) => {
                warn!(customer_id = %customer_id, error = %e, "Customer risk unavailable");
                return CustomerRiskResponse::unavailable(request_id, customer_id, history_records);
            }
        };
        let risk = self.aggregator.behavioral_risk(&behaviour);

        CustomerRiskResponse {
            response_id: uuid::Uuid::new_v4().to_string(),
            request_id,
            customer_id,
            status: PredictionStatus::Ok,
            risk_level: Some(risk.risk_level),
            risk_score: Some(round_to(risk.risk_score, 1)),
            average_delay_days: Some(round_to(risk.average_delay_days, 1)),
            payment_reliability: Some(round_to(risk.payment_reliability, 1)),
            history_records,
            company_features: Some(CompanyFeatureSummary {
                efficiency: round_to(behaviour.efficiency_all_time, 3),
                consistency: round_to(behaviour.consistency, 3),
                trend: round_to(behaviour.trend, 3),
            }),
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Risk from the predictions already made for this customer
    pub fn prediction_risk(&self, customer_id: &str) -> Option<CustomerRisk> {
        let scored = self.scored.read();
        let invoices: Vec<ScoredInvoice> = scored.get(customer_id)?.iter().cloned().collect();
        self.aggregator.customer_risk(&invoices)
    }

    pub fn store(&self) -> &Arc<CompanyHistoryStore> {
        &self.store
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    fn remember(&self, customer_id: &str, invoice: ScoredInvoice) {
        let mut scored = self.scored.write();
        let entries = scored.entry(customer_id.to_string()).or_default();
        entries.push_back(invoice);
        while entries.len() > SCORED_INVOICES_PER_CUSTOMER {
            entries.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::inference::{FixedNoise, PredictionHeuristic};
    use crate::types::invoice::InvoiceFeatureInput;
    use crate::types::payment::PaymentRecord;
    use crate::types::prediction::RiskLevel;
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::Ordering;

    fn pipeline() -> PredictionPipeline {
        let engine = InferenceEngine::with_noise(
            &ModelArtifacts::identity(),
            PredictionHeuristic::default(),
            Box::new(FixedNoise(0.0)),
        )
        .unwrap();
        PredictionPipeline::new(
            Arc::new(CompanyHistoryStore::default()),
            engine,
            Arc::new(PipelineMetrics::new()),
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap()
    }

    fn request(customer_id: &str, amount: f64, history: Vec<PaymentRecord>) -> PredictionRequest {
        PredictionRequest {
            request_id: Some("req-1".to_string()),
            invoice: InvoiceFeatureInput::new("inv-1", customer_id, amount, 30, 700.0)
                .with_profile("IT", "Mumbai")
                .with_invoice_date(now()),
            history,
        }
    }

    #[test]
    fn test_request_history_seeds_store() {
        let pipeline = pipeline();
        let history = vec![
            PaymentRecord::new(now() - Duration::days(20), 5_000.0, 10, 0.9),
            PaymentRecord::new(now() - Duration::days(10), 5_000.0, 12, 0.85),
        ];

        let response = pipeline.handle_request_at(request("acme", 10_000.0, history), now());

        assert_eq!(response.status, PredictionStatus::Ok);
        assert_eq!(response.request_id.as_deref(), Some("req-1"));
        assert_eq!(response.company_history_records, 2);
        assert_eq!(response.model_version, "identity");
        assert!(response.prediction.is_some());
        assert!(response.error.is_none());
        assert_eq!(pipeline.store().len("acme"), 2);
        assert_eq!(pipeline.metrics().predictions_processed.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_resent_ledger_is_not_duplicated() {
        let pipeline = pipeline();
        let history = vec![
            PaymentRecord::new(now() - Duration::days(30), 5_000.0, 10, 0.9),
            PaymentRecord::new(now() - Duration::days(20), 5_000.0, 12, 0.85),
            PaymentRecord::new(now() - Duration::days(10), 7_500.0, 9, 0.95),
        ];

        for _ in 0..3 {
            let response =
                pipeline.handle_request_at(request("acme", 10_000.0, history.clone()), now());
            assert_eq!(response.status, PredictionStatus::Ok);
            assert_eq!(response.company_history_records, 3);
        }
        assert_eq!(pipeline.store().len("acme"), 3);
    }

    #[test]
    fn test_invalid_request_is_unavailable() {
        let pipeline = pipeline();
        let response = pipeline.handle_request_at(request("acme", -5.0, Vec::new()), now());

        assert_eq!(response.status, PredictionStatus::Unavailable);
        assert_eq!(response.error.as_deref(), Some("prediction unavailable"));
        assert!(response.prediction.is_none());
        assert!(response.delay_ratio.is_none());
        assert_eq!(pipeline.metrics().predictions_failed.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_record_payment_and_customer_risk() {
        let pipeline = pipeline();

        // Empty history reports the new-company prior
        let prior = pipeline.customer_risk_at("acme", now()).unwrap();
        assert_eq!(prior.risk_level, RiskLevel::Medium);

        for (offset, efficiency) in [(30, 0.95), (20, 0.97), (10, 0.96)] {
            pipeline
                .record_payment(PaymentRecordedEvent {
                    customer_id: "acme".to_string(),
                    record: PaymentRecord::new(
                        now() - Duration::days(offset),
                        5_000.0,
                        10,
                        efficiency,
                    ),
                })
                .unwrap();
        }

        let risk = pipeline.customer_risk_at("acme", now()).unwrap();
        assert_eq!(risk.risk_level, RiskLevel::Low);
        assert_eq!(pipeline.metrics().payments_recorded.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_rejected_payment_is_not_stored() {
        let pipeline = pipeline();
        let result = pipeline.record_payment(PaymentRecordedEvent {
            customer_id: "acme".to_string(),
            record: PaymentRecord::new(now(), 0.0, 10, 0.9),
        });

        assert!(result.is_err());
        assert_eq!(pipeline.store().len("acme"), 0);
    }

    fn seed(pipeline: &PredictionPipeline, customer_id: &str, efficiency: f64) {
        for offset in [40, 30, 20, 10] {
            pipeline
                .record_payment(PaymentRecordedEvent {
                    customer_id: customer_id.to_string(),
                    record: PaymentRecord::new(
                        now() - Duration::days(offset),
                        5_000.0,
                        12,
                        efficiency,
                    ),
                })
                .unwrap();
        }
    }

    fn forecast_invoice(id: &str, customer_id: &str, amount: f64) -> InvoiceFeatureInput {
        InvoiceFeatureInput::new(id, customer_id, amount, 30, 700.0)
            .with_profile("IT", "Mumbai")
            .with_invoice_date(now())
    }

    #[test]
    fn test_forecast_totals_and_distribution() {
        let pipeline = pipeline();
        seed(&pipeline, "acme", 0.95);
        seed(&pipeline, "globex", 0.4);

        let summary = pipeline.forecast_at(
            ForecastRequest {
                request_id: Some("fc-1".to_string()),
                invoices: vec![
                    forecast_invoice("inv-1", "acme", 1_000.0),
                    forecast_invoice("inv-2", "globex", 2_000.0),
                    forecast_invoice("inv-3", "acme", 3_000.0),
                    forecast_invoice("inv-4", "acme", -1.0),
                ],
            },
            now(),
        );

        assert_eq!(summary.status, PredictionStatus::Ok);
        assert_eq!(summary.request_id.as_deref(), Some("fc-1"));
        assert_eq!(summary.total_invoices, 3);
        assert_eq!(summary.total_amount, 6_000.0);
        assert_eq!(summary.unavailable, vec!["inv-4"]);
        assert_eq!(summary.risk_distribution.total(), 3);
        assert_eq!(summary.generated_at, now());
        assert_eq!(summary.model_version, "identity");

        // Request order is kept across customers
        let ids: Vec<&str> = summary
            .individual_forecasts
            .iter()
            .map(|f| f.invoice_id.as_str())
            .collect();
        assert_eq!(ids, vec!["inv-1", "inv-2", "inv-3"]);

        let mean = summary
            .individual_forecasts
            .iter()
            .map(|f| f.predicted_days)
            .sum::<f64>()
            / 3.0;
        assert!((summary.average_predicted_days - mean).abs() <= 0.05);

        for forecast in &summary.individual_forecasts {
            let expected = now() + Duration::seconds((forecast.predicted_days * 86_400.0) as i64);
            assert!((forecast.expected_payment_date - expected).num_seconds().abs() <= 1);
        }

        let metrics = pipeline.metrics();
        assert_eq!(metrics.predictions_processed.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.predictions_failed.load(Ordering::Relaxed), 1);
        assert_eq!(pipeline.prediction_risk("acme").unwrap().predictions, 2);
    }

    #[test]
    fn test_forecast_without_invoices_is_unavailable() {
        let pipeline = pipeline();
        let summary = pipeline.forecast_at(
            ForecastRequest {
                request_id: None,
                invoices: Vec::new(),
            },
            now(),
        );
        assert_eq!(summary.status, PredictionStatus::Unavailable);
        assert_eq!(summary.total_invoices, 0);
        assert_eq!(summary.total_amount, 0.0);
    }

    #[test]
    fn test_customer_risk_report() {
        let pipeline = pipeline();
        seed(&pipeline, "acme", 0.9);

        let report = pipeline.customer_risk_report_at(
            CustomerRiskRequest {
                request_id: Some("risk-1".to_string()),
                customer_id: "acme".to_string(),
            },
            now(),
        );

        assert_eq!(report.status, PredictionStatus::Ok);
        assert_eq!(report.history_records, 4);
        // (1 - 0.9) * 70 + (1 - 1) * 30 = 7
        assert_eq!(report.risk_score, Some(7.0));
        assert_eq!(report.risk_level, Some(RiskLevel::Low));
        assert_eq!(report.average_delay_days, Some(2.0));
        assert_eq!(report.payment_reliability, Some(90.0));
        assert_eq!(
            report.company_features,
            Some(CompanyFeatureSummary {
                efficiency: 0.9,
                consistency: 1.0,
                trend: 0.0,
            })
        );

        let unknown = pipeline.customer_risk_report_at(
            CustomerRiskRequest {
                request_id: None,
                customer_id: "nobody".to_string(),
            },
            now(),
        );
        assert_eq!(unknown.history_records, 0);
        assert_eq!(unknown.risk_level, Some(RiskLevel::Medium));
    }

    #[test]
    fn test_prediction_risk_tracks_answered_requests() {
        let pipeline = pipeline();
        assert!(pipeline.prediction_risk("acme").is_none());

        pipeline.handle_request_at(request("acme", 10_000.0, Vec::new()), now());
        pipeline.handle_request_at(request("acme", 20_000.0, Vec::new()), now());

        let risk = pipeline.prediction_risk("acme").unwrap();
        assert_eq!(risk.predictions, 2);
        assert!(risk.avg_confidence >= 0.6);
    }
}
