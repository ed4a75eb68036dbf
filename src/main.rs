//! Invoice Payment Predictor - Main Entry Point
//!
//! Consumes prediction requests and payment events from NATS, keeps
//! per-customer payment history, and publishes payment-delay predictions.
//! Forecast and customer risk requests are answered over request-reply

use anyhow::{Context, Result};
use futures::StreamExt;
use invoice_payment_predictor::{
    config::{AppConfig, LoggingConfig},
    consumer::{
        decode_customer_risk, decode_forecast, decode_payment, decode_request, PredictionConsumer,
    },
    metrics::{MetricsReporter, PipelineMetrics},
    models::loader::ModelLoader,
    pipeline::PredictionPipeline,
    producer::PredictionProducer,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(
        format!("invoice_payment_predictor={}", logging.level).parse()?,
    );

    match logging.format.as_str() {
        "pretty" => tracing_subscriber::fmt().with_env_filter(filter).init(),
        _ => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting Invoice Payment Predictor");
    info!(
        low_ratio = config.prediction.risk_thresholds.low,
        high_ratio = config.prediction.risk_thresholds.high,
        max_records = config.history.max_records_per_company,
        eviction = ?config.history.eviction,
        "Configuration loaded successfully"
    );

    // Initialize metrics
    let metrics = Arc::new(PipelineMetrics::new());

    // Load scaler artifacts and build the pipeline
    let artifacts = ModelLoader::new().load_or_bundled(&config.model.artifacts_path)?;
    let pipeline = Arc::new(
        PredictionPipeline::from_config(&config, &artifacts, metrics.clone())
            .context("Failed to initialize prediction pipeline")?,
    );
    info!(
        model_version = %pipeline.engine().model_version(),
        "Prediction pipeline initialized"
    );

    // Connect to NATS
    let client = async_nats::connect(&config.nats.url).await?;
    info!("Connected to NATS at {}", config.nats.url);

    // Initialize consumer and producer
    let consumer = PredictionConsumer::new(client.clone(), &config.nats);
    let producer = Arc::new(PredictionProducer::new(
        client.clone(),
        &config.nats.response_subject,
    ));

    // Start metrics reporter
    let metrics_clone = metrics.clone();
    let report_interval = config.pipeline.report_interval_secs;
    tokio::spawn(async move {
        let reporter = MetricsReporter::new(metrics_clone, report_interval);
        reporter.start().await;
    });

    // Payment events only append to history
    let mut payments = consumer.subscribe_payments().await?;
    let payment_pipeline = pipeline.clone();
    tokio::spawn(async move {
        while let Some(message) = payments.next().await {
            match decode_payment(&message.payload) {
                Ok(event) => {
                    let customer_id = event.customer_id.clone();
                    if let Err(e) = payment_pipeline.record_payment(event) {
                        warn!(customer_id = %customer_id, error = %e, "Payment record rejected");
                    }
                }
                Err(e) => warn!(error = %e, "Failed to deserialize payment event"),
            }
        }
    });

    // Forecasts and risk lookups are request-reply only
    let mut forecasts = consumer.subscribe_forecasts().await?;
    let forecast_pipeline = pipeline.clone();
    let forecast_producer = producer.clone();
    tokio::spawn(async move {
        while let Some(message) = forecasts.next().await {
            let Some(reply_to) = message.reply else {
                warn!("Forecast request without reply subject dropped");
                continue;
            };
            let request = match decode_forecast(&message.payload) {
                Ok(request) => request,
                Err(e) => {
                    warn!(error = %e, "Failed to deserialize forecast request");
                    continue;
                }
            };

            let summary = forecast_pipeline.forecast(request);
            info!(
                invoices = summary.total_invoices,
                total_amount = summary.total_amount,
                average_predicted_days = summary.average_predicted_days,
                unavailable = summary.unavailable.len(),
                "Forecast generated"
            );
            if let Err(e) = forecast_producer.reply(reply_to, &summary).await {
                error!(error = %e, "Failed to reply with forecast");
            }
        }
    });

    let mut risk_requests = consumer.subscribe_customer_risk().await?;
    let risk_pipeline = pipeline.clone();
    let risk_producer = producer.clone();
    tokio::spawn(async move {
        while let Some(message) = risk_requests.next().await {
            let Some(reply_to) = message.reply else {
                warn!("Customer risk request without reply subject dropped");
                continue;
            };
            let request = match decode_customer_risk(&message.payload) {
                Ok(request) => request,
                Err(e) => {
                    warn!(error = %e, "Failed to deserialize customer risk request");
                    continue;
                }
            };

            let report = risk_pipeline.customer_risk_report(request);
            debug!(
                customer_id = %report.customer_id,
                risk_level = ?report.risk_level,
                history_records = report.history_records,
                "Customer risk assessed"
            );
            if let Err(e) = risk_producer.reply(reply_to, &report).await {
                error!(customer_id = %report.customer_id, error = %e, "Failed to reply with customer risk");
            }
        }
    });

    let num_workers = config.pipeline.workers.max(1);
    info!(
        "Starting request processing loop with {} parallel workers",
        num_workers
    );
    info!("Listening on subject: {}", consumer.request_subject());
    info!(
        forecast_subject = %consumer.forecast_subject(),
        customer_risk_subject = %consumer.customer_risk_subject(),
        "Answering forecast and customer risk requests"
    );
    info!("Publishing predictions to: {}", producer.subject());

    // Semaphore to limit concurrent processing
    let semaphore = Arc::new(Semaphore::new(num_workers));
    let processed_count = Arc::new(AtomicU64::new(0));

    let mut subscription = consumer.subscribe_requests().await?;

    while let Some(message) = subscription.next().await {
        // Acquire permit (limits concurrent tasks)
        let permit = semaphore.clone().acquire_owned().await?;

        let pipeline = pipeline.clone();
        let producer = producer.clone();
        let metrics = metrics.clone();
        let processed_count = processed_count.clone();

        tokio::spawn(async move {
            let request = match decode_request(&message.payload) {
                Ok(request) => request,
                Err(e) => {
                    warn!(error = %e, "Failed to deserialize prediction request");
                    drop(permit);
                    return;
                }
            };

            let response = pipeline.handle_request(request);

            if let Err(e) = producer.publish(&response).await {
                error!(
                    invoice_id = %response.invoice_id,
                    error = %e,
                    "Failed to publish prediction"
                );
            }
            if let Some(reply_to) = message.reply {
                if let Err(e) = producer.reply(reply_to, &response).await {
                    error!(
                        invoice_id = %response.invoice_id,
                        error = %e,
                        "Failed to reply with prediction"
                    );
                }
            }

            debug!(
                invoice_id = %response.invoice_id,
                status = ?response.status,
                "Request handled"
            );

            let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;

            // Log progress every 100 requests
            if count % 100 == 0 {
                let processing_stats = metrics.get_processing_stats();
                info!(
                    processed = count,
                    throughput = format!("{:.1} req/s", metrics.get_throughput()),
                    avg_latency_us = processing_stats.mean_us,
                    companies = pipeline.store().stats().companies_with_history,
                    "Processing milestone"
                );
            }

            // Release permit when done
            drop(permit);
        });
    }

    info!("Predictor shutting down...");
    metrics.print_summary();

    Ok(())
}
