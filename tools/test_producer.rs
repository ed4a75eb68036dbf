//! Test Request Producer
//!
//! Publishes synthetic payment events and prediction requests to NATS for
//! exercising the predictor

use chrono::{Duration as ChronoDuration, Utc};
use invoice_payment_predictor::features::encodings::{known_values, Category};
use invoice_payment_predictor::types::{
    ForecastRequest, ForecastSummary, InvoiceFeatureInput, PaymentRecord, PaymentRecordedEvent,
    PredictionRequest,
};
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

/// Synthetic invoice and payment generator
struct RequestGenerator {
    rng: rand::rngs::ThreadRng,
    invoice_counter: u64,
    customers: u32,
}

impl RequestGenerator {
    fn new(customers: u32) -> Self {
        Self {
            rng: rand::thread_rng(),
            invoice_counter: 0,
            customers: customers.max(1),
        }
    }

    fn customer_id(&mut self) -> String {
        format!("cust_{:04}", self.rng.gen_range(0..self.customers))
    }

    /// A recorded payment; late payers get lower efficiency
    fn generate_payment(&mut self, late_rate: f64) -> PaymentRecordedEvent {
        let late = self.rng.gen_bool(late_rate);
        let days_to_payment: u32 = if late {
            self.rng.gen_range(35..90)
        } else {
            self.rng.gen_range(5..32)
        };
        let efficiency = if late {
            self.rng.gen_range(0.2..0.6)
        } else {
            self.rng.gen_range(0.75..1.0)
        };

        PaymentRecordedEvent {
            customer_id: self.customer_id(),
            record: PaymentRecord::new(
                Utc::now() - ChronoDuration::days(self.rng.gen_range(0..180)),
                self.rng.gen_range(5_000.0..250_000.0),
                days_to_payment,
                efficiency,
            ),
        }
    }

    fn generate_request(&mut self) -> PredictionRequest {
        self.invoice_counter += 1;
        let due_days = *self.random_choice(&[15u32, 30, 45, 60]);

        let mut invoice = InvoiceFeatureInput::new(
            format!("inv_{:010}", self.invoice_counter),
            self.customer_id(),
            self.rng.gen_range(1_000.0..500_000.0),
            due_days,
            self.rng.gen_range(450.0..850.0),
        );
        let industry = self.random_choice(&known_values(Category::Industry)).to_string();
        let location = self.random_choice(&known_values(Category::Location)).to_string();
        invoice = invoice.with_profile(&industry, &location);
        invoice.payment_method = self
            .random_choice(&known_values(Category::PaymentMethod))
            .to_string();
        invoice.customer_segment = self
            .random_choice(&known_values(Category::Segment))
            .to_string();
        invoice.has_early_discount = self.rng.gen_bool(0.2);
        invoice.payment_urgency = self.rng.gen_range(0.0..1.0);
        invoice.market_condition = self.rng.gen_range(0.9..1.1);

        PredictionRequest {
            request_id: Some(format!("req_{:010}", self.invoice_counter)),
            invoice,
            history: Vec::new(),
        }
    }

    /// Open invoices across several customers
    fn generate_forecast(&mut self, invoices: usize) -> ForecastRequest {
        ForecastRequest {
            request_id: Some(format!("fc_{:010}", self.invoice_counter)),
            invoices: (0..invoices).map(|_| self.generate_request().invoice).collect(),
        }
    }

    fn random_choice<'a, T>(&mut self, choices: &'a [T]) -> &'a T {
        &choices[self.rng.gen_range(0..choices.len())]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_producer=info".parse()?),
        )
        .init();

    info!("Starting Test Request Producer");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let request_subject = args.get(2).map(|s| s.as_str()).unwrap_or("invoices.predict");
    let payment_subject = args.get(3).map(|s| s.as_str()).unwrap_or("payments.recorded");
    let count: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(100);
    let late_rate: f64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(0.2);
    let delay_ms: u64 = args.get(6).and_then(|s| s.parse().ok()).unwrap_or(100);
    let forecast_subject = args.get(7).map(|s| s.as_str()).unwrap_or("invoices.forecast");
    let customers: u32 = 25;

    info!(
        nats_url = %nats_url,
        request_subject = %request_subject,
        payment_subject = %payment_subject,
        count = count,
        late_rate = late_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    // Connect to NATS
    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, late_rate, customers).await;
        }
    };

    let mut generator = RequestGenerator::new(customers);

    // Seed some history before asking for predictions
    let seed_payments = u64::from(customers) * 5;
    for _ in 0..seed_payments {
        let event = generator.generate_payment(late_rate);
        client
            .publish(payment_subject.to_string(), serde_json::to_vec(&event)?.into())
            .await?;
    }
    info!(payments = seed_payments, "Seeded payment history");

    info!("Starting to publish {} prediction requests...", count);

    let mut payments_sent = 0;
    for i in 0..count {
        let request = generator.generate_request();
        client
            .publish(request_subject.to_string(), serde_json::to_vec(&request)?.into())
            .await?;

        // Interleave new payments with requests
        if generator.rng.gen_bool(0.3) {
            let event = generator.generate_payment(late_rate);
            client
                .publish(payment_subject.to_string(), serde_json::to_vec(&event)?.into())
                .await?;
            payments_sent += 1;
        }

        if (i + 1) % 10 == 0 {
            info!(
                "Published {}/{} requests ({} interleaved payments)",
                i + 1,
                count,
                payments_sent
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    client.flush().await?;
    info!(
        "Completed! Published {} requests and {} payments",
        count,
        seed_payments + payments_sent
    );

    // One portfolio forecast over the seeded customers
    let forecast = generator.generate_forecast(20);
    match client
        .request(forecast_subject.to_string(), serde_json::to_vec(&forecast)?.into())
        .await
    {
        Ok(reply) => {
            let summary: ForecastSummary = serde_json::from_slice(&reply.payload)?;
            info!(
                invoices = summary.total_invoices,
                total_amount = summary.total_amount,
                average_predicted_days = summary.average_predicted_days,
                low = summary.risk_distribution.low,
                medium = summary.risk_distribution.medium,
                high = summary.risk_distribution.high,
                "Forecast received"
            );
        }
        Err(e) => warn!(error = %e, subject = %forecast_subject, "Forecast request failed"),
    }

    Ok(())
}

async fn run_dry_mode(count: u64, late_rate: f64, customers: u32) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = RequestGenerator::new(customers);

    for i in 0..count {
        let request = generator.generate_request();
        let payment = generator.generate_payment(late_rate);

        if (i + 1) % 10 == 0 || i == 0 {
            info!(
                "Sample request {}:\n{}",
                i + 1,
                serde_json::to_string_pretty(&request)?
            );
            info!("Sample payment:\n{}", serde_json::to_string_pretty(&payment)?);
        }
    }

    let forecast = generator.generate_forecast(5);
    info!("Sample forecast request:\n{}", serde_json::to_string_pretty(&forecast)?);

    Ok(())
}
