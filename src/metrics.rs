//! Performance metrics and statistics tracking for the prediction service

use crate::types::prediction::{PredictionResult, RiskLevel};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Width of one predicted-days bucket
const DAYS_BUCKET_WIDTH: f64 = 10.0;
/// Buckets cover 0-120 days
const DAYS_BUCKETS: usize = 12;

/// Metrics collector for the prediction pipeline
pub struct PipelineMetrics {
    /// Requests answered with a prediction
    pub predictions_processed: AtomicU64,
    /// Requests answered as unavailable
    pub predictions_failed: AtomicU64,
    /// Payment events appended to history
    pub payments_recorded: AtomicU64,
    /// Predictions by risk level
    predictions_by_level: RwLock<HashMap<RiskLevel, u64>>,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Predicted days distribution
    days_buckets: RwLock<[u64; DAYS_BUCKETS]>,
    /// Confidence of recent predictions
    confidences: RwLock<Vec<f64>>,
    /// Zero scale factors seen by the scalers
    zero_scale_substitutions: AtomicU64,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PipelineMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            predictions_processed: AtomicU64::new(0),
            predictions_failed: AtomicU64::new(0),
            payments_recorded: AtomicU64::new(0),
            predictions_by_level: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            days_buckets: RwLock::new([0; DAYS_BUCKETS]),
            confidences: RwLock::new(Vec::with_capacity(1000)),
            zero_scale_substitutions: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a successful prediction
    pub fn record_prediction(&self, processing_time: Duration, prediction: &PredictionResult) {
        self.predictions_processed.fetch_add(1, Ordering::Relaxed);
        self.push_processing_time(processing_time);

        *self
            .predictions_by_level
            .write()
            .entry(prediction.risk_level)
            .or_insert(0) += 1;

        let bucket = ((prediction.predicted_days_to_payment / DAYS_BUCKET_WIDTH).max(0.0) as usize)
            .min(DAYS_BUCKETS - 1);
        self.days_buckets.write()[bucket] += 1;

        let mut confidences = self.confidences.write();
        confidences.push(prediction.confidence_score);
        if confidences.len() > 10000 {
            confidences.drain(0..5000);
        }
    }

    /// Record a request that could not be answered
    pub fn record_failure(&self, processing_time: Duration) {
        self.predictions_failed.fetch_add(1, Ordering::Relaxed);
        self.push_processing_time(processing_time);
    }

    pub fn record_payment(&self) {
        self.payments_recorded.fetch_add(1, Ordering::Relaxed);
    }

    /// Track the scalers' running substitution count
    pub fn set_zero_scale_substitutions(&self, total: u64) {
        self.zero_scale_substitutions.store(total, Ordering::Relaxed);
    }

    fn push_processing_time(&self, processing_time: Duration) {
        let mut times = self.processing_times.write();
        times.push(processing_time.as_micros() as u64);
        // Keep only last 10000
        if times.len() > 10000 {
            times.drain(0..5000);
        }
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let mut sorted: Vec<u64> = self.processing_times.read().clone();
        if sorted.is_empty() {
            return ProcessingStats::default();
        }
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[((count as f64 * 0.95) as usize).min(count - 1)],
            p99_us: sorted[((count as f64 * 0.99) as usize).min(count - 1)],
            max_us: sorted[count - 1],
        }
    }

    /// Predictions per second since start
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.predictions_processed.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_avg_confidence(&self) -> f64 {
        let confidences = self.confidences.read();
        if confidences.is_empty() {
            return 0.0;
        }
        confidences.iter().sum::<f64>() / confidences.len() as f64
    }

    pub fn get_predictions_by_level(&self) -> HashMap<RiskLevel, u64> {
        self.predictions_by_level.read().clone()
    }

    pub fn get_days_distribution(&self) -> [u64; DAYS_BUCKETS] {
        *self.days_buckets.read()
    }

    /// Print a summary of all metrics
    pub fn print_summary(&self) {
        let processed = self.predictions_processed.load(Ordering::Relaxed);
        let failed = self.predictions_failed.load(Ordering::Relaxed);
        let payments = self.payments_recorded.load(Ordering::Relaxed);
        let failure_rate = if processed + failed > 0 {
            (failed as f64 / (processed + failed) as f64) * 100.0
        } else {
            0.0
        };

        let processing = self.get_processing_stats();
        let throughput = self.get_throughput();
        let by_level = self.get_predictions_by_level();
        let days_dist = self.get_days_distribution();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║          INVOICE PAYMENT PREDICTOR - METRICS SUMMARY         ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Predictions:   {:>8}  │  Throughput: {:>6.1} req/s          ║",
            processed, throughput
        );
        info!(
            "║ Unavailable:   {:>8}  │  Failure Rate: {:>6.1}%             ║",
            failed, failure_rate
        );
        info!(
            "║ Payments:      {:>8}  │  Zero Scales: {:>8}             ║",
            payments,
            self.zero_scale_substitutions.load(Ordering::Relaxed)
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Processing Time (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5} ║",
            processing.mean_us, processing.p50_us, processing.p95_us, processing.p99_us
        );
        info!(
            "║ Average Confidence: {:>5.2}                                    ║",
            self.get_avg_confidence()
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Predictions by Risk Level:                                   ║");
        for level in [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High] {
            let count = by_level.get(&level).copied().unwrap_or(0);
            let pct = if processed > 0 {
                (count as f64 / processed as f64) * 100.0
            } else {
                0.0
            };
            info!(
                "║   {:10}: {:>6} ({:>5.1}%)                                ║",
                level.as_str(),
                count,
                pct
            );
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Predicted Days Distribution:                                 ║");
        let total: u64 = days_dist.iter().sum();
        for (i, &count) in days_dist.iter().enumerate() {
            let pct = if total > 0 { (count as f64 / total as f64) * 100.0 } else { 0.0 };
            let bar: String = "█".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "║   {:>3}-{:<3}: {:>6} ({:>5.1}%) {}",
                i * 10,
                (i + 1) * 10,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Real-time metrics reporter that prints periodic summaries
pub struct MetricsReporter {
    metrics: Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs: interval_secs.max(1),
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(days: f64, confidence: f64, risk_level: RiskLevel) -> PredictionResult {
        PredictionResult {
            predicted_days_to_payment: days,
            confidence_score: confidence,
            risk_level,
        }
    }

    #[test]
    fn test_metrics_recording() {
        let metrics = PipelineMetrics::new();

        metrics.record_prediction(Duration::from_micros(100), &prediction(25.0, 0.7, RiskLevel::Low));
        metrics.record_prediction(Duration::from_micros(200), &prediction(45.0, 0.9, RiskLevel::High));
        metrics.record_failure(Duration::from_micros(50));
        metrics.record_payment();

        assert_eq!(metrics.predictions_processed.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.predictions_failed.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.payments_recorded.load(Ordering::Relaxed), 1);
        assert!((metrics.get_avg_confidence() - 0.8).abs() < 1e-9);

        let by_level = metrics.get_predictions_by_level();
        assert_eq!(by_level.get(&RiskLevel::Low), Some(&1));
        assert_eq!(by_level.get(&RiskLevel::Medium), None);

        let stats = metrics.get_processing_stats();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.max_us, 200);
    }

    #[test]
    fn test_days_buckets() {
        let metrics = PipelineMetrics::new();
        for days in [1.0, 9.9, 10.0, 119.0, 120.0] {
            metrics.record_prediction(Duration::from_micros(1), &prediction(days, 0.6, RiskLevel::Medium));
        }

        let dist = metrics.get_days_distribution();
        assert_eq!(dist[0], 2);
        assert_eq!(dist[1], 1);
        assert_eq!(dist[11], 2);
    }

    #[test]
    fn test_empty_stats() {
        let metrics = PipelineMetrics::default();
        assert_eq!(metrics.get_processing_stats().count, 0);
        assert_eq!(metrics.get_avg_confidence(), 0.0);
        metrics.print_summary();
    }
}
