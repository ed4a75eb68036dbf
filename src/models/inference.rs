//! Fallback payment-delay predictor and the engine that feeds it

use crate::config::PredictionConfig;
use crate::error::{FeatureError, FeatureResult};
use crate::feature_extractor::{FeatureExtractor, FeatureSet};
use crate::features::statistics::{mean, round_to};
use crate::features::{SequenceFeatures, StaticFeatures};
use crate::models::loader::ModelArtifacts;
use crate::models::scaler::RobustScaler;
use crate::types::invoice::InvoiceFeatureInput;
use crate::types::payment::PaymentRecord;
use crate::types::prediction::{PredictionResult, RiskLevel, RiskRatioThresholds};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

/// Shortest prediction the heuristic reports, in days
pub const MIN_PREDICTED_DAYS: f64 = 1.0;
/// Longest prediction the heuristic reports, in days
pub const MAX_PREDICTED_DAYS: f64 = 120.0;

const BASE_DAYS: f64 = 30.0;
const EFFICIENCY_WEIGHT: f64 = 25.0;
const CONSISTENCY_WEIGHT: f64 = 5.0;
const TREND_WEIGHT: f64 = 10.0;
const STATIC_WEIGHT: f64 = 8.0;

const CONFIDENCE_FLOOR: f64 = 0.6;
const CONFIDENCE_CEILING: f64 = 0.95;
const CONFIDENCE_HISTORY_SPAN: f64 = 0.3;
const CONFIDENCE_HISTORY_SATURATION: usize = 20;
const CONFIDENCE_JITTER: f64 = 0.05;

/// Source of the predictor's simulated model noise
pub trait NoiseSource: Send {
    /// Next sample in [-1, 1]
    fn sample(&mut self) -> f64;
}

/// Uniform noise from a seedable generator
pub struct RandomNoise {
    rng: StdRng,
}

impl RandomNoise {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl NoiseSource for RandomNoise {
    fn sample(&mut self) -> f64 {
        self.rng.gen_range(-1.0..=1.0)
    }
}

/// Constant noise, for reproducible predictions
#[derive(Debug, Clone, Copy)]
pub struct FixedNoise(pub f64);

impl NoiseSource for FixedNoise {
    fn sample(&mut self) -> f64 {
        self.0.clamp(-1.0, 1.0)
    }
}

/// Predicts days-to-payment from behaviour and scaled invoice features
/// without a trained model
#[derive(Debug, Clone)]
pub struct PredictionHeuristic {
    thresholds: RiskRatioThresholds,
    jitter_days: f64,
}

impl PredictionHeuristic {
    pub fn new(thresholds: RiskRatioThresholds, jitter_days: f64) -> Self {
        Self {
            thresholds,
            jitter_days: jitter_days.abs(),
        }
    }

    /// Estimate a prediction
    ///
    /// `sequence` is the raw behaviour vector (interpreted directly),
    /// `scaled_static` the scaled invoice vector. `history_len` feeds the
    /// confidence score
    pub fn estimate(
        &self,
        sequence: &[f64],
        scaled_static: &[f64],
        payment_due_days: u32,
        history_len: usize,
        noise: &mut dyn NoiseSource,
    ) -> FeatureResult<PredictionResult> {
        check_vector("sequence", sequence, SequenceFeatures::LEN)?;
        check_vector("static", scaled_static, StaticFeatures::LEN)?;
        if payment_due_days == 0 {
            return Err(FeatureError::validation(
                "paymentDueDays",
                "must be at least one day",
            ));
        }

        let efficiency = sequence[SequenceFeatures::EFFICIENCY_ALL_INDEX];
        let consistency = sequence[SequenceFeatures::CONSISTENCY_INDEX];
        let trend = sequence[SequenceFeatures::TREND_INDEX];
        let avg_static = mean(scaled_static);

        let base = BASE_DAYS + (1.0 - efficiency) * EFFICIENCY_WEIGHT
            - consistency * CONSISTENCY_WEIGHT
            - trend * TREND_WEIGHT
            + avg_static * STATIC_WEIGHT;
        let perturbed = base + noise.sample() * self.jitter_days;
        if perturbed.is_nan() {
            warn!(base = base, avg_static = avg_static, "Prediction is not a number");
            return Err(FeatureError::validation("prediction", "not a number"));
        }

        let predicted_days = round_to(
            perturbed.clamp(MIN_PREDICTED_DAYS, MAX_PREDICTED_DAYS),
            1,
        );

        let history_weight = history_len.min(CONFIDENCE_HISTORY_SATURATION) as f64
            / CONFIDENCE_HISTORY_SATURATION as f64;
        let confidence = CONFIDENCE_FLOOR
            + history_weight * CONFIDENCE_HISTORY_SPAN
            + noise.sample() * CONFIDENCE_JITTER;
        let confidence_score = round_to(confidence.clamp(CONFIDENCE_FLOOR, CONFIDENCE_CEILING), 2);

        let ratio = predicted_days / f64::from(payment_due_days);
        let risk_level = RiskLevel::from_delay_ratio(ratio, &self.thresholds);

        debug!(
            efficiency = efficiency,
            consistency = consistency,
            trend = trend,
            avg_static = avg_static,
            predicted_days = predicted_days,
            confidence = confidence_score,
            risk_level = risk_level.as_str(),
            "Fallback prediction complete"
        );

        Ok(PredictionResult {
            predicted_days_to_payment: predicted_days,
            confidence_score,
            risk_level,
        })
    }

    pub fn thresholds(&self) -> &RiskRatioThresholds {
        &self.thresholds
    }
}

impl Default for PredictionHeuristic {
    fn default() -> Self {
        Self::new(RiskRatioThresholds::default(), 2.0)
    }
}

fn check_vector(name: &'static str, values: &[f64], expected: usize) -> FeatureResult<()> {
    if values.len() != expected {
        warn!(
            vector = name,
            expected = expected,
            actual = values.len(),
            "Malformed feature vector"
        );
        return Err(FeatureError::validation(
            name,
            format!("expected {} values, got {}", expected, values.len()),
        ));
    }
    if let Some(index) = values.iter().position(|v| !v.is_finite()) {
        warn!(vector = name, index = index, "Non-finite feature value");
        return Err(FeatureError::validation(
            name,
            format!("value at index {} is not finite", index),
        ));
    }
    Ok(())
}

/// Raw and scaled vectors for one invoice, ready for a trained model
#[derive(Debug, Clone)]
pub struct PreparedFeatures {
    pub raw: FeatureSet,
    pub scaled_sequence: Vec<f64>,
    pub scaled_static: Vec<f64>,
}

/// Feature extraction, scaling and fallback prediction in one place
pub struct InferenceEngine {
    extractor: FeatureExtractor,
    sequence_scaler: RobustScaler,
    static_scaler: RobustScaler,
    heuristic: PredictionHeuristic,
    /// Noise source (behind a lock for interior mutability)
    noise: Mutex<Box<dyn NoiseSource>>,
    model_version: String,
}

impl InferenceEngine {
    /// Create an engine from loaded artifacts and prediction settings
    pub fn new(artifacts: &ModelArtifacts, config: &PredictionConfig) -> FeatureResult<Self> {
        let noise: Box<dyn NoiseSource> = match config.noise_seed {
            Some(seed) => Box::new(RandomNoise::seeded(seed)),
            None => Box::new(RandomNoise::from_entropy()),
        };
        let heuristic = PredictionHeuristic::new(config.risk_thresholds.clone(), config.jitter_days);

        let engine = Self::with_noise(artifacts, heuristic, noise)?;

        info!(
            model_version = %engine.model_version,
            seeded = config.noise_seed.is_some(),
            low_ratio = config.risk_thresholds.low,
            high_ratio = config.risk_thresholds.high,
            "Inference engine initialized"
        );

        Ok(engine)
    }

    /// Create an engine with an explicit noise source
    pub fn with_noise(
        artifacts: &ModelArtifacts,
        heuristic: PredictionHeuristic,
        noise: Box<dyn NoiseSource>,
    ) -> FeatureResult<Self> {
        artifacts.validate()?;

        Ok(Self {
            extractor: FeatureExtractor::new(),
            sequence_scaler: RobustScaler::new(
                "sequence scaler",
                artifacts.sequence_scaler.clone(),
                SequenceFeatures::LEN,
            )?,
            static_scaler: RobustScaler::new(
                "static scaler",
                artifacts.static_scaler.clone(),
                StaticFeatures::LEN,
            )?,
            heuristic,
            noise: Mutex::new(noise),
            model_version: artifacts.model_version.clone(),
        })
    }

    /// Extract and scale features without predicting
    pub fn prepare(
        &self,
        invoice: &InvoiceFeatureInput,
        history: &[PaymentRecord],
        now: DateTime<Utc>,
    ) -> FeatureResult<PreparedFeatures> {
        let raw = self.extractor.extract(invoice, history, now)?;
        let scaled_sequence = self.sequence_scaler.transform(&raw.sequence_vec())?;
        let scaled_static = self.static_scaler.transform(&raw.static_vec())?;

        Ok(PreparedFeatures {
            raw,
            scaled_sequence,
            scaled_static,
        })
    }

    /// Behavioural features for a history, unscaled
    pub fn prepare_behaviour(
        &self,
        history: &[PaymentRecord],
        now: DateTime<Utc>,
    ) -> FeatureResult<SequenceFeatures> {
        self.extractor.behaviour(history, now)
    }

    /// Run the fallback predictor for one invoice
    pub fn predict(
        &self,
        invoice: &InvoiceFeatureInput,
        history: &[PaymentRecord],
        now: DateTime<Utc>,
    ) -> FeatureResult<PredictionResult> {
        let prepared = self.prepare(invoice, history, now)?;
        check_vector("scaled sequence", &prepared.scaled_sequence, SequenceFeatures::LEN)?;

        let mut noise = self.noise.lock();
        self.heuristic.estimate(
            &prepared.raw.sequence_vec(),
            &prepared.scaled_static,
            invoice.payment_due_days,
            history.len(),
            &mut **noise,
        )
    }

    /// Run predictions for several invoices sharing one history
    pub fn predict_batch(
        &self,
        invoices: &[InvoiceFeatureInput],
        history: &[PaymentRecord],
        now: DateTime<Utc>,
    ) -> Vec<FeatureResult<PredictionResult>> {
        invoices
            .iter()
            .map(|invoice| self.predict(invoice, history, now))
            .collect()
    }

    /// Version label of the loaded artifacts
    pub fn model_version(&self) -> &str {
        &self.model_version
    }

    /// Zero scale factors replaced by 1 across both scalers
    pub fn zero_scale_substitutions(&self) -> u64 {
        self.sequence_scaler.zero_scale_substitutions()
            + self.static_scaler.zero_scale_substitutions()
    }

    pub fn heuristic(&self) -> &PredictionHeuristic {
        &self.heuristic
    }
}
