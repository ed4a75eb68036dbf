//! Behavioural (sequence) features derived from a customer's payment history

use crate::error::{FeatureError, FeatureResult};
use crate::features::statistics::{
    days_between, linear_trend_slope, mean, payment_frequency_per_month, standard_deviation,
};
use crate::types::payment::PaymentRecord;
use chrono::{DateTime, Utc};

/// Longest gap reported by `days_since_last_record`
pub const MAX_DAYS_SINCE_LAST: f64 = 365.0;

/// Company behaviour vector, one named field per model input slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequenceFeatures {
    pub efficiency_last3: f64,
    pub efficiency_last7: f64,
    pub efficiency_all_time: f64,
    pub avg_velocity: f64,
    pub consistency: f64,
    pub trend: f64,
    pub monthly_frequency: f64,
    pub days_since_last_record: f64,
}

impl SequenceFeatures {
    pub const LEN: usize = 8;

    /// Model input names, in vector order
    pub const NAMES: [&'static str; Self::LEN] = [
        "CompanyEfficiency_3",
        "CompanyEfficiency_7",
        "CompanyEfficiency_All",
        "CompanyVelocity_Avg",
        "CompanyConsistency",
        "CompanyTrend",
        "PaymentFrequency",
        "DaysSinceLastInvoice",
    ];

    /// Index of `efficiency_all_time` in the vector
    pub const EFFICIENCY_ALL_INDEX: usize = 2;
    /// Index of `consistency` in the vector
    pub const CONSISTENCY_INDEX: usize = 4;
    /// Index of `trend` in the vector
    pub const TREND_INDEX: usize = 5;

    /// Neutral prior for a customer with no history
    pub const fn new_company() -> Self {
        Self {
            efficiency_last3: 0.7,
            efficiency_last7: 0.7,
            efficiency_all_time: 0.7,
            avg_velocity: 1.0,
            consistency: 0.5,
            trend: 0.0,
            monthly_frequency: 0.1,
            days_since_last_record: 30.0,
        }
    }

    /// Positional vector matching `NAMES`
    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.efficiency_last3,
            self.efficiency_last7,
            self.efficiency_all_time,
            self.avg_velocity,
            self.consistency,
            self.trend,
            self.monthly_frequency,
            self.days_since_last_record,
        ]
    }

    /// Rebuild from a positional vector
    pub fn from_slice(values: &[f64]) -> FeatureResult<Self> {
        if values.len() != Self::LEN {
            return Err(FeatureError::DimensionMismatch {
                context: "sequence features",
                expected: Self::LEN,
                actual: values.len(),
            });
        }
        Ok(Self {
            efficiency_last3: values[0],
            efficiency_last7: values[1],
            efficiency_all_time: values[2],
            avg_velocity: values[3],
            consistency: values[4],
            trend: values[5],
            monthly_frequency: values[6],
            days_since_last_record: values[7],
        })
    }
}

/// Builds `SequenceFeatures` from payment history
#[derive(Debug, Clone, Copy, Default)]
pub struct BehavioralFeatureBuilder;

impl BehavioralFeatureBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Derive the behaviour vector. `now` anchors `days_since_last_record`
    ///
    /// History may be in any order; it is sorted by date first
    pub fn build(
        &self,
        history: &[PaymentRecord],
        now: DateTime<Utc>,
    ) -> FeatureResult<SequenceFeatures> {
        if history.is_empty() {
            return Ok(SequenceFeatures::new_company());
        }

        for record in history {
            record.validate()?;
        }

        let sorted = sorted_by_date(history);
        let efficiencies: Vec<f64> = sorted.iter().map(|r| r.payment_efficiency).collect();

        let last7 = tail(&efficiencies, 7);

        let velocities: Vec<f64> = sorted
            .iter()
            .map(|r| f64::from(r.days_to_payment) / (r.amount.ln() + 1.0))
            .collect();

        let last_date = sorted[sorted.len() - 1].date;
        let days_since_last = days_between(last_date, now).clamp(0.0, MAX_DAYS_SINCE_LAST);

        Ok(SequenceFeatures {
            efficiency_last3: mean(tail(&efficiencies, 3)),
            efficiency_last7: mean(last7),
            efficiency_all_time: mean(&efficiencies),
            avg_velocity: mean(&velocities),
            consistency: 1.0 / (1.0 + standard_deviation(&efficiencies)),
            trend: linear_trend_slope(last7),
            monthly_frequency: payment_frequency_per_month(&sorted),
            days_since_last_record: days_since_last,
        })
    }
}

/// Copy of `history` ordered by date ascending (stable for equal dates)
pub fn sorted_by_date(history: &[PaymentRecord]) -> Vec<PaymentRecord> {
    let mut sorted = history.to_vec();
    sorted.sort_by_key(|r| r.date);
    sorted
}

fn tail(values: &[f64], n: usize) -> &[f64] {
    &values[values.len().saturating_sub(n)..]
}
