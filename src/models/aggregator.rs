//! Customer-level risk aggregation

use crate::features::SequenceFeatures;
use crate::types::prediction::{PredictionResult, RiskLevel};
use serde::{Deserialize, Serialize};

/// A stored prediction together with the invoice terms it was made for
#[derive(Debug, Clone)]
pub struct ScoredInvoice {
    pub prediction: PredictionResult,
    pub payment_due_days: u32,
}

/// Risk derived from a customer's prediction track record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRisk {
    pub risk_level: RiskLevel,
    pub avg_delay_ratio: f64,
    pub avg_confidence: f64,
    pub predictions: usize,
}

/// Risk derived from observed payment behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehavioralRisk {
    pub risk_level: RiskLevel,
    /// 0 (best) to 100 (worst)
    pub risk_score: f64,
    pub average_delay_days: f64,
    /// Efficiency as a percentage
    pub payment_reliability: f64,
}

/// Aggregates invoice-level results into a customer risk band
#[derive(Debug, Clone)]
pub struct RiskAggregator {
    /// Average delay ratio at or below which a customer can be low risk
    pub low_ratio: f64,
    /// Average delay ratio above which a customer is high risk
    pub high_ratio: f64,
    /// Average confidence a low-risk customer must exceed
    pub low_min_confidence: f64,
    /// Average confidence below which a customer is high risk
    pub high_max_confidence: f64,
}

impl RiskAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Band a customer from all predictions made for their invoices
    ///
    /// Returns `None` when there is nothing to aggregate
    pub fn customer_risk(&self, predictions: &[ScoredInvoice]) -> Option<CustomerRisk> {
        if predictions.is_empty() {
            return None;
        }

        let count = predictions.len() as f64;
        let avg_delay_ratio = predictions
            .iter()
            .map(|p| p.prediction.delay_ratio(p.payment_due_days))
            .sum::<f64>()
            / count;
        let avg_confidence = predictions
            .iter()
            .map(|p| p.prediction.confidence_score)
            .sum::<f64>()
            / count;

        let risk_level =
            if avg_delay_ratio <= self.low_ratio && avg_confidence > self.low_min_confidence {
                RiskLevel::Low
            } else if avg_delay_ratio > self.high_ratio || avg_confidence < self.high_max_confidence
            {
                RiskLevel::High
            } else {
                RiskLevel::Medium
            };

        Some(CustomerRisk {
            risk_level,
            avg_delay_ratio,
            avg_confidence,
            predictions: predictions.len(),
        })
    }

    /// Band a customer from behavioural features alone
    pub fn behavioral_risk(&self, behaviour: &SequenceFeatures) -> BehavioralRisk {
        let efficiency = behaviour.efficiency_all_time;
        let risk_score = (1.0 - efficiency) * 70.0 + (1.0 - behaviour.consistency) * 30.0;

        let risk_level = if risk_score <= 25.0 {
            RiskLevel::Low
        } else if risk_score <= 50.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        };

        BehavioralRisk {
            risk_level,
            risk_score,
            average_delay_days: (1.0 - efficiency) * 20.0,
            payment_reliability: efficiency * 100.0,
        }
    }
}

impl Default for RiskAggregator {
    fn default() -> Self {
        Self {
            low_ratio: 1.1,
            high_ratio: 1.3,
            low_min_confidence: 0.7,
            high_max_confidence: 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(days: f64, confidence: f64, due: u32) -> ScoredInvoice {
        ScoredInvoice {
            prediction: PredictionResult {
                predicted_days_to_payment: days,
                confidence_score: confidence,
                risk_level: RiskLevel::Medium,
            },
            payment_due_days: due,
        }
    }

    #[test]
    fn test_empty_predictions() {
        assert!(RiskAggregator::new().customer_risk(&[]).is_none());
    }

    #[test]
    fn test_customer_risk_bands() {
        let aggregator = RiskAggregator::new();

        let low = aggregator
            .customer_risk(&[scored(25.0, 0.9, 30), scored(30.0, 0.8, 30)])
            .unwrap();
        assert_eq!(low.risk_level, RiskLevel::Low);
        assert_eq!(low.predictions, 2);

        // Good ratio but not enough confidence for low
        let medium = aggregator.customer_risk(&[scored(25.0, 0.65, 30)]).unwrap();
        assert_eq!(medium.risk_level, RiskLevel::Medium);

        let slow = aggregator
            .customer_risk(&[scored(45.0, 0.9, 30), scored(40.0, 0.9, 30)])
            .unwrap();
        assert_eq!(slow.risk_level, RiskLevel::High);

        let unsure = aggregator.customer_risk(&[scored(30.0, 0.4, 30)]).unwrap();
        assert_eq!(unsure.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_behavioral_risk() {
        let aggregator = RiskAggregator::new();

        // New-company prior: 0.3 * 70 + 0.5 * 30 = 36
        let prior = aggregator.behavioral_risk(&SequenceFeatures::new_company());
        assert!((prior.risk_score - 36.0).abs() < 1e-9);
        assert_eq!(prior.risk_level, RiskLevel::Medium);
        assert!((prior.average_delay_days - 6.0).abs() < 1e-9);
        assert!((prior.payment_reliability - 70.0).abs() < 1e-9);

        let mut steady = SequenceFeatures::new_company();
        steady.efficiency_all_time = 0.95;
        steady.consistency = 0.98;
        assert_eq!(aggregator.behavioral_risk(&steady).risk_level, RiskLevel::Low);

        let mut poor = SequenceFeatures::new_company();
        poor.efficiency_all_time = 0.3;
        poor.consistency = 0.8;
        assert_eq!(aggregator.behavioral_risk(&poor).risk_level, RiskLevel::High);
    }
}
