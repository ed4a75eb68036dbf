//! Per-invoice (static) features

use crate::error::{FeatureError, FeatureResult};
use crate::features::encodings::{industry_effect, location_effect, target_encoding, Category};
use crate::features::sequence::SequenceFeatures;
use crate::types::invoice::InvoiceFeatureInput;
use chrono::Datelike;
use std::f64::consts::PI;

/// Volatility assumed for every invoice until market data carries it
pub const MARKET_VOLATILITY: f64 = 0.05;

/// Consistency used in the efficiency interaction until two records exist
const INTERACTION_CONSISTENCY_PRIOR: f64 = 0.5;

/// Invoice and context vector, one named field per model input slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticFeatures {
    // Amount
    pub log_amount: f64,
    pub amount_sqrt: f64,
    pub log_amount_per_due_day: f64,
    // Credit score
    pub credit_norm: f64,
    pub credit_squared: f64,
    pub credit_cubed: f64,
    // Seasonality
    pub month_sin: f64,
    pub month_cos: f64,
    pub quarter_sin: f64,
    pub quarter_cos: f64,
    pub day_of_week_sin: f64,
    pub day_of_week_cos: f64,
    pub day_of_month_sin: f64,
    pub day_of_month_cos: f64,
    // Market
    pub market_condition: f64,
    pub payment_urgency: f64,
    pub market_trend: f64,
    pub market_volatility: f64,
    // Fixed effects
    pub industry_effect: f64,
    pub location_effect: f64,
    // Interactions
    pub credit_amount: f64,
    pub credit_market: f64,
    pub amount_market: f64,
    pub efficiency_consistency: f64,
    // Target encodings
    pub industry_encoded: f64,
    pub location_encoded: f64,
    pub payment_method_encoded: f64,
    pub segment_encoded: f64,
}

impl StaticFeatures {
    pub const LEN: usize = 28;

    /// Model input names, in vector order
    pub const NAMES: [&'static str; Self::LEN] = [
        "LogInvoiceAmount",
        "AmountSquareRoot",
        "LogAmountPerDueDay",
        "CreditScoreNorm",
        "CreditScoreSquared",
        "CreditScoreCubed",
        "MonthSin",
        "MonthCos",
        "QuarterSin",
        "QuarterCos",
        "DayOfWeekSin",
        "DayOfWeekCos",
        "DayOfMonthSin",
        "DayOfMonthCos",
        "MarketCondition",
        "PaymentUrgency",
        "MarketTrend",
        "MarketVolatility",
        "IndustrySeasonalEffect",
        "LocationEconomicIndex",
        "CreditScore_Amount",
        "CreditScore_Market",
        "Amount_Market",
        "Efficiency_Consistency",
        "Industry_TargetEncoded",
        "Location_TargetEncoded",
        "PaymentMethod_TargetEncoded",
        "Segment_TargetEncoded",
    ];

    /// Positional vector matching `NAMES`
    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.log_amount,
            self.amount_sqrt,
            self.log_amount_per_due_day,
            self.credit_norm,
            self.credit_squared,
            self.credit_cubed,
            self.month_sin,
            self.month_cos,
            self.quarter_sin,
            self.quarter_cos,
            self.day_of_week_sin,
            self.day_of_week_cos,
            self.day_of_month_sin,
            self.day_of_month_cos,
            self.market_condition,
            self.payment_urgency,
            self.market_trend,
            self.market_volatility,
            self.industry_effect,
            self.location_effect,
            self.credit_amount,
            self.credit_market,
            self.amount_market,
            self.efficiency_consistency,
            self.industry_encoded,
            self.location_encoded,
            self.payment_method_encoded,
            self.segment_encoded,
        ]
    }
}

/// Builds `StaticFeatures` for one invoice
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticFeatureBuilder;

impl StaticFeatureBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Derive the static vector. `behaviour` supplies the efficiency/consistency
    /// interaction; with fewer than two records behind it the consistency
    /// term is the 0.5 prior (the new-company prior gives 0.7 * 0.5)
    pub fn build(
        &self,
        invoice: &InvoiceFeatureInput,
        behaviour: &SequenceFeatures,
        history_len: usize,
    ) -> FeatureResult<StaticFeatures> {
        invoice.validate()?;

        let amount = invoice.amount;
        let log_amount = amount.ln_1p();
        let amount_per_due_day = amount / f64::from(invoice.payment_due_days);

        let credit_norm = (invoice.customer_credit_score - 650.0) / 100.0;

        let month = invoice.invoice_date.month();
        let quarter = month.div_ceil(3);
        let day_of_week = invoice.invoice_date.weekday().num_days_from_sunday();
        let day_of_month = invoice.day_of_month();

        let (month_sin, month_cos) = cyclic(month, 12.0);
        let (quarter_sin, quarter_cos) = cyclic(quarter, 4.0);
        let (day_of_week_sin, day_of_week_cos) = cyclic(day_of_week, 7.0);
        let (day_of_month_sin, day_of_month_cos) = cyclic(day_of_month, 30.0);

        let market = invoice.market_condition;
        let interaction_consistency = if history_len > 1 {
            behaviour.consistency
        } else {
            INTERACTION_CONSISTENCY_PRIOR
        };

        let features = StaticFeatures {
            log_amount,
            amount_sqrt: amount.sqrt(),
            log_amount_per_due_day: amount_per_due_day.ln_1p(),
            credit_norm,
            credit_squared: credit_norm.powi(2),
            credit_cubed: credit_norm.powi(3),
            month_sin,
            month_cos,
            quarter_sin,
            quarter_cos,
            day_of_week_sin,
            day_of_week_cos,
            day_of_month_sin,
            day_of_month_cos,
            market_condition: market,
            payment_urgency: invoice.payment_urgency,
            market_trend: market,
            market_volatility: MARKET_VOLATILITY,
            industry_effect: industry_effect(&invoice.customer_industry),
            location_effect: location_effect(&invoice.customer_location),
            credit_amount: credit_norm * log_amount,
            credit_market: credit_norm * market,
            amount_market: log_amount * market,
            efficiency_consistency: behaviour.efficiency_all_time * interaction_consistency,
            industry_encoded: target_encoding(Category::Industry, &invoice.customer_industry),
            location_encoded: target_encoding(Category::Location, &invoice.customer_location),
            payment_method_encoded: target_encoding(
                Category::PaymentMethod,
                &invoice.payment_method,
            ),
            segment_encoded: target_encoding(Category::Segment, &invoice.customer_segment),
        };

        if let Some((index, _)) = features
            .to_vec()
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite())
        {
            return Err(FeatureError::validation(
                StaticFeatures::NAMES[index],
                "not finite",
            ));
        }

        Ok(features)
    }
}

/// `(sin, cos)` of `2π·value/period`
fn cyclic(value: u32, period: f64) -> (f64, f64) {
    let angle = 2.0 * PI * f64::from(value) / period;
    (angle.sin(), angle.cos())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::sequence::BehavioralFeatureBuilder;
    use crate::types::payment::PaymentRecord;
    use chrono::{TimeZone, Utc};

    fn invoice() -> InvoiceFeatureInput {
        // 2024-03-15 is a Friday
        InvoiceFeatureInput::new("inv-1", "cust-1", 100_000.0, 30, 750.0)
            .with_profile("IT", "Mumbai")
            .with_invoice_date(Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap())
    }

    #[test]
    fn test_names_match_vector_length() {
        let features = StaticFeatureBuilder::new()
            .build(&invoice(), &SequenceFeatures::new_company(), 0)
            .unwrap();
        assert_eq!(StaticFeatures::NAMES.len(), StaticFeatures::LEN);
        assert_eq!(features.to_vec().len(), StaticFeatures::LEN);
    }

    #[test]
    fn test_amount_and_credit_transforms() {
        let f = StaticFeatureBuilder::new()
            .build(&invoice(), &SequenceFeatures::new_company(), 0)
            .unwrap();

        assert!((f.log_amount - 100_001f64.ln()).abs() < 1e-12);
        assert!((f.amount_sqrt - 316.227_766_016_837_9).abs() < 1e-9);
        assert!((f.log_amount_per_due_day - (1.0 + 100_000.0 / 30.0f64).ln()).abs() < 1e-12);
        assert_eq!(f.credit_norm, 1.0);
        assert_eq!(f.credit_squared, 1.0);
        assert_eq!(f.credit_cubed, 1.0);
        assert!((f.credit_amount - f.log_amount).abs() < 1e-12);
        assert_eq!(f.credit_market, 1.0);
        assert!((f.amount_market - f.log_amount).abs() < 1e-12);
    }

    #[test]
    fn test_seasonality_encoding() {
        let f = StaticFeatureBuilder::new()
            .build(&invoice(), &SequenceFeatures::new_company(), 0)
            .unwrap();

        // March: angle pi/2; Q1: angle pi/2; Friday = 5; day 15: angle pi
        assert!((f.month_sin - 1.0).abs() < 1e-12);
        assert!(f.month_cos.abs() < 1e-12);
        assert!((f.quarter_sin - 1.0).abs() < 1e-12);
        assert!((f.day_of_week_sin - (2.0 * PI * 5.0 / 7.0).sin()).abs() < 1e-12);
        assert!(f.day_of_month_sin.abs() < 1e-12);
        assert!((f.day_of_month_cos + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_december_and_january_are_close() {
        let builder = StaticFeatureBuilder::new();
        let prior = SequenceFeatures::new_company();
        let dec = builder
            .build(
                &invoice().with_invoice_date(Utc.with_ymd_and_hms(2023, 12, 20, 0, 0, 0).unwrap()),
                &prior,
                0,
            )
            .unwrap();
        let jan = builder
            .build(
                &invoice().with_invoice_date(Utc.with_ymd_and_hms(2024, 1, 20, 0, 0, 0).unwrap()),
                &prior,
                0,
            )
            .unwrap();
        let jun = builder
            .build(
                &invoice().with_invoice_date(Utc.with_ymd_and_hms(2024, 6, 20, 0, 0, 0).unwrap()),
                &prior,
                0,
            )
            .unwrap();

        let dist = |a: &StaticFeatures, b: &StaticFeatures| {
            ((a.month_sin - b.month_sin).powi(2) + (a.month_cos - b.month_cos).powi(2)).sqrt()
        };
        assert!(dist(&dec, &jan) < dist(&dec, &jun));
    }

    #[test]
    fn test_market_and_lookups() {
        let mut input = invoice();
        input.market_condition = 1.2;
        input.payment_urgency = 0.9;
        input.payment_method = "UPI".to_string();
        input.customer_segment = "Reliable".to_string();

        let f = StaticFeatureBuilder::new()
            .build(&input, &SequenceFeatures::new_company(), 0)
            .unwrap();

        assert_eq!(f.market_condition, 1.2);
        assert_eq!(f.market_trend, 1.2);
        assert_eq!(f.payment_urgency, 0.9);
        assert_eq!(f.market_volatility, MARKET_VOLATILITY);
        assert_eq!(f.industry_effect, -0.2);
        assert_eq!(f.location_effect, -0.1);
        assert_eq!(f.industry_encoded, 0.75);
        assert_eq!(f.location_encoded, 0.73);
        assert_eq!(f.payment_method_encoded, 0.78);
        assert_eq!(f.segment_encoded, 0.85);
    }

    #[test]
    fn test_efficiency_consistency_interaction() {
        let builder = StaticFeatureBuilder::new();
        let prior = builder
            .build(&invoice(), &SequenceFeatures::new_company(), 0)
            .unwrap();
        assert!((prior.efficiency_consistency - 0.35).abs() < 1e-12);

        let mut behaviour = SequenceFeatures::new_company();
        behaviour.efficiency_all_time = 0.9;
        behaviour.consistency = 0.8;
        let f = builder.build(&invoice(), &behaviour, 5).unwrap();
        assert!((f.efficiency_consistency - 0.72).abs() < 1e-12);
    }

    #[test]
    fn test_single_record_interaction_uses_consistency_prior() {
        let history = [PaymentRecord::new(
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
            20_000.0,
            12,
            0.9,
        )];
        let behaviour = BehavioralFeatureBuilder::new()
            .build(&history, Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap())
            .unwrap();
        // One record has no spread, so the behaviour vector reports full consistency
        assert_eq!(behaviour.consistency, 1.0);

        let f = StaticFeatureBuilder::new()
            .build(&invoice(), &behaviour, history.len())
            .unwrap();
        assert!((f.efficiency_consistency - 0.45).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_invoice_is_rejected() {
        let mut input = invoice();
        input.amount = -10.0;
        assert_eq!(
            StaticFeatureBuilder::new().build(&input, &SequenceFeatures::new_company(), 0),
            Err(FeatureError::InvalidAmount { amount: -10.0 })
        );
    }
}
