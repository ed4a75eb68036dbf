//! Property tests for the numeric building blocks

use invoice_payment_predictor::features::statistics::{linear_trend_slope, mean, standard_deviation};
use invoice_payment_predictor::features::SequenceFeatures;
use invoice_payment_predictor::models::inference::{
    FixedNoise, PredictionHeuristic, MAX_PREDICTED_DAYS, MIN_PREDICTED_DAYS,
};
use invoice_payment_predictor::models::scaler::scale;
use proptest::prelude::*;

proptest! {
    #[test]
    fn standard_deviation_is_never_negative(values in prop::collection::vec(-1e6f64..1e6, 0..50)) {
        prop_assert!(standard_deviation(&values) >= 0.0);
    }

    #[test]
    fn constant_series_has_no_spread_or_trend(value in -1e3f64..1e3, len in 2usize..30) {
        let values = vec![value; len];
        prop_assert!(standard_deviation(&values).abs() < 1e-9);
        prop_assert!(linear_trend_slope(&values).abs() < 1e-9);
        prop_assert!((mean(&values) - value).abs() < 1e-9);
    }

    #[test]
    fn identity_scaling_is_a_no_op(values in prop::collection::vec(-1e9f64..1e9, 0..40)) {
        let center = vec![0.0; values.len()];
        let factors = vec![1.0; values.len()];
        prop_assert_eq!(scale(&values, &center, &factors).unwrap(), values);
    }

    #[test]
    fn zero_scale_stays_finite(value in -1e9f64..1e9, center in -1e9f64..1e9) {
        let scaled = scale(&[value], &[center], &[0.0]).unwrap();
        prop_assert!(scaled[0].is_finite());
        prop_assert_eq!(scaled[0], value - center);
    }

    #[test]
    fn prediction_stays_in_range(
        efficiency in 0.0f64..=1.0,
        consistency in 0.0f64..=1.0,
        trend in -1.0f64..1.0,
        static_level in -1e4f64..1e4,
        noise in -1.0f64..=1.0,
        due in 1u32..180,
        history_len in 0usize..60,
    ) {
        let mut sequence = SequenceFeatures::new_company().to_vec();
        sequence[SequenceFeatures::EFFICIENCY_ALL_INDEX] = efficiency;
        sequence[SequenceFeatures::CONSISTENCY_INDEX] = consistency;
        sequence[SequenceFeatures::TREND_INDEX] = trend;

        let result = PredictionHeuristic::default()
            .estimate(&sequence, &[static_level; 28], due, history_len, &mut FixedNoise(noise))
            .unwrap();

        prop_assert!(result.predicted_days_to_payment >= MIN_PREDICTED_DAYS);
        prop_assert!(result.predicted_days_to_payment <= MAX_PREDICTED_DAYS);
        prop_assert!((0.6..=0.95).contains(&result.confidence_score));
    }
}
