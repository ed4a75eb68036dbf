//! Numeric helpers over payment history

use crate::types::payment::PaymentRecord;
use chrono::{DateTime, Utc};

/// Frequency reported when a history is too short to measure a span
pub const DEFAULT_MONTHLY_FREQUENCY: f64 = 0.1;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Arithmetic mean; 0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by N); 0 for fewer than two values
pub fn standard_deviation(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Ordinary least squares slope of values against their 0-based index
///
/// Returns 0 for fewer than two values or when the fit is degenerate
pub fn linear_trend_slope(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }

    let n = values.len() as f64;
    let sum_x = n * (n - 1.0) / 2.0;
    let sum_x2 = n * (n - 1.0) * (2.0 * n - 1.0) / 6.0;
    let sum_y: f64 = values.iter().sum();
    let sum_xy: f64 = values
        .iter()
        .enumerate()
        .map(|(i, v)| i as f64 * v)
        .sum();

    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 {
        return 0.0;
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    if slope.is_finite() {
        slope
    } else {
        0.0
    }
}

/// Payments per month across the span between the earliest and latest record
///
/// Spans shorter than a month count as one month
pub fn payment_frequency_per_month(history: &[PaymentRecord]) -> f64 {
    if history.len() < 2 {
        return DEFAULT_MONTHLY_FREQUENCY;
    }

    let first = history.iter().map(|r| r.date).min();
    let last = history.iter().map(|r| r.date).max();

    let span_days = match (first, last) {
        (Some(first), Some(last)) => days_between(first, last),
        _ => 0.0,
    };

    history.len() as f64 / (span_days / 30.0).max(1.0)
}

/// Fractional days from `earlier` to `later`
pub fn days_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).num_seconds() as f64 / SECONDS_PER_DAY
}

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
