//! Robust (center/scale) feature scaling

use crate::error::{FeatureError, FeatureResult};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// Fitted per-feature center and scale, as exported with the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParameters {
    #[serde(rename = "center_")]
    pub center: Vec<f64>,
    #[serde(rename = "scale_")]
    pub scale: Vec<f64>,
}

impl ScalerParameters {
    /// Zeros/ones parameters that leave a vector unchanged
    pub fn identity(len: usize) -> Self {
        Self {
            center: vec![0.0; len],
            scale: vec![1.0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.center.len()
    }

    pub fn is_empty(&self) -> bool {
        self.center.is_empty()
    }
}

/// Elementwise `(v[i] - center[i]) / scale[i]`
///
/// A zero (or non-finite) scale is treated as 1 and logged
pub fn scale(vector: &[f64], center: &[f64], scale_factors: &[f64]) -> FeatureResult<Vec<f64>> {
    scale_counting(vector, center, scale_factors, "vector").map(|(scaled, _)| scaled)
}

fn scale_counting(
    vector: &[f64],
    center: &[f64],
    scale_factors: &[f64],
    context: &'static str,
) -> FeatureResult<(Vec<f64>, u64)> {
    if center.len() != vector.len() {
        return Err(FeatureError::DimensionMismatch {
            context,
            expected: vector.len(),
            actual: center.len(),
        });
    }
    if scale_factors.len() != vector.len() {
        return Err(FeatureError::DimensionMismatch {
            context,
            expected: vector.len(),
            actual: scale_factors.len(),
        });
    }

    let mut substitutions: u64 = 0;
    let scaled: Vec<f64> = vector
        .iter()
        .zip(center)
        .zip(scale_factors)
        .enumerate()
        .map(|(index, ((&v, &c), &s))| {
            let s = if s == 0.0 || !s.is_finite() {
                warn!(
                    scaler = context,
                    index = index,
                    scale = s,
                    "Degenerate scale factor, using 1.0"
                );
                substitutions += 1;
                1.0
            } else {
                s
            };
            (v - c) / s
        })
        .collect();

    Ok((scaled, substitutions))
}

/// One fitted scaler with a fixed dimensionality
#[derive(Debug)]
pub struct RobustScaler {
    name: &'static str,
    params: ScalerParameters,
    zero_scale_substitutions: AtomicU64,
}

impl RobustScaler {
    /// Build from fitted parameters, checking they describe `expected_len` features
    pub fn new(
        name: &'static str,
        params: ScalerParameters,
        expected_len: usize,
    ) -> FeatureResult<Self> {
        for actual in [params.center.len(), params.scale.len()] {
            if actual != expected_len {
                return Err(FeatureError::DimensionMismatch {
                    context: name,
                    expected: expected_len,
                    actual,
                });
            }
        }

        Ok(Self {
            name,
            params,
            zero_scale_substitutions: AtomicU64::new(0),
        })
    }

    /// Scaler that leaves vectors of `len` features unchanged
    pub fn identity(name: &'static str, len: usize) -> Self {
        Self {
            name,
            params: ScalerParameters::identity(len),
            zero_scale_substitutions: AtomicU64::new(0),
        }
    }

    /// Scale one vector
    pub fn transform(&self, vector: &[f64]) -> FeatureResult<Vec<f64>> {
        let (scaled, substitutions) =
            scale_counting(vector, &self.params.center, &self.params.scale, self.name)?;
        if substitutions > 0 {
            self.zero_scale_substitutions
                .fetch_add(substitutions, Ordering::Relaxed);
        }
        Ok(scaled)
    }

    /// Number of features this scaler expects
    pub fn dimension(&self) -> usize {
        self.params.len()
    }

    /// How many zero scale factors have been replaced by 1 so far
    pub fn zero_scale_substitutions(&self) -> u64 {
        self.zero_scale_substitutions.load(Ordering::Relaxed)
    }

    pub fn params(&self) -> &ScalerParameters {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_parameters_leave_vector_unchanged() {
        let v = vec![1.5, -3.0, 0.0, 1e6];
        assert_eq!(scale(&v, &[0.0; 4], &[1.0; 4]).unwrap(), v);

        let scaler = RobustScaler::identity("test", 4);
        assert_eq!(scaler.transform(&v).unwrap(), v);
    }

    #[test]
    fn test_center_and_scale() {
        let scaled = scale(&[10.0, 4.0], &[2.0, 4.0], &[4.0, 0.5]).unwrap();
        assert_eq!(scaled, vec![2.0, 0.0]);
    }

    #[test]
    fn test_zero_scale_is_treated_as_one() {
        let scaled = scale(&[5.0], &[0.0], &[0.0]).unwrap();
        assert_eq!(scaled, vec![5.0]);
        assert!(scaled[0].is_finite());

        let scaler = RobustScaler::new(
            "static",
            ScalerParameters {
                center: vec![1.0, 1.0],
                scale: vec![0.0, 2.0],
            },
            2,
        )
        .unwrap();
        assert_eq!(scaler.transform(&[3.0, 3.0]).unwrap(), vec![2.0, 1.0]);
        scaler.transform(&[3.0, 3.0]).unwrap();
        assert_eq!(scaler.zero_scale_substitutions(), 2);
    }

    #[test]
    fn test_dimension_mismatch() {
        assert!(matches!(
            scale(&[1.0, 2.0], &[0.0], &[1.0, 1.0]),
            Err(FeatureError::DimensionMismatch { expected: 2, actual: 1, .. })
        ));
        assert!(matches!(
            scale(&[1.0], &[0.0], &[1.0, 1.0]),
            Err(FeatureError::DimensionMismatch { expected: 1, actual: 2, .. })
        ));

        let scaler = RobustScaler::identity("sequence", 8);
        assert!(matches!(
            scaler.transform(&[0.0; 7]),
            Err(FeatureError::DimensionMismatch { context: "sequence", .. })
        ));

        assert!(RobustScaler::new("sequence", ScalerParameters::identity(7), 8).is_err());
    }

    #[test]
    fn test_parameters_deserialize_from_fitted_names() {
        let json = r#"{"center_": [0.5, 1.0], "scale_": [0.25, 2.0]}"#;
        let params: ScalerParameters = serde_json::from_str(json).unwrap();
        assert_eq!(params.center, vec![0.5, 1.0]);
        assert_eq!(params.scale, vec![0.25, 2.0]);
    }
}
