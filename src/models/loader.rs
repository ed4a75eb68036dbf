//! Model artifact loader

use crate::error::{FeatureError, FeatureResult};
use crate::features::encodings::{known_values, Category};
use crate::features::{SequenceFeatures, StaticFeatures};
use crate::models::scaler::ScalerParameters;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Fitted scalers and input contracts exported alongside a trained model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifacts {
    /// Model version label
    pub model_version: String,
    /// Export timestamp as written by the training job
    #[serde(default)]
    pub timestamp: String,
    /// Scaler for the sequence (behavioural) vector
    pub sequence_scaler: ScalerParameters,
    /// Scaler for the static (invoice) vector
    pub static_scaler: ScalerParameters,
    /// Sequence feature names in model order
    pub sequence_features: Vec<String>,
    /// Static feature names in model order
    pub static_features: Vec<String>,
    /// Categories seen during training
    #[serde(default)]
    pub industries: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub payment_methods: Vec<String>,
    #[serde(default)]
    pub segments: Vec<String>,
}

/// Artifacts compiled into the binary, used when no file is configured
const BUNDLED_ARTIFACTS: &str = include_str!("../../config/model_artifacts.json");

impl ModelArtifacts {
    /// Identity scalers over the built-in feature layout
    pub fn identity() -> Self {
        let to_strings =
            |names: &[&str]| -> Vec<String> { names.iter().map(|n| n.to_string()).collect() };
        Self {
            model_version: "identity".to_string(),
            timestamp: String::new(),
            sequence_scaler: ScalerParameters::identity(SequenceFeatures::LEN),
            static_scaler: ScalerParameters::identity(StaticFeatures::LEN),
            sequence_features: to_strings(&SequenceFeatures::NAMES),
            static_features: to_strings(&StaticFeatures::NAMES),
            industries: to_strings(&known_values(Category::Industry)),
            locations: to_strings(&known_values(Category::Location)),
            payment_methods: to_strings(&known_values(Category::PaymentMethod)),
            segments: to_strings(&known_values(Category::Segment)),
        }
    }

    /// The fitted artifacts shipped with the crate
    pub fn bundled() -> Result<Self> {
        let artifacts: ModelArtifacts =
            serde_json::from_str(BUNDLED_ARTIFACTS).context("Failed to parse bundled model artifacts")?;
        artifacts
            .validate()
            .context("Bundled model artifacts do not match feature layout")?;
        Ok(artifacts)
    }

    /// Check the artifacts describe exactly the vectors this crate produces
    pub fn validate(&self) -> FeatureResult<()> {
        check_layout(
            "sequence features",
            &self.sequence_features,
            &SequenceFeatures::NAMES,
        )?;
        check_layout("static features", &self.static_features, &StaticFeatures::NAMES)?;

        for (context, params, expected) in [
            ("sequence scaler", &self.sequence_scaler, SequenceFeatures::LEN),
            ("static scaler", &self.static_scaler, StaticFeatures::LEN),
        ] {
            for actual in [params.center.len(), params.scale.len()] {
                if actual != expected {
                    return Err(FeatureError::DimensionMismatch {
                        context,
                        expected,
                        actual,
                    });
                }
            }
            if params.center.iter().chain(&params.scale).any(|v| !v.is_finite()) {
                return Err(FeatureError::validation(context, "non-finite parameter"));
            }
        }

        Ok(())
    }
}

fn check_layout(
    context: &'static str,
    names: &[String],
    expected: &[&'static str],
) -> FeatureResult<()> {
    if names.len() != expected.len() {
        return Err(FeatureError::DimensionMismatch {
            context,
            expected: expected.len(),
            actual: names.len(),
        });
    }
    if let Some((index, name)) = names
        .iter()
        .enumerate()
        .find(|(i, name)| name.as_str() != expected[*i])
    {
        return Err(FeatureError::validation(
            context,
            format!(
                "position {} is {:?}, expected {:?}",
                index, name, expected[index]
            ),
        ));
    }
    Ok(())
}

/// Loader for model artifacts
#[derive(Debug, Default)]
pub struct ModelLoader;

impl ModelLoader {
    /// Create a new model loader
    pub fn new() -> Self {
        Self
    }

    /// Load and validate artifacts from a JSON file
    pub fn load_artifacts<P: AsRef<Path>>(&self, path: P) -> Result<ModelArtifacts> {
        let path = path.as_ref();

        info!(path = %path.display(), "Loading model artifacts");

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model artifacts from {:?}", path))?;
        let artifacts: ModelArtifacts = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse model artifacts in {:?}", path))?;
        artifacts
            .validate()
            .with_context(|| format!("Model artifacts in {:?} do not match feature layout", path))?;

        info!(
            model_version = %artifacts.model_version,
            sequence_features = artifacts.sequence_features.len(),
            static_features = artifacts.static_features.len(),
            "Model artifacts loaded successfully"
        );

        Ok(artifacts)
    }

    /// Load artifacts, falling back to the bundled ones when the file is absent
    pub fn load_or_bundled<P: AsRef<Path>>(&self, path: P) -> Result<ModelArtifacts> {
        let path = path.as_ref();
        if path.exists() {
            return self.load_artifacts(path);
        }

        let artifacts = ModelArtifacts::bundled()?;
        warn!(
            path = %path.display(),
            model_version = %artifacts.model_version,
            "Model artifacts not found, using bundled artifacts"
        );
        Ok(artifacts)
    }
}
