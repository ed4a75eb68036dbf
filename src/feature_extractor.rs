//! Feature extraction for payment-delay model inference
//!
//! This module turns an invoice and its customer's payment history into the
//! two vectors the trained model consumes, in the order recorded in the
//! model artifacts

use crate::error::FeatureResult;
use crate::features::{
    BehavioralFeatureBuilder, SequenceFeatures, StaticFeatureBuilder, StaticFeatures,
};
use crate::types::invoice::InvoiceFeatureInput;
use crate::types::payment::PaymentRecord;
use chrono::{DateTime, Utc};

/// Both raw feature vectors for one invoice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureSet {
    pub sequence: SequenceFeatures,
    pub invoice: StaticFeatures,
}

impl FeatureSet {
    /// Sequence vector in model order
    pub fn sequence_vec(&self) -> Vec<f64> {
        self.sequence.to_vec()
    }

    /// Static vector in model order
    pub fn static_vec(&self) -> Vec<f64> {
        self.invoice.to_vec()
    }
}

/// Feature extractor that combines behavioural and per-invoice features
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    sequence_builder: BehavioralFeatureBuilder,
    static_builder: StaticFeatureBuilder,
}

impl FeatureExtractor {
    /// Create a new feature extractor
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract both vectors for `invoice` given the customer's `history`
    ///
    /// `now` anchors the "days since last record" feature
    pub fn extract(
        &self,
        invoice: &InvoiceFeatureInput,
        history: &[PaymentRecord],
        now: DateTime<Utc>,
    ) -> FeatureResult<FeatureSet> {
        let sequence = self.sequence_builder.build(history, now)?;
        let invoice = self.static_builder.build(invoice, &sequence, history.len())?;
        Ok(FeatureSet { sequence, invoice })
    }

    /// Behavioural features alone, for customer-level assessments
    pub fn behaviour(
        &self,
        history: &[PaymentRecord],
        now: DateTime<Utc>,
    ) -> FeatureResult<SequenceFeatures> {
        self.sequence_builder.build(history, now)
    }

    /// Get the number of sequence features produced
    pub fn sequence_feature_count(&self) -> usize {
        SequenceFeatures::LEN
    }

    /// Get the number of static features produced
    pub fn static_feature_count(&self) -> usize {
        StaticFeatures::LEN
    }

    /// Sequence feature names (model order)
    pub fn sequence_feature_names(&self) -> Vec<&'static str> {
        SequenceFeatures::NAMES.to_vec()
    }

    /// Static feature names (model order)
    pub fn static_feature_names(&self) -> Vec<&'static str> {
        StaticFeatures::NAMES.to_vec()
    }
}
