//! Type definitions for the payment prediction pipeline

pub mod forecast;
pub mod invoice;
pub mod payment;
pub mod prediction;

pub use forecast::{
    CompanyFeatureSummary, CustomerRiskRequest, CustomerRiskResponse, ForecastEntry, ForecastRequest,
    ForecastSummary, RiskDistribution,
};
pub use invoice::{InvoiceFeatureInput, PredictionRequest};
pub use payment::{PaymentRecord, PaymentRecordedEvent};
pub use prediction::{PredictionResponse, PredictionResult, PredictionStatus, RiskLevel};
