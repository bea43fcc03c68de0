//! Inference pipeline
//!
//! Turns a prediction request into a price in four stages: feature
//! construction, encoding, schema alignment and regression. The encoder
//! and regressor are collaborators behind traits so that any artifact
//! format can back them.

mod alignment;
mod features;
mod inference;
mod output;

pub use alignment::{EncodingAligner, ALIGNMENT_FILL_VALUE};
pub use features::{FeatureBuilder, DEFAULT_ROOM_VALUE, PARKING_YES, ROOM_VALUE_CODES};
pub use inference::{InferenceStats, PredictionService};
pub use output::{group_thousands, PriceFormatter, CURRENCY_CODE};

use crate::models::{AlignedRecord, EncodedRecord, FeatureRecord};
use anyhow::Result;

/// Categorical encoder fitted at training time
pub trait Encoder: Send + Sync {
    /// Encode a feature record into named numeric columns
    fn transform(&self, record: &FeatureRecord) -> Result<EncodedRecord>;
}

/// Regression model predicting the log-transformed price
pub trait Regressor: Send + Sync {
    /// Ordered feature names the model was trained on
    fn feature_names(&self) -> &[String];

    /// Predict `ln(price)` for a record aligned to [`Regressor::feature_names`]
    fn predict(&self, record: &AlignedRecord) -> Result<f64>;
}
