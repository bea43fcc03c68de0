//! Regressor invocation
//!
//! Runs the loaded regressor on an aligned record, tracks inference
//! statistics and hands the log-space output to the [`PriceFormatter`].

use super::output::PriceFormatter;
use super::Regressor;
use crate::error::{EstimatorError, Result};
use crate::models::{AlignedRecord, PricePrediction};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 50;

/// Invokes the regressor and formats its output
pub struct PredictionService {
    formatter: PriceFormatter,
    inference_count: AtomicU64,
    slow_inference_count: AtomicU64,
    failed_inference_count: AtomicU64,
}

impl Default for PredictionService {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictionService {
    pub fn new() -> Self {
        Self {
            formatter: PriceFormatter::new(),
            inference_count: AtomicU64::new(0),
            slow_inference_count: AtomicU64::new(0),
            failed_inference_count: AtomicU64::new(0),
        }
    }

    /// Predict and format the price for an aligned record
    pub fn predict(
        &self,
        record: &AlignedRecord,
        regressor: &dyn Regressor,
    ) -> Result<PricePrediction> {
        let start = Instant::now();

        let log_price = regressor.predict(record).map_err(|e| {
            self.failed_inference_count.fetch_add(1, Ordering::Relaxed);
            EstimatorError::Prediction(format!("{:#}", e))
        })?;

        let elapsed = start.elapsed();
        self.inference_count.fetch_add(1, Ordering::Relaxed);

        if elapsed.as_millis() > MAX_INFERENCE_MS {
            self.slow_inference_count.fetch_add(1, Ordering::Relaxed);
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), log_price = log_price, "Inference completed");
        }

        self.formatter.format(log_price)
    }

    /// Get inference statistics
    pub fn stats(&self) -> InferenceStats {
        InferenceStats {
            total_inferences: self.inference_count.load(Ordering::Relaxed),
            slow_inferences: self.slow_inference_count.load(Ordering::Relaxed),
            failed_inferences: self.failed_inference_count.load(Ordering::Relaxed),
        }
    }
}

/// Inference statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceStats {
    pub total_inferences: u64,
    pub slow_inferences: u64,
    pub failed_inferences: u64,
}
