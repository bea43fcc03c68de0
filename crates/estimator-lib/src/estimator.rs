//! Request pipeline
//!
//! Ties the model lifecycle to the per-request stages:
//! readiness -> feature construction -> encoding and alignment -> inference.

use crate::error::{EstimatorError, Result};
use crate::lifecycle::{LifecyclePhase, LoadedModel, ModelLifecycle};
use crate::models::{PredictRequest, PricePrediction};
use crate::observability::{EstimatorMetrics, StructuredLogger};
use crate::predictor::{EncodingAligner, FeatureBuilder, InferenceStats, PredictionService};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

const LOADING_MESSAGE: &str = "Model is loading, please wait...";
const READY_MESSAGE: &str = "Model is ready! You can now proceed to make predictions.";

/// Body of the status endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub status: LifecyclePhase,
    pub message: String,
}

/// Serves price predictions from the lazily loaded model
#[derive(Clone)]
pub struct PriceEstimator {
    lifecycle: ModelLifecycle,
    features: FeatureBuilder,
    aligner: EncodingAligner,
    service: Arc<PredictionService>,
    metrics: EstimatorMetrics,
    logger: StructuredLogger,
}

impl PriceEstimator {
    pub fn new(lifecycle: ModelLifecycle, logger: StructuredLogger) -> Self {
        Self {
            lifecycle,
            features: FeatureBuilder::new(),
            aligner: EncodingAligner::new(),
            service: Arc::new(PredictionService::new()),
            metrics: EstimatorMetrics::new(),
            logger,
        }
    }

    pub fn lifecycle(&self) -> &ModelLifecycle {
        &self.lifecycle
    }

    /// Current status; starts the load if nothing has been loaded yet.
    ///
    /// An unloaded model is reported as loading since the poll just kicked
    /// it off.
    pub fn status(&self) -> ServiceStatus {
        match self.lifecycle.poll() {
            LifecyclePhase::Ready => ServiceStatus {
                status: LifecyclePhase::Ready,
                message: READY_MESSAGE.to_string(),
            },
            LifecyclePhase::Failed => {
                let reason = self
                    .lifecycle
                    .last_error()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "unknown error".to_string());
                ServiceStatus {
                    status: LifecyclePhase::Failed,
                    message: format!("Model failed to load: {}", reason),
                }
            }
            LifecyclePhase::Unloaded | LifecyclePhase::Loading => ServiceStatus {
                status: LifecyclePhase::Loading,
                message: LOADING_MESSAGE.to_string(),
            },
        }
    }

    /// Predict the price for a request
    pub fn estimate(&self, request: &PredictRequest) -> Result<PricePrediction> {
        self.observe(|| {
            let model = self.lifecycle.ensure_ready()?;
            self.run(&model, request)
        })
    }

    /// Predict from a request body that may have failed to parse.
    ///
    /// Readiness is checked first, so a client hitting a loading model gets
    /// the not-ready answer whatever it sent.
    pub fn estimate_payload(
        &self,
        payload: std::result::Result<PredictRequest, String>,
    ) -> Result<PricePrediction> {
        self.observe(|| {
            let model = self.lifecycle.ensure_ready()?;
            let request = payload.map_err(EstimatorError::MalformedRequest)?;
            self.run(&model, &request)
        })
    }

    pub fn inference_stats(&self) -> InferenceStats {
        self.service.stats()
    }

    fn run(&self, model: &LoadedModel, request: &PredictRequest) -> Result<PricePrediction> {
        let record = self.features.build(request)?;
        let aligned = self.aligner.align(
            &record,
            model.encoder.as_ref(),
            model.regressor.feature_names(),
        )?;
        self.service.predict(&aligned, model.regressor.as_ref())
    }

    fn observe(&self, f: impl FnOnce() -> Result<PricePrediction>) -> Result<PricePrediction> {
        let start = Instant::now();
        let outcome = f();
        let elapsed = start.elapsed();

        match &outcome {
            Ok(prediction) => {
                self.metrics.inc_predictions();
                self.metrics
                    .observe_prediction_latency(elapsed.as_secs_f64());
                self.logger
                    .log_prediction(prediction.price, prediction.log_price, elapsed);
            }
            Err(err) => {
                self.metrics.inc_prediction_errors(err);
                self.logger.log_request_rejected(err);
            }
        }
        outcome
    }
}
