//! Observability infrastructure for the price estimator
//!
//! Provides:
//! - Prometheus metrics (prediction latency, load duration, error counts, model state)
//! - Structured JSON logging with tracing

use crate::error::EstimatorError;
use crate::lifecycle::LifecyclePhase;
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, register_int_counter_vec,
    register_int_gauge, GaugeVec, Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Buckets for artifact load duration (in seconds)
const LOAD_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<EstimatorMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct EstimatorMetricsInner {
    prediction_latency_seconds: Histogram,
    model_load_duration_seconds: Histogram,
    predictions_total: IntCounter,
    prediction_errors: IntCounterVec,
    model_load_attempts: IntCounter,
    model_state: IntGauge,
    model_info: GaugeVec,
}

impl EstimatorMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "price_estimator_prediction_latency_seconds",
                "Time spent serving a prediction request end to end",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            model_load_duration_seconds: register_histogram!(
                "price_estimator_model_load_duration_seconds",
                "Time spent reading and parsing the encoder and regressor",
                LOAD_BUCKETS.to_vec()
            )
            .expect("Failed to register model_load_duration_seconds"),

            predictions_total: register_int_counter!(
                "price_estimator_predictions_total",
                "Total number of prices predicted"
            )
            .expect("Failed to register predictions_total"),

            prediction_errors: register_int_counter_vec!(
                "price_estimator_prediction_errors_total",
                "Prediction requests that failed, by error kind",
                &["kind"]
            )
            .expect("Failed to register prediction_errors_total"),

            model_load_attempts: register_int_counter!(
                "price_estimator_model_load_attempts_total",
                "Number of model load attempts started"
            )
            .expect("Failed to register model_load_attempts_total"),

            model_state: register_int_gauge!(
                "price_estimator_model_state",
                "Model lifecycle state (0 unloaded, 1 loading, 2 ready, 3 failed)"
            )
            .expect("Failed to register model_state"),

            model_info: register_gauge_vec!(
                "price_estimator_model_info",
                "Checksums of the currently loaded artifacts",
                &["encoder_sha256", "regressor_sha256"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Estimator metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct EstimatorMetrics {
    // This is just a marker - we use the global instance
    _private: (),
}

impl Default for EstimatorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EstimatorMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(EstimatorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &EstimatorMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Record a prediction latency observation
    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    /// Record how long a load attempt took
    pub fn observe_load_duration(&self, duration_secs: f64) {
        self.inner().model_load_duration_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self) {
        self.inner().predictions_total.inc();
    }

    /// Count a failed prediction request under its error kind
    pub fn inc_prediction_errors(&self, error: &EstimatorError) {
        self.inner()
            .prediction_errors
            .with_label_values(&[error.kind()])
            .inc();
    }

    pub fn inc_load_attempts(&self) {
        self.inner().model_load_attempts.inc();
    }

    pub fn set_model_state(&self, phase: LifecyclePhase) {
        self.inner().model_state.set(phase.code());
    }

    /// Update loaded model info
    pub fn set_model_info(&self, encoder_checksum: &str, regressor_checksum: &str) {
        // Reset previous model
        self.inner().model_info.reset();
        self.inner()
            .model_info
            .with_label_values(&[encoder_checksum, regressor_checksum])
            .set(1.0);
    }
}

/// Structured logger for estimator events
///
/// Provides consistent JSON-formatted logging for model loading,
/// predictions and rejected requests.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str, artifacts: &str) {
        info!(
            event = "service_started",
            instance = %self.instance,
            service_version = %version,
            artifacts = %artifacts,
            "Price estimator started"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Price estimator shutting down"
        );
    }

    pub fn log_load_started(&self, attempt: u64, artifacts: &str) {
        info!(
            event = "model_load_started",
            instance = %self.instance,
            attempt = attempt,
            artifacts = %artifacts,
            "Loading encoder and regressor in the background"
        );
    }

    pub fn log_model_loaded(
        &self,
        attempt: u64,
        elapsed: Duration,
        feature_count: usize,
        encoder_checksum: &str,
        regressor_checksum: &str,
    ) {
        info!(
            event = "model_loaded",
            instance = %self.instance,
            attempt = attempt,
            elapsed_ms = elapsed.as_millis() as u64,
            feature_count = feature_count,
            encoder_sha256 = %encoder_checksum,
            regressor_sha256 = %regressor_checksum,
            "Model and encoder loaded successfully"
        );
    }

    pub fn log_load_failed(&self, attempt: u64, error: &EstimatorError) {
        warn!(
            event = "model_load_failed",
            instance = %self.instance,
            attempt = attempt,
            error = %error,
            "Error loading model"
        );
    }

    /// Log a served prediction
    pub fn log_prediction(&self, price: u64, log_price: f64, elapsed: Duration) {
        info!(
            event = "prediction_served",
            instance = %self.instance,
            price = price,
            log_price = log_price,
            elapsed_us = elapsed.as_micros() as u64,
            "Predicted property price"
        );
    }

    /// Log a prediction request that did not produce a price
    pub fn log_request_rejected(&self, error: &EstimatorError) {
        if error.is_retryable() {
            info!(
                event = "request_rejected",
                instance = %self.instance,
                kind = error.kind(),
                "Prediction requested before the model was ready"
            );
        } else {
            warn!(
                event = "request_rejected",
                instance = %self.instance,
                kind = error.kind(),
                error = %error,
                "Prediction request failed"
            );
        }
    }
}
