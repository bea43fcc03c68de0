//! HTTP API for price predictions, health checks and Prometheus metrics

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use estimator_lib::{
    health::{components, ComponentStatus, HealthRegistry},
    EstimatorError, PredictRequest, PriceEstimator,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub estimator: PriceEstimator,
    pub health_registry: HealthRegistry,
}

impl AppState {
    pub async fn new(estimator: PriceEstimator, health_registry: HealthRegistry) -> Self {
        health_registry.register(components::PREDICTOR).await;
        let state = Self {
            estimator,
            health_registry,
        };
        state.refresh_health().await;
        state
    }

    /// Mirror the lifecycle phase into the health registry
    async fn refresh_health(&self) {
        let lifecycle = self.estimator.lifecycle();
        let error = lifecycle.last_error().map(|e| e.to_string());
        self.health_registry
            .record_lifecycle(lifecycle.phase(), error.as_deref())
            .await;
    }
}

/// Request-path error rendered as `{"error": ...}`
pub struct ApiError(EstimatorError);

impl From<EstimatorError> for ApiError {
    fn from(err: EstimatorError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            EstimatorError::ModelNotReady => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Lifecycle status; the first call starts loading the model
async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let status = state.estimator.status();
    state.refresh_health().await;
    Json(status)
}

/// Predict a property price
///
/// The body is taken as a `Result` so that readiness is decided before any
/// parse error is reported.
async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = payload
        .map(|Json(request)| request)
        .map_err(|rejection| rejection.body_text());

    let outcome = state.estimator.estimate_payload(payload);
    state
        .health_registry
        .record_prediction(outcome.as_ref().map(|_| ()))
        .await;

    let prediction = outcome?;
    Ok(Json(json!({ "predicted_price": prediction.formatted })))
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.refresh_health().await;
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still loading
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 once the model is loaded
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.refresh_health().await;
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            Vec::new(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Create the API router
///
/// Any origin may call the API, so a browser front end can post predictions
/// directly.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/predict", post(predict))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the API server, returning once `shutdown` resolves
pub async fn serve(
    addr: String,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
