//! Health and readiness reporting
//!
//! Components report a status; the overall status is the worst of them.
//! Readiness additionally requires the model to be loaded.

use crate::error::EstimatorError;
use crate::lifecycle::LifecyclePhase;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Operational but not at full capacity (e.g. the model is still loading)
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn new(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::new(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::new(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::new(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

/// Body of the health endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: BTreeMap<String, ComponentHealth>,
}

/// Body of the readiness endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    /// Encoder and regressor files, mirrored from the model lifecycle
    pub const ARTIFACTS: &str = "artifacts";
    /// Request pipeline
    pub const PREDICTOR: &str = "predictor";
}

#[derive(Debug, Default)]
struct HealthState {
    components: BTreeMap<String, ComponentHealth>,
    model_loaded: bool,
}

impl HealthState {
    fn overall(&self) -> ComponentStatus {
        self.components
            .values()
            .map(|c| c.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy)
    }
}

/// Shared registry of component health
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    state: Arc<RwLock<HealthState>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component as healthy
    pub async fn register(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        self.state
            .write()
            .await
            .components
            .insert(name.to_string(), health);
    }

    /// Reflect a prediction outcome in the predictor component.
    ///
    /// Encoding and inference failures degrade it until the next success;
    /// client errors and not-ready rejections say nothing about the pipeline.
    pub async fn record_prediction(&self, outcome: Result<(), &EstimatorError>) {
        let health = match outcome {
            Ok(()) => ComponentHealth::healthy(),
            Err(err @ (EstimatorError::Encoding(_) | EstimatorError::Prediction(_))) => {
                ComponentHealth::degraded(err.to_string())
            }
            Err(_) => return,
        };
        self.update(components::PREDICTOR, health).await;
    }

    /// Reflect the model lifecycle in the artifacts component and readiness
    pub async fn record_lifecycle(&self, phase: LifecyclePhase, error: Option<&str>) {
        let health = match phase {
            LifecyclePhase::Ready => ComponentHealth::healthy(),
            LifecyclePhase::Unloaded => ComponentHealth::degraded("Model not loaded yet"),
            LifecyclePhase::Loading => ComponentHealth::degraded("Model is loading"),
            LifecyclePhase::Failed => {
                ComponentHealth::unhealthy(error.unwrap_or("Model failed to load"))
            }
        };

        let mut state = self.state.write().await;
        state
            .components
            .insert(components::ARTIFACTS.to_string(), health);
        state.model_loaded = phase == LifecyclePhase::Ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let state = self.state.read().await;
        HealthResponse {
            status: state.overall(),
            components: state.components.clone(),
        }
    }

    /// Ready when the model is loaded and no component is unhealthy
    pub async fn readiness(&self) -> ReadinessResponse {
        let state = self.state.read().await;
        let reason = if !state.model_loaded {
            Some("Model not loaded")
        } else if state.overall() == ComponentStatus::Unhealthy {
            Some("Critical component unhealthy")
        } else {
            None
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason: reason.map(str::to_string),
        }
    }
}
