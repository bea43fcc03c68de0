//! Estimator library for property price inference
//!
//! This crate provides the core functionality for:
//! - Loading the encoder and regressor artifacts, lazily and exactly once
//! - Feature construction, encoding and schema alignment
//! - Regressor inference and price formatting
//! - Health checks and observability

pub mod artifacts;
pub mod error;
pub mod estimator;
pub mod health;
pub mod lifecycle;
pub mod models;
pub mod observability;
pub mod predictor;

pub use artifacts::{ArtifactSource, ArtifactStore, ArtifactStoreConfig};
pub use error::{EstimatorError, Result, MODEL_NOT_READY_MESSAGE};
pub use estimator::{PriceEstimator, ServiceStatus};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use lifecycle::{LifecycleConfig, LifecyclePhase, ModelLifecycle};
pub use models::*;
pub use observability::{EstimatorMetrics, StructuredLogger};
