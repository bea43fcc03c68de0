//! Error taxonomy for the inference pipeline
//!
//! Every stage of a prediction request maps its failures onto
//! [`EstimatorError`]; the HTTP layer turns it into a JSON envelope.

use thiserror::Error;

/// Message returned to callers while the model is not ready yet
pub const MODEL_NOT_READY_MESSAGE: &str = "Model is still loading, please try again later.";

/// Which artifact an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Encoder,
    Regressor,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Encoder => f.write_str("encoder"),
            ArtifactKind::Regressor => f.write_str("regressor"),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum EstimatorError {
    /// Artifact file missing, corrupt or incompatible
    #[error("failed to load {artifact} artifact: {reason}")]
    ArtifactLoad {
        artifact: ArtifactKind,
        reason: String,
    },

    /// Request arrived before the lifecycle reached READY
    #[error("{}", MODEL_NOT_READY_MESSAGE)]
    ModelNotReady,

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// The encoder could not represent the input
    #[error("encoding failed: {0}")]
    Encoding(String),

    /// The regressor call failed or produced an unusable value
    #[error("prediction failed: {0}")]
    Prediction(String),
}

impl EstimatorError {
    pub fn artifact_load(artifact: ArtifactKind, reason: impl Into<String>) -> Self {
        EstimatorError::ArtifactLoad {
            artifact,
            reason: reason.into(),
        }
    }

    /// Returns true if the caller should retry the same request later
    pub fn is_retryable(&self) -> bool {
        matches!(self, EstimatorError::ModelNotReady)
    }

    /// Short label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            EstimatorError::ArtifactLoad { .. } => "artifact_load",
            EstimatorError::ModelNotReady => "model_not_ready",
            EstimatorError::MissingField(_) => "missing_field",
            EstimatorError::MalformedRequest(_) => "malformed_request",
            EstimatorError::Encoding(_) => "encoding",
            EstimatorError::Prediction(_) => "prediction",
        }
    }
}

pub type Result<T> = std::result::Result<T, EstimatorError>;
