//! Model lifecycle management
//!
//! Owns the loaded encoder and regressor for the life of the process and
//! tracks where loading stands:
//!
//! ```text
//! UNLOADED -> LOADING -> READY
//!                     \-> FAILED (-> LOADING again only if a retry cooldown is set)
//! ```
//!
//! State and artifacts live in one `watch` channel, so READY is never
//! observable before the artifacts are in place, and the UNLOADED -> LOADING
//! transition is a compare-and-set: concurrent triggers start exactly one load.
//! Loading runs on the blocking pool and never blocks the caller.

use crate::artifacts::ArtifactSource;
use crate::error::{ArtifactKind, EstimatorError, Result};
use crate::observability::{EstimatorMetrics, StructuredLogger};
use crate::predictor::{Encoder, Regressor};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::debug;

/// Coarse lifecycle phase, without the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecyclePhase {
    Unloaded,
    Loading,
    Ready,
    Failed,
}

impl LifecyclePhase {
    /// READY and FAILED are terminal for a single load attempt
    pub fn is_settled(&self) -> bool {
        matches!(self, LifecyclePhase::Ready | LifecyclePhase::Failed)
    }

    /// Numeric code exported as a gauge
    pub fn code(&self) -> i64 {
        match self {
            LifecyclePhase::Unloaded => 0,
            LifecyclePhase::Loading => 1,
            LifecyclePhase::Ready => 2,
            LifecyclePhase::Failed => 3,
        }
    }
}

/// Encoder and regressor loaded together
pub struct LoadedModel {
    pub encoder: Box<dyn Encoder>,
    pub regressor: Box<dyn Regressor>,
    pub encoder_checksum: String,
    pub regressor_checksum: String,
    pub loaded_at: chrono::DateTime<chrono::Utc>,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("features", &self.regressor.feature_names().len())
            .field("encoder_checksum", &self.encoder_checksum)
            .field("regressor_checksum", &self.regressor_checksum)
            .field("loaded_at", &self.loaded_at)
            .finish()
    }
}

/// Details of a failed load attempt
#[derive(Debug, Clone)]
pub struct LoadFailure {
    pub error: EstimatorError,
    pub failed_at: Instant,
    pub attempt: u64,
}

/// Full lifecycle state, including the loaded artifacts
#[derive(Debug, Clone)]
pub enum LifecycleState {
    Unloaded,
    Loading { attempt: u64 },
    Ready(Arc<LoadedModel>),
    Failed(LoadFailure),
}

impl LifecycleState {
    pub fn phase(&self) -> LifecyclePhase {
        match self {
            LifecycleState::Unloaded => LifecyclePhase::Unloaded,
            LifecycleState::Loading { .. } => LifecyclePhase::Loading,
            LifecycleState::Ready(_) => LifecyclePhase::Ready,
            LifecycleState::Failed(_) => LifecyclePhase::Failed,
        }
    }
}

/// Lifecycle configuration
#[derive(Debug, Clone, Default)]
pub struct LifecycleConfig {
    /// Minimum wait before a FAILED load may be retried; `None` keeps
    /// FAILED terminal until restart
    pub retry_cooldown: Option<Duration>,
}

struct LifecycleInner {
    state: watch::Sender<LifecycleState>,
    source: Arc<dyn ArtifactSource>,
    config: LifecycleConfig,
    attempts: std::sync::atomic::AtomicU64,
    logger: StructuredLogger,
    metrics: EstimatorMetrics,
}

/// Process-wide owner of the model artifacts
#[derive(Clone)]
pub struct ModelLifecycle {
    inner: Arc<LifecycleInner>,
}

impl ModelLifecycle {
    pub fn new(source: Arc<dyn ArtifactSource>) -> Self {
        Self::with_config(source, LifecycleConfig::default())
    }

    pub fn with_config(source: Arc<dyn ArtifactSource>, config: LifecycleConfig) -> Self {
        Self::build(source, config, StructuredLogger::new("estimator"))
    }

    pub fn build(
        source: Arc<dyn ArtifactSource>,
        config: LifecycleConfig,
        logger: StructuredLogger,
    ) -> Self {
        let (state, _) = watch::channel(LifecycleState::Unloaded);
        let metrics = EstimatorMetrics::new();
        metrics.set_model_state(LifecyclePhase::Unloaded);
        Self {
            inner: Arc::new(LifecycleInner {
                state,
                source,
                config,
                attempts: std::sync::atomic::AtomicU64::new(0),
                logger,
                metrics,
            }),
        }
    }

    /// Current phase, without side effects
    pub fn phase(&self) -> LifecyclePhase {
        self.inner.state.borrow().phase()
    }

    /// Snapshot of the full state
    pub fn state(&self) -> LifecycleState {
        self.inner.state.borrow().clone()
    }

    /// Error recorded by the last failed load, if the lifecycle is FAILED
    pub fn last_error(&self) -> Option<EstimatorError> {
        match &*self.inner.state.borrow() {
            LifecycleState::Failed(failure) => Some(failure.error.clone()),
            _ => None,
        }
    }

    /// Watch state transitions
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.inner.state.subscribe()
    }

    /// Start loading if nothing has been loaded yet.
    ///
    /// Returns `true` only for the call that won the UNLOADED -> LOADING
    /// transition; every other call, concurrent or later, is a no-op.
    pub fn trigger_load(&self) -> bool {
        self.start_load_if(|state| matches!(state, LifecycleState::Unloaded))
    }

    /// Artifacts for a prediction, or `ModelNotReady`.
    ///
    /// The first call in UNLOADED kicks off loading; that call still gets
    /// `ModelNotReady` because loading happens in the background.
    pub fn ensure_ready(&self) -> Result<Arc<LoadedModel>> {
        let phase = {
            let state = self.inner.state.borrow();
            if let LifecycleState::Ready(model) = &*state {
                return Ok(model.clone());
            }
            state.phase()
        };

        if phase == LifecyclePhase::Unloaded {
            self.trigger_load();
        }
        Err(EstimatorError::ModelNotReady)
    }

    /// Report the phase for status polls.
    ///
    /// Triggers the load when UNLOADED, and retries a FAILED load once the
    /// configured cooldown has elapsed.
    pub fn poll(&self) -> LifecyclePhase {
        match self.phase() {
            LifecyclePhase::Unloaded => {
                self.trigger_load();
            }
            LifecyclePhase::Failed => {
                self.retry_failed();
            }
            LifecyclePhase::Loading | LifecyclePhase::Ready => {}
        }
        self.phase()
    }

    /// Retry a failed load if a cooldown is configured and has elapsed
    pub fn retry_failed(&self) -> bool {
        let Some(cooldown) = self.inner.config.retry_cooldown else {
            return false;
        };
        self.start_load_if(|state| match state {
            LifecycleState::Failed(failure) => failure.failed_at.elapsed() >= cooldown,
            _ => false,
        })
    }

    /// Wait while a load is in flight; returns immediately when none is
    pub async fn wait_until_settled(&self) -> LifecyclePhase {
        let mut rx = self.subscribe();
        let settled = match rx
            .wait_for(|state| state.phase() != LifecyclePhase::Loading)
            .await
        {
            Ok(state) => state.phase(),
            // The sender lives as long as `self`, so this only happens on teardown
            Err(_) => self.phase(),
        };
        settled
    }

    fn start_load_if(&self, eligible: impl FnOnce(&LifecycleState) -> bool) -> bool {
        let inner = &self.inner;
        let mut attempt = 0;
        let started = inner.state.send_if_modified(|state| {
            if !eligible(state) {
                return false;
            }
            attempt = inner
                .attempts
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
                + 1;
            *state = LifecycleState::Loading { attempt };
            true
        });

        if !started {
            debug!(phase = ?self.phase(), "Load already started or finished, not triggering");
            return false;
        }

        inner.metrics.set_model_state(LifecyclePhase::Loading);
        inner.metrics.inc_load_attempts();
        inner.logger.log_load_started(attempt, &inner.source.describe());

        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            let started_at = Instant::now();
            let source = Arc::clone(&inner.source);
            let outcome = match tokio::task::spawn_blocking(move || load_model(source.as_ref())).await
            {
                Ok(outcome) => outcome,
                Err(join_error) => Err(EstimatorError::artifact_load(
                    ArtifactKind::Regressor,
                    format!("load task panicked: {}", join_error),
                )),
            };
            inner.finish(attempt, outcome, started_at.elapsed());
        });

        true
    }
}

impl LifecycleInner {
    fn finish(&self, attempt: u64, outcome: Result<LoadedModel>, elapsed: Duration) {
        self.metrics.observe_load_duration(elapsed.as_secs_f64());

        match outcome {
            Ok(model) => {
                self.logger.log_model_loaded(
                    attempt,
                    elapsed,
                    model.regressor.feature_names().len(),
                    &model.encoder_checksum,
                    &model.regressor_checksum,
                );
                self.metrics
                    .set_model_info(&model.encoder_checksum, &model.regressor_checksum);
                self.metrics.set_model_state(LifecyclePhase::Ready);
                let model = Arc::new(model);
                self.state.send_modify(|state| *state = LifecycleState::Ready(model));
            }
            Err(err) => {
                self.logger.log_load_failed(attempt, &err);
                self.metrics.set_model_state(LifecyclePhase::Failed);
                self.state.send_modify(|state| {
                    *state = LifecycleState::Failed(LoadFailure {
                        error: err,
                        failed_at: Instant::now(),
                        attempt,
                    })
                });
            }
        }
    }
}

/// Read the encoder, then the regressor
fn load_model(source: &dyn ArtifactSource) -> Result<LoadedModel> {
    let encoder = source.load_encoder()?;
    let regressor = source.load_regressor()?;
    Ok(LoadedModel {
        encoder: encoder.value,
        regressor: regressor.value,
        encoder_checksum: encoder.checksum,
        regressor_checksum: regressor.checksum,
        loaded_at: chrono::Utc::now(),
    })
}
