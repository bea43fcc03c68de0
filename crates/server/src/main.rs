//! Price server - property price estimation over HTTP
//!
//! Serves predictions from a lazily loaded encoder and regressor, along with
//! health, readiness and Prometheus endpoints.

use anyhow::Result;
use estimator_lib::{
    health::HealthRegistry, ArtifactSource, ArtifactStore, ModelLifecycle, PriceEstimator,
    StructuredLogger,
};
use price_server::{api, config::ServerConfig};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting price-server");

    let config = ServerConfig::load()?;
    info!(
        instance = %config.instance_name,
        encoder = %config.encoder_path.display(),
        regressor = %config.regressor_path.display(),
        "Server configured"
    );

    let logger = StructuredLogger::new(&config.instance_name);
    let store: Arc<dyn ArtifactSource> =
        Arc::new(ArtifactStore::new(config.artifact_store_config()));
    logger.log_startup(SERVICE_VERSION, &store.describe());

    let lifecycle = ModelLifecycle::build(store, config.lifecycle_config(), logger.clone());
    if config.eager_load {
        lifecycle.trigger_load();
    }

    let estimator = PriceEstimator::new(lifecycle, logger.clone());
    let app_state = Arc::new(api::AppState::new(estimator, HealthRegistry::new()).await);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
        }
    };
    api::serve(config.listen_address(), app_state, shutdown).await?;

    logger.log_shutdown("SIGINT received");
    info!("Shutting down");

    Ok(())
}
