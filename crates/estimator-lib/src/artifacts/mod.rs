//! Artifact loading
//!
//! This module provides:
//! - The [`ArtifactSource`] seam the model lifecycle loads through
//! - A filesystem [`ArtifactStore`] with size and SHA-256 validation
//! - Concrete encoder and regressor artifact formats

mod encoder;
mod linear;
mod onnx;


pub use encoder::{
    CategoricalColumn, CategoricalEncoder, EncodingScheme, HandleUnknown, ORDINAL_UNKNOWN,
};
pub use linear::LinearRegressor;
pub use onnx::{parse_feature_names, OnnxRegressor, FEATURE_NAMES_KEY};

use crate::error::{ArtifactKind, EstimatorError, Result};
use crate::predictor::{Encoder, Regressor};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default upper bound on a single artifact file
pub const DEFAULT_MAX_ARTIFACT_BYTES: u64 = 512 * 1024 * 1024;

/// Source of the encoder and regressor artifacts
///
/// Implementations perform blocking I/O; the lifecycle calls them from the
/// blocking thread pool.
pub trait ArtifactSource: Send + Sync {
    fn load_encoder(&self) -> Result<LoadedArtifact<Box<dyn Encoder>>>;

    fn load_regressor(&self) -> Result<LoadedArtifact<Box<dyn Regressor>>>;

    /// Human readable description for logs
    fn describe(&self) -> String;
}

/// A parsed artifact together with the checksum of the bytes it came from
pub struct LoadedArtifact<T> {
    pub value: T,
    pub checksum: String,
}

/// Configuration for the filesystem artifact store
#[derive(Debug, Clone)]
pub struct ArtifactStoreConfig {
    pub encoder_path: PathBuf,
    pub regressor_path: PathBuf,
    /// Expected SHA-256 (hex) of the encoder file
    pub encoder_sha256: Option<String>,
    /// Expected SHA-256 (hex) of the regressor file
    pub regressor_sha256: Option<String>,
    pub max_artifact_bytes: u64,
}

impl ArtifactStoreConfig {
    pub fn new(encoder_path: impl Into<PathBuf>, regressor_path: impl Into<PathBuf>) -> Self {
        Self {
            encoder_path: encoder_path.into(),
            regressor_path: regressor_path.into(),
            encoder_sha256: None,
            regressor_sha256: None,
            max_artifact_bytes: DEFAULT_MAX_ARTIFACT_BYTES,
        }
    }
}

/// Reads artifacts from the local filesystem
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    config: ArtifactStoreConfig,
}

impl ArtifactStore {
    pub fn new(config: ArtifactStoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ArtifactStoreConfig {
        &self.config
    }

    /// Read a file, enforcing the size limit and the optional checksum
    fn read_verified(
        &self,
        kind: ArtifactKind,
        path: &Path,
        expected_sha256: Option<&str>,
    ) -> Result<(Vec<u8>, String)> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            EstimatorError::artifact_load(kind, format!("{}: {}", path.display(), e))
        })?;
        if metadata.len() > self.config.max_artifact_bytes {
            return Err(EstimatorError::artifact_load(
                kind,
                format!(
                    "{} is {} bytes, exceeding the {} byte limit",
                    path.display(),
                    metadata.len(),
                    self.config.max_artifact_bytes
                ),
            ));
        }

        let bytes = std::fs::read(path).map_err(|e| {
            EstimatorError::artifact_load(kind, format!("{}: {}", path.display(), e))
        })?;

        let checksum = compute_checksum(&bytes);
        if let Some(expected) = expected_sha256 {
            if !checksum.eq_ignore_ascii_case(expected.trim()) {
                return Err(EstimatorError::artifact_load(
                    kind,
                    format!("checksum mismatch: expected {}, got {}", expected, checksum),
                ));
            }
            debug!(artifact = %kind, checksum = %checksum, "Artifact checksum validated");
        }

        info!(
            artifact = %kind,
            path = %path.display(),
            size = bytes.len(),
            "Artifact read from disk"
        );
        Ok((bytes, checksum))
    }
}

impl ArtifactSource for ArtifactStore {
    fn load_encoder(&self) -> Result<LoadedArtifact<Box<dyn Encoder>>> {
        let kind = ArtifactKind::Encoder;
        let (bytes, checksum) = self.read_verified(
            kind,
            &self.config.encoder_path,
            self.config.encoder_sha256.as_deref(),
        )?;
        let encoder = CategoricalEncoder::from_bytes(&bytes)
            .map_err(|e| EstimatorError::artifact_load(kind, format!("{:#}", e)))?;
        Ok(LoadedArtifact {
            value: Box::new(encoder),
            checksum,
        })
    }

    fn load_regressor(&self) -> Result<LoadedArtifact<Box<dyn Regressor>>> {
        let kind = ArtifactKind::Regressor;
        let path = &self.config.regressor_path;
        let format = RegressorFormat::from_path(path).ok_or_else(|| {
            EstimatorError::artifact_load(
                kind,
                format!("{}: unsupported format, expected .onnx or .json", path.display()),
            )
        })?;

        let (bytes, checksum) =
            self.read_verified(kind, path, self.config.regressor_sha256.as_deref())?;

        let parsed: anyhow::Result<Box<dyn Regressor>> = match format {
            RegressorFormat::Onnx => {
                OnnxRegressor::from_bytes(&bytes).map(|m| Box::new(m) as Box<dyn Regressor>)
            }
            RegressorFormat::Linear => {
                LinearRegressor::from_bytes(&bytes).map(|m| Box::new(m) as Box<dyn Regressor>)
            }
        };
        let regressor =
            parsed.map_err(|e| EstimatorError::artifact_load(kind, format!("{:#}", e)))?;

        Ok(LoadedArtifact {
            value: regressor,
            checksum,
        })
    }

    fn describe(&self) -> String {
        format!(
            "encoder={} regressor={}",
            self.config.encoder_path.display(),
            self.config.regressor_path.display()
        )
    }
}

/// Regressor file formats, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegressorFormat {
    Onnx,
    Linear,
}

impl RegressorFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "onnx" => Some(RegressorFormat::Onnx),
            "json" => Some(RegressorFormat::Linear),
            _ => None,
        }
    }
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
