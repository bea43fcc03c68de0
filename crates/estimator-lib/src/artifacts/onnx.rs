//! ONNX regressor inference using tract
//!
//! Loads an exported tree ensemble (or any single-output regression graph)
//! and runs it on one aligned row. The training-time feature order travels
//! with the model as the `feature_names` metadata property.

use super::linear::check_schema;
use crate::models::AlignedRecord;
use crate::predictor::Regressor;
use anyhow::{bail, Context, Result};
use tract_onnx::prelude::*;

/// Model metadata key holding the ordered feature names
pub const FEATURE_NAMES_KEY: &str = "feature_names";

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX-backed regressor
pub struct OnnxRegressor {
    model: TractModel,
    feature_names: Vec<String>,
}

impl std::fmt::Debug for OnnxRegressor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxRegressor")
            .field("feature_names", &self.feature_names)
            .finish_non_exhaustive()
    }
}

impl OnnxRegressor {
    /// Parse, optimize and plan an ONNX model from bytes
    pub fn from_bytes(model_bytes: &[u8]) -> Result<Self> {
        let onnx = tract_onnx::onnx();
        let proto = onnx
            .proto_model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?;

        let raw_names = proto
            .metadata_props
            .iter()
            .find(|prop| prop.key == FEATURE_NAMES_KEY)
            .map(|prop| prop.value.clone())
            .with_context(|| format!("ONNX model has no '{}' metadata", FEATURE_NAMES_KEY))?;
        let feature_names = parse_feature_names(&raw_names)?;

        let model = onnx
            .model_for_proto_model(&proto)
            .context("Failed to build ONNX graph")?
            .with_input_fact(0, f32::fact([1, feature_names.len()]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;

        Ok(Self {
            model,
            feature_names,
        })
    }
}

impl Regressor for OnnxRegressor {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, record: &AlignedRecord) -> Result<f64> {
        check_schema(&self.feature_names, record)?;

        let input: Tensor =
            tract_ndarray::Array2::from_shape_vec((1, record.len()), record.to_f32())
                .context("Failed to shape input tensor")?
                .into();

        let result = self.model.run(tvec!(input.into()))?;
        let output = result.first().context("No output from model")?;
        let view = output.to_array_view::<f32>()?;
        match view.iter().next() {
            Some(value) => Ok(f64::from(*value)),
            None => bail!("Model produced an empty output tensor"),
        }
    }
}

/// Accepts a JSON array of names or a comma separated list
pub fn parse_feature_names(raw: &str) -> Result<Vec<String>> {
    let trimmed = raw.trim();
    let names: Vec<String> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).context("Invalid feature_names JSON array")?
    } else {
        trimmed
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    };
    if names.is_empty() {
        bail!("Model declares no feature names");
    }
    Ok(names)
}
