//! Linear regressor artifact
//!
//! A JSON document with one coefficient per named feature and an intercept.
//! Useful for small models and for exercising the pipeline without an ONNX
//! export.

use crate::models::AlignedRecord;
use crate::predictor::Regressor;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegressor {
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
}

impl LinearRegressor {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let model: LinearRegressor =
            serde_json::from_slice(bytes).context("Failed to parse linear model JSON")?;
        if model.feature_names.len() != model.coefficients.len() {
            bail!(
                "Linear model has {} feature names but {} coefficients",
                model.feature_names.len(),
                model.coefficients.len()
            );
        }
        if !model.intercept.is_finite() || model.coefficients.iter().any(|c| !c.is_finite()) {
            bail!("Linear model contains non-finite parameters");
        }
        Ok(model)
    }
}

impl Regressor for LinearRegressor {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, record: &AlignedRecord) -> Result<f64> {
        check_schema(&self.feature_names, record)?;
        let dot: f64 = self
            .coefficients
            .iter()
            .zip(&record.values)
            .map(|(w, x)| w * x)
            .sum();
        Ok(dot + self.intercept)
    }
}

/// Reject records whose shape or column order differ from the model schema
pub(crate) fn check_schema(expected: &[String], record: &AlignedRecord) -> Result<()> {
    if record.values.len() != expected.len() {
        bail!(
            "Feature mismatch: model expects {} features, got {}",
            expected.len(),
            record.values.len()
        );
    }
    if let Some((want, got)) = expected
        .iter()
        .zip(&record.feature_names)
        .find(|(want, got)| want != got)
    {
        bail!("Feature mismatch: expected column '{}', got '{}'", want, got);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> LinearRegressor {
        LinearRegressor::from_bytes(
            br#"{"feature_names": ["procedure_area", "has_parking"], "coefficients": [0.01, 0.5], "intercept": 12.0}"#,
        )
        .unwrap()
    }

    fn aligned(names: &[&str], values: &[f64]) -> AlignedRecord {
        AlignedRecord {
            feature_names: names.iter().map(|s| s.to_string()).collect(),
            values: values.to_vec(),
        }
    }

    #[test]
    fn test_dot_product_plus_intercept() {
        let y = model()
            .predict(&aligned(&["procedure_area", "has_parking"], &[100.0, 1.0]))
            .unwrap();
        assert!((y - 13.5).abs() < 1e-9);
    }

    #[test]
    fn test_width_mismatch_rejected() {
        let err = model()
            .predict(&aligned(&["procedure_area"], &[100.0]))
            .unwrap_err();
        assert!(err.to_string().contains("expects 2 features"));
    }

    #[test]
    fn test_order_mismatch_rejected() {
        let err = model()
            .predict(&aligned(&["has_parking", "procedure_area"], &[1.0, 100.0]))
            .unwrap_err();
        assert!(err.to_string().contains("expected column 'procedure_area'"));
    }

    #[test]
    fn test_inconsistent_document_rejected() {
        let result = LinearRegressor::from_bytes(
            br#"{"feature_names": ["a", "b"], "coefficients": [1.0]}"#,
        );
        assert!(result.is_err());
    }
}
