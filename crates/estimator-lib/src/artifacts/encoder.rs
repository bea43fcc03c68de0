//! Categorical encoder artifact
//!
//! A JSON document listing, per categorical column, the categories seen at
//! training time. Supports one-hot and ordinal schemes.

use crate::models::{EncodedRecord, FeatureRecord, FeatureValue};
use crate::predictor::Encoder;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Encoding scheme applied to every categorical column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodingScheme {
    /// One indicator column per category, named `<column>_<category>`
    OneHot,
    /// A single column holding the 1-based category index
    Ordinal,
}

/// Strategy for categories not seen at training time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleUnknown {
    /// Reject the record
    #[default]
    Error,
    /// All-zero indicators for one-hot, `-1` for ordinal
    Ignore,
}

/// Value written for unknown categories by the ordinal scheme
pub const ORDINAL_UNKNOWN: f64 = -1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalColumn {
    pub name: String,
    pub categories: Vec<String>,
}

/// Fitted categorical encoder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalEncoder {
    pub scheme: EncodingScheme,
    #[serde(default)]
    pub handle_unknown: HandleUnknown,
    pub columns: Vec<CategoricalColumn>,
}

impl CategoricalEncoder {
    /// Parse and validate an encoder document
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let encoder: CategoricalEncoder =
            serde_json::from_slice(bytes).context("Failed to parse encoder JSON")?;
        encoder.validate()?;
        Ok(encoder)
    }

    fn validate(&self) -> Result<()> {
        let mut seen_columns = HashSet::new();
        for column in &self.columns {
            if column.name.is_empty() {
                bail!("Encoder column with empty name");
            }
            if !seen_columns.insert(column.name.as_str()) {
                bail!("Encoder column '{}' is listed twice", column.name);
            }
            let mut seen = HashSet::new();
            for category in &column.categories {
                if !seen.insert(category.as_str()) {
                    bail!(
                        "Category '{}' is listed twice for column '{}'",
                        category,
                        column.name
                    );
                }
            }
        }
        Ok(())
    }

    fn column(&self, name: &str) -> Option<&CategoricalColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    fn encode_category(
        &self,
        column: &CategoricalColumn,
        value: &str,
        out: &mut EncodedRecord,
    ) -> Result<()> {
        let position = column.categories.iter().position(|c| c == value);
        if position.is_none() && self.handle_unknown == HandleUnknown::Error {
            bail!(
                "Unknown category '{}' in column '{}'",
                value,
                column.name
            );
        }

        match self.scheme {
            EncodingScheme::OneHot => {
                for (idx, category) in column.categories.iter().enumerate() {
                    let hot = if Some(idx) == position { 1.0 } else { 0.0 };
                    out.push(one_hot_name(&column.name, category), hot);
                }
            }
            EncodingScheme::Ordinal => {
                let code = position.map(|p| (p + 1) as f64).unwrap_or(ORDINAL_UNKNOWN);
                out.push(column.name.clone(), code);
            }
        }
        Ok(())
    }
}

impl Encoder for CategoricalEncoder {
    fn transform(&self, record: &FeatureRecord) -> Result<EncodedRecord> {
        let mut out = EncodedRecord::new();
        for (name, value) in record.columns() {
            match (self.column(name), value) {
                (Some(column), FeatureValue::Text(text)) => {
                    self.encode_category(column, &text, &mut out)?
                }
                (Some(column), FeatureValue::Number(n)) => {
                    self.encode_category(column, &format_number(n), &mut out)?
                }
                (None, FeatureValue::Number(n)) => out.push(name, n),
                (None, FeatureValue::Text(_)) => {
                    bail!("Column '{}' holds text but the encoder has no categories for it", name)
                }
            }
        }
        Ok(out)
    }
}

fn one_hot_name(column: &str, category: &str) -> String {
    format!("{}_{}", column, category)
}

/// Numbers used as categories are matched by their shortest textual form
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
