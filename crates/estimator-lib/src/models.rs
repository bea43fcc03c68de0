//! Core data models for the price estimator

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Column names of a feature record, in the order the encoder was fitted on
pub const FEATURE_COLUMNS: [&str; 9] = [
    "property_usage_en",
    "property_type_en",
    "reg_type_en",
    "area_name_en",
    "nearest_metro_en",
    "room_value",
    "has_parking",
    "procedure_area",
    "trans_group_en",
];

/// Prediction request body as received from clients
///
/// Required fields are still `Option` here so that absence can be reported
/// by name instead of as a generic deserialization failure. `room_value` and
/// `has_parking` accept any JSON value; anything outside the known labels
/// falls back to its default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictRequest {
    pub property_usage_en: Option<String>,
    pub property_type_en: Option<String>,
    pub reg_type_en: Option<String>,
    pub area_name_en: Option<String>,
    pub nearest_metro_en: Option<String>,
    pub room_value: Option<serde_json::Value>,
    pub has_parking: Option<serde_json::Value>,
    pub procedure_area: Option<f64>,
    pub trans_group: Option<String>,
}

/// A single cell of a feature record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Text(String),
    Number(f64),
}

impl FeatureValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FeatureValue::Text(s) => Some(s),
            FeatureValue::Number(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FeatureValue::Number(n) => Some(*n),
            FeatureValue::Text(_) => None,
        }
    }
}

/// Single-row feature record handed to the encoder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub property_usage_en: String,
    pub property_type_en: String,
    pub reg_type_en: String,
    pub area_name_en: String,
    pub nearest_metro_en: String,
    pub room_value: i64,
    pub has_parking: u8,
    pub procedure_area: f64,
    pub trans_group_en: String,
}

impl FeatureRecord {
    /// Cells in [`FEATURE_COLUMNS`] order
    pub fn columns(&self) -> Vec<(&'static str, FeatureValue)> {
        let values = [
            FeatureValue::Text(self.property_usage_en.clone()),
            FeatureValue::Text(self.property_type_en.clone()),
            FeatureValue::Text(self.reg_type_en.clone()),
            FeatureValue::Text(self.area_name_en.clone()),
            FeatureValue::Text(self.nearest_metro_en.clone()),
            FeatureValue::Number(self.room_value as f64),
            FeatureValue::Number(f64::from(self.has_parking)),
            FeatureValue::Number(self.procedure_area),
            FeatureValue::Text(self.trans_group_en.clone()),
        ];
        FEATURE_COLUMNS.into_iter().zip(values).collect()
    }
}

/// Encoder output: named numeric columns in whatever shape the encoder produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodedRecord {
    pub columns: Vec<(String, f64)>,
}

impl EncodedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: f64) {
        self.columns.push((name.into(), value));
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column lookup by name; a repeated name resolves to its last value
    pub fn get(&self, name: &str) -> Option<f64> {
        self.columns
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn to_map(&self) -> HashMap<&str, f64> {
        self.columns.iter().map(|(n, v)| (n.as_str(), *v)).collect()
    }
}

/// Encoded record reindexed to exactly the regressor's feature schema
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRecord {
    pub feature_names: Vec<String>,
    pub values: Vec<f64>,
}

impl AlignedRecord {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_f32(&self) -> Vec<f32> {
        self.values.iter().map(|v| *v as f32).collect()
    }
}

/// Final prediction output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePrediction {
    /// Raw regressor output in log space
    pub log_price: f64,
    /// Price rounded to the nearest whole unit
    pub price: u64,
    /// Human readable price, e.g. `AED 729,416`
    pub formatted: String,
}
