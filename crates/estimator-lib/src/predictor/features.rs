//! Feature construction for price inference
//!
//! Maps a raw prediction request onto the single-row feature record the
//! encoder was fitted on. Room types are bucketed into the integer codes
//! used at training time and the parking answer becomes a 0/1 flag.

use crate::error::{EstimatorError, Result};
use crate::models::{FeatureRecord, PredictRequest};
use serde_json::Value;

/// Room type label to training-time code.
///
/// The codes are not ordered by size (`3 B/R` is 5, `Office` is 4); they
/// must stay exactly as the model was trained.
pub const ROOM_VALUE_CODES: [(&str, i64); 6] = [
    ("Studio", 1),
    ("1 B/R", 2),
    ("2 B/R", 3),
    ("3 B/R", 5),
    ("Office", 4),
    ("Others", 6),
];

/// Code used for missing or unrecognized room types (Studio)
pub const DEFAULT_ROOM_VALUE: i64 = 1;

/// The only `has_parking` answer that counts as having parking
pub const PARKING_YES: &str = "Yes";

/// Builds feature records from prediction requests
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureBuilder;

impl FeatureBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build the feature record for one request.
    ///
    /// Fails with [`EstimatorError::MissingField`] naming the first required
    /// field that is absent or null.
    pub fn build(&self, request: &PredictRequest) -> Result<FeatureRecord> {
        Ok(FeatureRecord {
            property_usage_en: required(&request.property_usage_en, "property_usage_en")?,
            property_type_en: required(&request.property_type_en, "property_type_en")?,
            reg_type_en: required(&request.reg_type_en, "reg_type_en")?,
            area_name_en: required(&request.area_name_en, "area_name_en")?,
            nearest_metro_en: required(&request.nearest_metro_en, "nearest_metro_en")?,
            room_value: room_value_code(request.room_value.as_ref()),
            has_parking: parking_flag(request.has_parking.as_ref()),
            procedure_area: request
                .procedure_area
                .ok_or(EstimatorError::MissingField("procedure_area"))?,
            trans_group_en: required(&request.trans_group, "trans_group")?,
        })
    }
}

fn required(value: &Option<String>, field: &'static str) -> Result<String> {
    value.clone().ok_or(EstimatorError::MissingField(field))
}

/// Integer code for a room type label; anything unrecognized is a studio
pub fn room_value_code(value: Option<&Value>) -> i64 {
    let label = match value {
        Some(Value::String(label)) => label.as_str(),
        _ => return DEFAULT_ROOM_VALUE,
    };
    ROOM_VALUE_CODES
        .iter()
        .find(|(known, _)| *known == label)
        .map(|(_, code)| *code)
        .unwrap_or(DEFAULT_ROOM_VALUE)
}

/// 1 only for the exact string "Yes"
pub fn parking_flag(value: Option<&Value>) -> u8 {
    match value {
        Some(Value::String(answer)) if answer == PARKING_YES => 1,
        _ => 0,
    }
}
