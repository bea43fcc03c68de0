//! Encoding and schema alignment
//!
//! The encoder's output width depends on which categories it saw, while the
//! regressor is frozen to the feature list it was trained with. Alignment
//! reconciles the two: every schema column is taken from the encoded record
//! or filled, extra encoded columns are dropped, and the schema's order wins.

use super::Encoder;
use crate::error::{EstimatorError, Result};
use crate::models::{AlignedRecord, EncodedRecord, FeatureRecord};
use tracing::debug;

/// Value used for schema columns the encoder did not produce
pub const ALIGNMENT_FILL_VALUE: f64 = 0.0;

/// Applies the encoder and reindexes its output to a fixed schema
#[derive(Debug, Clone, Copy)]
pub struct EncodingAligner {
    fill_value: f64,
}

impl Default for EncodingAligner {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodingAligner {
    pub fn new() -> Self {
        Self {
            fill_value: ALIGNMENT_FILL_VALUE,
        }
    }

    /// Encode `record` and align it to `expected_schema`
    pub fn align(
        &self,
        record: &FeatureRecord,
        encoder: &dyn Encoder,
        expected_schema: &[String],
    ) -> Result<AlignedRecord> {
        let encoded = encoder
            .transform(record)
            .map_err(|e| EstimatorError::Encoding(format!("{:#}", e)))?;
        Ok(self.reindex(&encoded, expected_schema))
    }

    /// Reindex an encoded record to exactly `expected_schema`
    pub fn reindex(&self, encoded: &EncodedRecord, expected_schema: &[String]) -> AlignedRecord {
        let lookup = encoded.to_map();

        let mut filled = 0usize;
        let values: Vec<f64> = expected_schema
            .iter()
            .map(|name| {
                lookup.get(name.as_str()).copied().unwrap_or_else(|| {
                    filled += 1;
                    self.fill_value
                })
            })
            .collect();

        let used = expected_schema.len() - filled;
        debug!(
            schema_width = expected_schema.len(),
            encoded_width = encoded.len(),
            filled = filled,
            dropped = lookup.len().saturating_sub(used),
            "Aligned encoded features to model schema"
        );

        AlignedRecord {
            feature_names: expected_schema.to_vec(),
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;

    fn schema(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn encoded(cols: &[(&str, f64)]) -> EncodedRecord {
        let mut record = EncodedRecord::new();
        for (name, value) in cols {
            record.push(*name, *value);
        }
        record
    }

    fn record() -> FeatureRecord {
        FeatureRecord {
            property_usage_en: "Residential".to_string(),
            property_type_en: "Flat".to_string(),
            reg_type_en: "Existing".to_string(),
            area_name_en: "Downtown".to_string(),
            nearest_metro_en: "Burj Khalifa".to_string(),
            room_value: 3,
            has_parking: 1,
            procedure_area: 120.0,
            trans_group_en: "Sales".to_string(),
        }
    }

    struct FixedEncoder(EncodedRecord);

    impl Encoder for FixedEncoder {
        fn transform(&self, _record: &FeatureRecord) -> anyhow::Result<EncodedRecord> {
            Ok(self.0.clone())
        }
    }

    struct RejectingEncoder;

    impl Encoder for RejectingEncoder {
        fn transform(&self, _record: &FeatureRecord) -> anyhow::Result<EncodedRecord> {
            bail!("unknown category 'Atlantis' in column 'area_name_en'")
        }
    }

    #[test]
    fn test_reorders_to_schema() {
        let aligned = EncodingAligner::new().reindex(
            &encoded(&[("b", 2.0), ("a", 1.0), ("c", 3.0)]),
            &schema(&["a", "b", "c"]),
        );
        assert_eq!(aligned.feature_names, schema(&["a", "b", "c"]));
        assert_eq!(aligned.values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_fills_missing_and_drops_extras() {
        let aligned = EncodingAligner::new().reindex(
            &encoded(&[("a", 1.0), ("extra_1", 9.0), ("extra_2", 9.0)]),
            &schema(&["a", "area_name_en_Marina", "procedure_area"]),
        );
        assert_eq!(aligned.len(), 3);
        assert_eq!(aligned.values, vec![1.0, ALIGNMENT_FILL_VALUE, ALIGNMENT_FILL_VALUE]);
    }

    #[test]
    fn test_width_always_matches_schema() {
        let expected = schema(&["x", "y", "z", "w"]);
        let shapes = [
            encoded(&[]),
            encoded(&[("x", 1.0)]),
            encoded(&[("w", 1.0), ("z", 2.0), ("y", 3.0), ("x", 4.0), ("v", 5.0)]),
            encoded(&[("q", 1.0), ("r", 2.0), ("s", 3.0), ("t", 4.0), ("u", 5.0), ("v", 6.0)]),
        ];
        for shape in &shapes {
            let aligned = EncodingAligner::new().reindex(shape, &expected);
            assert_eq!(aligned.len(), expected.len());
            assert_eq!(aligned.feature_names, expected);
        }
    }

    #[test]
    fn test_empty_schema_yields_empty_record() {
        let aligned = EncodingAligner::new().reindex(&encoded(&[("a", 1.0)]), &[]);
        assert!(aligned.is_empty());
    }

    #[test]
    fn test_align_runs_encoder() {
        let encoder = FixedEncoder(encoded(&[("procedure_area", 120.0), ("has_parking", 1.0)]));
        let aligned = EncodingAligner::new()
            .align(&record(), &encoder, &schema(&["has_parking", "procedure_area"]))
            .unwrap();
        assert_eq!(aligned.values, vec![1.0, 120.0]);
    }

    #[test]
    fn test_encoder_rejection_is_encoding_error() {
        let err = EncodingAligner::new()
            .align(&record(), &RejectingEncoder, &schema(&["a"]))
            .unwrap_err();
        match err {
            EstimatorError::Encoding(msg) => assert!(msg.contains("Atlantis")),
            other => panic!("expected encoding error, got {:?}", other),
        }
    }
}
