//! Feature vector assembly for a single inference request

use crate::error::{PredictorError, Result};
use crate::provenance::FieldSource;
use super::schema::{week_flag_code, FeatureField, FeatureVector};
use serde_json::Value;
use tracing::debug;

/// Maps an ad-hoc JSON record onto the feature schema.
///
/// Absent fields take their defaults. The lenient assembler never fails:
/// anything it cannot read as a number becomes 0. The strict assembler
/// reports it instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureAssembler {
    strict: bool,
}

impl FeatureAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject values that cannot be coerced
    pub fn strict() -> Self {
        Self { strict: true }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn assemble(&self, record: &Value) -> Result<FeatureVector> {
        let mut vector = FeatureVector::defaults();

        let Some(fields) = record.as_object() else {
            if self.strict && !record.is_null() {
                return Err(PredictorError::InferenceCoercionError {
                    field: "<record>".to_string(),
                    value: record.to_string(),
                });
            }
            return Ok(vector);
        };

        for field in FeatureField::ALL {
            let Some(raw) = fields.get(field.name()) else {
                continue;
            };

            let (value, source) = match coerce(field, raw) {
                Some(coerced) => coerced,
                None if self.strict => {
                    return Err(PredictorError::InferenceCoercionError {
                        field: field.name().to_string(),
                        value: raw.to_string(),
                    });
                }
                None => {
                    debug!(field = field.name(), value = %raw, "uncoercible value replaced by 0");
                    (0.0, FieldSource::Coerced)
                }
            };
            vector.set(field, value, source);
        }

        Ok(vector)
    }
}

/// Numeric value of a request field, `None` if it has none
fn coerce(field: FeatureField, raw: &Value) -> Option<(f64, FieldSource)> {
    match raw {
        Value::Number(n) => n
            .as_f64()
            .filter(|v| v.is_finite())
            .map(|v| (v, FieldSource::Observed)),
        Value::Bool(b) => Some((if *b { 1.0 } else { 0.0 }, FieldSource::Coerced)),
        Value::String(s) => {
            let parsed = s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .or_else(|| match field {
                    FeatureField::WeekFlag => week_flag_code(s),
                    _ => None,
                });
            parsed.map(|v| (v, FieldSource::Coerced))
        }
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
