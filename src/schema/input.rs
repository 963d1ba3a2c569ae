//! Assessment request schema
//!
//! One `RawInput` is produced per form submission. Every field is optional so
//! that an absent value can be reported by name instead of failing the whole
//! decode. Short training-time column names are accepted as aliases.

use serde::{Deserialize, Serialize};

use crate::error::AssessError;
use crate::types::{ChestPainType, RestingEcg, StSlope, Thalassemia};

/// Identifier of the request schema
pub const INPUT_SCHEMA_VERSION: &str = "heart.assessment_input.v1";

/// Clinical attributes of one patient, as submitted by the form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawInput {
    /// Age in years
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
    /// 0 = female, 1 = male
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<i64>,
    /// Resting blood pressure (mm Hg)
    #[serde(default, alias = "trestbps", skip_serializing_if = "Option::is_none")]
    pub resting_blood_pressure: Option<i64>,
    /// Serum cholesterol (mg/dl)
    #[serde(default, alias = "chol", skip_serializing_if = "Option::is_none")]
    pub cholesterol: Option<i64>,
    /// Fasting blood sugar > 120 mg/dl
    #[serde(default, alias = "fbs", skip_serializing_if = "Option::is_none")]
    pub fasting_blood_sugar_high: Option<i64>,
    /// Maximum heart rate achieved
    #[serde(default, alias = "thalach", skip_serializing_if = "Option::is_none")]
    pub max_heart_rate: Option<i64>,
    /// Exercise induced angina
    #[serde(default, alias = "exang", skip_serializing_if = "Option::is_none")]
    pub exercise_angina: Option<i64>,
    /// ST depression induced by exercise relative to rest (oldpeak)
    #[serde(default, alias = "oldpeak", skip_serializing_if = "Option::is_none")]
    pub st_depression: Option<f64>,
    /// Number of major vessels colored by fluoroscopy
    #[serde(default, alias = "ca", skip_serializing_if = "Option::is_none")]
    pub major_vessels: Option<i64>,
    #[serde(default, alias = "cp", skip_serializing_if = "Option::is_none")]
    pub chest_pain_type: Option<ChestPainType>,
    #[serde(default, alias = "restecg", skip_serializing_if = "Option::is_none")]
    pub resting_ecg: Option<RestingEcg>,
    #[serde(default, alias = "slope", skip_serializing_if = "Option::is_none")]
    pub st_slope: Option<StSlope>,
    #[serde(default, alias = "thal", skip_serializing_if = "Option::is_none")]
    pub thalassemia: Option<Thalassemia>,
}

/// Inclusive integer domain for a numeric field
struct IntDomain {
    field: &'static str,
    min: i64,
    max: i64,
}

const INT_DOMAINS: [IntDomain; 8] = [
    IntDomain { field: "age", min: 20, max: 100 },
    IntDomain { field: "sex", min: 0, max: 1 },
    IntDomain { field: "resting_blood_pressure", min: 80, max: 200 },
    IntDomain { field: "cholesterol", min: 100, max: 600 },
    IntDomain { field: "fasting_blood_sugar_high", min: 0, max: 1 },
    IntDomain { field: "max_heart_rate", min: 70, max: 220 },
    IntDomain { field: "exercise_angina", min: 0, max: 1 },
    IntDomain { field: "major_vessels", min: 0, max: 3 },
];

/// Domain of `st_depression`
pub const ST_DEPRESSION_RANGE: (f64, f64) = (0.0, 10.0);

impl RawInput {
    fn int_field(&self, field: &str) -> Option<i64> {
        match field {
            "age" => self.age,
            "sex" => self.sex,
            "resting_blood_pressure" => self.resting_blood_pressure,
            "cholesterol" => self.cholesterol,
            "fasting_blood_sugar_high" => self.fasting_blood_sugar_high,
            "max_heart_rate" => self.max_heart_rate,
            "exercise_angina" => self.exercise_angina,
            "major_vessels" => self.major_vessels,
            _ => None,
        }
    }

    /// Re-check the documented input domains.
    ///
    /// Absent fields are not reported here; the assembler decides which
    /// fields the loaded schema requires.
    pub fn validate(&self) -> Result<(), AssessError> {
        for domain in &INT_DOMAINS {
            if let Some(value) = self.int_field(domain.field) {
                if value < domain.min || value > domain.max {
                    return Err(AssessError::InvalidInput {
                        field: domain.field.to_string(),
                        reason: format!(
                            "{} is outside {}..={}",
                            value, domain.min, domain.max
                        ),
                    });
                }
            }
        }

        if let Some(value) = self.st_depression {
            let (min, max) = ST_DEPRESSION_RANGE;
            if !value.is_finite() || value < min || value > max {
                return Err(AssessError::InvalidInput {
                    field: "st_depression".to_string(),
                    reason: format!("{} is outside {:.1}..={:.1}", value, min, max),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_deserialize_short_names() {
        let json = r#"{
            "age": 50, "sex": 1, "trestbps": 120, "chol": 200, "fbs": 0,
            "thalach": 150, "exang": 0, "oldpeak": 1.0, "ca": 0,
            "cp": 0, "restecg": 0, "slope": 0, "thal": 0
        }"#;

        let input: RawInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.resting_blood_pressure, Some(120));
        assert_eq!(input.st_depression, Some(1.0));
        assert_eq!(input.chest_pain_type, Some(ChestPainType::TypicalAngina));
        assert_eq!(input.thalassemia, Some(Thalassemia::Normal));
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_missing_fields_decode_as_none() {
        let input: RawInput = serde_json::from_str(r#"{"sex": 0}"#).unwrap();
        assert_eq!(input.age, None);
        assert_eq!(input.st_slope, None);
    }

    #[test]
    fn test_out_of_domain_category_rejected_on_decode() {
        let result: Result<RawInput, _> = serde_json::from_str(r#"{"cp": 4}"#);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("chest_pain_type must be one of"));
    }

    #[test]
    fn test_validate_ranges() {
        let input = RawInput {
            age: Some(19),
            ..Default::default()
        };
        match input.validate() {
            Err(AssessError::InvalidInput { field, .. }) => assert_eq!(field, "age"),
            other => panic!("expected InvalidInput, got {:?}", other),
        }

        let input = RawInput {
            exercise_angina: Some(2),
            ..Default::default()
        };
        assert!(input.validate().is_err());

        let input = RawInput {
            st_depression: Some(10.5),
            ..Default::default()
        };
        assert!(input.validate().is_err());

        let input = RawInput {
            age: Some(100),
            cholesterol: Some(600),
            st_depression: Some(0.0),
            ..Default::default()
        };
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_serialize_uses_long_names() {
        let input = RawInput {
            max_heart_rate: Some(150),
            st_slope: Some(StSlope::Flat),
            ..Default::default()
        };
        let json = serde_json::to_string(&input).unwrap();
        assert_eq!(json, r#"{"max_heart_rate":150,"st_slope":1}"#);
    }
}
