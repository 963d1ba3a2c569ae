//! Feature vector assembly
//!
//! This module turns one `RawInput` into the fixed-width numeric vector the
//! classifier was trained on:
//! - every schema column starts at 0
//! - direct columns copy their field verbatim
//! - each categorical field sets exactly one `<prefix>_<code>` flag
//!
//! The output is positionally aligned with the `FeatureSchema`.

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::AssessError;
use crate::schema::{FeatureSchema, RawInput};
use crate::types::Categorical;

/// What to do when a categorical level has no schema column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryPolicy {
    /// Leave the family all-zero (implicit baseline category) and log a warning
    #[default]
    Baseline,
    /// Reject the request with `UnknownCategoryLevel`
    Strict,
}

/// Schema column, RawInput field, accessor
type DirectColumn = (&'static str, &'static str, fn(&RawInput) -> Option<f64>);

/// Columns copied verbatim from the request
pub const DIRECT_COLUMNS: [DirectColumn; 9] = [
    ("age", "age", |r| r.age.map(|v| v as f64)),
    ("sex", "sex", |r| r.sex.map(|v| v as f64)),
    ("trestbps", "resting_blood_pressure", |r| {
        r.resting_blood_pressure.map(|v| v as f64)
    }),
    ("chol", "cholesterol", |r| r.cholesterol.map(|v| v as f64)),
    ("fbs", "fasting_blood_sugar_high", |r| {
        r.fasting_blood_sugar_high.map(|v| v as f64)
    }),
    ("thalach", "max_heart_rate", |r| r.max_heart_rate.map(|v| v as f64)),
    ("exang", "exercise_angina", |r| r.exercise_angina.map(|v| v as f64)),
    ("oldpeak", "st_depression", |r| r.st_depression),
    ("ca", "major_vessels", |r| r.major_vessels.map(|v| v as f64)),
];

/// Numeric feature vector in schema order
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector<'a> {
    schema: &'a FeatureSchema,
    values: Vec<f64>,
}

impl<'a> FeatureVector<'a> {
    /// All-zero vector over `schema`
    pub fn zeros(schema: &'a FeatureSchema) -> Self {
        Self {
            schema,
            values: vec![0.0; schema.len()],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values in schema order
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Column names in schema order
    pub fn names(&self) -> &[String] {
        self.schema.columns()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.schema.position(name).map(|pos| self.values[pos])
    }

    /// Set a column; returns false when the schema has no such column
    fn set(&mut self, name: &str, value: f64) -> bool {
        match self.schema.position(name) {
            Some(pos) => {
                self.values[pos] = value;
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.names()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

impl Serialize for FeatureVector<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

/// Assembler for building feature vectors from requests
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureAssembler {
    policy: CategoryPolicy,
}

impl FeatureAssembler {
    pub fn new(policy: CategoryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> CategoryPolicy {
        self.policy
    }

    /// Assemble the feature vector for one request.
    ///
    /// Fails with `MissingField` when a field needed by the schema is absent;
    /// no partial vector is returned.
    pub fn assemble<'a>(
        &self,
        raw: &RawInput,
        schema: &'a FeatureSchema,
    ) -> Result<FeatureVector<'a>, AssessError> {
        let mut vector = FeatureVector::zeros(schema);

        for (column, field, get) in DIRECT_COLUMNS.iter() {
            if !schema.contains(column) {
                continue;
            }
            let value = get(raw).ok_or_else(|| AssessError::MissingField(field.to_string()))?;
            vector.set(column, value);
        }

        self.set_level(&mut vector, raw.chest_pain_type)?;
        self.set_level(&mut vector, raw.resting_ecg)?;
        self.set_level(&mut vector, raw.st_slope)?;
        self.set_level(&mut vector, raw.thalassemia)?;

        debug!(columns = vector.len(), "assembled feature vector");
        Ok(vector)
    }

    fn set_level<C: Categorical>(
        &self,
        vector: &mut FeatureVector<'_>,
        level: Option<C>,
    ) -> Result<(), AssessError> {
        if !vector.schema.has_family(C::PREFIX) {
            return Ok(());
        }

        let level = level.ok_or_else(|| AssessError::MissingField(C::FIELD.to_string()))?;
        let column = level.column();

        if vector.set(&column, 1.0) {
            return Ok(());
        }

        match self.policy {
            CategoryPolicy::Baseline => {
                warn!(
                    field = C::FIELD,
                    column = %column,
                    "category level has no schema column; treating as baseline"
                );
                Ok(())
            }
            CategoryPolicy::Strict => Err(AssessError::UnknownCategoryLevel {
                field: C::FIELD.to_string(),
                column,
            }),
        }
    }
}

/// Assemble with the default (baseline) policy
pub fn assemble<'a>(
    raw: &RawInput,
    schema: &'a FeatureSchema,
) -> Result<FeatureVector<'a>, AssessError> {
    FeatureAssembler::default().assemble(raw, schema)
}
