//! Report encoding
//!
//! This module encodes assessment outcomes into JSON reports for the CLI and
//! any other front-end. Reports carry producer metadata so that a stored
//! result can be traced back to the build that computed it.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AssessError, Fault};
use crate::features::FeatureVector;
use crate::messages::{self, AudienceMode};
use crate::types::Prediction;
use crate::{PRODUCER_NAME, VERSION};

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// One assembled feature, in schema order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEntry {
    pub column: String,
    pub value: f64,
}

/// Successful assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentReport {
    pub report_version: String,
    pub producer: Producer,
    pub assessment_id: String,
    pub computed_at_utc: String,
    pub mode: AudienceMode,
    pub prediction: Prediction,
    /// Probability as a percentage with two decimals
    pub probability_percent: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<FeatureEntry>>,
}

/// Rejected assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectionReport {
    pub report_version: String,
    pub code: String,
    pub fault: Fault,
    /// User-facing copy
    pub message: String,
    /// Underlying error
    pub detail: String,
}

/// Encoder producing reports with a per-process instance ID
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    /// Encode a prediction, optionally embedding the assembled features
    pub fn encode(
        &self,
        prediction: Prediction,
        mode: AudienceMode,
        features: Option<&FeatureVector<'_>>,
    ) -> AssessmentReport {
        AssessmentReport {
            report_version: REPORT_VERSION.to_string(),
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            assessment_id: Uuid::new_v4().to_string(),
            computed_at_utc: Utc::now().to_rfc3339(),
            mode,
            prediction,
            probability_percent: prediction.percent(),
            message: messages::render(&prediction, mode),
            features: features.map(|v| {
                v.iter()
                    .map(|(column, value)| FeatureEntry {
                        column: column.to_string(),
                        value,
                    })
                    .collect()
            }),
        }
    }

    /// Encode a rejected request
    pub fn encode_rejection(&self, error: &AssessError) -> RejectionReport {
        RejectionReport {
            report_version: REPORT_VERSION.to_string(),
            code: error.code().to_string(),
            fault: error.fault(),
            message: messages::rejection(error),
            detail: error.to_string(),
        }
    }

    /// Encode a prediction to a JSON string
    pub fn encode_to_json(
        &self,
        prediction: Prediction,
        mode: AudienceMode,
    ) -> Result<String, AssessError> {
        let report = self.encode(prediction, mode, None);
        serde_json::to_string_pretty(&report).map_err(AssessError::JsonError)
    }
}
