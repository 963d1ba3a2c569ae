//! Error types for heart-risk

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which side of the boundary caused a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fault {
    /// The submitted inputs were missing or malformed
    Client,
    /// Artifacts, configuration or model output are at fault
    Server,
}

/// Errors that can occur while loading artifacts or assessing a record
#[derive(Debug, Error)]
pub enum AssessError {
    #[error("Required artifact '{artifact}' could not be loaded: {reason}")]
    StartupArtifactMissing { artifact: String, reason: String },

    #[error("Invalid artifact '{artifact}': {reason}")]
    InvalidArtifact { artifact: String, reason: String },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Unknown category level: {field} has no schema column '{column}'")]
    UnknownCategoryLevel { field: String, column: String },

    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: String,
        expected: String,
        actual: String,
    },

    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Invalid model output: {0}")]
    InvalidModelOutput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl AssessError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            AssessError::StartupArtifactMissing { .. } => "STARTUP_ARTIFACT_MISSING",
            AssessError::InvalidArtifact { .. } => "INVALID_ARTIFACT",
            AssessError::MissingField(_) => "MISSING_FIELD",
            AssessError::UnknownCategoryLevel { .. } => "UNKNOWN_CATEGORY_LEVEL",
            AssessError::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            AssessError::InvalidInput { .. } => "INVALID_INPUT",
            AssessError::InvalidModelOutput(_) => "INVALID_MODEL_OUTPUT",
            AssessError::Config(_) => "CONFIG_ERROR",
            AssessError::JsonError(_) => "JSON_ERROR",
        }
    }

    /// Classify the error as client- or server-caused.
    ///
    /// An unknown category level is reported as a client fault: the level
    /// itself is valid for the form, but the submitted combination cannot be
    /// scored against the loaded schema and the user can choose another.
    pub fn fault(&self) -> Fault {
        match self {
            AssessError::MissingField(_)
            | AssessError::InvalidInput { .. }
            | AssessError::UnknownCategoryLevel { .. }
            | AssessError::JsonError(_) => Fault::Client,
            AssessError::StartupArtifactMissing { .. }
            | AssessError::InvalidArtifact { .. }
            | AssessError::DimensionMismatch { .. }
            | AssessError::InvalidModelOutput(_)
            | AssessError::Config(_) => Fault::Server,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.fault() == Fault::Client
    }

    pub(crate) fn missing_artifact(artifact: &str, reason: impl ToString) -> Self {
        AssessError::StartupArtifactMissing {
            artifact: artifact.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn invalid_artifact(artifact: &str, reason: impl ToString) -> Self {
        AssessError::InvalidArtifact {
            artifact: artifact.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn dimension(
        context: &str,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        AssessError::DimensionMismatch {
            context: context.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_classification() {
        assert_eq!(AssessError::MissingField("age".into()).fault(), Fault::Client);
        assert_eq!(
            AssessError::missing_artifact("scaler", "not found").fault(),
            Fault::Server
        );
        assert_eq!(
            AssessError::dimension("scaler", 23, 22).fault(),
            Fault::Server
        );
        assert!(AssessError::InvalidInput {
            field: "age".into(),
            reason: "out of range".into()
        }
        .is_client_error());
    }

    #[test]
    fn test_display_messages() {
        let err = AssessError::dimension("scaler input", 23, 22);
        assert_eq!(
            err.to_string(),
            "Dimension mismatch in scaler input: expected 23, got 22"
        );
        assert_eq!(err.code(), "DIMENSION_MISMATCH");
    }
}
