//! Feature scaling
//!
//! This module applies the scaler fit during training to an assembled vector.
//! - `standard`: (x - mean) / scale, zero scale treated as 1
//! - `min_max`: x * scale + min
//!
//! Parameters are loaded from a JSON artifact and are read-only afterwards.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AssessError;

const ARTIFACT: &str = "scaler";

/// A deterministic, post-fit numeric transform `R^n -> R^n`
pub trait Scaler: Send + Sync {
    /// Expected input width
    fn n_features(&self) -> usize;

    /// Column names seen at fit time, when recorded
    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    /// Transform one row
    fn transform(&self, x: &[f64]) -> Result<Vec<f64>, AssessError>;
}

/// Standardization parameters (`mean_`, `scale_`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
    #[serde(default = "default_true")]
    pub with_mean: bool,
    #[serde(default = "default_true")]
    pub with_std: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names_in: Option<Vec<String>>,
}

fn default_true() -> bool {
    true
}

/// Min-max parameters (`min_`, `scale_`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub min: Vec<f64>,
    pub scale: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names_in: Option<Vec<String>>,
}

/// Serialized scaler artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalerArtifact {
    Standard(StandardScaler),
    MinMax(MinMaxScaler),
}

impl ScalerArtifact {
    /// Parse and check a scaler artifact
    pub fn from_json(json: &str) -> Result<Self, AssessError> {
        let artifact: ScalerArtifact =
            serde_json::from_str(json).map_err(|e| AssessError::missing_artifact(ARTIFACT, e))?;
        artifact.check()?;
        Ok(artifact)
    }

    /// Load a scaler artifact from disk
    pub fn load(path: &Path) -> Result<Self, AssessError> {
        let json = fs::read_to_string(path).map_err(|e| {
            AssessError::missing_artifact(ARTIFACT, format!("{}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    pub(crate) fn check(&self) -> Result<(), AssessError> {
        let (a, b, names) = match self {
            ScalerArtifact::Standard(s) => (s.mean.len(), s.scale.len(), &s.feature_names_in),
            ScalerArtifact::MinMax(s) => (s.min.len(), s.scale.len(), &s.feature_names_in),
        };

        if a == 0 {
            return Err(AssessError::invalid_artifact(ARTIFACT, "no parameters"));
        }
        if a != b {
            return Err(AssessError::invalid_artifact(
                ARTIFACT,
                format!("parameter lengths differ ({} vs {})", a, b),
            ));
        }
        if let Some(names) = names {
            if names.len() != a {
                return Err(AssessError::invalid_artifact(
                    ARTIFACT,
                    format!("{} feature names for {} parameters", names.len(), a),
                ));
            }
        }
        Ok(())
    }
}

fn check_width(expected: usize, x: &[f64]) -> Result<(), AssessError> {
    if x.len() != expected {
        return Err(AssessError::dimension("scaler input", expected, x.len()));
    }
    Ok(())
}

impl Scaler for StandardScaler {
    fn n_features(&self) -> usize {
        self.mean.len()
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names_in.as_deref()
    }

    fn transform(&self, x: &[f64]) -> Result<Vec<f64>, AssessError> {
        check_width(self.n_features(), x)?;

        Ok(x.iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(&v, (&mean, &scale))| {
                let centered = if self.with_mean { v - mean } else { v };
                if self.with_std {
                    centered / if scale == 0.0 { 1.0 } else { scale }
                } else {
                    centered
                }
            })
            .collect())
    }
}

impl Scaler for MinMaxScaler {
    fn n_features(&self) -> usize {
        self.min.len()
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names_in.as_deref()
    }

    fn transform(&self, x: &[f64]) -> Result<Vec<f64>, AssessError> {
        check_width(self.n_features(), x)?;

        Ok(x.iter()
            .zip(self.scale.iter().zip(self.min.iter()))
            .map(|(&v, (&scale, &min))| v * scale + min)
            .collect())
    }
}

impl Scaler for ScalerArtifact {
    fn n_features(&self) -> usize {
        match self {
            ScalerArtifact::Standard(s) => s.n_features(),
            ScalerArtifact::MinMax(s) => s.n_features(),
        }
    }

    fn feature_names(&self) -> Option<&[String]> {
        match self {
            ScalerArtifact::Standard(s) => s.feature_names(),
            ScalerArtifact::MinMax(s) => s.feature_names(),
        }
    }

    fn transform(&self, x: &[f64]) -> Result<Vec<f64>, AssessError> {
        match self {
            ScalerArtifact::Standard(s) => s.transform(x),
            ScalerArtifact::MinMax(s) => s.transform(x),
        }
    }
}
