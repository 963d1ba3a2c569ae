//! Startup artifact loading
//!
//! The classifier, the scaler and the ordered column list are loaded together
//! and cross-checked before anything is served. A failure here is fatal.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AssessError;
use crate::model::{Classifier, ModelArtifact};
use crate::scaler::{Scaler, ScalerArtifact};
use crate::schema::FeatureSchema;

/// Locations of the three serving artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub scaler: PathBuf,
    pub feature_columns: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            model: PathBuf::from("artifacts/heart_disease_rf_model.json"),
            scaler: PathBuf::from("artifacts/heart_scaler.json"),
            feature_columns: PathBuf::from("artifacts/feature_columns.json"),
        }
    }
}

impl ArtifactPaths {
    /// Resolve relative paths against `base`
    pub fn relative_to(&self, base: &Path) -> Self {
        let resolve = |p: &PathBuf| {
            if p.is_absolute() {
                p.clone()
            } else {
                base.join(p)
            }
        };
        Self {
            model: resolve(&self.model),
            scaler: resolve(&self.scaler),
            feature_columns: resolve(&self.feature_columns),
        }
    }
}

/// A consistent set of loaded artifacts
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub schema: FeatureSchema,
    pub scaler: ScalerArtifact,
    pub model: ModelArtifact,
}

impl Artifacts {
    /// Load and cross-check all artifacts; never returns a partial set
    pub fn load(paths: &ArtifactPaths) -> Result<Self, AssessError> {
        let schema = FeatureSchema::load(&paths.feature_columns)?;
        let scaler = ScalerArtifact::load(&paths.scaler)?;
        let model = ModelArtifact::load(&paths.model)?;

        let artifacts = Self::from_parts(schema, scaler, model)?;
        info!(
            columns = artifacts.schema.len(),
            model = %artifacts.model.describe(),
            "loaded serving artifacts"
        );
        Ok(artifacts)
    }

    /// Assemble an artifact set from already-parsed parts.
    ///
    /// Parts built in code get the same structural checks as parts read
    /// from disk.
    pub fn from_parts(
        schema: FeatureSchema,
        scaler: ScalerArtifact,
        model: ModelArtifact,
    ) -> Result<Self, AssessError> {
        scaler.check()?;
        model.check()?;
        check_compatible(&schema, &scaler, &model)?;
        Ok(Self {
            schema,
            scaler,
            model,
        })
    }
}

/// Detect version skew between the schema and the fitted transforms
pub fn check_compatible(
    schema: &FeatureSchema,
    scaler: &dyn Scaler,
    model: &dyn Classifier,
) -> Result<(), AssessError> {
    if scaler.n_features() != schema.len() {
        return Err(AssessError::dimension(
            "scaler width",
            schema.len(),
            scaler.n_features(),
        ));
    }
    if model.n_features() != schema.len() {
        return Err(AssessError::dimension(
            "model width",
            schema.len(),
            model.n_features(),
        ));
    }
    if let Some(names) = scaler.feature_names() {
        if let Some((pos, (want, got))) = schema
            .columns()
            .iter()
            .zip(names.iter())
            .enumerate()
            .find(|(_, (a, b))| a != b)
        {
            return Err(AssessError::dimension(
                &format!("scaler column {}", pos),
                want,
                got,
            ));
        }
    }
    Ok(())
}
