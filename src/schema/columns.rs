//! Ordered feature column schema
//!
//! The exact set and order of columns the classifier was trained on. Loaded
//! once at startup from a JSON array of strings and never mutated.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::AssessError;

const ARTIFACT: &str = "feature_columns";

/// Ordered, duplicate-free list of feature column names
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSchema {
    columns: Vec<String>,
    index: HashMap<String, usize>,
}

impl FeatureSchema {
    /// Build a schema from an ordered column list
    pub fn from_columns(columns: Vec<String>) -> Result<Self, AssessError> {
        if columns.is_empty() {
            return Err(AssessError::invalid_artifact(ARTIFACT, "column list is empty"));
        }

        let mut index = HashMap::with_capacity(columns.len());
        for (pos, name) in columns.iter().enumerate() {
            if index.insert(name.clone(), pos).is_some() {
                return Err(AssessError::invalid_artifact(
                    ARTIFACT,
                    format!("duplicate column '{}'", name),
                ));
            }
        }

        Ok(Self { columns, index })
    }

    /// Parse a JSON array of column names
    pub fn from_json(json: &str) -> Result<Self, AssessError> {
        let columns: Vec<String> = serde_json::from_str(json)
            .map_err(|e| AssessError::missing_artifact(ARTIFACT, e))?;
        Self::from_columns(columns)
    }

    /// Load the schema artifact from disk
    pub fn load(path: &Path) -> Result<Self, AssessError> {
        let json = fs::read_to_string(path).map_err(|e| {
            AssessError::missing_artifact(ARTIFACT, format!("{}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Position of a column, if present
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// True if any column is a one-hot level of `prefix` (`<prefix>_<level>`)
    pub fn has_family(&self, prefix: &str) -> bool {
        self.family(prefix).next().is_some()
    }

    /// Columns belonging to a one-hot family, in schema order
    pub fn family<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.columns.iter().filter_map(move |c| {
            c.strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix('_'))
                .filter(|level| !level.is_empty() && level.chars().all(|ch| ch.is_ascii_digit()))
                .map(|_| c.as_str())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_from_columns_keeps_order() {
        let schema = FeatureSchema::from_columns(columns(&["age", "cp_0", "cp_1"])).unwrap();
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.position("cp_1"), Some(2));
        assert_eq!(schema.position("chol"), None);
    }

    #[test]
    fn test_rejects_empty_and_duplicates() {
        assert!(matches!(
            FeatureSchema::from_columns(Vec::new()),
            Err(AssessError::InvalidArtifact { .. })
        ));
        assert!(matches!(
            FeatureSchema::from_columns(columns(&["age", "age"])),
            Err(AssessError::InvalidArtifact { .. })
        ));
    }

    #[test]
    fn test_family_matching() {
        let schema = FeatureSchema::from_columns(columns(&[
            "thalach", "thal_0", "thal_2", "thal_x", "cp_1",
        ]))
        .unwrap();

        let thal: Vec<&str> = schema.family("thal").collect();
        assert_eq!(thal, vec!["thal_0", "thal_2"]);
        assert!(schema.has_family("cp"));
        assert!(!schema.has_family("slope"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"["age", "sex", "cp_0"]"#).unwrap();

        let schema = FeatureSchema::load(file.path()).unwrap();
        assert_eq!(schema.columns(), &columns(&["age", "sex", "cp_0"])[..]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = FeatureSchema::load(Path::new("/nonexistent/feature_columns.json")).unwrap_err();
        match err {
            AssessError::StartupArtifactMissing { artifact, .. } => {
                assert_eq!(artifact, "feature_columns")
            }
            other => panic!("expected StartupArtifactMissing, got {:?}", other),
        }
    }

    #[test]
    fn test_load_malformed_json() {
        let err = FeatureSchema::from_json(r#"{"age": 1}"#).unwrap_err();
        assert!(matches!(err, AssessError::StartupArtifactMissing { .. }));
    }
}
