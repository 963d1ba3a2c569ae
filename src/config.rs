//! Layered configuration
//!
//! Priority (highest to lowest):
//! 1. Environment variables prefixed with `HEARTRISK_` (`__` separates nested keys)
//! 2. TOML file (explicit path, or `heartrisk.toml` in the working directory)
//! 3. Built-in defaults

use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::artifacts::ArtifactPaths;
use crate::error::AssessError;
use crate::features::CategoryPolicy;
use crate::messages::AudienceMode;

/// Default configuration file name
pub const CONFIG_FILE: &str = "heartrisk.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "HEARTRISK_";

/// Service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Artifact locations
    pub artifacts: ArtifactPaths,
    /// Handling of categorical levels missing from the schema
    pub unknown_category: CategoryPolicy,
    /// Re-check input domains before assembly
    pub validate_ranges: bool,
    /// Default audience for rendered messages
    pub mode: AudienceMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            artifacts: ArtifactPaths::default(),
            unknown_category: CategoryPolicy::Baseline,
            validate_ranges: true,
            mode: AudienceMode::Standard,
        }
    }
}

impl Config {
    /// Figment with every configuration source merged
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        match file {
            Some(path) => figment = figment.merge(Toml::file(path)),
            None => {
                if Path::new(CONFIG_FILE).exists() {
                    figment = figment.merge(Toml::file(CONFIG_FILE));
                }
            }
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load configuration from layered sources
    pub fn load(file: Option<&Path>) -> Result<Self, AssessError> {
        if let Some(path) = file {
            if !path.exists() {
                return Err(AssessError::Config(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
        }

        Self::figment(file)
            .extract()
            .map_err(|e| AssessError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn test_defaults() {
        Jail::expect_with(|_jail| {
            let config = Config::load(None).unwrap();
            assert_eq!(config, Config::default());
            assert_eq!(
                config.artifacts.model,
                PathBuf::from("artifacts/heart_disease_rf_model.json")
            );
            assert!(config.validate_ranges);
            Ok(())
        });
    }

    #[test]
    fn test_toml_file_in_working_directory() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                unknown_category = "strict"
                mode = "patient"

                [artifacts]
                model = "/models/rf.json"
                "#,
            )?;

            let config = Config::load(None).unwrap();
            assert_eq!(config.unknown_category, CategoryPolicy::Strict);
            assert_eq!(config.mode, AudienceMode::Patient);
            assert_eq!(config.artifacts.model, PathBuf::from("/models/rf.json"));
            assert_eq!(
                config.artifacts.scaler,
                PathBuf::from("artifacts/heart_scaler.json")
            );
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("custom.toml", r#"mode = "family""#)?;
            jail.set_env("HEARTRISK_MODE", "professional");
            jail.set_env("HEARTRISK_VALIDATE_RANGES", "false");
            jail.set_env("HEARTRISK_ARTIFACTS__FEATURE_COLUMNS", "/srv/columns.json");

            let config = Config::load(Some(Path::new("custom.toml"))).unwrap();
            assert_eq!(config.mode, AudienceMode::Professional);
            assert!(!config.validate_ranges);
            assert_eq!(
                config.artifacts.feature_columns,
                PathBuf::from("/srv/columns.json")
            );
            Ok(())
        });
    }

    #[test]
    fn test_invalid_values() {
        Jail::expect_with(|jail| {
            jail.set_env("HEARTRISK_UNKNOWN_CATEGORY", "sometimes");
            assert!(matches!(Config::load(None), Err(AssessError::Config(_))));
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file() {
        Jail::expect_with(|_jail| {
            let err = Config::load(Some(Path::new("absent.toml"))).unwrap_err();
            assert!(err.to_string().contains("absent.toml"));
            Ok(())
        });
    }
}
