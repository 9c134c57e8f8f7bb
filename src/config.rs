//! Configuration management for the model registry
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (goosetype.toml)
//! - Environment variables (GOOSETYPE__*)
//!
//! ## Example config file (goosetype.toml):
//! ```toml
//! [schema]
//! timestamps = true
//!
//! [schema.to_json]
//! virtuals = true
//!
//! [manifests]
//! paths = ["models"]
//! extensions = ["toml", "json"]
//!
//! [logging]
//! filter = "goosetype=debug"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::registry::ModelRegistry;
use crate::schema::SchemaOptions;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoosetypeConfig {
    /// Default options for schemas compiled without explicit options
    #[serde(default)]
    pub schema: SchemaOptions,

    /// Where model manifests live
    #[serde(default)]
    pub manifests: ManifestConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Manifest discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestConfig {
    /// Files or directories to load, in order
    #[serde(default = "default_manifest_paths")]
    pub paths: Vec<PathBuf>,

    /// File extensions picked up when walking directories
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when RUST_LOG is not set
    #[serde(default = "default_filter")]
    pub filter: String,
}

// Default value functions
fn default_manifest_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("models")]
}

fn default_extensions() -> Vec<String> {
    vec!["toml".to_string(), "json".to_string()]
}

fn default_filter() -> String {
    "warn".to_string()
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            paths: default_manifest_paths(),
            extensions: default_extensions(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

impl GoosetypeConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = ["goosetype.toml", ".goosetype.toml", "config/goosetype.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "goosetype", "goosetype") {
            let xdg_config = config_dir.config_dir().join("goosetype.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (GOOSETYPE__*)
        builder = builder.add_source(
            Environment::with_prefix("GOOSETYPE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Manifest paths, relative ones resolved against the working directory
    pub fn manifest_paths(&self) -> Vec<PathBuf> {
        self.manifests
            .paths
            .iter()
            .map(|p| {
                if p.is_absolute() {
                    p.clone()
                } else {
                    std::env::current_dir().unwrap_or_default().join(p)
                }
            })
            .collect()
    }

    /// A fresh registry using the configured schema defaults
    pub fn registry(&self) -> ModelRegistry {
        ModelRegistry::with_defaults(self.schema.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GoosetypeConfig::default();
        assert_eq!(config.manifests.extensions, vec!["toml", "json"]);
        assert_eq!(config.logging.filter, "warn");
        assert!(!config.schema.timestamps);
    }

    #[test]
    fn test_serialize_config() {
        let config = GoosetypeConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[manifests]"));
        assert!(toml_str.contains("[logging]"));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("goosetype.toml");
        std::fs::write(
            &path,
            "[schema]\ntimestamps = true\ncollection = \"things\"\n\n\
             [logging]\nfilter = \"debug\"\n",
        )
        .unwrap();

        let config = GoosetypeConfig::load_from(path.to_str()).unwrap();
        assert!(config.schema.timestamps);
        assert_eq!(config.logging.filter, "debug");

        let registry = config.registry();
        assert_eq!(registry.defaults().collection.as_deref(), Some("things"));
    }
}
