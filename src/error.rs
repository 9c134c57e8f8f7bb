//! Error types for the model registry

use std::path::PathBuf;

use thiserror::Error;

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Model registry errors
#[derive(Error, Debug)]
pub enum SchemaError {
    /// An array field was declared without `items_type`, `items_ref` or `items_ref_path`.
    #[error(
        "InvalidArrayPropOptions: array field {class}.{field} must define \
         items_type, items_ref, or items_ref_path"
    )]
    InvalidArrayPropOptions { class: String, field: String },

    #[error("Invalid manifest {}: {message}", .path.display())]
    Manifest { path: PathBuf, message: String },

    #[error("Unsupported manifest format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl SchemaError {
    /// Whether this error means the declared data model itself is malformed.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            SchemaError::InvalidArrayPropOptions { .. } | SchemaError::Manifest { .. }
        )
    }
}
