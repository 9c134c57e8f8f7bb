//! Model Manifests
//!
//! Declarative model files (TOML or JSON). Each file is one registration
//! pass: its fields are registered, then every model it names is compiled or
//! extended. Several files may contribute fields to the same class.
//!
//! ```toml
//! [[models]]
//! name = "ProductsFilter"
//!
//! [[models.fields]]
//! name = "filterType"
//! enum = { 0 = "Category", 1 = "Attribute", Category = 0, Attribute = 1 }
//!
//! [[models.fields]]
//! name = "taxonomyTermOptions"
//! kind = "array"
//! items_ref = "TaxonomyTerm"
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::compiler::CompiledSchema;
use crate::error::{Result, SchemaError};
use crate::model::TypeIntrospector;
use crate::names::ClassName;
use crate::registry::ModelRegistry;
use crate::schema::{
    ArrayFieldOptions, ClassRef, EnumValues, FieldOptions, RawType, SchemaOptions,
};

/// One manifest file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelManifest {
    #[serde(default)]
    pub models: Vec<ModelDecl>,
    /// File this manifest was read from
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// A model and the fields this manifest contributes to it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelDecl {
    pub name: String,
    /// Options used if this pass creates the compiled schema
    #[serde(default)]
    pub options: Option<SchemaOptions>,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    #[default]
    Scalar,
    Array,
}

/// Allowed values as written in a manifest. Tables keep their written order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnumDecl {
    List(Vec<String>),
    Map(IndexMap<String, Value>),
}

impl EnumDecl {
    /// Tag the manifest form. A map with integer keys is a two-way numeric
    /// enum (its integer entries ordered by index); any other map is a string
    /// enum keyed by member name, in written order.
    pub fn to_enum_values(&self) -> EnumValues {
        match self {
            EnumDecl::List(values) => EnumValues::List(values.clone()),
            EnumDecl::Map(map) => {
                let numeric = map.keys().any(|key| key.trim().parse::<i64>().is_ok());
                if numeric {
                    let mut forward: Vec<(i64, String, String)> = map
                        .iter()
                        .filter_map(|(key, value)| {
                            key.trim()
                                .parse::<i64>()
                                .ok()
                                .map(|index| (index, key.clone(), value_to_string(value)))
                        })
                        .collect();
                    forward.sort_by_key(|(index, _, _)| *index);
                    let backward = map
                        .iter()
                        .filter(|(key, _)| key.trim().parse::<i64>().is_err())
                        .map(|(key, value)| (key.clone(), value_to_string(value)));
                    EnumValues::Bidirectional(
                        forward
                            .into_iter()
                            .map(|(_, key, value)| (key, value))
                            .chain(backward)
                            .collect(),
                    )
                } else {
                    EnumValues::Named(
                        map.iter()
                            .map(|(key, value)| (key.clone(), value_to_string(value)))
                            .collect(),
                    )
                }
            }
        }
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One field declaration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDecl {
    pub name: String,
    #[serde(default)]
    pub kind: FieldKind,
    /// Explicit type (overrides `declared`)
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
    /// Statically declared type
    #[serde(default)]
    pub declared: Option<String>,
    #[serde(default, rename = "ref")]
    pub reference: Option<String>,
    #[serde(default)]
    pub ref_path: Option<String>,
    #[serde(default, rename = "enum")]
    pub enum_values: Option<EnumDecl>,
    #[serde(default)]
    pub items_type: Option<String>,
    #[serde(default)]
    pub items_ref: Option<String>,
    #[serde(default)]
    pub items_ref_path: Option<String>,
    /// Passed through to the field spec untouched
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

impl FieldDecl {
    /// Options that belong to the other kind of field are rejected rather
    /// than dropped.
    fn check_kind(&self) -> std::result::Result<(), String> {
        let (foreign, expected): (Vec<&str>, &str) = match self.kind {
            FieldKind::Scalar => (
                [
                    ("items_type", self.items_type.is_some()),
                    ("items_ref", self.items_ref.is_some()),
                    ("items_ref_path", self.items_ref_path.is_some()),
                ]
                .into_iter()
                .filter_map(|(key, set)| set.then_some(key))
                .collect(),
                "kind = \"array\"",
            ),
            FieldKind::Array => (
                [
                    ("type", self.type_name.is_some()),
                    ("ref", self.reference.is_some()),
                    ("ref_path", self.ref_path.is_some()),
                ]
                .into_iter()
                .filter_map(|(key, set)| set.then_some(key))
                .collect(),
                "items_type, items_ref or items_ref_path",
            ),
        };

        if foreign.is_empty() {
            Ok(())
        } else {
            Err(format!(
                "{:?} field {} sets {}; use {}",
                self.kind,
                self.name,
                foreign.join(", "),
                expected
            ))
        }
    }

    fn field_options(&self) -> FieldOptions {
        FieldOptions {
            field_type: self.type_name.as_deref().map(RawType::parse),
            reference: self.reference.clone().map(ClassRef::from),
            ref_path: self.ref_path.clone(),
            enum_values: self.enum_values.as_ref().map(EnumDecl::to_enum_values),
            attributes: self.attributes.clone(),
        }
    }

    fn array_options(&self) -> ArrayFieldOptions {
        ArrayFieldOptions {
            items_type: self.items_type.as_deref().map(RawType::parse),
            items_ref: self.items_ref.clone().map(ClassRef::from),
            items_ref_path: self.items_ref_path.clone(),
            field: FieldOptions {
                field_type: None,
                reference: None,
                ref_path: None,
                ..self.field_options()
            },
        }
    }
}

impl ModelManifest {
    /// Parse a manifest file; the format follows the extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut manifest: ModelManifest = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content).map_err(|e| SchemaError::Manifest {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?,
            Some("json") => serde_json::from_str(&content).map_err(|e| SchemaError::Manifest {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?,
            _ => return Err(SchemaError::UnsupportedFormat(path.to_path_buf())),
        };
        manifest.source = Some(path.to_path_buf());
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Reject fields whose options contradict their kind
    pub fn validate(&self) -> Result<()> {
        for model in &self.models {
            for field in &model.fields {
                field.check_kind().map_err(|message| SchemaError::Manifest {
                    path: self.source.clone().unwrap_or_default(),
                    message: format!("model {}: {}", model.name, message),
                })?;
            }
        }
        Ok(())
    }

    /// Register every field, then compile or extend every model, in file order.
    /// Nothing is registered if any field fails validation.
    pub fn apply(&self, registry: &ModelRegistry) -> Result<Vec<CompiledSchema>> {
        self.validate()?;
        for model in &self.models {
            for field in &model.fields {
                match field.kind {
                    FieldKind::Scalar => registry.register_scalar_field_with(
                        self,
                        &model.name,
                        &field.name,
                        field.field_options(),
                    )?,
                    FieldKind::Array => registry.register_array_field(
                        &model.name,
                        &field.name,
                        field.array_options(),
                    )?,
                }
            }
        }

        let schemas = self
            .models
            .iter()
            .map(|model| {
                let definition = registry.definition(&model.name).unwrap_or_default();
                let options = model
                    .options
                    .clone()
                    .unwrap_or_else(|| registry.defaults().clone());
                registry.find_or_create_schema(&model.name, &definition, &options)
            })
            .collect();
        Ok(schemas)
    }
}

impl TypeIntrospector for ModelManifest {
    fn declared_type(&self, class: &ClassName, field: &str) -> Option<RawType> {
        self.models
            .iter()
            .filter(|model| &ClassName::new(&model.name) == class)
            .flat_map(|model| model.fields.iter())
            .filter(|decl| decl.name == field)
            .find_map(|decl| decl.declared.as_deref().map(RawType::parse))
    }
}

/// Collect manifest files under `path` (a file or a directory), sorted
pub fn discover(path: &Path, extensions: &[String]) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| extensions.iter().any(|allowed| allowed == ext))
        })
        .collect();
    files.sort();
    files
}

/// Apply every manifest under `paths` as its own registration pass
pub fn load_all(
    registry: &ModelRegistry,
    paths: &[PathBuf],
    extensions: &[String],
) -> Result<Vec<PathBuf>> {
    let mut applied = Vec::new();
    for path in paths {
        if !path.exists() {
            debug!(path = %path.display(), "manifest path does not exist, skipping");
            continue;
        }
        for file in discover(path, extensions) {
            let manifest = ModelManifest::from_path(&file)?;
            let schemas = manifest.apply(registry)?;
            info!(path = %file.display(), models = schemas.len(), "applied manifest");
            applied.push(file);
        }
    }
    Ok(applied)
}
