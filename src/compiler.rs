//! Schema Compilation
//!
//! Realizes accumulated definitions into [`CompiledSchema`] handles. A handle
//! is shared: an embedded class compiles to the same handle its own
//! registration extends later, so every parent sees fields added after the
//! parent was compiled.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use tracing::{debug, trace};

use crate::names::ClassName;
use crate::schema::{FieldSpec, FieldType, PrimitiveKind, SchemaDefinition, SchemaOptions};

/// Storage shape of a compiled path
#[derive(Clone)]
pub enum PathType {
    Primitive(PrimitiveKind),
    ObjectId {
        reference: Option<ClassName>,
        ref_path: Option<String>,
    },
    Embedded(CompiledSchema),
    Array(Box<PathType>),
}

impl PathType {
    /// Compiled schema of an embedded path (or embedded array items)
    pub fn embedded(&self) -> Option<&CompiledSchema> {
        match self {
            PathType::Embedded(schema) => Some(schema),
            PathType::Array(items) => items.embedded(),
            _ => None,
        }
    }

    fn describe(&self) -> Value {
        match self {
            PathType::Primitive(kind) => json!(kind.type_name()),
            PathType::ObjectId { .. } => json!("ObjectId"),
            PathType::Embedded(schema) => json!({ "$schema": schema.class().as_str() }),
            PathType::Array(items) => json!([items.describe()]),
        }
    }
}

impl fmt::Debug for PathType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathType::Primitive(kind) => write!(f, "{}", kind.type_name()),
            PathType::ObjectId {
                reference: Some(class),
                ..
            } => write!(f, "ObjectId(ref {})", class),
            PathType::ObjectId {
                ref_path: Some(path),
                ..
            } => write!(f, "ObjectId(refPath {})", path),
            PathType::ObjectId { .. } => f.write_str("ObjectId"),
            PathType::Embedded(schema) => write!(f, "Embedded({})", schema.class()),
            PathType::Array(items) => write!(f, "[{:?}]", items),
        }
    }
}

/// One realized field
#[derive(Debug, Clone)]
pub struct CompiledPath {
    pub path_type: PathType,
    pub enum_values: Option<Vec<String>>,
    pub attributes: BTreeMap<String, Value>,
}

impl CompiledPath {
    fn describe(&self) -> Value {
        let mut extras = Map::new();
        if let Some(values) = &self.enum_values {
            extras.insert("enum".to_string(), json!(values));
        }
        for (key, value) in &self.attributes {
            extras.insert(key.clone(), value.clone());
        }

        // Reference arrays keep their options on the item, as the store expects.
        if let PathType::Array(items) = &self.path_type {
            if let PathType::ObjectId { .. } = items.as_ref() {
                let mut item = object_id_description(items);
                item.extend(extras);
                return Value::Array(vec![Value::Object(item)]);
            }
        }

        let mut described = match &self.path_type {
            PathType::ObjectId { .. } => object_id_description(&self.path_type),
            other => {
                let mut map = Map::new();
                map.insert("type".to_string(), other.describe());
                map
            }
        };
        described.extend(extras);
        Value::Object(described)
    }
}

fn object_id_description(path_type: &PathType) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("type".to_string(), json!("ObjectId"));
    if let PathType::ObjectId {
        reference,
        ref_path,
    } = path_type
    {
        if let Some(class) = reference {
            map.insert("ref".to_string(), json!(class.as_str()));
        }
        if let Some(path) = ref_path {
            map.insert("refPath".to_string(), json!(path));
        }
    }
    map
}

struct SchemaState {
    paths: BTreeMap<String, CompiledPath>,
    options: SchemaOptions,
}

struct Shared {
    class: ClassName,
    state: RwLock<SchemaState>,
}

/// Shared handle to a compiled schema.
///
/// Handles are reference counted. A class that embeds itself, directly or
/// through a cycle, holds a handle to itself, so its compiled schema is never
/// freed, even after the registry that built it is dropped. Registries are
/// meant to live as long as the process; a short-lived registry leaks its
/// cyclic schemas.
#[derive(Clone)]
pub struct CompiledSchema(Arc<Shared>);

impl CompiledSchema {
    pub(crate) fn empty(class: ClassName, options: SchemaOptions) -> Self {
        Self(Arc::new(Shared {
            class,
            state: RwLock::new(SchemaState {
                paths: BTreeMap::new(),
                options,
            }),
        }))
    }

    pub fn class(&self) -> &ClassName {
        &self.0.class
    }

    pub fn options(&self) -> SchemaOptions {
        self.0.state.read().options.clone()
    }

    pub fn path(&self, name: &str) -> Option<CompiledPath> {
        self.0.state.read().paths.get(name).cloned()
    }

    pub fn has_path(&self, name: &str) -> bool {
        self.0.state.read().paths.contains_key(name)
    }

    /// Path names in sorted order
    pub fn path_names(&self) -> Vec<String> {
        self.0.state.read().paths.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.state.read().paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.state.read().paths.is_empty()
    }

    /// Whether both handles point at the same schema
    pub fn ptr_eq(&self, other: &CompiledSchema) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// External description in the document store's notation.
    ///
    /// Embedded schemas appear by class name (`{"$schema": "address"}`).
    pub fn describe(&self) -> Value {
        let state = self.0.state.read();
        let paths: Map<String, Value> = state
            .paths
            .iter()
            .map(|(name, path)| (name.clone(), path.describe()))
            .collect();
        json!({
            "class": self.0.class.as_str(),
            "options": state.options,
            "paths": paths,
        })
    }

    /// Add a path unless it exists; existing paths are never replaced.
    fn add_path(&self, name: &str, path: CompiledPath) -> bool {
        let mut state = self.0.state.write();
        if state.paths.contains_key(name) {
            return false;
        }
        state.paths.insert(name.to_string(), path);
        true
    }

    pub(crate) fn update_options(&self, update: impl FnOnce(&mut SchemaOptions)) {
        update(&mut self.0.state.write().options);
    }
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0.state.read();
        f.debug_struct("CompiledSchema")
            .field("class", &self.0.class)
            .field("paths", &state.paths)
            .field("options", &state.options)
            .finish()
    }
}

/// Compiles definitions against the registry's schema cache
pub(crate) struct Compiler<'a> {
    definitions: &'a BTreeMap<ClassName, SchemaDefinition>,
    schemas: &'a mut HashMap<ClassName, CompiledSchema>,
    defaults: &'a SchemaOptions,
}

impl<'a> Compiler<'a> {
    pub(crate) fn new(
        definitions: &'a BTreeMap<ClassName, SchemaDefinition>,
        schemas: &'a mut HashMap<ClassName, CompiledSchema>,
        defaults: &'a SchemaOptions,
    ) -> Self {
        Self {
            definitions,
            schemas,
            defaults,
        }
    }

    /// Compile `definition` for `class`, or extend the cached schema with the
    /// fields it lacks. Options only apply when the schema is created.
    pub(crate) fn find_or_create(
        &mut self,
        class: &ClassName,
        definition: &SchemaDefinition,
        options: &SchemaOptions,
    ) -> CompiledSchema {
        let schema = match self.schemas.get(class).cloned() {
            Some(existing) => {
                let added = self.extend(&existing, definition);
                debug!(class = %class, added, "extended compiled schema");
                existing
            }
            None => {
                let schema = CompiledSchema::empty(class.clone(), options.clone());
                self.schemas.insert(class.clone(), schema.clone());
                let added = self.extend(&schema, definition);
                debug!(class = %class, paths = added, "compiled schema");
                schema
            }
        };
        schema.update_options(SchemaOptions::enforce_serialization);
        schema
    }

    /// Add every field of `definition` missing from `schema`.
    pub(crate) fn extend(
        &mut self,
        schema: &CompiledSchema,
        definition: &SchemaDefinition,
    ) -> usize {
        let mut added = 0;
        for (name, spec) in definition {
            if schema.has_path(name) {
                continue;
            }
            let path = self.realize(spec);
            if schema.add_path(name, path) {
                trace!(class = %schema.class(), field = %name, "added path");
                added += 1;
            }
        }
        added
    }

    fn realize(&mut self, spec: &FieldSpec) -> CompiledPath {
        CompiledPath {
            path_type: self.realize_type(&spec.field_type),
            enum_values: spec.enum_values.clone(),
            attributes: spec.attributes.clone(),
        }
    }

    fn realize_type(&mut self, field_type: &FieldType) -> PathType {
        match field_type {
            FieldType::Primitive(kind) => PathType::Primitive(*kind),
            FieldType::ObjectId => PathType::ObjectId {
                reference: None,
                ref_path: None,
            },
            FieldType::Reference(class) => PathType::ObjectId {
                reference: Some(class.clone()),
                ref_path: None,
            },
            FieldType::PolymorphicReference(path) => PathType::ObjectId {
                reference: None,
                ref_path: Some(path.clone()),
            },
            FieldType::Embedded(class) => PathType::Embedded(self.embedded(class)),
            FieldType::ArrayOf(items) => PathType::Array(Box::new(self.realize_type(items))),
        }
    }

    /// Handle for an embedded class. The handle is cached before it is filled,
    /// so a class reached again while filling (itself, or a cycle) gets the
    /// same handle back instead of recursing.
    fn embedded(&mut self, class: &ClassName) -> CompiledSchema {
        if let Some(schema) = self.schemas.get(class) {
            return schema.clone();
        }

        let schema = CompiledSchema::empty(class.clone(), self.defaults.clone());
        schema.update_options(SchemaOptions::enforce_serialization);
        self.schemas.insert(class.clone(), schema.clone());

        let definitions = self.definitions;
        if let Some(definition) = definitions.get(class) {
            self.extend(&schema, definition);
        }
        debug!(class = %class, paths = schema.len(), "compiled embedded schema");
        schema
    }
}
