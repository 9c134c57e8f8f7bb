//! Model Registry
//!
//! Owns, per canonical class name, the accumulating schema definition, the
//! lazily compiled schema and the hook lists. Definitions grow monotonically;
//! compiled schemas are created once and only ever extended.
//!
//! Registration is meant to happen during start-up. The per-class
//! create-or-extend decision runs under one lock, so concurrent start-up is
//! safe, but nothing here is tuned for registration on a hot path.

use std::any::type_name;
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::compiler::{CompiledSchema, Compiler};
use crate::error::Result;
use crate::hooks::{Hook, HookKind, HookTable};
use crate::model::{Fields, Model, TypeIntrospector};
use crate::names::ClassName;
use crate::normalizer::{array_field_spec, scalar_field_spec};
use crate::schema::{
    ArrayFieldOptions, FieldOptions, FieldSpec, RawType, SchemaDefinition, SchemaOptions,
};

static GLOBAL: OnceLock<ModelRegistry> = OnceLock::new();

/// Where a class is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassState {
    /// Never mentioned
    Unseen,
    /// Has a definition (possibly an empty placeholder) but no compiled schema
    Defined,
    /// Has a compiled schema
    Compiled,
}

/// Fuzzy class search hit
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub class: ClassName,
    pub fields: usize,
    pub score: i64,
}

#[derive(Default)]
struct RegistryState {
    definitions: BTreeMap<ClassName, SchemaDefinition>,
    schemas: HashMap<ClassName, CompiledSchema>,
    hooks: HookTable,
    /// Rust type registered under each class name by `register_model`
    model_types: HashMap<ClassName, &'static str>,
}

impl RegistryState {
    /// Write a field spec and, if the class is already compiled, extend it.
    fn insert_field(
        &mut self,
        class: ClassName,
        field: &str,
        spec: FieldSpec,
        defaults: &SchemaOptions,
    ) {
        let RegistryState {
            definitions,
            schemas,
            ..
        } = self;

        let definition = definitions.entry(class.clone()).or_insert_with(|| {
            debug!(class = %class, "created schema definition");
            SchemaDefinition::new()
        });
        if definition.insert(field.to_string(), spec.clone()).is_some() {
            debug!(class = %class, field, "field re-registered, latest declaration wins");
        }

        if let Some(schema) = schemas.get(&class).cloned() {
            let mut single = SchemaDefinition::new();
            single.insert(field.to_string(), spec);
            Compiler::new(definitions, schemas, defaults).extend(&schema, &single);
        }
    }
}

/// The schema registry
pub struct ModelRegistry {
    state: Mutex<RegistryState>,
    /// Options for schemas compiled without explicit options (embedded classes)
    defaults: SchemaOptions,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRegistry {
    /// Create an isolated registry
    pub fn new() -> Self {
        Self::with_defaults(SchemaOptions::default())
    }

    /// Create an isolated registry with default schema options
    pub fn with_defaults(defaults: SchemaOptions) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            defaults,
        }
    }

    /// The process-wide registry, created on first use
    pub fn global() -> &'static ModelRegistry {
        GLOBAL.get_or_init(ModelRegistry::new)
    }

    pub fn defaults(&self) -> &SchemaOptions {
        &self.defaults
    }

    // ========== Field registration ==========

    /// Register a scalar field.
    ///
    /// `declared` is the field's static type; `options.field_type` overrides it
    /// and `options.reference` turns the field into an identifier.
    pub fn register_scalar_field(
        &self,
        class: &str,
        field: &str,
        declared: Option<RawType>,
        options: FieldOptions,
    ) -> Result<()> {
        let class = ClassName::new(class);
        let mut state = self.state.lock();
        let spec = scalar_field_spec(declared, options, &mut state.definitions);
        trace!(class = %class, field, field_type = ?spec.field_type, "scalar field");
        state.insert_field(class, field, spec, &self.defaults);
        Ok(())
    }

    /// Register a scalar field, taking its declared type from `introspector`
    pub fn register_scalar_field_with(
        &self,
        introspector: &dyn TypeIntrospector,
        class: &str,
        field: &str,
        options: FieldOptions,
    ) -> Result<()> {
        let declared = introspector.declared_type(&ClassName::new(class), field);
        self.register_scalar_field(class, field, declared, options)
    }

    /// Register an array field.
    ///
    /// Fails with `InvalidArrayPropOptions` unless one of `items_type`,
    /// `items_ref` or `items_ref_path` is given.
    pub fn register_array_field(
        &self,
        class: &str,
        field: &str,
        options: ArrayFieldOptions,
    ) -> Result<()> {
        let class = ClassName::new(class);
        let mut state = self.state.lock();
        let spec = array_field_spec(&class, field, options, &mut state.definitions)?;
        trace!(class = %class, field, field_type = ?spec.field_type, "array field");
        state.insert_field(class, field, spec, &self.defaults);
        Ok(())
    }

    // ========== Schemas ==========

    /// Compile `definition` for `name`, or extend the existing compiled schema
    /// with the fields it lacks. Existing compiled fields are never altered.
    ///
    /// The fields are also merged into the stored definition.
    pub fn find_or_create_schema(
        &self,
        name: &str,
        definition: &SchemaDefinition,
        options: &SchemaOptions,
    ) -> CompiledSchema {
        let class = ClassName::new(name);
        let mut guard = self.state.lock();
        let RegistryState {
            definitions,
            schemas,
            ..
        } = &mut *guard;

        let stored = definitions.entry(class.clone()).or_default();
        for (field, spec) in definition {
            stored.insert(field.clone(), spec.clone());
        }
        // Embedded classes get a definition before the compiler caches them.
        for target in definition.values().filter_map(|spec| spec.field_type.embedded_class()) {
            if !definitions.contains_key(target) {
                debug!(class = %target, "placeholder definition for embedded class");
                definitions.insert(target.clone(), SchemaDefinition::new());
            }
        }

        Compiler::new(definitions, schemas, &self.defaults).find_or_create(
            &class,
            definition,
            options,
        )
    }

    /// Compiled schema for a class. Never fails: an unknown class gets an
    /// empty schema, which later registrations extend in place.
    pub fn compiled_schema(&self, name: &str) -> CompiledSchema {
        let class = ClassName::new(name);
        let mut guard = self.state.lock();
        if let Some(schema) = guard.schemas.get(&class) {
            return schema.clone();
        }

        let RegistryState {
            definitions,
            schemas,
            ..
        } = &mut *guard;
        let definition = definitions.entry(class.clone()).or_default().clone();
        Compiler::new(definitions, schemas, &self.defaults).find_or_create(
            &class,
            &definition,
            &self.defaults,
        )
    }

    /// Register a model: run its field declarations, then compile or extend
    /// its schema with the accumulated definition.
    pub fn register_model<M: Model>(&self) -> Result<CompiledSchema> {
        self.register_model_inner::<M>(None)
    }

    /// Like [`register_model`](Self::register_model), with an introspector for
    /// fields declared without a type
    pub fn register_model_with<M: Model>(
        &self,
        introspector: &dyn TypeIntrospector,
    ) -> Result<CompiledSchema> {
        self.register_model_inner::<M>(Some(introspector))
    }

    fn register_model_inner<M: Model>(
        &self,
        introspector: Option<&dyn TypeIntrospector>,
    ) -> Result<CompiledSchema> {
        let class = ClassName::new(M::NAME);
        {
            let mut state = self.state.lock();
            let rust_type = type_name::<M>();
            match state.model_types.get(&class) {
                Some(existing) if *existing != rust_type => {
                    warn!(
                        class = %class,
                        existing = *existing,
                        incoming = rust_type,
                        "two model types share one class name; their fields are merged"
                    );
                }
                Some(_) => {}
                None => {
                    state.model_types.insert(class.clone(), rust_type);
                }
            }
        }

        let mut fields = Fields::new(self, M::NAME, introspector);
        M::define(&mut fields)?;

        let definition = self.definition(M::NAME).unwrap_or_default();
        Ok(self.find_or_create_schema(M::NAME, &definition, &M::schema_options()))
    }

    // ========== Introspection ==========

    /// Snapshot of a class's definition
    pub fn definition(&self, name: &str) -> Option<SchemaDefinition> {
        self.state.lock().definitions.get(&ClassName::new(name)).cloned()
    }

    /// Snapshot of every definition
    pub fn definitions(&self) -> BTreeMap<ClassName, SchemaDefinition> {
        self.state.lock().definitions.clone()
    }

    pub fn field_spec(&self, class: &str, field: &str) -> Option<FieldSpec> {
        self.state
            .lock()
            .definitions
            .get(&ClassName::new(class))
            .and_then(|definition| definition.get(field).cloned())
    }

    /// All known class names, sorted
    pub fn class_names(&self) -> Vec<ClassName> {
        self.state.lock().definitions.keys().cloned().collect()
    }

    pub fn class_state(&self, name: &str) -> ClassState {
        let class = ClassName::new(name);
        let state = self.state.lock();
        if state.schemas.contains_key(&class) {
            ClassState::Compiled
        } else if state.definitions.contains_key(&class) {
            ClassState::Defined
        } else {
            ClassState::Unseen
        }
    }

    /// Search class names (fuzzy)
    pub fn search(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        let matcher = SkimMatcherV2::default();
        let state = self.state.lock();

        let mut results: Vec<SearchResult> = state
            .definitions
            .iter()
            .filter_map(|(class, definition)| {
                matcher.fuzzy_match(class.as_str(), query).map(|score| SearchResult {
                    class: class.clone(),
                    fields: definition.len(),
                    score,
                })
            })
            .collect();

        // Sort by score descending
        results.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.class.cmp(&b.class)));
        results.truncate(limit);
        results
    }

    // ========== Hooks ==========

    /// Append a hook for `(kind, class)`. Duplicates are kept.
    pub fn register_hook(&self, kind: HookKind, class: &str, hook: Hook) {
        let class = ClassName::new(class);
        let count = self.state.lock().hooks.push(kind, class.clone(), hook);
        trace!(class = %class, kind = %kind, count, "registered hook");
    }

    /// Hooks for `(kind, class)` in registration order
    pub fn hooks(&self, kind: HookKind, class: &str) -> Vec<Hook> {
        self.state.lock().hooks.get(kind, &ClassName::new(class))
    }

    /// Run every hook for `(kind, class)` on `document`, in registration
    /// order. Returns how many ran.
    pub fn run_hooks(&self, kind: HookKind, class: &str, document: &mut Value) -> usize {
        let hooks = self.hooks(kind, class);
        for hook in &hooks {
            hook.call(document);
        }
        hooks.len()
    }
}
