//! Domain Models
//!
//! A [`Model`] is the Rust counterpart of an annotated domain class: it names
//! itself and declares its fields against a [`Fields`] registrar. Registering
//! the model runs those declarations and then compiles (or extends) its schema.

use std::collections::HashMap;

use crate::error::Result;
use crate::names::ClassName;
use crate::registry::ModelRegistry;
use crate::schema::{ArrayFieldOptions, FieldOptions, RawType, SchemaOptions};

/// A domain class whose schema is declared field by field
pub trait Model {
    /// Class name; canonicalized before use
    const NAME: &'static str;

    /// Document-level options passed when the schema is first compiled
    fn schema_options() -> SchemaOptions {
        SchemaOptions::default()
    }

    /// Declare the fields of this class
    fn define(fields: &mut Fields<'_>) -> Result<()>;
}

/// Source of statically declared field types.
///
/// Only consulted when a field is declared without an explicit type.
pub trait TypeIntrospector {
    fn declared_type(&self, class: &ClassName, field: &str) -> Option<RawType>;
}

/// A fixed table of declared types
#[derive(Debug, Clone, Default)]
pub struct DeclaredTypes {
    types: HashMap<(ClassName, String), RawType>,
}

impl DeclaredTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, class: &str, field: impl Into<String>, raw: RawType) {
        self.types.insert((ClassName::new(class), field.into()), raw);
    }

    pub fn with(mut self, class: &str, field: impl Into<String>, raw: RawType) -> Self {
        self.insert(class, field, raw);
        self
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TypeIntrospector for DeclaredTypes {
    fn declared_type(&self, class: &ClassName, field: &str) -> Option<RawType> {
        self.types.get(&(class.clone(), field.to_string())).cloned()
    }
}

/// Field registrar handed to [`Model::define`]
pub struct Fields<'a> {
    registry: &'a ModelRegistry,
    class: &'a str,
    introspector: Option<&'a dyn TypeIntrospector>,
}

impl<'a> Fields<'a> {
    pub(crate) fn new(
        registry: &'a ModelRegistry,
        class: &'a str,
        introspector: Option<&'a dyn TypeIntrospector>,
    ) -> Self {
        Self {
            registry,
            class,
            introspector,
        }
    }

    pub fn class_name(&self) -> ClassName {
        ClassName::new(self.class)
    }

    /// Scalar field with a declared type
    pub fn prop(
        &mut self,
        name: &str,
        declared: RawType,
        options: FieldOptions,
    ) -> Result<&mut Self> {
        self.registry
            .register_scalar_field(self.class, name, Some(declared), options)?;
        Ok(self)
    }

    /// Scalar field typed by its options (or the introspector, if any)
    pub fn prop_with(&mut self, name: &str, options: FieldOptions) -> Result<&mut Self> {
        match self.introspector {
            Some(introspector) => self.registry.register_scalar_field_with(
                introspector,
                self.class,
                name,
                options,
            )?,
            None => self
                .registry
                .register_scalar_field(self.class, name, None, options)?,
        }
        Ok(self)
    }

    /// Array field
    pub fn array_prop(&mut self, name: &str, options: ArrayFieldOptions) -> Result<&mut Self> {
        self.registry.register_array_field(self.class, name, options)?;
        Ok(self)
    }
}
