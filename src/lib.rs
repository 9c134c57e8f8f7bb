//! Goosetype Model Registry
//!
//! Builds document-store schemas from domain models at runtime. Each model
//! declares its fields (scalar or array, primitive, embedded, referenced or
//! polymorphically referenced, optionally enum-constrained); the registry
//! accumulates those declarations per class and compiles them into shared
//! schema handles that later declarations extend in place.
//!
//! ## Lifecycle of a class
//!
//! ```text
//! UNSEEN ──first field──▶ DEFINED ──first compile/access──▶ COMPILED
//!                                                            │    ▲
//!                                            new fields ─────┘    │
//!                                            (extend in place) ───┘
//! ```
//!
//! ## Example
//!
//! ```
//! use goosetype::{ArrayFieldOptions, FieldOptions, Fields, Model, ModelRegistry, RawType};
//!
//! struct TaxonomyTerm;
//!
//! impl Model for TaxonomyTerm {
//!     const NAME: &'static str = "TaxonomyTerm";
//!
//!     fn define(fields: &mut Fields<'_>) -> goosetype::Result<()> {
//!         fields
//!             .prop("slug", RawType::String, FieldOptions::new().required())?
//!             .array_prop("children", ArrayFieldOptions::items_ref("TaxonomyTerm"))?;
//!         Ok(())
//!     }
//! }
//!
//! let registry = ModelRegistry::new();
//! let schema = registry.register_model::<TaxonomyTerm>().unwrap();
//! assert_eq!(schema.path_names(), vec!["children", "slug"]);
//! ```

pub mod checksum;
pub mod compiler;
pub mod config;
pub mod error;
pub mod hooks;
pub mod manifest;
pub mod model;
pub mod names;
pub mod normalizer;
pub mod registry;
pub mod relations;
pub mod resolver;
pub mod schema;

pub use checksum::Checksum;
pub use compiler::{CompiledPath, CompiledSchema, PathType};
pub use config::GoosetypeConfig;
pub use error::{Result, SchemaError};
pub use hooks::{Hook, HookKind};
pub use manifest::ModelManifest;
pub use model::{DeclaredTypes, Fields, Model, TypeIntrospector};
pub use names::ClassName;
pub use registry::{ClassState, ModelRegistry};
pub use relations::{Relation, RelationGraph, RelationKind};
pub use schema::{
    ArrayFieldOptions, ClassRef, EnumValues, FieldOptions, FieldSpec, FieldType, PrimitiveKind,
    RawType, SchemaDefinition, SchemaOptions,
};

/// The process-wide registry
pub fn global() -> &'static ModelRegistry {
    ModelRegistry::global()
}
