//! Schema types and structures
//!
//! The vocabulary shared by the resolver, the registry and the compiler:
//! raw declared types, field options, normalized field specs and
//! document-level schema options.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::model::Model;
use crate::names::ClassName;

/// Storage kind of a primitive field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    Text,
    Number,
    Boolean,
    /// Untyped object value
    Mixed,
    /// Raw bytes
    Buffer,
}

impl PrimitiveKind {
    /// Name of this kind in the document store's schema notation
    pub fn type_name(&self) -> &'static str {
        match self {
            PrimitiveKind::Text => "String",
            PrimitiveKind::Number => "Number",
            PrimitiveKind::Boolean => "Boolean",
            PrimitiveKind::Mixed => "Mixed",
            PrimitiveKind::Buffer => "Buffer",
        }
    }
}

/// Reference to another domain class, by value or by name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassRef(String);

impl ClassRef {
    /// Reference a class by its model type
    pub fn of<M: Model>() -> Self {
        Self(M::NAME.to_string())
    }

    /// Reference a class by a string literal
    pub fn named(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Name as given by the caller (not canonicalized)
    pub fn raw(&self) -> &str {
        &self.0
    }

    pub fn class_name(&self) -> ClassName {
        ClassName::new(&self.0)
    }
}

impl From<&str> for ClassRef {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl From<String> for ClassRef {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// A field's declared type before resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawType {
    String,
    Number,
    Boolean,
    /// Generic object
    Object,
    Buffer,
    /// Identifier marker
    ObjectId,
    /// Another domain class
    Class(ClassRef),
    /// A declared type with no storage mapping (`any`, interfaces, ...)
    Unknown,
}

impl RawType {
    pub fn class<M: Model>() -> Self {
        RawType::Class(ClassRef::of::<M>())
    }

    /// Parse a type name as written in a model manifest.
    ///
    /// Anything that is not a known marker names a class.
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "String" | "string" | "text" => RawType::String,
            "Number" | "number" => RawType::Number,
            "Boolean" | "boolean" | "bool" => RawType::Boolean,
            "Object" | "object" | "Mixed" | "mixed" | "{}" => RawType::Object,
            "Buffer" | "buffer" | "bytes" => RawType::Buffer,
            "ObjectId" | "objectId" | "ObjectID" => RawType::ObjectId,
            "" | "any" | "unknown" => RawType::Unknown,
            other => RawType::Class(ClassRef::named(other)),
        }
    }
}

impl fmt::Display for RawType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawType::String => f.write_str("String"),
            RawType::Number => f.write_str("Number"),
            RawType::Boolean => f.write_str("Boolean"),
            RawType::Object => f.write_str("Object"),
            RawType::Buffer => f.write_str("Buffer"),
            RawType::ObjectId => f.write_str("ObjectId"),
            RawType::Class(class) => f.write_str(class.raw()),
            RawType::Unknown => f.write_str("unknown"),
        }
    }
}

/// Resolved storage shape of a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "of", rename_all = "snake_case")]
pub enum FieldType {
    Primitive(PrimitiveKind),
    /// Identifier without a fixed target class
    ObjectId,
    /// Nested document of another class
    Embedded(ClassName),
    /// Identifier of a document of the named class
    Reference(ClassName),
    /// Identifier whose class is named by the given sibling field
    PolymorphicReference(String),
    ArrayOf(Box<FieldType>),
}

impl FieldType {
    pub fn array_of(items: FieldType) -> Self {
        FieldType::ArrayOf(Box::new(items))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, FieldType::ArrayOf(_))
    }

    /// Class names this field points at (embedded or referenced)
    pub fn target_class(&self) -> Option<&ClassName> {
        match self {
            FieldType::Embedded(class) | FieldType::Reference(class) => Some(class),
            FieldType::ArrayOf(items) => items.target_class(),
            _ => None,
        }
    }

    /// Class embedded by this field, directly or as array items
    pub fn embedded_class(&self) -> Option<&ClassName> {
        match self {
            FieldType::Embedded(class) => Some(class),
            FieldType::ArrayOf(items) => items.embedded_class(),
            _ => None,
        }
    }
}

/// Allowed values of an enum-constrained field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumValues {
    /// Ordered allowed values
    List(Vec<String>),
    /// Numeric enum stored both ways: `("0", "A"), ("1", "B"), ("A", "0"), ("B", "1")`
    Bidirectional(Vec<(String, String)>),
    /// String enum: `("Admin", "admin"), ("Guest", "guest")`
    Named(Vec<(String, String)>),
}

impl EnumValues {
    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        EnumValues::List(values.into_iter().map(Into::into).collect())
    }

    /// Build the two-way encoding from `(index, name)` pairs
    pub fn bidirectional<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (i64, S)>,
        S: Into<String>,
    {
        let forward: Vec<(String, String)> = entries
            .into_iter()
            .map(|(index, name)| (index.to_string(), name.into()))
            .collect();
        let backward: Vec<(String, String)> = forward
            .iter()
            .map(|(index, name)| (name.clone(), index.clone()))
            .collect();
        EnumValues::Bidirectional(forward.into_iter().chain(backward).collect())
    }

    /// Canonical ordered list of allowed values
    pub fn normalize(&self) -> Vec<String> {
        match self {
            EnumValues::List(values) => values.clone(),
            EnumValues::Bidirectional(pairs) => {
                let mut forward: Vec<(i64, &String)> = pairs
                    .iter()
                    .filter_map(|(key, name)| key.trim().parse::<i64>().ok().map(|i| (i, name)))
                    .collect();
                forward.sort_by_key(|(index, _)| *index);
                forward.into_iter().map(|(_, name)| name.clone()).collect()
            }
            EnumValues::Named(pairs) => pairs.iter().map(|(_, value)| value.clone()).collect(),
        }
    }
}

/// Normalized description of one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub field_type: FieldType,
    /// Allowed values, constraining the field (for arrays, the wrapper)
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    /// Options passed through without interpretation (`default`, `required`, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
}

impl FieldSpec {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            enum_values: None,
            attributes: BTreeMap::new(),
        }
    }
}

/// Accumulated field specs of one class
pub type SchemaDefinition = BTreeMap<String, FieldSpec>;

/// Options of a scalar field declaration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldOptions {
    /// Explicit type, overrides the declared type
    pub field_type: Option<RawType>,
    /// Reference target; makes the field an identifier
    pub reference: Option<ClassRef>,
    /// Sibling field naming the reference target per document
    pub ref_path: Option<String>,
    pub enum_values: Option<EnumValues>,
    pub attributes: BTreeMap<String, Value>,
}

impl FieldOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, field_type: RawType) -> Self {
        self.field_type = Some(field_type);
        self
    }

    pub fn with_ref(mut self, target: impl Into<ClassRef>) -> Self {
        self.reference = Some(target.into());
        self
    }

    pub fn with_ref_path(mut self, path: impl Into<String>) -> Self {
        self.ref_path = Some(path.into());
        self
    }

    pub fn with_enum(mut self, values: EnumValues) -> Self {
        self.enum_values = Some(values);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn required(self) -> Self {
        self.with_attribute("required", true)
    }
}

/// Options of an array field declaration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArrayFieldOptions {
    /// Inline item type
    pub items_type: Option<RawType>,
    /// Items are identifiers of this class
    pub items_ref: Option<ClassRef>,
    /// Items are identifiers whose class is named by this sibling field
    pub items_ref_path: Option<String>,
    /// Options applied to the array field itself
    pub field: FieldOptions,
}

impl ArrayFieldOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items_type(items_type: RawType) -> Self {
        Self {
            items_type: Some(items_type),
            ..Self::default()
        }
    }

    pub fn items_ref(target: impl Into<ClassRef>) -> Self {
        Self {
            items_ref: Some(target.into()),
            ..Self::default()
        }
    }

    pub fn items_ref_path(path: impl Into<String>) -> Self {
        Self {
            items_ref_path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn with_enum(mut self, values: EnumValues) -> Self {
        self.field.enum_values = Some(values);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.field.attributes.insert(key.into(), value.into());
        self
    }
}

/// Serialization transform options (`toObject` / `toJSON`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformOptions {
    #[serde(default)]
    pub getters: bool,
    #[serde(default)]
    pub virtuals: bool,
}

/// Document-level schema options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaOptions {
    /// Collection name override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    /// Maintain `createdAt` / `updatedAt`
    #[serde(default)]
    pub timestamps: bool,
    #[serde(default)]
    pub use_push_each: bool,
    #[serde(default)]
    pub to_object: TransformOptions,
    #[serde(default)]
    pub to_json: TransformOptions,
}

impl SchemaOptions {
    /// Options every registered schema ends up with: getters on both
    /// representations and push-each array updates.
    pub fn enforce_serialization(&mut self) {
        self.to_object.getters = true;
        self.to_json.getters = true;
        self.use_push_each = true;
    }
}
