//! Field Descriptor Normalization
//!
//! Turns one field declaration into a [`FieldSpec`]. Scalar and array
//! declarations share option handling: `enum` is normalized, everything in the
//! attribute bag is carried over untouched.

use std::collections::BTreeMap;

use crate::error::{Result, SchemaError};
use crate::names::ClassName;
use crate::resolver::resolve_type;
use crate::schema::{
    ArrayFieldOptions, FieldOptions, FieldSpec, FieldType, PrimitiveKind, RawType,
    SchemaDefinition,
};

/// Spec of a scalar field.
///
/// `ref` wins over `ref_path`, which wins over the explicit `type`, which wins
/// over the declared type. With none of them the field is `Mixed`.
pub fn scalar_field_spec(
    declared: Option<RawType>,
    options: FieldOptions,
    definitions: &mut BTreeMap<ClassName, SchemaDefinition>,
) -> FieldSpec {
    let FieldOptions {
        field_type,
        reference,
        ref_path,
        enum_values,
        attributes,
    } = options;

    let field_type = if let Some(target) = reference {
        FieldType::Reference(target.class_name())
    } else if let Some(path) = ref_path {
        FieldType::PolymorphicReference(path)
    } else {
        match field_type.or(declared) {
            Some(raw) => resolve_type(&raw, definitions),
            None => FieldType::Primitive(PrimitiveKind::Mixed),
        }
    };

    FieldSpec {
        field_type,
        enum_values: enum_values.map(|values| values.normalize()),
        attributes,
    }
}

/// Spec of an array field.
///
/// Exactly one of `items_type`, `items_ref`, `items_ref_path` is expected; when
/// several are set the first in that order is used.
pub fn array_field_spec(
    class: &ClassName,
    field: &str,
    options: ArrayFieldOptions,
    definitions: &mut BTreeMap<ClassName, SchemaDefinition>,
) -> Result<FieldSpec> {
    let ArrayFieldOptions {
        items_type,
        items_ref,
        items_ref_path,
        field: field_options,
    } = options;

    let items = if let Some(raw) = items_type {
        resolve_type(&raw, definitions)
    } else if let Some(target) = items_ref {
        FieldType::Reference(target.class_name())
    } else if let Some(path) = items_ref_path {
        FieldType::PolymorphicReference(path)
    } else {
        return Err(SchemaError::InvalidArrayPropOptions {
            class: class.to_string(),
            field: field.to_string(),
        });
    };

    Ok(FieldSpec {
        field_type: FieldType::array_of(items),
        enum_values: field_options.enum_values.map(|values| values.normalize()),
        attributes: field_options.attributes,
    })
}
