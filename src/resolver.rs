//! Type Resolution
//!
//! Classifies a raw declared type into a [`FieldType`]. Class types become
//! embedded schemas resolved by name, so a class may embed itself: nothing is
//! realized here, the compiler does that on first access.

use std::collections::BTreeMap;

use tracing::{trace, warn};

use crate::names::ClassName;
use crate::schema::{FieldType, PrimitiveKind, RawType, SchemaDefinition};

/// Resolve a raw type, creating an empty definition for any class seen for
/// the first time.
pub fn resolve_type(
    raw: &RawType,
    definitions: &mut BTreeMap<ClassName, SchemaDefinition>,
) -> FieldType {
    match raw {
        RawType::String => FieldType::Primitive(PrimitiveKind::Text),
        RawType::Number => FieldType::Primitive(PrimitiveKind::Number),
        RawType::Boolean => FieldType::Primitive(PrimitiveKind::Boolean),
        RawType::Object | RawType::Unknown => FieldType::Primitive(PrimitiveKind::Mixed),
        RawType::Buffer => FieldType::Primitive(PrimitiveKind::Buffer),
        RawType::ObjectId => FieldType::ObjectId,
        RawType::Class(class) => {
            let name = class.class_name();
            if name.is_empty() {
                warn!(raw = class.raw(), "class type without a usable name, using Mixed");
                return FieldType::Primitive(PrimitiveKind::Mixed);
            }
            if !definitions.contains_key(&name) {
                trace!(class = %name, "placeholder definition for embedded class");
                definitions.insert(name.clone(), SchemaDefinition::new());
            }
            FieldType::Embedded(name)
        }
    }
}
