//! Registry Behaviour Tests
//!
//! Storefront models registered through the public API.

use std::sync::{Arc, Mutex};

use goosetype::{
    ArrayFieldOptions, ClassName, ClassState, EnumValues, FieldOptions, FieldType, Fields, Hook,
    HookKind, Model, ModelRegistry, PathType, PrimitiveKind, RawType, SchemaError, SchemaOptions,
};
use serde_json::json;

// =============================================================================
// Models
// =============================================================================

struct Address;

impl Model for Address {
    const NAME: &'static str = "Address";

    fn define(fields: &mut Fields<'_>) -> goosetype::Result<()> {
        fields
            .prop("street1", RawType::String, FieldOptions::new())?
            .prop("city", RawType::String, FieldOptions::new())?
            .prop("zip", RawType::String, FieldOptions::new())?;
        Ok(())
    }
}

struct OrderCustomer;

impl Model for OrderCustomer {
    const NAME: &'static str = "OrderCustomer";

    fn schema_options() -> SchemaOptions {
        SchemaOptions {
            collection: Some("orderCustomers".to_string()),
            ..SchemaOptions::default()
        }
    }

    fn define(fields: &mut Fields<'_>) -> goosetype::Result<()> {
        fields
            .prop("userId", RawType::String, FieldOptions::new())?
            .prop("email", RawType::String, FieldOptions::new().required())?
            .prop("shippingAddress", RawType::class::<Address>(), FieldOptions::new())?
            .prop("billingAddress", RawType::class::<Address>(), FieldOptions::new())?
            .prop("savePaymentInfo", RawType::Boolean, FieldOptions::new())?;
        Ok(())
    }
}

struct TaxonomyTerm;

impl Model for TaxonomyTerm {
    const NAME: &'static str = "TaxonomyTerm";

    fn define(fields: &mut Fields<'_>) -> goosetype::Result<()> {
        fields.prop("slug", RawType::String, FieldOptions::new())?;
        Ok(())
    }
}

struct ProductsFilter;

impl Model for ProductsFilter {
    const NAME: &'static str = "ProductsFilter";

    fn define(fields: &mut Fields<'_>) -> goosetype::Result<()> {
        fields
            .prop(
                "filterType",
                RawType::Number,
                FieldOptions::new().with_enum(EnumValues::bidirectional([
                    (0, "TaxonomyTermChecklist"),
                    (1, "AttributeValueChecklist"),
                    (2, "PriceRange"),
                ])),
            )?
            .prop("enabled", RawType::Boolean, FieldOptions::new())?
            .array_prop(
                "taxonomyTermOptions",
                ArrayFieldOptions::items_ref(goosetype::ClassRef::of::<TaxonomyTerm>()),
            )?
            .array_prop("attributeValueOptions", ArrayFieldOptions::items_type(RawType::Object))?;
        Ok(())
    }
}

struct Category;

impl Model for Category {
    const NAME: &'static str = "Category";

    fn define(fields: &mut Fields<'_>) -> goosetype::Result<()> {
        fields
            .prop("name", RawType::String, FieldOptions::new())?
            .prop("parent", RawType::class::<Category>(), FieldOptions::new())?
            .array_prop("children", ArrayFieldOptions::items_type(RawType::class::<Category>()))?;
        Ok(())
    }
}

// =============================================================================
// Field registration
// =============================================================================

#[test]
fn test_reregistered_field_latest_wins() {
    let registry = ModelRegistry::new();
    registry
        .register_scalar_field("Widget", "size", Some(RawType::String), FieldOptions::new())
        .unwrap();
    registry
        .register_scalar_field("Widget", "color", Some(RawType::String), FieldOptions::new())
        .unwrap();
    registry
        .register_scalar_field("Widget", "size", Some(RawType::Number), FieldOptions::new())
        .unwrap();

    let definition = registry.definition("Widget").unwrap();
    assert_eq!(definition.len(), 2);
    assert_eq!(
        definition["size"].field_type,
        FieldType::Primitive(PrimitiveKind::Number)
    );
    assert_eq!(
        definition["color"].field_type,
        FieldType::Primitive(PrimitiveKind::Text)
    );
}

#[test]
fn test_array_without_items_option_fails() {
    let registry = ModelRegistry::new();
    let err = registry
        .register_array_field(
            "Widget",
            "parts",
            ArrayFieldOptions::new().with_attribute("default", json!([])),
        )
        .unwrap_err();

    assert!(matches!(err, SchemaError::InvalidArrayPropOptions { ref class, ref field }
        if class == "widget" && field == "parts"));
    assert!(err.is_configuration_error());
    assert!(registry.field_spec("Widget", "parts").is_none());
}

#[test]
fn test_array_items_variants() {
    let registry = ModelRegistry::new();
    registry
        .register_array_field("Widget", "tags", ArrayFieldOptions::items_type(RawType::String))
        .unwrap();
    registry
        .register_array_field("Widget", "parts", ArrayFieldOptions::items_ref("Part"))
        .unwrap();
    registry
        .register_array_field(
            "Widget",
            "attachments",
            ArrayFieldOptions::items_ref_path("attachmentKind"),
        )
        .unwrap();

    assert_eq!(
        registry.field_spec("Widget", "tags").unwrap().field_type,
        FieldType::array_of(FieldType::Primitive(PrimitiveKind::Text))
    );
    assert_eq!(
        registry.field_spec("Widget", "parts").unwrap().field_type,
        FieldType::array_of(FieldType::Reference(ClassName::new("part")))
    );
    assert_eq!(
        registry.field_spec("Widget", "attachments").unwrap().field_type,
        FieldType::array_of(FieldType::PolymorphicReference("attachmentKind".to_string()))
    );
}

#[test]
fn test_enum_encodings_normalize_alike() {
    let registry = ModelRegistry::new();
    registry
        .register_scalar_field(
            "Widget",
            "listed",
            Some(RawType::String),
            FieldOptions::new().with_enum(EnumValues::list(["A", "B"])),
        )
        .unwrap();
    registry
        .register_scalar_field(
            "Widget",
            "mapped",
            Some(RawType::Number),
            FieldOptions::new().with_enum(EnumValues::Bidirectional(vec![
                ("0".into(), "A".into()),
                ("1".into(), "B".into()),
                ("A".into(), "0".into()),
                ("B".into(), "1".into()),
            ])),
        )
        .unwrap();

    let expected = Some(vec!["A".to_string(), "B".to_string()]);
    assert_eq!(registry.field_spec("Widget", "listed").unwrap().enum_values, expected);
    assert_eq!(registry.field_spec("Widget", "mapped").unwrap().enum_values, expected);
}

#[test]
fn test_bidirectional_enum_is_ordered_by_index() {
    let shuffled = EnumValues::Bidirectional(vec![
        ("B".into(), "1".into()),
        ("1".into(), "B".into()),
        ("A".into(), "0".into()),
        ("0".into(), "A".into()),
    ]);
    assert_eq!(shuffled.normalize(), vec!["A", "B"]);

    let signed = EnumValues::bidirectional([(1, "Active"), (-1, "Deleted"), (0, "Draft")]);
    assert_eq!(signed.normalize(), vec!["Deleted", "Draft", "Active"]);

    let registry = ModelRegistry::new();
    registry
        .register_scalar_field(
            "Product",
            "status",
            Some(RawType::Number),
            FieldOptions::new().with_enum(signed),
        )
        .unwrap();
    assert_eq!(
        registry.field_spec("Product", "status").unwrap().enum_values,
        Some(vec!["Deleted".to_string(), "Draft".to_string(), "Active".to_string()])
    );
}

#[test]
fn test_enum_on_reference_field() {
    let registry = ModelRegistry::new();
    registry
        .register_scalar_field(
            "Order",
            "customer",
            None,
            FieldOptions::new()
                .with_ref("OrderCustomer")
                .with_enum(EnumValues::bidirectional([(1, "Guest"), (0, "Member")])),
        )
        .unwrap();

    let spec = registry.field_spec("Order", "customer").unwrap();
    assert_eq!(spec.field_type, FieldType::Reference(ClassName::new("orderCustomer")));
    assert_eq!(spec.enum_values, Some(vec!["Member".to_string(), "Guest".to_string()]));

    let described = registry.compiled_schema("Order").describe();
    assert_eq!(
        described["paths"]["customer"],
        json!({ "type": "ObjectId", "ref": "orderCustomer", "enum": ["Member", "Guest"] })
    );
}

#[test]
fn test_ref_accepts_model_or_string() {
    let registry = ModelRegistry::new();
    registry
        .register_scalar_field(
            "Order",
            "customer",
            Some(RawType::class::<OrderCustomer>()),
            FieldOptions::new().with_ref(goosetype::ClassRef::of::<OrderCustomer>()),
        )
        .unwrap();
    registry
        .register_scalar_field(
            "Order",
            "buyer",
            None,
            FieldOptions::new().with_ref("order-customer"),
        )
        .unwrap();

    let expected = FieldType::Reference(ClassName::new("orderCustomer"));
    assert_eq!(registry.field_spec("Order", "customer").unwrap().field_type, expected);
    assert_eq!(registry.field_spec("Order", "buyer").unwrap().field_type, expected);
    // A reference does not embed, so no placeholder is created for the target.
    assert_eq!(registry.class_state("OrderCustomer"), ClassState::Unseen);
}

// =============================================================================
// Compilation
// =============================================================================

#[test]
fn test_unknown_class_compiles_empty() {
    let registry = ModelRegistry::new();
    let schema = registry.compiled_schema("Widget");

    assert!(schema.is_empty());
    assert_eq!(schema.class(), &ClassName::new("widget"));
    assert!(schema.options().to_object.getters);
    assert!(schema.options().to_json.getters);
    assert!(schema.ptr_eq(&registry.compiled_schema("widget")));
}

#[test]
fn test_two_registration_passes_extend_one_schema() {
    let registry = ModelRegistry::new();
    registry
        .register_scalar_field("Widget", "a", Some(RawType::String), FieldOptions::new().required())
        .unwrap();
    registry
        .register_scalar_field("Widget", "b", Some(RawType::Number), FieldOptions::new())
        .unwrap();
    let first = registry.find_or_create_schema(
        "Widget",
        &registry.definition("Widget").unwrap(),
        &SchemaOptions::default(),
    );
    let a_before = format!("{:?}", first.path("a").unwrap());
    let b_before = format!("{:?}", first.path("b").unwrap());

    registry
        .register_scalar_field("Widget", "c", Some(RawType::Boolean), FieldOptions::new())
        .unwrap();
    let second = registry.find_or_create_schema(
        "Widget",
        &registry.definition("Widget").unwrap(),
        &SchemaOptions::default(),
    );

    assert!(first.ptr_eq(&second));
    assert_eq!(second.path_names(), vec!["a", "b", "c"]);
    assert_eq!(format!("{:?}", second.path("a").unwrap()), a_before);
    assert_eq!(format!("{:?}", second.path("b").unwrap()), b_before);
}

#[test]
fn test_compiled_paths_are_not_replaced() {
    let registry = ModelRegistry::new();
    registry
        .register_scalar_field("Widget", "size", Some(RawType::String), FieldOptions::new())
        .unwrap();
    let schema = registry.compiled_schema("Widget");

    registry
        .register_scalar_field("Widget", "size", Some(RawType::Number), FieldOptions::new())
        .unwrap();

    assert_eq!(
        registry.field_spec("Widget", "size").unwrap().field_type,
        FieldType::Primitive(PrimitiveKind::Number)
    );
    assert!(matches!(
        schema.path("size").unwrap().path_type,
        PathType::Primitive(PrimitiveKind::Text)
    ));
}

#[test]
fn test_self_reference_compiles() {
    let registry = ModelRegistry::new();
    let schema = registry.register_model::<Category>().unwrap();

    let parent = schema.path("parent").unwrap();
    assert!(parent.path_type.embedded().unwrap().ptr_eq(&schema));
    let children = schema.path("children").unwrap();
    assert!(children.path_type.embedded().unwrap().ptr_eq(&schema));

    let described = schema.describe();
    assert_eq!(described["paths"]["parent"], json!({ "type": { "$schema": "category" } }));
    assert_eq!(described["paths"]["children"], json!({ "type": [{ "$schema": "category" }] }));
}

#[test]
fn test_embedded_placeholder_is_extended_in_place() {
    let registry = ModelRegistry::new();
    let customer = registry.register_model::<OrderCustomer>().unwrap();

    let address = customer
        .path("shippingAddress")
        .unwrap()
        .path_type
        .embedded()
        .cloned()
        .unwrap();
    assert!(address.is_empty());
    assert_eq!(registry.class_state("Address"), ClassState::Compiled);

    registry.register_model::<Address>().unwrap();

    assert_eq!(address.path_names(), vec!["city", "street1", "zip"]);
    let billing = customer.path("billingAddress").unwrap();
    assert!(billing.path_type.embedded().unwrap().ptr_eq(&address));
}

#[test]
fn test_model_options_and_description() {
    let registry = ModelRegistry::new();
    registry.register_model::<TaxonomyTerm>().unwrap();
    let filter = registry.register_model::<ProductsFilter>().unwrap();
    let customer = registry.register_model::<OrderCustomer>().unwrap();

    assert_eq!(customer.options().collection.as_deref(), Some("orderCustomers"));
    assert!(customer.options().use_push_each);

    let described = filter.describe();
    assert_eq!(described["class"], json!("productsFilter"));
    assert_eq!(
        described["paths"]["filterType"],
        json!({
            "type": "Number",
            "enum": ["TaxonomyTermChecklist", "AttributeValueChecklist", "PriceRange"]
        })
    );
    assert_eq!(
        described["paths"]["taxonomyTermOptions"],
        json!([{ "type": "ObjectId", "ref": "taxonomyTerm" }])
    );
    assert_eq!(
        described["paths"]["attributeValueOptions"],
        json!({ "type": ["Mixed"] })
    );
    assert_eq!(
        customer.describe()["paths"]["email"],
        json!({ "type": "String", "required": true })
    );
}

#[test]
fn test_invalid_model_aborts_registration() {
    struct Broken;

    impl Model for Broken {
        const NAME: &'static str = "Broken";

        fn define(fields: &mut Fields<'_>) -> goosetype::Result<()> {
            fields
                .prop("name", RawType::String, FieldOptions::new())?
                .array_prop("items", ArrayFieldOptions::new())?;
            Ok(())
        }
    }

    let registry = ModelRegistry::new();
    let err = registry.register_model::<Broken>().unwrap_err();
    assert!(matches!(err, SchemaError::InvalidArrayPropOptions { .. }));
    assert_eq!(registry.class_state("Broken"), ClassState::Defined);
}

#[test]
fn test_introspected_types() {
    struct Profile;

    impl Model for Profile {
        const NAME: &'static str = "Profile";

        fn define(fields: &mut Fields<'_>) -> goosetype::Result<()> {
            fields
                .prop_with("nickname", FieldOptions::new())?
                .prop_with("avatar", FieldOptions::new().with_type(RawType::Buffer))?
                .prop_with("notes", FieldOptions::new())?;
            Ok(())
        }
    }

    let types = goosetype::DeclaredTypes::new()
        .with("Profile", "nickname", RawType::String)
        .with("Profile", "avatar", RawType::String);

    let registry = ModelRegistry::new();
    let schema = registry.register_model_with::<Profile>(&types).unwrap();

    let described = schema.describe();
    assert_eq!(described["paths"]["nickname"], json!({ "type": "String" }));
    assert_eq!(described["paths"]["avatar"], json!({ "type": "Buffer" }));
    assert_eq!(described["paths"]["notes"], json!({ "type": "Mixed" }));
}

// =============================================================================
// Hooks
// =============================================================================

#[test]
fn test_duplicate_hook_runs_twice_in_order() {
    let registry = ModelRegistry::new();
    let calls = Arc::new(Mutex::new(Vec::new()));

    let log = calls.clone();
    let h = Hook::new(move |_| log.lock().unwrap().push("h"));
    let log = calls.clone();
    let g = Hook::new(move |_| log.lock().unwrap().push("g"));

    registry.register_hook(HookKind::Post, "Widget", h.clone());
    registry.register_hook(HookKind::Post, "Widget", g);
    registry.register_hook(HookKind::Post, "widget", h);

    let mut document = json!({});
    assert_eq!(registry.run_hooks(HookKind::Post, "Widget", &mut document), 3);
    assert_eq!(*calls.lock().unwrap(), vec!["h", "g", "h"]);
    assert_eq!(registry.run_hooks(HookKind::Pre, "Widget", &mut document), 0);
}

#[test]
fn test_hooks_see_the_document() {
    let registry = ModelRegistry::new();
    registry.register_hook(
        HookKind::Pre,
        "OrderCustomer",
        Hook::new(|doc| {
            if let Some(email) = doc.get("email").and_then(|e| e.as_str()) {
                let lowered = email.to_lowercase();
                doc["email"] = json!(lowered);
            }
        }),
    );

    let mut document = json!({ "email": "Shopper@Example.COM" });
    registry.run_hooks(HookKind::Pre, "order_customer", &mut document);
    assert_eq!(document["email"], json!("shopper@example.com"));
}
