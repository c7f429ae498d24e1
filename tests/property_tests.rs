//! Property-based tests for serialization invariants.

use proptest::prelude::*;
use serde_json::json;

use lancaster::{SchemaBuilder, TypeConfig};

/// Generate valid type/field names (start with [a-z_], then [a-z0-9_]).
fn arb_name() -> impl Strategy<Value = String> {
    "[a-z_][a-z0-9_]{0,11}"
}

/// Generate Avro primitive type names.
fn arb_primitive_name() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("null"),
        Just("boolean"),
        Just("int"),
        Just("long"),
        Just("float"),
        Just("double"),
        Just("bytes"),
        Just("string"),
    ]
}

proptest! {
    /// Serializing the same graph twice with independent reference states
    /// yields identical documents.
    #[test]
    fn prop_serialization_is_idempotent(
        name in arb_name(),
        fields in prop::collection::vec((arb_name(), arb_primitive_name()), 1..8),
    ) {
        let mut builder = SchemaBuilder::new();
        builder
            .record(&name, |r| {
                for (field_name, field_type) in &fields {
                    r.required(field_name, *field_type)?;
                }
                Ok(())
            })
            .unwrap();

        prop_assert_eq!(builder.to_value().unwrap(), builder.to_value().unwrap());
        prop_assert_eq!(builder.to_json().unwrap(), builder.to_json().unwrap());
    }

    /// A named type referenced N times is emitted as a full definition
    /// exactly once, at its first occurrence; the rest are fullname
    /// strings.
    #[test]
    fn prop_shared_type_defined_exactly_once(reference_count in 2usize..8) {
        let mut builder = SchemaBuilder::new();
        builder.fixed("shared", 8).unwrap();
        builder
            .record("holder", |r| {
                for i in 0..reference_count {
                    r.required(&format!("f{i}"), "shared")?;
                }
                Ok(())
            })
            .unwrap();

        let value = builder.to_value().unwrap();
        prop_assert_eq!(value.to_string().matches("\"type\":\"fixed\"").count(), 1);

        let fields = value["fields"].as_array().unwrap();
        prop_assert_eq!(&fields[0]["type"]["type"], &json!("fixed"));
        for field in &fields[1..] {
            prop_assert_eq!(&field["type"], &json!("shared"));
        }
    }

    /// Two separate sessions building the same nested definition produce
    /// byte-identical documents, synthesized names included.
    #[test]
    fn prop_independent_sessions_agree(name in arb_name(), field in arb_name()) {
        let build_once = || {
            let mut builder = SchemaBuilder::new();
            builder
                .record(&name, |r| {
                    r.required_record(&field, TypeConfig::new(), |n| {
                        n.required("s", "string")
                    })
                })
                .unwrap();
            builder.to_json().unwrap()
        };
        prop_assert_eq!(build_once(), build_once());
    }
}
