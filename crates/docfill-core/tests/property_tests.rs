//! Property-based tests for docfill-core
//!
//! Checkbox exclusivity, placeholder extraction and marker handling over
//! generated inputs.
//!
//! Run with: cargo test -p docfill-core --test property_tests

use docfill_core::marker;
use docfill_core::tracker::FieldStore;
use docfill_core::{extract_placeholders, CheckboxResolver, FieldValue, FieldValues, Schema};
use proptest::prelude::*;

// ============================================================
// Strategies
// ============================================================

fn field_name() -> impl Strategy<Value = String> {
    "[a-z][a-zA-Z0-9_]{0,11}"
}

fn field_value() -> impl Strategy<Value = FieldValue> {
    prop_oneof![
        Just(FieldValue::Null),
        any::<bool>().prop_map(FieldValue::Bool),
        "[A-Za-z]{0,6}".prop_map(FieldValue::Text),
        Just(FieldValue::from("true")),
        Just(FieldValue::from("false")),
    ]
}

fn dual_schema() -> Schema {
    Schema::from_json(
        r#"{"properties": {
            "isCriticalEquipment": {
                "type": "boolean",
                "docx_mapping": { "type": "checkbox", "true_name": "Check1", "false_name": "Check2" }
            }
        }}"#,
    )
    .unwrap()
}

fn radio_schema(options: &[String]) -> Schema {
    let mapping: Vec<serde_json::Value> = options
        .iter()
        .enumerate()
        .map(|(i, value)| serde_json::json!({ "name": format!("Check{}", i + 1), "value": value }))
        .collect();
    let schema = serde_json::json!({
        "properties": {
            "choice": { "type": "string", "docx_mapping": { "type": "radio", "mapping": mapping } }
        }
    });
    Schema::from_json(&schema.to_string()).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // ============================================================
    // Checkbox resolution
    // ============================================================

    #[test]
    fn dual_checkbox_is_mutually_exclusive(flag in any::<bool>(), as_text in any::<bool>()) {
        let schema = dual_schema();
        let value = if as_text { FieldValue::from(flag.to_string()) } else { FieldValue::Bool(flag) };
        let values: FieldValues = [("isCriticalEquipment".to_string(), value)].into_iter().collect();
        let resolver = CheckboxResolver::new(Some(&schema), &values);

        let yes = resolver.resolve("Check1");
        let no = resolver.resolve("Check2");
        prop_assert!(yes != no);
        prop_assert_eq!(yes, flag);
    }

    #[test]
    fn radio_checks_exactly_the_matching_entry(
        options in proptest::collection::btree_set("[A-Z]{1,3}", 1..6),
        pick in any::<prop::sample::Index>(),
        miss in any::<bool>(),
    ) {
        let options: Vec<String> = options.into_iter().collect();
        let schema = radio_schema(&options);
        let current = if miss { "none-of-them".to_string() } else { pick.get(&options).clone() };
        let values: FieldValues = [("choice".to_string(), FieldValue::from(current.clone()))].into_iter().collect();
        let resolver = CheckboxResolver::new(Some(&schema), &values);

        let checked: Vec<usize> = (0..options.len())
            .filter(|i| resolver.resolve(&format!("Check{}", i + 1)))
            .collect();
        if miss {
            prop_assert!(checked.is_empty());
        } else {
            prop_assert_eq!(checked.len(), 1);
            prop_assert_eq!(&options[checked[0]], &current);
        }
    }

    #[test]
    fn unmapped_bookmarks_never_panic(value in field_value(), n in 1u32..500) {
        let bookmark = format!("Check{}", n);
        let values: FieldValues = [(bookmark.clone(), value.clone())].into_iter().collect();
        let checked = CheckboxResolver::new(None, &values).resolve(&bookmark);
        prop_assert_eq!(checked, value.as_bool() == Some(true));
    }

    // ============================================================
    // Placeholder extraction
    // ============================================================

    #[test]
    fn placeholders_unique_in_first_occurrence_order(
        names in proptest::collection::vec(field_name(), 1..8),
        repeats in 1usize..4,
    ) {
        let mut text = String::new();
        for _ in 0..repeats {
            for name in &names {
                text.push_str(&format!("text {{{}}} ", name));
            }
        }

        let mut expected: Vec<String> = Vec::new();
        for name in &names {
            if !expected.contains(name) {
                expected.push(name.clone());
            }
        }
        prop_assert_eq!(extract_placeholders(&text), expected);
    }

    // ============================================================
    // Markers and edit tracking
    // ============================================================

    #[test]
    fn escaped_values_round_trip_through_markers(
        lines in proptest::collection::vec("[A-Za-z0-9 ,.;:!?'-]{0,10}", 1..4),
        field in field_name(),
    ) {
        let value = lines.join("\n");
        let encoded = marker::encode(&marker::escape_newlines(&value), &field);
        let decoded = marker::decode(&encoded);
        prop_assert_eq!(decoded.len(), 1);
        prop_assert_eq!(marker::restore_newlines(&decoded[0].payload), value);
    }

    #[test]
    fn unset_field_is_edited_only_when_non_empty(field in field_name(), text in "[a-z]{0,5}") {
        let store = FieldStore::new(FieldValues::new());
        let value = FieldValue::from(text.clone());
        prop_assert_eq!(store.is_edited(&field, &value), !text.is_empty());
    }
}
