//! Entity evaluator. Pure logic, no storage access.

use serde_json::Value;

use super::rules::{ValidationResult, MSG_NOT_DEFINED, MSG_NOT_INTEGER, MSG_REQUIRED};
use crate::entity::Entity;
use crate::error::Details;
use crate::schema::{Attribute, AttributeKind, Schema};

/// Validate `entity` against `schema`.
///
/// Every present key is checked independently and reports at most one
/// message; required attributes missing from the payload are reported
/// afterwards. RELATIONSHIP attributes carry no field-level rules here,
/// their shape is checked when the write is partitioned.
pub fn validate(schema: &Schema, entity: &Entity) -> ValidationResult {
    if entity.schema_id_str() != Some(schema.id.as_str()) {
        return ValidationResult::schema_mismatch();
    }

    let mut messages = Details::new();

    for (key, value) in &entity.fields {
        let Some(attribute) = schema.attribute(key) else {
            messages.insert(key.clone(), MSG_NOT_DEFINED.to_string());
            continue;
        };

        if value.is_null() && attribute.required {
            messages.insert(key.clone(), MSG_REQUIRED.to_string());
            continue;
        }

        if let Some(message) = evaluate_attribute(attribute, value) {
            messages.insert(key.clone(), message);
        }
    }

    let missing_required = schema
        .scalar_attributes()
        .filter(|a| a.required && !entity.fields.contains_key(&a.name));
    for attribute in missing_required {
        messages.insert(attribute.name.clone(), MSG_REQUIRED.to_string());
    }

    ValidationResult {
        valid: messages.is_empty(),
        message: None,
        messages: Some(messages),
    }
}

fn evaluate_attribute(attribute: &Attribute, value: &Value) -> Option<String> {
    match &attribute.kind {
        AttributeKind::String { max_length } => evaluate_string(*max_length, value),
        AttributeKind::Numeric { min, max, integer } => {
            evaluate_numeric(*min, *max, *integer, value)
        }
        AttributeKind::Boolean => evaluate_boolean(value),
        AttributeKind::Relationship { .. } => None,
    }
}

fn evaluate_string(max_length: Option<u64>, value: &Value) -> Option<String> {
    let Some(s) = value.as_str() else {
        return Some(format!(
            "This attribute must be a string but got '{}'.",
            json_kind(value)
        ));
    };

    match max_length {
        Some(max) if s.chars().count() as u64 > max => Some(format!("Max length is {max}.")),
        _ => None,
    }
}

/// Checks run in order and stop at the first failure: type, max, min, integer.
fn evaluate_numeric(
    min: Option<f64>,
    max: Option<f64>,
    integer: bool,
    value: &Value,
) -> Option<String> {
    let Some(num) = value.as_f64() else {
        return Some(format!(
            "This attribute must be numeric but got '{}'.",
            json_kind(value)
        ));
    };

    if let Some(max) = max {
        if num > max {
            return Some(format!("Max value is {max}."));
        }
    }

    if let Some(min) = min {
        if num < min {
            // Cites the max bound when one is declared; see DESIGN.md.
            let cited = max.unwrap_or(min);
            return Some(format!("Min value is {cited}."));
        }
    }

    if integer && num.fract() != 0.0 {
        return Some(MSG_NOT_INTEGER.to_string());
    }

    None
}

fn evaluate_boolean(value: &Value) -> Option<String> {
    if value.is_boolean() {
        None
    } else {
        Some(format!(
            "This attribute must be boolean but got '{}'.",
            json_kind(value)
        ))
    }
}

/// JSON kind name used in type-mismatch messages.
fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::rules::MSG_SCHEMA_MISMATCH;
    use serde_json::json;

    const SCHEMA_ID: &str = "87654321-1234-1234-1234-123456789012";

    fn make_schema(attributes: Value) -> Schema {
        serde_json::from_value(json!({
            "id": SCHEMA_ID,
            "display": "Schema",
            "description": "The schema",
            "attributes": attributes,
        }))
        .unwrap()
    }

    fn make_entity(fields: Value) -> Entity {
        let mut payload = json!({
            "id": "12345678-1234-1234-1234-123456789012",
            "schemaId": SCHEMA_ID,
        });
        payload
            .as_object_mut()
            .unwrap()
            .extend(fields.as_object().unwrap().clone());
        serde_json::from_value(payload).unwrap()
    }

    /// bool / number / string schema used by most cases.
    fn standard_schema(number_required: bool, string_required: bool) -> Schema {
        make_schema(json!([
            {"type": "BOOLEAN", "name": "bool", "required": false},
            {"type": "NUMERIC", "name": "number", "required": number_required,
             "min": 0, "max": 10, "integer": true},
            {"type": "STRING", "name": "string", "required": string_required, "maxLength": 5},
        ]))
    }

    fn messages(result: &ValidationResult) -> Details {
        result.field_messages()
    }

    #[test]
    fn conforming_entity_passes() {
        let schema = make_schema(json!([
            {"type": "BOOLEAN", "name": "bool"},
            {"type": "NUMERIC", "name": "number"},
            {"type": "STRING", "name": "string"},
        ]));
        let entity = make_entity(json!({"bool": false, "number": 1.2, "string": "string"}));

        let result = validate(&schema, &entity);
        assert!(result.valid);
        assert!(result.message.is_none());
        assert!(messages(&result).is_empty());
    }

    #[test]
    fn schema_mismatch_short_circuits() {
        let schema = standard_schema(true, true);
        let mut entity = make_entity(json!({"unknown": 1, "number": "nope"}));
        entity.schema_id = Some("another-schema".into());

        let result = validate(&schema, &entity);
        assert!(!result.valid);
        assert_eq!(result.message.as_deref(), Some(MSG_SCHEMA_MISMATCH));
        assert!(result.messages.is_none());
    }

    #[test]
    fn non_string_schema_id_is_a_mismatch() {
        let schema = standard_schema(false, false);
        let mut entity = make_entity(json!({"bool": true}));
        entity.schema_id = Some(json!(42));

        let result = validate(&schema, &entity);
        assert!(!result.valid);
        assert_eq!(result.message.as_deref(), Some(MSG_SCHEMA_MISMATCH));
    }

    #[test]
    fn missing_schema_id_is_a_mismatch() {
        let schema = standard_schema(false, false);
        let mut entity = make_entity(json!({}));
        entity.schema_id = None;

        assert_eq!(
            validate(&schema, &entity).message.as_deref(),
            Some(MSG_SCHEMA_MISMATCH)
        );
    }

    #[test]
    fn missing_required_attribute_is_reported() {
        let schema = make_schema(json!([
            {"type": "BOOLEAN", "name": "bool"},
            {"type": "NUMERIC", "name": "number", "required": true},
        ]));
        let result = validate(&schema, &make_entity(json!({})));

        assert!(!result.valid);
        assert_eq!(
            messages(&result),
            Details::from([("number".to_string(), MSG_REQUIRED.to_string())])
        );
    }

    #[test]
    fn null_required_value_is_reported_as_required() {
        let schema = standard_schema(false, true);
        let result = validate(&schema, &make_entity(json!({"string": null})));
        assert_eq!(messages(&result)["string"], MSG_REQUIRED);
    }

    #[test]
    fn null_optional_value_fails_the_type_check() {
        let schema = standard_schema(false, false);
        let result = validate(&schema, &make_entity(json!({"string": null})));
        assert_eq!(
            messages(&result)["string"],
            "This attribute must be a string but got 'null'."
        );
    }

    #[test]
    fn missing_relationship_attribute_is_never_required() {
        let schema = make_schema(json!([
            {"type": "RELATIONSHIP", "name": "owner", "required": true,
             "cardinality": "MANY_TO_ONE", "targetId": "people"},
        ]));
        assert!(validate(&schema, &make_entity(json!({}))).valid);
    }

    #[test]
    fn relationship_values_have_no_field_rules() {
        let schema = make_schema(json!([
            {"type": "RELATIONSHIP", "name": "owner",
             "cardinality": "MANY_TO_ONE", "targetId": "people"},
        ]));
        assert!(validate(&schema, &make_entity(json!({"owner": "p1"}))).valid);
    }

    #[test]
    fn unknown_key_is_reported() {
        let schema = standard_schema(false, false);
        let result = validate(&schema, &make_entity(json!({"colour": "red"})));
        assert!(!result.valid);
        assert_eq!(messages(&result)["colour"], MSG_NOT_DEFINED);
    }

    #[test]
    fn string_at_max_length_passes() {
        let schema = standard_schema(false, true);
        assert!(validate(&schema, &make_entity(json!({"string": "12345"}))).valid);
    }

    #[test]
    fn string_over_max_length_fails() {
        let schema = standard_schema(false, true);
        let result = validate(&schema, &make_entity(json!({"string": "123456"})));
        assert!(!result.valid);
        assert_eq!(messages(&result)["string"], "Max length is 5.");
    }

    #[test]
    fn string_length_counts_characters() {
        let schema = standard_schema(false, true);
        assert!(validate(&schema, &make_entity(json!({"string": "ééééé"}))).valid);
    }

    #[test]
    fn string_type_mismatch_names_the_kind() {
        let schema = standard_schema(false, true);
        let result = validate(&schema, &make_entity(json!({"string": 12})));
        assert_eq!(
            messages(&result)["string"],
            "This attribute must be a string but got 'number'."
        );
    }

    #[test]
    fn numeric_bounds_are_inclusive() {
        let schema = standard_schema(true, false);
        for number in [0, 10] {
            let result = validate(&schema, &make_entity(json!({"number": number})));
            assert!(result.valid, "{number} should be accepted");
        }
    }

    #[test]
    fn numeric_over_max_fails() {
        let schema = standard_schema(true, false);
        let result = validate(&schema, &make_entity(json!({"number": 11})));
        assert_eq!(messages(&result)["number"], "Max value is 10.");
    }

    #[test]
    fn numeric_under_min_cites_the_max_bound() {
        let schema = standard_schema(true, false);
        let result = validate(&schema, &make_entity(json!({"number": -1})));
        assert!(!result.valid);
        assert_eq!(messages(&result)["number"], "Min value is 10.");
    }

    #[test]
    fn numeric_under_min_without_max_cites_min() {
        let schema = make_schema(json!([{"type": "NUMERIC", "name": "n", "min": 3}]));
        let result = validate(&schema, &make_entity(json!({"n": 1})));
        assert_eq!(messages(&result)["n"], "Min value is 3.");
    }

    #[test]
    fn non_integral_value_fails_integer_rule() {
        let schema = standard_schema(true, false);
        let result = validate(&schema, &make_entity(json!({"number": 2.5})));
        assert_eq!(messages(&result)["number"], MSG_NOT_INTEGER);
    }

    #[test]
    fn integral_float_passes_integer_rule() {
        let schema = standard_schema(true, false);
        assert!(validate(&schema, &make_entity(json!({"number": 4.0}))).valid);
    }

    #[test]
    fn numeric_type_mismatch_stops_numeric_checks() {
        let schema = standard_schema(true, false);
        let result = validate(&schema, &make_entity(json!({"number": "500"})));
        assert_eq!(
            messages(&result)["number"],
            "This attribute must be numeric but got 'string'."
        );
    }

    #[test]
    fn boolean_type_mismatch_is_reported() {
        let schema = standard_schema(false, false);
        let result = validate(&schema, &make_entity(json!({"bool": [true]})));
        assert_eq!(
            messages(&result)["bool"],
            "This attribute must be boolean but got 'array'."
        );
    }

    #[test]
    fn every_failing_attribute_gets_one_message() {
        let schema = standard_schema(true, true);
        let result = validate(
            &schema,
            &make_entity(json!({"bool": "yes", "string": "toolong", "extra": 1})),
        );

        let messages = messages(&result);
        assert_eq!(messages.len(), 4);
        assert_eq!(messages["number"], MSG_REQUIRED);
        assert_eq!(messages["extra"], MSG_NOT_DEFINED);
    }

    #[test]
    fn validation_is_idempotent() {
        let schema = standard_schema(true, true);
        let entity = make_entity(json!({"number": 2.5, "string": "123456"}));
        assert_eq!(validate(&schema, &entity), validate(&schema, &entity));
    }
}
