//! Structural validation of a host JSON value against a [`SchemaNode`].
//!
//! Deliberately shallow compared to a full JSON-Schema validator: it checks
//! shape (object has the right keys, array items recurse, enums/literals
//! match) but not cross-field constraints, numeric ranges, or string
//! patterns — the tool wrapper's input/output validation steps only need
//! enough to catch a script calling a tool with the wrong shape of value.

use crate::SchemaNode;
use serde_json::Value;

/// Validate `value` against `schema`, returning the first mismatch found.
pub fn validate(schema: &SchemaNode, value: &Value) -> Result<(), String> {
    match schema {
        SchemaNode::Primitive { name, .. } => validate_primitive(name, value),
        SchemaNode::Literal { value: expected, .. } => {
            if value == expected {
                Ok(())
            } else {
                Err(format!("expected literal {expected}, got {value}"))
            }
        }
        SchemaNode::Enum { values, .. } => {
            if values.contains(value) {
                Ok(())
            } else {
                Err(format!("{value} is not one of the allowed enum values"))
            }
        }
        SchemaNode::Union { variants } => {
            if variants.iter().any(|v| validate(v, value).is_ok()) {
                Ok(())
            } else {
                Err("value did not match any union variant".to_string())
            }
        }
        SchemaNode::Intersection { parts } => {
            for part in parts {
                validate(part, value)?;
            }
            Ok(())
        }
        SchemaNode::Object { fields, .. } => {
            let Value::Object(map) = value else {
                return Err(format!("expected object, got {value}"));
            };
            for (key, field_schema) in fields {
                match map.get(key) {
                    Some(v) => validate(field_schema, v)?,
                    None if is_optional(field_schema) => {}
                    None => return Err(format!("missing required field '{key}'")),
                }
            }
            Ok(())
        }
        SchemaNode::Array { item, .. } => {
            let Value::Array(items) = value else {
                return Err(format!("expected array, got {value}"));
            };
            items.iter().enumerate().try_for_each(|(i, v)| {
                validate(item, v).map_err(|e| format!("array item {i}: {e}"))
            })
        }
        SchemaNode::Tuple { items, .. } => {
            let Value::Array(values) = value else {
                return Err(format!("expected tuple, got {value}"));
            };
            if values.len() != items.len() {
                return Err(format!(
                    "expected tuple of length {}, got {}",
                    items.len(),
                    values.len()
                ));
            }
            for (schema, value) in items.iter().zip(values) {
                validate(schema, value)?;
            }
            Ok(())
        }
        SchemaNode::Record { value: value_schema, .. } => {
            let Value::Object(map) = value else {
                return Err(format!("expected record, got {value}"));
            };
            for (key, v) in map {
                validate(value_schema, v).map_err(|e| format!("record key '{key}': {e}"))?;
            }
            Ok(())
        }
        SchemaNode::Optional { inner } => {
            if value.is_null() {
                Ok(())
            } else {
                validate(inner, value)
            }
        }
        SchemaNode::Nullable { inner } => {
            if value.is_null() {
                Ok(())
            } else {
                validate(inner, value)
            }
        }
        SchemaNode::Default { inner, .. } => validate(inner, value),
    }
}

fn is_optional(schema: &SchemaNode) -> bool {
    matches!(schema, SchemaNode::Optional { .. } | SchemaNode::Default { .. })
}

fn validate_primitive(name: &str, value: &Value) -> Result<(), String> {
    let ok = match name {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.as_i64().is_some() || value.as_u64().is_some(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        // Unrecognised/domain-specific primitive names (e.g. a tool's own
        // "email" or "uuid") are accepted as-is — this validator only
        // enforces the handful of JSON-native primitive names it knows.
        _ => true,
    };
    if ok {
        Ok(())
    } else {
        Err(format!("expected {name}, got {value}"))
    }
}
