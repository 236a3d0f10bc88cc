//! Best-effort conversion from a `schemars`-generated JSON Schema into a
//! [`SchemaNode`], for tool authors who'd rather derive `JsonSchema` on a
//! Rust input type than hand-build a `SchemaNode`.
//!
//! This is a convenience, not the canonical representation — the renderer
//! in `lib.rs` never depends on this module.

use crate::SchemaNode;
use schemars::Schema;
use serde_json::Value;

/// Convert a schemars-generated schema into a [`SchemaNode`].
///
/// Falls back to an undescribed `"object"` primitive for shapes this
/// best-effort walker doesn't recognise (e.g. `$ref`-heavy recursive types).
#[must_use]
pub fn from_schemars(schema: &Schema) -> SchemaNode {
    from_value(schema.as_value())
}

fn from_value(value: &Value) -> SchemaNode {
    let description = value
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string);

    if let Some(values) = value.get("enum").and_then(Value::as_array) {
        return SchemaNode::Enum {
            values: values.clone(),
            description,
        };
    }

    match value.get("type").and_then(Value::as_str) {
        Some("object") => {
            let required: Vec<&str> = value
                .get("required")
                .and_then(Value::as_array)
                .map(|r| r.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            let fields = value
                .get("properties")
                .and_then(Value::as_object)
                .map(|props| {
                    props
                        .iter()
                        .map(|(name, sub)| {
                            let node = from_value(sub);
                            let node = if required.contains(&name.as_str()) {
                                node
                            } else {
                                SchemaNode::Optional {
                                    inner: Box::new(node),
                                }
                            };
                            (name.clone(), node)
                        })
                        .collect()
                })
                .unwrap_or_default();
            SchemaNode::Object { fields, description }
        }
        Some("array") => {
            let item = value
                .get("items")
                .map(from_value)
                .unwrap_or_else(|| SchemaNode::primitive("unknown"));
            SchemaNode::Array {
                item: Box::new(item),
                description,
            }
        }
        Some("string") => SchemaNode::Primitive {
            name: "string".to_string(),
            description,
        },
        Some("number") => SchemaNode::Primitive {
            name: "number".to_string(),
            description,
        },
        Some("integer") => SchemaNode::Primitive {
            name: "integer".to_string(),
            description,
        },
        Some("boolean") => SchemaNode::Primitive {
            name: "boolean".to_string(),
            description,
        },
        Some("null") => SchemaNode::Primitive {
            name: "null".to_string(),
            description,
        },
        _ => SchemaNode::Primitive {
            name: "object".to_string(),
            description,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::JsonSchema;
    use serde::Serialize;

    #[derive(Serialize, JsonSchema)]
    struct Example {
        /// the id
        id: String,
        count: Option<u32>,
    }

    #[test]
    fn converts_object_with_optional_field() {
        let schema = schemars::schema_for!(Example);
        let node = from_schemars(&schema);
        let rendered = crate::render(&node);
        assert!(rendered.contains("id: string"));
        assert!(rendered.contains("count:"));
    }
}
