//! A portable, structural schema representation and its renderer.
//!
//! `SchemaNode` is intentionally not `schemars::Schema`: it only carries the
//! handful of shapes the tool-documentation renderer needs to know about, so
//! the renderer is a total function over a closed set of variants rather
//! than a partial reflection over an arbitrary target type system.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[cfg(feature = "derive")]
mod derive;
#[cfg(feature = "derive")]
pub use derive::from_schemars;

mod validate;
pub use validate::validate;

/// A structural schema node.
///
/// Holds descriptions alongside structure so the renderer can carry them
/// through without a second pass. `Object` and `Union` use `Vec` rather than
/// a `HashMap` so rendering is deterministic and order-preserving — the
/// "equal schemas render to byte-equal strings" property depends on this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaNode {
    /// A primitive: `string`, `number`, `boolean`, `integer`, `null`.
    Primitive {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// A closed set of literal values.
    Enum {
        values: Vec<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// One JSON literal value.
    Literal {
        value: Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// `A | B | …`.
    Union { variants: Vec<SchemaNode> },
    /// `A & B & …`.
    Intersection { parts: Vec<SchemaNode> },
    /// `{ key: T; … }`.
    Object {
        fields: Vec<(String, SchemaNode)>,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// `[T]`.
    Array {
        item: Box<SchemaNode>,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// `[T, U, …]`.
    Tuple {
        items: Vec<SchemaNode>,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// `{ [key: K]: V }`.
    Record {
        key: Box<SchemaNode>,
        value: Box<SchemaNode>,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// `T?`.
    Optional { inner: Box<SchemaNode> },
    /// `T | null`.
    Nullable { inner: Box<SchemaNode> },
    /// `T` with a default value, rendered as `T (default)`.
    Default {
        inner: Box<SchemaNode>,
        value: Value,
    },
}

impl SchemaNode {
    /// Shorthand for a bare primitive with no description.
    #[must_use]
    pub fn primitive(name: impl Into<String>) -> Self {
        Self::Primitive {
            name: name.into(),
            description: None,
        }
    }

    /// Attach or replace a description, for the variants that carry one.
    #[must_use]
    pub fn described(mut self, description: impl Into<String>) -> Self {
        let description = Some(description.into());
        match &mut self {
            Self::Primitive { description: d, .. }
            | Self::Enum { description: d, .. }
            | Self::Literal { description: d, .. }
            | Self::Object { description: d, .. }
            | Self::Array { description: d, .. }
            | Self::Tuple { description: d, .. }
            | Self::Record { description: d, .. } => *d = description,
            _ => {}
        }
        self
    }
}

/// Render a [`SchemaNode`] into the language-neutral doc-string format used
/// in tool documentation.
#[must_use]
pub fn render(node: &SchemaNode) -> String {
    match node {
        SchemaNode::Primitive { name, description } => with_description(name, description),
        SchemaNode::Enum { values, description } => {
            let inner = values
                .iter()
                .map(render_literal)
                .collect::<Vec<_>>()
                .join(", ");
            with_description(&format!("enum({inner})"), description)
        }
        SchemaNode::Literal { value, description } => {
            with_description(&render_literal(value), description)
        }
        SchemaNode::Union { variants } => variants
            .iter()
            .map(render)
            .collect::<Vec<_>>()
            .join(" | "),
        SchemaNode::Intersection { parts } => {
            parts.iter().map(render).collect::<Vec<_>>().join(" & ")
        }
        SchemaNode::Object { fields, description } => {
            let inner = fields
                .iter()
                .map(|(name, node)| format!("{name}: {}", render(node)))
                .collect::<Vec<_>>()
                .join("; ");
            with_description(&format!("{{ {inner} }}"), description)
        }
        SchemaNode::Array { item, description } => {
            with_description(&format!("[{}]", render(item)), description)
        }
        SchemaNode::Tuple { items, description } => {
            let inner = items.iter().map(render).collect::<Vec<_>>().join(", ");
            with_description(&format!("[{inner}]"), description)
        }
        SchemaNode::Record { key, value, description } => with_description(
            &format!("{{ [key: {}]: {} }}", render(key), render(value)),
            description,
        ),
        SchemaNode::Optional { inner } => format!("{}?", render(inner)),
        SchemaNode::Nullable { inner } => format!("{} | null", render(inner)),
        SchemaNode::Default { inner, value } => {
            format!("{} (default: {})", render(inner), render_literal(value))
        }
    }
}

fn with_description(body: &str, description: &Option<String>) -> String {
    match description {
        Some(d) => format!("{body} <{d}>"),
        None => body.to_string(),
    }
}

fn render_literal(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}
