//! Agent-facing invocation schema types.
//!
//! MCP servers advertise JSON-Schema-shaped input descriptors; the agent
//! runtime consumes a closed, validation-oriented node set instead. The
//! conversion here is pure and total: any shape outside the supported subset
//! falls back to [`SchemaKind::Any`], so one exotic tool schema can never
//! break bridging for the rest of the catalog.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One converted schema node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Node kind with per-kind constraints.
    pub kind: SchemaKind,

    /// Human-readable description carried over from the source schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether `null` is accepted in place of the described value.
    #[serde(default)]
    pub nullable: bool,
}

/// Closed set of schema node kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchemaKind {
    /// Free-form string.
    String,
    /// Integral number, optionally bounded.
    Integer {
        /// Inclusive lower bound.
        #[serde(skip_serializing_if = "Option::is_none")]
        minimum: Option<f64>,
        /// Inclusive upper bound.
        #[serde(skip_serializing_if = "Option::is_none")]
        maximum: Option<f64>,
    },
    /// Floating-point number, optionally bounded.
    Number {
        /// Inclusive lower bound.
        #[serde(skip_serializing_if = "Option::is_none")]
        minimum: Option<f64>,
        /// Inclusive upper bound.
        #[serde(skip_serializing_if = "Option::is_none")]
        maximum: Option<f64>,
    },
    /// Boolean.
    Boolean,
    /// JSON null.
    Null,
    /// Closed string-choice set.
    Enum {
        /// Accepted values.
        choices: Vec<String>,
    },
    /// Homogeneous array.
    Array {
        /// Element schema; `Any` when the source declared no `items`.
        items: Box<ToolSchema>,
    },
    /// Object. `open` means the source declared no `properties` and the
    /// node accepts an untyped mapping. A non-open object validates the
    /// listed fields; fields not marked required stay optional, never
    /// forbidden.
    Object {
        /// Named fields, in source order.
        fields: Vec<ObjectField>,
        /// Whether arbitrary keys are accepted (no `properties` declared).
        open: bool,
    },
    /// Anything accepted; the fallback for unsupported shapes.
    Any,
}

/// One named field of an object schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectField {
    /// Field name.
    pub name: String,
    /// Field schema.
    pub schema: ToolSchema,
    /// Whether the field must be present.
    pub required: bool,
}

impl ToolSchema {
    /// The unconstrained node.
    #[must_use]
    pub const fn any() -> Self {
        Self {
            kind: SchemaKind::Any,
            description: None,
            nullable: false,
        }
    }

    /// Convert a JSON-Schema-shaped value into an agent schema node.
    ///
    /// Supported: primitive `type` tags, `enum` (string choices), `array`
    /// `items`, `object` `properties`/`required`, numeric bounds, and the
    /// two-branch `anyOf`/`oneOf` where one branch is literal `null` (which
    /// collapses into the nullable variant of the other branch). Everything
    /// else degrades to [`SchemaKind::Any`]; this function never fails.
    #[must_use]
    pub fn from_json_schema(schema: &Value) -> Self {
        let Some(map) = schema.as_object() else {
            return Self::any();
        };

        let description = map
            .get("description")
            .and_then(Value::as_str)
            .map(String::from);

        if let Some(branches) = map
            .get("anyOf")
            .or_else(|| map.get("oneOf"))
            .and_then(Value::as_array)
        {
            return Self::from_union(branches, description);
        }

        // enum takes precedence over a sibling `type` tag
        if let Some(choices) = map.get("enum").and_then(Value::as_array) {
            let choices: Vec<String> = choices
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect();

            if choices.is_empty() {
                return Self {
                    kind: SchemaKind::Any,
                    description,
                    nullable: false,
                };
            }

            return Self {
                kind: SchemaKind::Enum { choices },
                description,
                nullable: false,
            };
        }

        let kind = match map.get("type").and_then(Value::as_str) {
            Some("string") => SchemaKind::String,
            Some("integer") => SchemaKind::Integer {
                minimum: bound(map, "minimum"),
                maximum: bound(map, "maximum"),
            },
            Some("number") => SchemaKind::Number {
                minimum: bound(map, "minimum"),
                maximum: bound(map, "maximum"),
            },
            Some("boolean") => SchemaKind::Boolean,
            Some("null") => SchemaKind::Null,
            Some("array") => SchemaKind::Array {
                items: Box::new(
                    map.get("items")
                        .map_or_else(Self::any, Self::from_json_schema),
                ),
            },
            Some("object") => object_kind(map),
            other => {
                tracing::trace!(declared_type = ?other, "unsupported schema shape, accepting any");
                SchemaKind::Any
            }
        };

        Self {
            kind,
            description,
            nullable: false,
        }
    }

    /// Collapse a union: exactly two branches with one literal `null` become
    /// the nullable variant of the other branch; every other union shape is
    /// accepted permissively.
    fn from_union(branches: &[Value], description: Option<String>) -> Self {
        if branches.len() == 2 {
            if let Some(pos) = branches.iter().position(is_null_branch) {
                let mut converted = Self::from_json_schema(&branches[1 - pos]);
                converted.nullable = true;
                if converted.description.is_none() {
                    converted.description = description;
                }
                return converted;
            }
        }

        tracing::trace!(
            branch_count = branches.len(),
            "union beyond the nullable case, accepting any"
        );
        Self {
            kind: SchemaKind::Any,
            description,
            nullable: false,
        }
    }
}

fn bound(map: &serde_json::Map<String, Value>, key: &str) -> Option<f64> {
    map.get(key).and_then(Value::as_f64)
}

fn is_null_branch(branch: &Value) -> bool {
    branch
        .get("type")
        .and_then(Value::as_str)
        .is_some_and(|t| t == "null")
}

fn object_kind(map: &serde_json::Map<String, Value>) -> SchemaKind {
    let Some(properties) = map.get("properties").and_then(Value::as_object) else {
        return SchemaKind::Object {
            fields: Vec::new(),
            open: true,
        };
    };

    let required: Vec<&str> = map
        .get("required")
        .and_then(Value::as_array)
        .map(|keys| keys.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let fields = properties
        .iter()
        .map(|(name, sub)| ObjectField {
            name: name.clone(),
            schema: ToolSchema::from_json_schema(sub),
            required: required.contains(&name.as_str()),
        })
        .collect();

    SchemaKind::Object {
        fields,
        open: false,
    }
}
