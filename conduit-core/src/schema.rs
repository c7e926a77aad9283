//! `Schema`: a JSON-Schema-like structural + value-constraint descriptor of a
//! [`Generable`](crate::Generable) record type, and the `Constraint`s attachable to it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single constraint on a scalar, array, or enum-like schema node.
///
/// Applying a constraint to an incompatible schema variant is rejected by the
/// (external, compile-time) code generator; this type makes no attempt to
/// re-validate compatibility at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Constraint {
    Pattern { regex: String },
    Constant { value: crate::StructuredContent },
    AnyOf { values: Vec<crate::StructuredContent> },
    MinLength { value: usize },
    MaxLength { value: usize },
    Minimum { value: f64 },
    Maximum { value: f64 },
    ExclusiveMin { value: f64 },
    ExclusiveMax { value: f64 },
    MultipleOf { value: f64 },
    MinItems { value: usize },
    MaxItems { value: usize },
    UniqueItems,
}

/// A named, possibly-optional field of an `object` schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub schema: Schema,
    pub description: Option<String>,
    pub is_required: bool,
}

/// Discriminated union describing the structure of a generable record type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Schema {
    String { constraints: Vec<Constraint> },
    Integer { constraints: Vec<Constraint> },
    Number { constraints: Vec<Constraint> },
    Boolean { constraints: Vec<Constraint> },
    Array { items: Box<Schema>, constraints: Vec<Constraint> },
    Object {
        name: String,
        description: Option<String>,
        properties: IndexMap<String, Property>,
    },
    /// Normalizes `optional(optional(T))` to `optional(T)` via [`Schema::optional`].
    Optional(Box<Schema>),
    AnyOf { name: String, description: Option<String>, schemas: Vec<Schema> },
}

impl Schema {
    /// Wraps `self` as optional, collapsing nested `Optional` so that
    /// `optional(optional(T)) == optional(T)`.
    pub fn optional(self) -> Schema {
        match self {
            Schema::Optional(inner) => Schema::Optional(inner),
            other => Schema::Optional(Box::new(other)),
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, Schema::Optional(_))
    }

    /// Renders to a JSON Schema document, for sending as a tool's `parameters`
    /// or as a structured-output constraint. `Optional` unwraps to its inner
    /// schema; object-level required-ness is instead reflected in the parent
    /// object's `required` array.
    pub fn to_json_schema(&self) -> serde_json::Value {
        use serde_json::{json, Value};

        fn apply_constraints(mut node: serde_json::Map<String, Value>, constraints: &[Constraint]) -> Value {
            for constraint in constraints {
                match constraint {
                    Constraint::Pattern { regex } => {
                        node.insert("pattern".to_string(), json!(regex));
                    }
                    Constraint::Constant { value } => {
                        node.insert("const".to_string(), value.to_json());
                    }
                    Constraint::AnyOf { values } => {
                        node.insert(
                            "enum".to_string(),
                            Value::Array(values.iter().map(|v| v.to_json()).collect()),
                        );
                    }
                    Constraint::MinLength { value } => {
                        node.insert("minLength".to_string(), json!(value));
                    }
                    Constraint::MaxLength { value } => {
                        node.insert("maxLength".to_string(), json!(value));
                    }
                    Constraint::Minimum { value } => {
                        node.insert("minimum".to_string(), json!(value));
                    }
                    Constraint::Maximum { value } => {
                        node.insert("maximum".to_string(), json!(value));
                    }
                    Constraint::ExclusiveMin { value } => {
                        node.insert("exclusiveMinimum".to_string(), json!(value));
                    }
                    Constraint::ExclusiveMax { value } => {
                        node.insert("exclusiveMaximum".to_string(), json!(value));
                    }
                    Constraint::MultipleOf { value } => {
                        node.insert("multipleOf".to_string(), json!(value));
                    }
                    Constraint::MinItems { value } => {
                        node.insert("minItems".to_string(), json!(value));
                    }
                    Constraint::MaxItems { value } => {
                        node.insert("maxItems".to_string(), json!(value));
                    }
                    Constraint::UniqueItems => {
                        node.insert("uniqueItems".to_string(), json!(true));
                    }
                }
            }
            Value::Object(node)
        }

        match self {
            Schema::String { constraints } => {
                let mut node = serde_json::Map::new();
                node.insert("type".to_string(), json!("string"));
                apply_constraints(node, constraints)
            }
            Schema::Integer { constraints } => {
                let mut node = serde_json::Map::new();
                node.insert("type".to_string(), json!("integer"));
                apply_constraints(node, constraints)
            }
            Schema::Number { constraints } => {
                let mut node = serde_json::Map::new();
                node.insert("type".to_string(), json!("number"));
                apply_constraints(node, constraints)
            }
            Schema::Boolean { constraints } => {
                let mut node = serde_json::Map::new();
                node.insert("type".to_string(), json!("boolean"));
                apply_constraints(node, constraints)
            }
            Schema::Array { items, constraints } => {
                let mut node = serde_json::Map::new();
                node.insert("type".to_string(), json!("array"));
                node.insert("items".to_string(), items.to_json_schema());
                apply_constraints(node, constraints)
            }
            Schema::Object { description, properties, .. } => {
                let mut props = serde_json::Map::with_capacity(properties.len());
                let mut required = Vec::new();
                for (name, property) in properties {
                    props.insert(name.clone(), property.schema.to_json_schema());
                    if property.is_required {
                        required.push(json!(name));
                    }
                }
                let mut node = serde_json::Map::new();
                node.insert("type".to_string(), json!("object"));
                node.insert("properties".to_string(), Value::Object(props));
                node.insert("required".to_string(), Value::Array(required));
                if let Some(description) = description {
                    node.insert("description".to_string(), json!(description));
                }
                Value::Object(node)
            }
            Schema::Optional(inner) => inner.to_json_schema(),
            Schema::AnyOf { description, schemas, .. } => {
                let mut node = serde_json::Map::new();
                node.insert(
                    "anyOf".to_string(),
                    Value::Array(schemas.iter().map(Schema::to_json_schema).collect()),
                );
                if let Some(description) = description {
                    node.insert("description".to_string(), json!(description));
                }
                Value::Object(node)
            }
        }
    }
}

impl Property {
    /// A required property is one whose schema is not itself `optional`;
    /// `is_required` is kept as an explicit flag so callers needn't pattern-match.
    pub fn required(schema: Schema, description: Option<String>) -> Self {
        let is_required = !schema.is_optional();
        Property { schema, description, is_required }
    }

    pub fn optional(schema: Schema, description: Option<String>) -> Self {
        Property { schema: schema.optional(), description, is_required: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_optional_normalizes() {
        let schema = Schema::String { constraints: vec![] }.optional().optional();
        match schema {
            Schema::Optional(inner) => assert!(!inner.is_optional()),
            _ => panic!("expected Optional"),
        }
    }

    #[test]
    fn object_properties_preserve_declaration_order() {
        let mut properties = IndexMap::new();
        properties.insert(
            "b".to_string(),
            Property::required(Schema::String { constraints: vec![] }, None),
        );
        properties.insert(
            "a".to_string(),
            Property::required(Schema::Integer { constraints: vec![] }, None),
        );
        let schema = Schema::Object { name: "X".to_string(), description: None, properties };
        if let Schema::Object { properties, .. } = schema {
            let keys: Vec<_> = properties.keys().collect();
            assert_eq!(keys, vec!["b", "a"]);
        } else {
            panic!("expected Object");
        }
    }

    #[test]
    fn required_property_rejects_optional_schema_flag() {
        let prop = Property::required(Schema::Boolean { constraints: vec![] }.optional(), None);
        assert!(!prop.is_required);
    }

    #[test]
    fn json_schema_marks_only_required_properties() {
        let mut properties = IndexMap::new();
        properties.insert("name".to_string(), Property::required(Schema::String { constraints: vec![] }, None));
        properties.insert(
            "nickname".to_string(),
            Property::optional(Schema::String { constraints: vec![] }, None),
        );
        let schema = Schema::Object { name: "Person".to_string(), description: None, properties };
        let json = schema.to_json_schema();
        assert_eq!(json["type"], "object");
        assert_eq!(json["required"], serde_json::json!(["name"]));
        assert_eq!(json["properties"]["nickname"]["type"], "string");
    }

    #[test]
    fn json_schema_unwraps_optional_and_applies_constraints() {
        let schema = Schema::Integer { constraints: vec![Constraint::Minimum { value: 0.0 }] }.optional();
        let json = schema.to_json_schema();
        assert_eq!(json["type"], "integer");
        assert_eq!(json["minimum"], 0.0);
    }
}
