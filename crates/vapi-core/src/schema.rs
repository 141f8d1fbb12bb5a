//! Schema-derived mock generation
//!
//! A response schema is classified into a [`SchemaNode`] and walked
//! recursively:
//! - object with `properties` → object of generated properties
//! - array with `items` → singleton list of one generated item
//! - otherwise `example`, else `default`, else a per-type placeholder
//!
//! Circular references survive validation as bare `$ref` nodes and generate
//! `null`, so the walk always terminates.

use serde_json::{Map, Value};

/// Placeholder for `string` schemas
pub const STRING_PLACEHOLDER: &str = "string";

/// Shape of one schema node, as far as mock generation cares
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SchemaNode<'a> {
    /// `type: object` with a `properties` map
    Object(&'a Map<String, Value>),
    /// `type: array` with an `items` schema
    Array(&'a Value),
    /// `example` or `default` value, returned as-is
    Literal(&'a Value),
    /// `type: string`
    String,
    /// `type: number` or `type: integer`
    Number,
    /// `type: boolean`
    Boolean,
    /// Anything else, including unresolved `$ref`s
    Unknown,
}

impl<'a> SchemaNode<'a> {
    /// Classify a schema
    #[must_use]
    pub fn classify(schema: &'a Value) -> Self {
        let Some(fields) = schema.as_object() else {
            return Self::Unknown;
        };
        let kind = declared_type(fields);
        match (kind, fields.get("properties"), fields.get("items")) {
            (Some("object"), Some(Value::Object(properties)), _) => return Self::Object(properties),
            (Some("array"), _, Some(items)) => return Self::Array(items),
            _ => {}
        }
        if let Some(example) = fields.get("example") {
            return Self::Literal(example);
        }
        if let Some(default) = fields.get("default") {
            return Self::Literal(default);
        }
        match kind {
            Some("string") => Self::String,
            Some("number" | "integer") => Self::Number,
            Some("boolean") => Self::Boolean,
            _ => Self::Unknown,
        }
    }

    /// Generate the mock value of this node
    #[must_use]
    pub fn generate(self) -> Value {
        match self {
            Self::Object(properties) => Value::Object(
                properties
                    .iter()
                    .map(|(name, schema)| (name.clone(), generate_mock(schema)))
                    .collect(),
            ),
            Self::Array(items) => Value::Array(vec![generate_mock(items)]),
            Self::Literal(value) => value.clone(),
            Self::String => Value::String(STRING_PLACEHOLDER.to_string()),
            Self::Number => Value::from(0),
            Self::Boolean => Value::Bool(false),
            Self::Unknown => Value::Null,
        }
    }
}

/// `type` of a schema; for a type list, the first entry other than `null`
fn declared_type(fields: &Map<String, Value>) -> Option<&str> {
    match fields.get("type")? {
        Value::String(kind) => Some(kind.as_str()),
        Value::Array(kinds) => kinds
            .iter()
            .filter_map(Value::as_str)
            .find(|kind| *kind != "null"),
        _ => None,
    }
}

/// Generate a mock value conforming (loosely) to `schema`
#[must_use]
pub fn generate_mock(schema: &Value) -> Value {
    SchemaNode::classify(schema).generate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn object_with_primitive_properties() {
        let schema = json!({
            "type": "object",
            "properties": {"name": {"type": "string"}, "age": {"type": "number"}}
        });
        assert_eq!(generate_mock(&schema), json!({"name": "string", "age": 0}));
    }

    #[test]
    fn array_yields_one_item() {
        let schema = json!({"type": "array", "items": {"type": "integer"}});
        assert_eq!(generate_mock(&schema), json!([0]));
    }

    #[test]
    fn example_beats_default_and_placeholder() {
        assert_eq!(
            generate_mock(&json!({"type": "string", "example": "rex", "default": "fido"})),
            json!("rex")
        );
        assert_eq!(generate_mock(&json!({"type": "string", "default": "fido"})), json!("fido"));
        assert_eq!(generate_mock(&json!({"type": "boolean"})), json!(false));
    }

    #[test]
    fn object_without_properties_uses_example() {
        let schema = json!({"type": "object", "example": {"free": "form"}});
        assert_eq!(generate_mock(&schema), json!({"free": "form"}));
        assert_eq!(generate_mock(&json!({"type": "object"})), Value::Null);
    }

    #[test]
    fn nullable_type_lists_pick_the_concrete_type() {
        assert_eq!(generate_mock(&json!({"type": ["null", "integer"]})), json!(0));
        assert_eq!(generate_mock(&json!({"type": ["null"]})), Value::Null);
    }

    #[test]
    fn nested_structures_keep_declaration_order() {
        let schema = json!({
            "type": "object",
            "properties": {
                "zeta": {"type": "string"},
                "tags": {"type": "array", "items": {"type": "object", "properties": {"id": {"type": "integer"}}}},
                "alpha": {"type": "boolean"}
            }
        });
        let mock = generate_mock(&schema);
        assert_eq!(mock, json!({"zeta": "string", "tags": [{"id": 0}], "alpha": false}));
        let keys: Vec<&String> = mock.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["zeta", "tags", "alpha"]);
    }

    #[test]
    fn unresolved_reference_is_null() {
        let schema = json!({
            "type": "object",
            "properties": {"child": {"$ref": "#/components/schemas/Node"}}
        });
        assert_eq!(generate_mock(&schema), json!({"child": null}));
    }

    fn arb_schema() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(json!({"type": "string"})),
            Just(json!({"type": "integer"})),
            Just(json!({"type": "boolean"})),
            any::<i32>().prop_map(|n| json!({"type": "integer", "example": n})),
        ];
        leaf.prop_recursive(4, 32, 4, |inner| {
            prop_oneof![
                inner.clone().prop_map(|items| json!({"type": "array", "items": items})),
                prop::collection::btree_map("[a-z]{1,6}", inner, 1..4).prop_map(|props| {
                    json!({"type": "object", "properties": props})
                }),
            ]
        })
    }

    proptest! {
        #[test]
        fn objects_mirror_declared_properties(schema in arb_schema()) {
            let mock = generate_mock(&schema);
            if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
                let generated = mock.as_object().unwrap();
                prop_assert_eq!(generated.len(), properties.len());
                for name in properties.keys() {
                    prop_assert!(generated.contains_key(name));
                }
            }
        }

        #[test]
        fn arrays_are_singletons(schema in arb_schema()) {
            let wrapped = json!({"type": "array", "items": schema});
            prop_assert_eq!(generate_mock(&wrapped).as_array().map(Vec::len), Some(1));
        }

        #[test]
        fn generation_is_deterministic(schema in arb_schema()) {
            prop_assert_eq!(generate_mock(&schema), generate_mock(&schema));
        }
    }
}
