//! Schema definitions
//!
//! Two layers:
//!
//! - the wire model ([`SchemaDefinition`], [`FieldDefinition`],
//!   [`ConstraintsDefinition`]) exactly as clients send it, unknown types and
//!   all;
//! - the compiled model ([`Schema`], [`FieldSpec`]), which only exists for
//!   definitions that passed [`validate_schema`].
//!
//! Field declaration order is preserved through both layers because it
//! determines the order of PRNG draws.

pub mod field;
pub mod validator;

pub use field::{
    EnumConstraints, FieldKind, FieldSpec, FieldType, NumberConstraints, StringConstraints,
    StringLength, StringPattern, TimestampConstraints,
};
pub use validator::{validate_schema, ValidationError, ValidationIssue, ValidationReport};

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

use crate::error::{CoreError, Result};

fn default_required() -> bool {
    true
}

/// A numeric or textual constraint bound. Number fields take numbers,
/// timestamp fields take ISO-8601 strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bound {
    Number(f64),
    Text(String),
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Number(n) => write!(f, "{}", n),
            Bound::Text(s) => f.write_str(s),
        }
    }
}

/// Constraint bag as received on the wire
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintsDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Bound>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Bound>,

    /// Floor numbers and emit integers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integer: Option<bool>,

    /// `"integer"` is accepted as an alias for `integer: true`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i64>,

    /// Named pattern (`email`, `phone`) or a regular expression
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,

    /// Seconds between consecutive records for index-derived timestamps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
}

/// Field definition as received on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Type name. Kept as a string so unknown types can be reported by
    /// validation instead of failing deserialization.
    #[serde(rename = "type")]
    pub field_type: String,

    #[serde(default = "default_required")]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<ConstraintsDefinition>,
}

impl FieldDefinition {
    /// A required field of the given type with no constraints
    pub fn new(field_type: impl Into<String>) -> Self {
        Self {
            field_type: field_type.into(),
            required: true,
            default: None,
            constraints: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_constraints(mut self, constraints: ConstraintsDefinition) -> Self {
        self.constraints = Some(constraints);
        self
    }
}

/// Ordered mapping from field name to definition
///
/// Serialized as a JSON object. Duplicate keys in the input are kept so that
/// validation can report them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDefinition {
    fields: Vec<(String, FieldDefinition)>,
}

impl SchemaDefinition {
    /// Create an empty schema definition
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field, keeping declaration order
    pub fn with_field(mut self, name: impl Into<String>, definition: FieldDefinition) -> Self {
        self.fields.push((name.into(), definition));
        self
    }

    /// Fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldDefinition)> {
        self.fields.iter().map(|(name, def)| (name.as_str(), def))
    }

    /// Look up a field by name
    pub fn get(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, def)| def)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parse a definition from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a definition from a JSON value
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Load a definition from a JSON file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Render the definition back into a JSON value
    pub fn to_value(&self) -> Value {
        // Serializing plain maps of strings and JSON values cannot fail
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for SchemaDefinition {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, def) in &self.fields {
            map.serialize_entry(name, def)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SchemaDefinition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct SchemaVisitor;

        impl<'de> Visitor<'de> for SchemaVisitor {
            type Value = SchemaDefinition;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to field definitions")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut fields = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, def)) = access.next_entry::<String, FieldDefinition>()? {
                    fields.push((name, def));
                }
                Ok(SchemaDefinition { fields })
            }
        }

        deserializer.deserialize_map(SchemaVisitor)
    }
}

/// A validated schema
///
/// Only constructible through [`Schema::compile`], so the engine never sees
/// an unknown type, an empty enum or an inverted range.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    definition: SchemaDefinition,
    fields: Vec<FieldSpec>,
}

impl Schema {
    /// Validate and compile a definition
    pub fn compile(definition: &SchemaDefinition) -> std::result::Result<Self, ValidationReport> {
        let fields = validator::compile_fields(definition)?;
        Ok(Self {
            definition: definition.clone(),
            fields,
        })
    }

    /// Parse and compile in one step, folding validation failures into [`CoreError`]
    pub fn from_json(json: &str) -> Result<Self> {
        let definition = SchemaDefinition::from_json(json)?;
        Self::compile(&definition).map_err(CoreError::InvalidSchema)
    }

    /// Compiled fields in declaration order
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// The definition this schema was compiled from
    pub fn definition(&self) -> &SchemaDefinition {
        &self.definition
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE: &str = r#"{
        "id": { "type": "uuid", "required": true },
        "status": { "type": "enum", "constraints": { "enum": ["active", "inactive"] } },
        "score": { "type": "number", "required": false, "default": 0,
                   "constraints": { "min": 0, "max": 100, "integer": true } },
        "createdAt": { "type": "iso8601", "constraints": { "min": "2024-01-01", "max": "2024-12-31T23:59:59Z" } }
    }"#;

    #[test]
    fn test_parse_preserves_declaration_order() {
        let def = SchemaDefinition::from_json(SAMPLE).unwrap();
        let names: Vec<&str> = def.fields().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["id", "status", "score", "createdAt"]);
    }

    #[test]
    fn test_required_defaults_to_true() {
        let def = SchemaDefinition::from_json(SAMPLE).unwrap();
        assert!(def.get("status").unwrap().required);
        assert!(!def.get("score").unwrap().required);
    }

    #[test]
    fn test_bounds_parse_as_number_or_text() {
        let def = SchemaDefinition::from_json(SAMPLE).unwrap();
        let score = def.get("score").unwrap().constraints.as_ref().unwrap();
        assert_eq!(score.min, Some(Bound::Number(0.0)));

        let created = def.get("createdAt").unwrap().constraints.as_ref().unwrap();
        assert_eq!(created.min, Some(Bound::Text("2024-01-01".to_string())));
    }

    #[test]
    fn test_serialize_keeps_order_and_shape() {
        let def = SchemaDefinition::from_json(SAMPLE).unwrap();
        let value = def.to_value();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["id", "status", "score", "createdAt"]);
        assert_eq!(value["status"]["constraints"]["enum"], json!(["active", "inactive"]));

        let reparsed = SchemaDefinition::from_value(value).unwrap();
        assert_eq!(reparsed, def);
    }

    #[test]
    fn test_unknown_type_survives_parsing() {
        let def = SchemaDefinition::from_json(r#"{ "when": { "type": "date" } }"#).unwrap();
        assert_eq!(def.get("when").unwrap().field_type, "date");
        assert!(Schema::compile(&def).is_err());
    }

    #[test]
    fn test_compile_sample() {
        let schema = Schema::from_json(SAMPLE).unwrap();
        assert_eq!(schema.len(), 4);
        assert_eq!(schema.fields()[0].kind, FieldKind::Uuid);
        assert!(matches!(
            schema.fields()[2].kind,
            FieldKind::Number(NumberConstraints { integer: true, .. })
        ));
    }

    #[test]
    fn test_from_json_invalid_schema_error() {
        let err = Schema::from_json(r#"{ "status": { "type": "enum" } }"#).unwrap_err();
        assert!(matches!(err, CoreError::InvalidSchema(_)));
    }

    #[test]
    fn test_builder() {
        let def = SchemaDefinition::new()
            .with_field("name", FieldDefinition::new("string"))
            .with_field(
                "nickname",
                FieldDefinition::new("string").optional().with_default(json!("n/a")),
            );
        assert_eq!(def.len(), 2);
        assert_eq!(def.get("nickname").unwrap().default, Some(json!("n/a")));
    }
}
