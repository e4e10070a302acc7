//! Built-in dataset schemas

use serde_json::json;

use crate::error::{CoreError, Result};
use crate::schema::{Schema, SchemaDefinition};

/// Names of the built-in datasets
pub const PRESET_NAMES: [&str; 2] = ["records", "logs"];

/// A generic business record
pub fn records_definition() -> Result<SchemaDefinition> {
    SchemaDefinition::from_value(json!({
        "id": { "type": "uuid" },
        "name": { "type": "string", "constraints": { "minLength": 5, "maxLength": 20 } },
        "email": { "type": "string", "constraints": { "pattern": "email" } },
        "phone": { "type": "string", "required": false, "constraints": { "pattern": "phone" } },
        "age": { "type": "number", "constraints": { "min": 18, "max": 80, "integer": true } },
        "balance": { "type": "number", "constraints": { "min": 0, "max": 10000 } },
        "status": { "type": "enum", "constraints": { "enum": ["active", "inactive", "pending", "suspended"] } },
        "tier": { "type": "enum", "default": "free",
                  "constraints": { "enum": ["free", "basic", "premium", "enterprise"] } },
        "isVerified": { "type": "boolean" },
        "referralCode": { "type": "string", "required": false, "default": "NONE",
                          "constraints": { "length": 8 } },
        "createdAt": { "type": "iso8601" },
        "updatedAt": { "type": "iso8601" }
    }))
}

/// A log line, one per minute from 2024-01-01T00:00:00Z
pub fn logs_definition() -> Result<SchemaDefinition> {
    SchemaDefinition::from_value(json!({
        "timestamp": { "type": "iso8601", "constraints": { "step": 60 } },
        "level": { "type": "enum", "constraints": { "enum": ["DEBUG", "INFO", "WARN", "ERROR"] } },
        "service": { "type": "enum",
                     "constraints": { "enum": ["auth", "billing", "orders", "inventory", "gateway"] } },
        "message": { "type": "string", "constraints": { "minLength": 20, "maxLength": 80 } },
        "durationMs": { "type": "number", "constraints": { "min": 1, "max": 2000, "integer": true } },
        "statusCode": { "type": "enum", "constraints": { "enum": [200, 201, 204, 400, 404, 500, 503] } },
        "traceId": { "type": "string", "constraints": { "length": 16 } }
    }))
}

/// Definition of a built-in dataset, if `name` is one
pub fn definition(name: &str) -> Option<Result<SchemaDefinition>> {
    match name {
        "records" => Some(records_definition()),
        "logs" => Some(logs_definition()),
        _ => None,
    }
}

/// Compiled schema of a built-in dataset
pub fn schema(name: &str) -> Result<Schema> {
    let definition = definition(name)
        .ok_or_else(|| CoreError::ConfigError(format!("unknown preset '{}'", name)))??;
    Schema::compile(&definition).map_err(CoreError::InvalidSchema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::synthesize_record;
    use chrono::Utc;

    #[test]
    fn test_presets_compile() {
        for name in PRESET_NAMES {
            let schema = schema(name).unwrap();
            assert!(!schema.is_empty(), "{name}");
        }
        assert!(matches!(schema("metrics"), Err(CoreError::ConfigError(_))));
    }

    #[test]
    fn test_logs_are_one_per_minute() {
        let schema = schema("logs").unwrap();
        let first = synthesize_record(&schema, 1, 0, Utc::now());
        let later = synthesize_record(&schema, 1, 61, Utc::now());
        assert_eq!(first["timestamp"], "2024-01-01T00:00:00.000Z");
        assert_eq!(later["timestamp"], "2024-01-01T01:01:00.000Z");
    }

    #[test]
    fn test_records_optional_default() {
        let schema = schema("records").unwrap();
        let record = synthesize_record(&schema, 3, 0, Utc::now());
        assert_eq!(record["referralCode"], "NONE");
        assert!(record["email"].as_str().unwrap().contains('@'));
    }
}
