//! Typed field model
//!
//! A [`FieldSpec`] is what synthesis works on. Each field type carries its
//! own constraint struct, chosen once at validation time, so the synthesizer
//! matches exhaustively instead of probing optional properties.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Default numeric range when a number field declares no bounds
pub const DEFAULT_NUMBER_MIN: f64 = 0.0;
/// Default numeric range when a number field declares no bounds
pub const DEFAULT_NUMBER_MAX: f64 = 1000.0;
/// Default string length
pub const DEFAULT_STRING_LENGTH: usize = 10;

/// The closed set of field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Deterministic identifier derived from `(seed, index)`
    Uuid,
    /// Alphanumeric or pattern-driven text
    String,
    /// Floating point or integer number
    Number,
    /// Boolean
    Boolean,
    /// RFC 3339 timestamp string
    Iso8601,
    /// One of a declared list of values
    Enum,
}

impl FieldType {
    /// Wire name of the type
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Uuid => "uuid",
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Iso8601 => "iso8601",
            FieldType::Enum => "enum",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uuid" => Ok(FieldType::Uuid),
            "string" => Ok(FieldType::String),
            "number" => Ok(FieldType::Number),
            "boolean" => Ok(FieldType::Boolean),
            "iso8601" => Ok(FieldType::Iso8601),
            "enum" => Ok(FieldType::Enum),
            other => Err(other.to_string()),
        }
    }
}

/// Numeric bounds, inclusive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberConstraints {
    pub min: f64,
    pub max: f64,
    /// Floor the drawn value and emit it as a JSON integer
    pub integer: bool,
}

impl Default for NumberConstraints {
    fn default() -> Self {
        Self {
            min: DEFAULT_NUMBER_MIN,
            max: DEFAULT_NUMBER_MAX,
            integer: false,
        }
    }
}

/// How long a synthesized string is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringLength {
    /// Always exactly this many characters
    Fixed(usize),
    /// Uniform in `[min, max]`
    Range { min: usize, max: usize },
}

/// Known string synthesizers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringPattern {
    /// `local@domain` from a small fixed domain pool
    Email,
    /// `+1-XXX-XXX-XXXX`
    Phone,
    /// A validated regular expression. Values are plain alphanumerics; the
    /// expression is not used generatively.
    Regex(String),
}

impl StringPattern {
    /// Resolve a named pattern, if the name is one of the built-ins
    pub fn named(name: &str) -> Option<Self> {
        match name {
            "email" => Some(StringPattern::Email),
            "phone" => Some(StringPattern::Phone),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringConstraints {
    pub length: StringLength,
    pub pattern: Option<StringPattern>,
}

impl Default for StringConstraints {
    fn default() -> Self {
        Self {
            length: StringLength::Fixed(DEFAULT_STRING_LENGTH),
            pattern: None,
        }
    }
}

/// Timestamp window. Missing bounds are resolved against the engine's
/// reference time at synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimestampConstraints {
    pub min: Option<DateTime<Utc>>,
    pub max: Option<DateTime<Utc>>,
    /// When set, the value is `start + index * step` and no draw is consumed
    pub step_millis: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumConstraints {
    /// Never empty once validated
    pub values: Vec<Value>,
}

/// Type plus its constraints
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Uuid,
    Boolean,
    Number(NumberConstraints),
    String(StringConstraints),
    Iso8601(TimestampConstraints),
    Enum(EnumConstraints),
}

/// A validated field, ready for synthesis
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub required: bool,
    pub default: Option<Value>,
    pub kind: FieldKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_round_trip_names() {
        for ty in [
            FieldType::Uuid,
            FieldType::String,
            FieldType::Number,
            FieldType::Boolean,
            FieldType::Iso8601,
            FieldType::Enum,
        ] {
            assert_eq!(ty.as_str().parse::<FieldType>(), Ok(ty));
        }
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert_eq!("date".parse::<FieldType>(), Err("date".to_string()));
        assert!("UUID".parse::<FieldType>().is_err());
    }

    #[test]
    fn test_named_patterns() {
        assert_eq!(StringPattern::named("email"), Some(StringPattern::Email));
        assert_eq!(StringPattern::named("phone"), Some(StringPattern::Phone));
        assert_eq!(StringPattern::named("^[a-z]+$"), None);
    }
}
