//! Schema validation
//!
//! Validation is the only place a [`SchemaDefinition`] turns into typed
//! [`FieldSpec`]s. Every problem in every field is collected; nothing here
//! panics or returns early on the first issue.

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use super::field::{
    EnumConstraints, FieldKind, FieldSpec, FieldType, NumberConstraints, StringConstraints,
    StringLength, StringPattern, TimestampConstraints, DEFAULT_NUMBER_MAX, DEFAULT_NUMBER_MIN,
    DEFAULT_STRING_LENGTH,
};
use super::{Bound, ConstraintsDefinition, FieldDefinition, SchemaDefinition};

/// Longest string a field may ask for
pub const MAX_STRING_LENGTH: i64 = 10_000;

/// A single rule violation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Type outside the closed set
    #[error("unknown field type '{0}' (expected one of uuid, string, number, boolean, iso8601, enum)")]
    UnknownType(String),

    /// Enum field with no `enum` constraint
    #[error("enum fields require a non-empty 'enum' constraint")]
    MissingEnum,

    /// Enum field with an empty `enum` list
    #[error("enum constraint must list at least one value")]
    EmptyEnum,

    /// Inverted numeric range
    #[error("min ({min}) must not be greater than max ({max})")]
    MinGreaterThanMax { min: f64, max: f64 },

    /// Integer range with no integer inside it
    #[error("integer range [{min}, {max}] contains no integer")]
    EmptyIntegerRange { min: f64, max: f64 },

    /// NaN or infinite bound
    #[error("{0} must be a finite number")]
    NonFiniteBound(&'static str),

    /// Text bound on a number field
    #[error("{bound} must be a number, got '{value}'")]
    NonNumericBound { bound: &'static str, value: String },

    /// Negative string length
    #[error("{name} must not be negative (got {value})")]
    NegativeLength { name: &'static str, value: i64 },

    /// String length above [`MAX_STRING_LENGTH`]
    #[error("{name} must not exceed {max} (got {value})", max = MAX_STRING_LENGTH)]
    LengthTooLarge { name: &'static str, value: i64 },

    /// Inverted length range
    #[error("minLength ({0}) must not be greater than maxLength ({1})")]
    LengthRange(i64, i64),

    /// Pattern that is neither named nor a regular expression
    #[error("pattern '{0}' is neither a named pattern (email, phone) nor a valid regular expression")]
    InvalidPattern(String),

    /// Unparsable timestamp bound
    #[error("{bound} '{value}' is not a valid ISO-8601 timestamp")]
    InvalidTimestamp { bound: &'static str, value: String },

    /// Inverted timestamp window
    #[error("timestamp min must not be after max")]
    TimestampRange,

    /// Non-positive step
    #[error("step must be a positive number of seconds (got {0})")]
    InvalidStep(f64),

    /// Blank field name
    #[error("field name must not be empty")]
    EmptyName,

    /// Same field declared twice
    #[error("field '{0}' is declared more than once")]
    DuplicateField(String),
}

impl ValidationError {
    /// Short rule identifier reported to clients
    pub fn rule(&self) -> &'static str {
        match self {
            ValidationError::UnknownType(_) => "type",
            ValidationError::MissingEnum | ValidationError::EmptyEnum => "enum",
            ValidationError::MinGreaterThanMax { .. }
            | ValidationError::EmptyIntegerRange { .. }
            | ValidationError::NonFiniteBound(_)
            | ValidationError::NonNumericBound { .. } => "range",
            ValidationError::NegativeLength { .. }
            | ValidationError::LengthTooLarge { .. }
            | ValidationError::LengthRange(..) => "length",
            ValidationError::InvalidPattern(_) => "pattern",
            ValidationError::InvalidTimestamp { .. }
            | ValidationError::TimestampRange
            | ValidationError::InvalidStep(_) => "timestamp",
            ValidationError::EmptyName | ValidationError::DuplicateField(_) => "name",
        }
    }
}

/// A violation attributed to a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub rule: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, error: &ValidationError) -> Self {
        Self {
            field: field.into(),
            rule: error.rule().to_string(),
            message: error.to_string(),
        }
    }
}

/// Outcome of validating a schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
}

impl ValidationReport {
    fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    fn invalid(errors: Vec<ValidationIssue>) -> Self {
        Self {
            valid: false,
            errors,
        }
    }

    /// True if any issue mentions `needle` in its rule or message
    pub fn mentions(&self, needle: &str) -> bool {
        self.errors
            .iter()
            .any(|e| e.rule.contains(needle) || e.message.contains(needle))
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.valid {
            return f.write_str("schema is valid");
        }
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{} [{}]: {}", e.field, e.rule, e.message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

/// Validate a schema definition
///
/// Pure and total: every problem is reported in the returned report.
pub fn validate_schema(definition: &SchemaDefinition) -> ValidationReport {
    match compile_fields(definition) {
        Ok(_) => ValidationReport::ok(),
        Err(report) => report,
    }
}

/// Compile every field, or report all issues found
pub(crate) fn compile_fields(
    definition: &SchemaDefinition,
) -> Result<Vec<FieldSpec>, ValidationReport> {
    let mut issues = Vec::new();
    let mut seen = HashSet::new();
    let mut specs = Vec::with_capacity(definition.len());

    for (name, field) in definition.fields() {
        if name.trim().is_empty() {
            issues.push(ValidationIssue::new(name, &ValidationError::EmptyName));
        }
        if !seen.insert(name) {
            issues.push(ValidationIssue::new(
                name,
                &ValidationError::DuplicateField(name.to_string()),
            ));
        }

        match compile_field(name, field) {
            Ok(spec) => specs.push(spec),
            Err(errors) => issues.extend(errors.iter().map(|e| ValidationIssue::new(name, e))),
        }
    }

    if issues.is_empty() {
        Ok(specs)
    } else {
        Err(ValidationReport::invalid(issues))
    }
}

fn compile_field(name: &str, field: &FieldDefinition) -> Result<FieldSpec, Vec<ValidationError>> {
    let field_type: FieldType = field
        .field_type
        .parse()
        .map_err(|ty| vec![ValidationError::UnknownType(ty)])?;

    let empty = ConstraintsDefinition::default();
    let constraints = field.constraints.as_ref().unwrap_or(&empty);

    let kind = match field_type {
        FieldType::Uuid => FieldKind::Uuid,
        FieldType::Boolean => FieldKind::Boolean,
        FieldType::Number => FieldKind::Number(number_constraints(constraints)?),
        FieldType::String => FieldKind::String(string_constraints(constraints)?),
        FieldType::Iso8601 => FieldKind::Iso8601(timestamp_constraints(constraints)?),
        FieldType::Enum => FieldKind::Enum(enum_constraints(constraints)?),
    };

    Ok(FieldSpec {
        name: name.to_string(),
        required: field.required,
        default: field.default.clone(),
        kind,
    })
}

fn numeric_bound(
    label: &'static str,
    bound: Option<&Bound>,
    errors: &mut Vec<ValidationError>,
) -> Option<f64> {
    match bound {
        None => None,
        Some(Bound::Number(n)) if n.is_finite() => Some(*n),
        Some(Bound::Number(_)) => {
            errors.push(ValidationError::NonFiniteBound(label));
            None
        }
        Some(Bound::Text(value)) => {
            errors.push(ValidationError::NonNumericBound {
                bound: label,
                value: value.clone(),
            });
            None
        }
    }
}

fn number_constraints(
    constraints: &ConstraintsDefinition,
) -> Result<NumberConstraints, Vec<ValidationError>> {
    let mut errors = Vec::new();
    let min = numeric_bound("min", constraints.min.as_ref(), &mut errors);
    let max = numeric_bound("max", constraints.max.as_ref(), &mut errors);
    let integer =
        constraints.integer.unwrap_or(false) || constraints.format.as_deref() == Some("integer");

    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            errors.push(ValidationError::MinGreaterThanMax { min, max });
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    // A lone bound widens the default range rather than inverting it
    let (min, max) = match (min, max) {
        (Some(min), Some(max)) => (min, max),
        (Some(min), None) => (min, min.max(DEFAULT_NUMBER_MAX)),
        (None, Some(max)) => (max.min(DEFAULT_NUMBER_MIN), max),
        (None, None) => (DEFAULT_NUMBER_MIN, DEFAULT_NUMBER_MAX),
    };

    if integer && min.ceil() > max.floor() {
        return Err(vec![ValidationError::EmptyIntegerRange { min, max }]);
    }

    Ok(NumberConstraints { min, max, integer })
}

fn length_value(
    name: &'static str,
    value: Option<i64>,
    errors: &mut Vec<ValidationError>,
) -> Option<usize> {
    match value {
        None => None,
        Some(v) if v < 0 => {
            errors.push(ValidationError::NegativeLength { name, value: v });
            None
        }
        Some(v) if v > MAX_STRING_LENGTH => {
            errors.push(ValidationError::LengthTooLarge { name, value: v });
            None
        }
        Some(v) => Some(v as usize),
    }
}

fn string_constraints(
    constraints: &ConstraintsDefinition,
) -> Result<StringConstraints, Vec<ValidationError>> {
    let mut errors = Vec::new();
    let length = length_value("length", constraints.length, &mut errors);
    let min_length = length_value("minLength", constraints.min_length, &mut errors);
    let max_length = length_value("maxLength", constraints.max_length, &mut errors);

    if let (Some(min), Some(max)) = (min_length, max_length) {
        if min > max {
            errors.push(ValidationError::LengthRange(min as i64, max as i64));
        }
    }

    let pattern = match constraints.pattern.as_deref() {
        None => None,
        Some(name) => match StringPattern::named(name) {
            Some(named) => Some(named),
            None if Regex::new(name).is_ok() => Some(StringPattern::Regex(name.to_string())),
            None => {
                errors.push(ValidationError::InvalidPattern(name.to_string()));
                None
            }
        },
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    let length = match (length, min_length, max_length) {
        (Some(exact), _, _) => StringLength::Fixed(exact),
        (None, Some(min), Some(max)) => StringLength::Range { min, max },
        (None, Some(min), None) => StringLength::Range {
            min,
            max: min.max(DEFAULT_STRING_LENGTH),
        },
        (None, None, Some(max)) => StringLength::Range {
            min: max.min(DEFAULT_STRING_LENGTH),
            max,
        },
        (None, None, None) => StringLength::Fixed(DEFAULT_STRING_LENGTH),
    };

    Ok(StringConstraints { length, pattern })
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC)
pub(crate) fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

fn timestamp_bound(
    label: &'static str,
    bound: Option<&Bound>,
    errors: &mut Vec<ValidationError>,
) -> Option<DateTime<Utc>> {
    let text = match bound {
        None => return None,
        Some(Bound::Text(text)) => text.clone(),
        Some(Bound::Number(n)) => n.to_string(),
    };
    let parsed = parse_timestamp(&text);
    if parsed.is_none() {
        errors.push(ValidationError::InvalidTimestamp {
            bound: label,
            value: text,
        });
    }
    parsed
}

fn timestamp_constraints(
    constraints: &ConstraintsDefinition,
) -> Result<TimestampConstraints, Vec<ValidationError>> {
    let mut errors = Vec::new();
    let min = timestamp_bound("min", constraints.min.as_ref(), &mut errors);
    let max = timestamp_bound("max", constraints.max.as_ref(), &mut errors);

    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            errors.push(ValidationError::TimestampRange);
        }
    }

    let step_millis = match constraints.step {
        None => None,
        Some(step) if step.is_finite() && (step * 1000.0).round() >= 1.0 => {
            Some((step * 1000.0).round() as i64)
        }
        Some(step) => {
            errors.push(ValidationError::InvalidStep(step));
            None
        }
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(TimestampConstraints {
        min,
        max,
        step_millis,
    })
}

fn enum_constraints(
    constraints: &ConstraintsDefinition,
) -> Result<EnumConstraints, Vec<ValidationError>> {
    match &constraints.enum_values {
        None => Err(vec![ValidationError::MissingEnum]),
        Some(values) if values.is_empty() => Err(vec![ValidationError::EmptyEnum]),
        Some(values) => Ok(EnumConstraints {
            values: values.clone(),
        }),
    }
}
