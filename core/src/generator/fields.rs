//! Field synthesis
//!
//! One value per field per record. All draws come from the record's own
//! [`SeededRng`]; identifiers and index-stepped timestamps are computed from
//! the record position and consume no draws.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::{Number, Value};

use crate::identity::derive_record_id;
use crate::random::SeededRng;
use crate::schema::{
    FieldKind, FieldSpec, NumberConstraints, StringConstraints, StringLength, StringPattern,
    TimestampConstraints,
};

/// Chance that a required field with a default emits the default instead of
/// a synthesized value.
///
/// A required field that declares a default is therefore not always
/// synthesized.
pub const DEFAULT_SUBSTITUTION_RATE: f64 = 0.10;

/// Domains used by the email synthesizer
pub const EMAIL_DOMAINS: [&str; 5] = ["example.com", "test.com", "mock.dev", "sample.org", "demo.net"];

/// Start of index-stepped timestamps when no `min` is declared (2024-01-01T00:00:00Z)
pub const INDEXED_EPOCH_MILLIS: i64 = 1_704_067_200_000;

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const LOWER_ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const EMAIL_LOCAL_LENGTH: usize = 8;
/// 2^53
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Position-dependent inputs shared by every field of one record
#[derive(Debug, Clone, Copy)]
pub struct SynthesisContext {
    pub seed: u64,
    pub index: u64,
    /// Anchor for default timestamp windows
    pub reference_time: DateTime<Utc>,
}

/// Synthesize one field value
///
/// Policy, in order:
/// 1. a declared default is returned for optional fields, and for required
///    fields when a [`DEFAULT_SUBSTITUTION_RATE`] coin flip succeeds (this
///    flip is the only draw consumed in that case);
/// 2. otherwise the value is synthesized from the field's kind.
pub fn synthesize_field(spec: &FieldSpec, rng: &mut SeededRng, ctx: &SynthesisContext) -> Value {
    if let Some(default) = &spec.default {
        if !spec.required || rng.chance(DEFAULT_SUBSTITUTION_RATE) {
            return default.clone();
        }
    }
    synthesize_kind(&spec.kind, rng, ctx)
}

fn synthesize_kind(kind: &FieldKind, rng: &mut SeededRng, ctx: &SynthesisContext) -> Value {
    match kind {
        FieldKind::Uuid => Value::String(derive_record_id(ctx.seed, ctx.index)),
        FieldKind::Boolean => Value::Bool(rng.next_f64() < 0.5),
        FieldKind::Number(constraints) => number(constraints, rng),
        FieldKind::String(constraints) => Value::String(string(constraints, rng)),
        FieldKind::Iso8601(constraints) => Value::String(timestamp(constraints, rng, ctx)),
        FieldKind::Enum(constraints) => {
            if constraints.values.is_empty() {
                return Value::Null;
            }
            let idx = rng.next_index(constraints.values.len());
            constraints.values[idx].clone()
        }
    }
}

fn number(constraints: &NumberConstraints, rng: &mut SeededRng) -> Value {
    let (min, max) = (constraints.min, constraints.max);
    let u = rng.next_f64();

    if constraints.integer {
        let (lo, hi) = (min.ceil(), max.floor());
        let drawn = if (hi - lo).is_finite() {
            lo + (u * (hi - lo + 1.0)).floor()
        } else {
            (lo + u * hi - u * lo).floor()
        };
        return integer_value(drawn.clamp(lo, hi));
    }

    // Expanded form stays finite when max - min overflows
    let raw = if (max - min).is_finite() {
        min + u * (max - min)
    } else {
        min + u * max - u * min
    };
    let scaled = raw * 100.0;
    let rounded = if scaled.is_finite() {
        scaled.round() / 100.0
    } else {
        raw
    };
    Number::from_f64(rounded.clamp(min, max))
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// JSON integer when exactly representable as one, float otherwise
fn integer_value(drawn: f64) -> Value {
    if drawn.abs() <= MAX_SAFE_INTEGER {
        Value::from(drawn as i64)
    } else {
        Number::from_f64(drawn)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

fn string(constraints: &StringConstraints, rng: &mut SeededRng) -> String {
    match &constraints.pattern {
        Some(StringPattern::Email) => email(rng),
        Some(StringPattern::Phone) => phone(rng),
        Some(StringPattern::Regex(_)) | None => {
            let length = match constraints.length {
                StringLength::Fixed(length) => length,
                StringLength::Range { min, max } => min + rng.next_index(max - min + 1),
            };
            random_chars(rng, ALPHANUMERIC, length)
        }
    }
}

fn random_chars(rng: &mut SeededRng, alphabet: &[u8], length: usize) -> String {
    (0..length)
        .map(|_| alphabet[rng.next_index(alphabet.len())] as char)
        .collect()
}

/// Random lowercase local part at one of [`EMAIL_DOMAINS`]
pub fn email(rng: &mut SeededRng) -> String {
    let local = random_chars(rng, LOWER_ALPHANUMERIC, EMAIL_LOCAL_LENGTH);
    let domain = EMAIL_DOMAINS[rng.next_index(EMAIL_DOMAINS.len())];
    format!("{local}@{domain}")
}

/// `+1-XXX-XXX-XXXX` with a 2-9 leading area-code digit
pub fn phone(rng: &mut SeededRng) -> String {
    let mut digits = String::with_capacity(10);
    digits.push(char::from(b'2' + rng.next_index(8) as u8));
    for _ in 1..10 {
        digits.push(char::from(b'0' + rng.next_index(10) as u8));
    }
    format!("+1-{}-{}-{}", &digits[0..3], &digits[3..6], &digits[6..10])
}

fn timestamp(constraints: &TimestampConstraints, rng: &mut SeededRng, ctx: &SynthesisContext) -> String {
    let millis = match constraints.step_millis {
        Some(step) => {
            let start = constraints
                .min
                .map(|min| min.timestamp_millis())
                .unwrap_or(INDEXED_EPOCH_MILLIS);
            let offset = i64::try_from(ctx.index)
                .unwrap_or(i64::MAX)
                .saturating_mul(step);
            start.saturating_add(offset)
        }
        None => {
            let max = constraints.max.unwrap_or(ctx.reference_time);
            let min = constraints.min.unwrap_or_else(|| {
                max.checked_sub_signed(Duration::days(365))
                    .unwrap_or(DateTime::<Utc>::MIN_UTC)
            });
            let (lo, hi) = (min.timestamp_millis(), max.timestamp_millis().max(min.timestamp_millis()));
            lo + (rng.next_f64() * (hi - lo) as f64) as i64
        }
    };
    format_timestamp(millis)
}

/// Render epoch milliseconds as RFC 3339 with millisecond precision,
/// clamped to the representable date range
pub fn format_timestamp(millis: i64) -> String {
    let millis = millis.clamp(
        DateTime::<Utc>::MIN_UTC.timestamp_millis(),
        DateTime::<Utc>::MAX_UTC.timestamp_millis(),
    );
    DateTime::<Utc>::from_timestamp_millis(millis)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}
