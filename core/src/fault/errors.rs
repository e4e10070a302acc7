//! Error injection
//!
//! Two draws per request: a gate against `error_rate`, then a weighted pick
//! among the configured categories.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Category that makes the server hang before answering
pub const TIMEOUT_KIND: &str = "timeout";
/// Category that carries a `Retry-After` header
pub const RATE_LIMIT_KIND: &str = "rate_limit";

/// One kind of injected failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorCategory {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(alias = "status_code")]
    pub status_code: u16,
    pub message: String,
    /// Relative weight, not necessarily normalized
    pub probability: f64,
}

impl ErrorCategory {
    pub fn new(kind: &str, status_code: u16, message: &str, probability: f64) -> Self {
        Self {
            kind: kind.to_string(),
            status_code,
            message: message.to_string(),
            probability,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == TIMEOUT_KIND
    }

    pub fn is_rate_limit(&self) -> bool {
        self.kind == RATE_LIMIT_KIND
    }

    /// Error code for the response envelope, e.g. `SERVICE_UNAVAILABLE`
    pub fn error_code(&self) -> String {
        self.kind.to_uppercase()
    }
}

/// The stock categories and weights
pub fn default_error_types() -> Vec<ErrorCategory> {
    vec![
        ErrorCategory::new("internal_error", 500, "Internal server error", 0.4),
        ErrorCategory::new("service_unavailable", 503, "Service temporarily unavailable", 0.3),
        ErrorCategory::new(RATE_LIMIT_KIND, 429, "Too many requests", 0.2),
        ErrorCategory::new(TIMEOUT_KIND, 504, "Gateway timeout", 0.1),
    ]
}

/// Error injection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ErrorInjectionConfig {
    pub enabled: bool,
    #[serde(alias = "error_rate")]
    pub error_rate: f64,
    #[serde(alias = "error_types")]
    pub error_types: Vec<ErrorCategory>,
}

impl Default for ErrorInjectionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            error_rate: 0.1,
            error_types: default_error_types(),
        }
    }
}

/// Decide whether this request fails, and how
///
/// Returns `None` when disabled, when the gate draw `u` satisfies
/// `u >= error_rate`, or when no category has positive weight.
pub fn select_error<'a, R: Rng + ?Sized>(
    config: &'a ErrorInjectionConfig,
    rng: &mut R,
) -> Option<&'a ErrorCategory> {
    if !config.enabled || rng.gen::<f64>() >= config.error_rate {
        return None;
    }

    let total: f64 = config
        .error_types
        .iter()
        .filter(|c| c.probability > 0.0)
        .map(|c| c.probability)
        .sum();
    if total <= 0.0 || !total.is_finite() {
        return None;
    }

    let mut remaining = rng.gen::<f64>() * total;
    for category in config.error_types.iter().filter(|c| c.probability > 0.0) {
        remaining -= category.probability;
        if remaining <= 0.0 {
            return Some(category);
        }
    }
    // Rounding left a sliver; the walk lands on the last weighted category
    config
        .error_types
        .iter()
        .rev()
        .find(|c| c.probability > 0.0)
}
