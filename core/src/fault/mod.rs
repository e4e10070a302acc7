//! Fault injection decisions
//!
//! [`FaultConfig`] is immutable once published. Updates go through a
//! [`FaultConfigHandle`], which validates the merged result and swaps in a
//! new `Arc` snapshot; requests keep whatever snapshot they started with.

pub mod errors;
pub mod latency;

pub use errors::{default_error_types, select_error, ErrorCategory, ErrorInjectionConfig};
pub use latency::{sample_latency, Distribution, LatencyConfig};

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::{CoreError, Result};

/// How long a `timeout` category hangs before answering
pub const DEFAULT_HANG_MS: u64 = 30_000;

fn default_hang_ms() -> u64 {
    DEFAULT_HANG_MS
}

/// Complete fault injection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaultConfig {
    #[serde(default)]
    pub latency: LatencyConfig,
    #[serde(default)]
    pub errors: ErrorInjectionConfig,
    #[serde(default = "default_hang_ms", alias = "hang_ms")]
    pub hang_ms: u64,
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            latency: LatencyConfig::default(),
            errors: ErrorInjectionConfig::default(),
            hang_ms: DEFAULT_HANG_MS,
        }
    }
}

impl FaultConfig {
    /// Check ranges and weights
    pub fn validate(&self) -> Result<()> {
        if self.latency.min_ms > self.latency.max_ms {
            return Err(CoreError::ConfigError(format!(
                "latency.minMs ({}) must not exceed latency.maxMs ({})",
                self.latency.min_ms, self.latency.max_ms
            )));
        }

        let rate = self.errors.error_rate;
        if !(0.0..=1.0).contains(&rate) {
            return Err(CoreError::ConfigError(format!(
                "errors.errorRate must be within [0, 1], got {}",
                rate
            )));
        }

        for category in &self.errors.error_types {
            if !category.probability.is_finite() || category.probability < 0.0 {
                return Err(CoreError::ConfigError(format!(
                    "error type '{}' has invalid probability {}",
                    category.kind, category.probability
                )));
            }
            if !(100..=599).contains(&category.status_code) {
                return Err(CoreError::ConfigError(format!(
                    "error type '{}' has invalid status code {}",
                    category.kind, category.status_code
                )));
            }
        }

        Ok(())
    }

    /// Apply a partial update and validate the result
    pub fn merged(&self, update: &FaultConfigUpdate) -> Result<FaultConfig> {
        let mut next = self.clone();

        if let Some(latency) = &update.latency {
            if let Some(enabled) = latency.enabled {
                next.latency.enabled = enabled;
            }
            if let Some(min_ms) = latency.min_ms {
                next.latency.min_ms = min_ms;
            }
            if let Some(max_ms) = latency.max_ms {
                next.latency.max_ms = max_ms;
            }
            if let Some(distribution) = latency.distribution {
                next.latency.distribution = distribution;
            }
        }

        if let Some(errors) = &update.errors {
            if let Some(enabled) = errors.enabled {
                next.errors.enabled = enabled;
            }
            if let Some(rate) = errors.error_rate {
                next.errors.error_rate = rate;
            }
            if let Some(types) = &errors.error_types {
                next.errors.error_types = types.clone();
            }
        }

        if let Some(hang_ms) = update.hang_ms {
            next.hang_ms = hang_ms;
        }

        next.validate()?;
        Ok(next)
    }

    /// Roll the dice for one request
    pub fn decide<R: Rng + ?Sized>(&self, rng: &mut R) -> FaultDecision {
        let latency = self.latency.enabled.then(|| InjectedLatency {
            millis: sample_latency(&self.latency, rng),
            distribution: self.latency.distribution,
        });
        let error = select_error(&self.errors, rng).cloned();

        FaultDecision {
            latency,
            error,
            error_rate: self.errors.error_rate,
            hang_ms: self.hang_ms,
        }
    }
}

/// Partial latency update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyUpdate {
    pub enabled: Option<bool>,
    pub min_ms: Option<u64>,
    pub max_ms: Option<u64>,
    pub distribution: Option<Distribution>,
}

/// Partial error injection update. `errorTypes` replaces the whole list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorsUpdate {
    pub enabled: Option<bool>,
    pub error_rate: Option<f64>,
    pub error_types: Option<Vec<ErrorCategory>>,
}

/// Body of a fault configuration update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaultConfigUpdate {
    pub latency: Option<LatencyUpdate>,
    pub errors: Option<ErrorsUpdate>,
    pub hang_ms: Option<u64>,
}

/// Sampled delay for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectedLatency {
    pub millis: u64,
    pub distribution: Distribution,
}

/// What to do to one request
#[derive(Debug, Clone, PartialEq)]
pub struct FaultDecision {
    pub latency: Option<InjectedLatency>,
    pub error: Option<ErrorCategory>,
    /// Configured rate, echoed in debug headers
    pub error_rate: f64,
    pub hang_ms: u64,
}

impl FaultDecision {
    pub fn is_clean(&self) -> bool {
        self.latency.is_none() && self.error.is_none()
    }
}

/// Shared publisher of fault configuration snapshots
#[derive(Debug, Clone)]
pub struct FaultConfigHandle {
    sender: Arc<watch::Sender<Arc<FaultConfig>>>,
}

impl FaultConfigHandle {
    pub fn new(config: FaultConfig) -> Result<Self> {
        config.validate()?;
        let (sender, _) = watch::channel(Arc::new(config));
        Ok(Self {
            sender: Arc::new(sender),
        })
    }

    /// The snapshot current right now
    pub fn current(&self) -> Arc<FaultConfig> {
        self.sender.borrow().clone()
    }

    /// Merge a partial update into the current snapshot and publish it
    ///
    /// An invalid merge leaves the current snapshot in place.
    pub fn update(&self, update: &FaultConfigUpdate) -> Result<Arc<FaultConfig>> {
        let mut outcome = Err(CoreError::ConfigError("update not applied".to_string()));
        self.sender.send_if_modified(|current| match current.merged(update) {
            Ok(next) => {
                let snapshot = Arc::new(next);
                *current = snapshot.clone();
                outcome = Ok(snapshot);
                true
            }
            Err(err) => {
                outcome = Err(err);
                false
            }
        });

        if outcome.is_ok() {
            log::info!("Fault configuration updated");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    #[test]
    fn test_default_is_inert() {
        let config = FaultConfig::default();
        assert!(config.validate().is_ok());

        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..100 {
            assert!(config.decide(&mut rng).is_clean());
        }
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = FaultConfig::default();
        config.latency.min_ms = 600;
        assert!(matches!(config.validate(), Err(CoreError::ConfigError(_))));

        let mut config = FaultConfig::default();
        config.errors.error_rate = 1.5;
        assert!(config.validate().is_err());

        let mut config = FaultConfig::default();
        config.errors.error_types[0].probability = -0.1;
        assert!(config.validate().is_err());

        let mut config = FaultConfig::default();
        config.errors.error_types[0].status_code = 42;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_partial_update() {
        let update: FaultConfigUpdate = serde_json::from_value(json!({
            "latency": { "enabled": true, "distribution": "exponential" },
            "hangMs": 50
        }))
        .unwrap();

        let merged = FaultConfig::default().merged(&update).unwrap();
        assert!(merged.latency.enabled);
        assert_eq!(merged.latency.distribution, Distribution::Exponential);
        assert_eq!(merged.latency.min_ms, 100);
        assert_eq!(merged.hang_ms, 50);
        assert_eq!(merged.errors, ErrorInjectionConfig::default());
    }

    #[test]
    fn test_decide_reports_latency_and_error() {
        let config = FaultConfig {
            latency: LatencyConfig {
                enabled: true,
                min_ms: 10,
                max_ms: 20,
                distribution: Distribution::Normal,
            },
            errors: ErrorInjectionConfig {
                enabled: true,
                error_rate: 1.0,
                ..ErrorInjectionConfig::default()
            },
            hang_ms: 5,
        };
        let mut rng = StdRng::seed_from_u64(9);
        let decision = config.decide(&mut rng);

        let latency = decision.latency.unwrap();
        assert!((10..=20).contains(&latency.millis));
        assert_eq!(latency.distribution, Distribution::Normal);
        assert!(decision.error.is_some());
        assert_eq!(decision.error_rate, 1.0);
        assert_eq!(decision.hang_ms, 5);
    }

    #[test]
    fn test_handle_publishes_snapshots() {
        let handle = FaultConfigHandle::new(FaultConfig::default()).unwrap();
        let before = handle.current();

        let update = FaultConfigUpdate {
            errors: Some(ErrorsUpdate {
                enabled: Some(true),
                error_rate: Some(0.5),
                error_types: None,
            }),
            ..FaultConfigUpdate::default()
        };
        let after = handle.update(&update).unwrap();

        assert!(!before.errors.enabled);
        assert!(after.errors.enabled);
        assert_eq!(handle.current().errors.error_rate, 0.5);
        assert_eq!(handle.current(), after);
        // Snapshots taken earlier are unaffected
        assert_eq!(*before, FaultConfig::default());
    }

    #[test]
    fn test_handle_rejects_invalid_update() {
        let handle = FaultConfigHandle::new(FaultConfig::default()).unwrap();
        let update = FaultConfigUpdate {
            latency: Some(LatencyUpdate {
                min_ms: Some(1_000),
                ..LatencyUpdate::default()
            }),
            ..FaultConfigUpdate::default()
        };

        assert!(handle.update(&update).is_err());
        assert_eq!(*handle.current(), FaultConfig::default());
    }
}
