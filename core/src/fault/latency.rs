//! Latency sampling
//!
//! Unlike record synthesis this path uses whatever [`Rng`] the caller hands
//! in. The server passes `thread_rng()`; tests pass a seeded `StdRng`.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Shape of the injected delay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distribution {
    #[default]
    Uniform,
    /// Box-Muller around the midpoint, sd = range / 6
    Normal,
    /// Rate 3 / range, shifted to start at min
    Exponential,
}

impl Distribution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Distribution::Uniform => "uniform",
            Distribution::Normal => "normal",
            Distribution::Exponential => "exponential",
        }
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latency injection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LatencyConfig {
    pub enabled: bool,
    #[serde(alias = "min_ms")]
    pub min_ms: u64,
    #[serde(alias = "max_ms")]
    pub max_ms: u64,
    pub distribution: Distribution,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_ms: 100,
            max_ms: 500,
            distribution: Distribution::Uniform,
        }
    }
}

/// Draw a delay in milliseconds, always within `[min_ms, max_ms]`
///
/// Ignores `enabled`; gating is the caller's decision.
pub fn sample_latency<R: Rng + ?Sized>(config: &LatencyConfig, rng: &mut R) -> u64 {
    let (min, max) = (config.min_ms, config.max_ms);
    if max <= min {
        return min;
    }
    let (lo, hi) = (min as f64, max as f64);
    let range = hi - lo;

    let raw = match config.distribution {
        Distribution::Uniform => lo + rng.gen::<f64>() * range,
        Distribution::Normal => {
            let mean = (lo + hi) / 2.0;
            let sd = range / 6.0;
            // u1 in (0, 1] keeps ln finite
            let u1 = 1.0 - rng.gen::<f64>();
            let u2 = rng.gen::<f64>();
            let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
            mean + z * sd
        }
        Distribution::Exponential => {
            let lambda = 3.0 / range;
            let u = 1.0 - rng.gen::<f64>();
            -u.ln() / lambda + lo
        }
    };

    (raw.round().clamp(lo, hi)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rstest::rstest;

    fn config(distribution: Distribution) -> LatencyConfig {
        LatencyConfig {
            enabled: true,
            min_ms: 100,
            max_ms: 500,
            distribution,
        }
    }

    #[rstest]
    #[case(Distribution::Uniform)]
    #[case(Distribution::Normal)]
    #[case(Distribution::Exponential)]
    fn test_samples_within_bounds(#[case] distribution: Distribution) {
        let config = config(distribution);
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..10_000 {
            let delay = sample_latency(&config, &mut rng);
            assert!((100..=500).contains(&delay), "{distribution}: {delay}");
        }
    }

    #[rstest]
    #[case(Distribution::Uniform)]
    #[case(Distribution::Normal)]
    #[case(Distribution::Exponential)]
    fn test_equal_bounds_are_constant(#[case] distribution: Distribution) {
        let config = LatencyConfig {
            min_ms: 250,
            max_ms: 250,
            ..config(distribution)
        };
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(sample_latency(&config, &mut rng), 250);
        }
    }

    #[rstest]
    #[case(Distribution::Uniform, 280.0, 320.0)]
    #[case(Distribution::Normal, 280.0, 320.0)]
    #[case(Distribution::Exponential, 210.0, 250.0)]
    fn test_sample_means(#[case] distribution: Distribution, #[case] low: f64, #[case] high: f64) {
        let config = config(distribution);
        let mut rng = StdRng::seed_from_u64(7);
        let n = 10_000;
        let mean = (0..n).map(|_| sample_latency(&config, &mut rng) as f64).sum::<f64>() / n as f64;
        assert!(mean > low && mean < high, "{distribution} mean {mean}");
    }

    #[test]
    fn test_config_wire_shape() {
        let config: LatencyConfig =
            serde_json::from_str(r#"{ "enabled": true, "minMs": 10, "distribution": "normal" }"#)
                .unwrap();
        assert_eq!(config.min_ms, 10);
        assert_eq!(config.max_ms, 500);
        assert_eq!(config.distribution, Distribution::Normal);

        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["maxMs"], 500);
    }
}
