//! Configuration for the mock server
//!
//! Layers, lowest precedence first: built-in defaults, an optional config
//! file (format by extension), `DATAMOCK__*` environment variables, then
//! command-line overrides. Defaults come from the serde `default`s of every
//! section, so a file only names what it changes. A `datasets` table in a
//! file replaces the default dataset list.

use config::{Config, ConfigError, Environment, File};
use datamock_core::{CoreConfig, DatasetConfig};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Prefix of environment overrides, e.g. `DATAMOCK__PORT=9000` or
/// `DATAMOCK__ENGINE__PAGINATION__MAX_LIMIT=500`
pub const ENV_PREFIX: &str = "DATAMOCK";

/// Dataset that `--schema-file` applies to
pub const PRIMARY_DATASET: &str = "records";

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// TCP port to listen on
    pub port: u16,

    /// When set, `/api/*` requires this key
    pub api_key: Option<String>,

    /// Engine, dataset and fault settings
    pub engine: CoreConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            api_key: None,
            engine: CoreConfig::default(),
        }
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub api_key: Option<String>,
    pub seed: Option<u64>,
    pub total_records: Option<u64>,
    pub schema_file: Option<String>,
}

impl ServerConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the optional file, then the environment, over the defaults
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path));
        }
        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Apply command-line overrides. Seed and record count apply to every
    /// dataset; a schema file replaces the primary dataset's schema.
    pub fn apply(&mut self, overrides: CliOverrides) {
        if let Some(host) = overrides.host {
            self.host = host;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(api_key) = overrides.api_key {
            self.api_key = Some(api_key);
        }
        for dataset in self.engine.datasets.values_mut() {
            if let Some(seed) = overrides.seed {
                dataset.seed = Some(seed);
            }
            if let Some(total_records) = overrides.total_records {
                dataset.total_records = total_records;
            }
        }
        if let Some(schema_file) = overrides.schema_file {
            let dataset = self
                .engine
                .datasets
                .entry(PRIMARY_DATASET.to_string())
                .or_insert_with(|| {
                    DatasetConfig::new(
                        overrides.total_records.unwrap_or(1000),
                        overrides.seed,
                    )
                });
            dataset.schema_file = Some(schema_file);
        }
    }

    /// Address to bind
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// Configuration for in-process tests: small fixed datasets, no auth
    pub fn for_testing() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            api_key: None,
            engine: CoreConfig::testing(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3000);
        assert!(config.api_key.is_none());
        assert_eq!(config.engine.pagination.max_limit, 1000);
        assert_eq!(config.socket_addr().unwrap().port(), 3000);
    }

    #[test]
    fn test_load_without_file_keeps_defaults() {
        let config = ServerConfig::load(None).unwrap();
        assert_eq!(config.engine.datasets.len(), 2);
        assert_eq!(config.engine.pagination.default_limit, 100);
    }

    #[test]
    fn test_load_file_layer() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
port = 8088
api_key = "secret"

[engine.pagination]
max_limit = 250

[engine.datasets.records]
total_records = 20
seed = 7

[engine.faults.latency]
enabled = true
min_ms = 5
max_ms = 10
"#
        )
        .unwrap();

        let config = ServerConfig::load(file.path().to_str()).unwrap();
        assert_eq!(config.port, 8088);
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.engine.pagination.max_limit, 250);
        assert_eq!(config.engine.pagination.default_limit, 100);
        assert_eq!(config.engine.datasets["records"].total_records, 20);
        assert_eq!(config.engine.datasets["records"].seed, Some(7));
        assert!(!config.engine.datasets.contains_key("logs"));
        assert!(config.engine.faults.latency.enabled);
        assert_eq!(config.engine.faults.latency.max_ms, 10);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = ServerConfig::default();
        config.apply(CliOverrides {
            port: Some(9000),
            seed: Some(1),
            total_records: Some(10),
            schema_file: Some("schema.json".to_string()),
            ..CliOverrides::default()
        });

        assert_eq!(config.port, 9000);
        assert!(config
            .engine
            .datasets
            .values()
            .all(|d| d.seed == Some(1) && d.total_records == 10));
        assert_eq!(
            config.engine.datasets[PRIMARY_DATASET].schema_file.as_deref(),
            Some("schema.json")
        );
    }
}
