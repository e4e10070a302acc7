//! Configuration for the core crate
//!
//! Pagination limits, the datasets served at startup and the initial fault
//! configuration. Field names are snake_case so layered loaders can map
//! environment variables onto them.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{CoreError, Result};
use crate::fault::{Distribution, FaultConfig};
use crate::generator::DataGenerator;
use crate::presets;
use crate::schema::{Schema, SchemaDefinition};

/// Page size limits enforced at the HTTP boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Limit used when a request names none
    pub default_limit: u64,

    /// Largest accepted limit
    pub max_limit: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        PaginationConfig {
            default_limit: 100,
            max_limit: 1000,
        }
    }
}

/// One dataset served at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Number of records in the virtual sequence
    pub total_records: u64,

    /// Fixed seed; the wall clock is used when unset
    pub seed: Option<u64>,

    /// Built-in schema to use. Defaults to the dataset's own name.
    pub preset: Option<String>,

    /// JSON schema file, takes precedence over `preset`
    pub schema_file: Option<String>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        DatasetConfig {
            total_records: 1000,
            seed: None,
            preset: None,
            schema_file: None,
        }
    }
}

impl DatasetConfig {
    pub fn new(total_records: u64, seed: Option<u64>) -> Self {
        DatasetConfig {
            total_records,
            seed,
            ..DatasetConfig::default()
        }
    }

    /// Load and compile this dataset's schema
    pub fn load_schema(&self, name: &str) -> Result<Schema> {
        if let Some(path) = &self.schema_file {
            debug!("Loading schema for dataset '{}' from {}", name, path);
            let definition = SchemaDefinition::from_file(path)?;
            return Schema::compile(&definition).map_err(CoreError::InvalidSchema);
        }
        presets::schema(self.preset.as_deref().unwrap_or(name))
    }
}

/// Main configuration for the core crate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Pagination limits
    pub pagination: PaginationConfig,

    /// Datasets by name
    pub datasets: BTreeMap<String, DatasetConfig>,

    /// Fault injection settings at startup
    pub faults: FaultConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        let mut datasets = BTreeMap::new();
        datasets.insert("records".to_string(), DatasetConfig::new(1000, None));
        datasets.insert("logs".to_string(), DatasetConfig::new(10_000, None));

        CoreConfig {
            pagination: PaginationConfig::default(),
            datasets,
            faults: FaultConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: &str) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let config = serde_json::from_reader(file)?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_file(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Latency on, errors off, fixed seeds
    pub fn development() -> Self {
        let mut config = Self::default();
        config.faults.latency.enabled = true;
        config.faults.latency.min_ms = 50;
        config.faults.latency.max_ms = 250;
        config.faults.latency.distribution = Distribution::Normal;
        for dataset in config.datasets.values_mut() {
            dataset.seed.get_or_insert(42);
        }
        config
    }

    /// Small datasets, fixed seeds, no faults and short hangs
    pub fn testing() -> Self {
        let mut config = Self::default();
        config.faults.hang_ms = 100;
        for dataset in config.datasets.values_mut() {
            dataset.total_records = 50;
            dataset.seed = Some(42);
        }
        config
    }

    /// Check limits and fault settings
    pub fn validate(&self) -> Result<()> {
        let pagination = &self.pagination;
        if pagination.max_limit == 0 {
            return Err(CoreError::ConfigError(
                "pagination.max_limit must be positive".to_string(),
            ));
        }
        if pagination.default_limit == 0 || pagination.default_limit > pagination.max_limit {
            return Err(CoreError::ConfigError(format!(
                "pagination.default_limit must be within [1, {}], got {}",
                pagination.max_limit, pagination.default_limit
            )));
        }
        self.faults.validate()
    }

    /// Build one engine per configured dataset
    pub fn build_generators(&self) -> Result<BTreeMap<String, DataGenerator>> {
        self.datasets
            .iter()
            .map(|(name, dataset)| {
                let schema = dataset.load_schema(name)?;
                let generator = DataGenerator::new(schema, dataset.total_records, dataset.seed);
                Ok((name.clone(), generator))
            })
            .collect()
    }
}
