//! Shared application state

use datamock_core::{DataGenerator, FaultConfigHandle, PaginationConfig};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use crate::config::ServerConfig;
use crate::error::ApiError;

/// State shared by every handler
#[derive(Debug)]
pub struct AppState {
    /// One engine per dataset, fixed at startup
    pub datasets: BTreeMap<String, DataGenerator>,

    /// Fault configuration publisher
    pub faults: FaultConfigHandle,

    /// Page size limits
    pub pagination: PaginationConfig,

    /// Required key for `/api/*`, if any
    pub api_key: Option<String>,

    /// Process start, for uptime
    pub started_at: Instant,
}

impl AppState {
    /// Build engines and the fault publisher from configuration
    pub fn from_config(config: &ServerConfig) -> datamock_core::Result<Self> {
        config.engine.validate()?;
        Ok(Self {
            datasets: config.engine.build_generators()?,
            faults: FaultConfigHandle::new(config.engine.faults.clone())?,
            pagination: config.engine.pagination.clone(),
            api_key: config.api_key.clone().filter(|key| !key.is_empty()),
            started_at: Instant::now(),
        })
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Look up a dataset engine, or 404
    pub fn dataset(&self, name: &str) -> Result<&DataGenerator, ApiError> {
        self.datasets
            .get(name)
            .ok_or_else(|| ApiError::NotFound(format!("Dataset '{}' not found", name)))
    }
}
