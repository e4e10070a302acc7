//! # Datamock Core
//!
//! Deterministic synthetic data generation and fault injection decisions
//! for the datamock server.
//!
//! The record at position `i` is a pure function of `(seed, schema, i)`:
//! any page can be served in any order, by any number of concurrent
//! requests, and it always comes out the same.

#![forbid(unsafe_code)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod fault;
pub mod generator;
pub mod identity;
pub mod presets;
pub mod random;
pub mod schema;

/// Re-export common types for ease of use
pub use config::{CoreConfig, DatasetConfig, PaginationConfig};
pub use error::{CoreError, Result};
pub use fault::{FaultConfig, FaultConfigHandle, FaultConfigUpdate, FaultDecision};
pub use generator::{synthesize_record, Batch, DataGenerator, Record, ResetRequest};
pub use identity::derive_record_id;
pub use random::SeededRng;
pub use schema::{validate_schema, Schema, SchemaDefinition, ValidationReport};
