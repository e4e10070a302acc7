//! Client library for the datamock server
//!
//! Used by code under test to page through synthetic datasets, reset them
//! between runs and switch fault injection on and off.

pub mod client;
pub mod types;

pub use client::{ClientError, DatamockClient, Result};
pub use types::{Page, Pagination, Record, ResetOptions, ResetResult, ValidationResult};
