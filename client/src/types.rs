//! Wire types of the datamock API

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A synthesized record
pub type Record = Map<String, Value>;

/// `{ success: true, data, pagination?, requestId }`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SuccessEnvelope<T> {
    pub data: T,
    #[serde(default)]
    pub pagination: Option<Pagination>,
    #[serde(default)]
    pub request_id: Option<String>,
}

/// `{ success: false, error, message, details?, requestId }`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FailureEnvelope {
    pub error: String,
    pub message: String,
    #[serde(default)]
    pub details: Option<Value>,
    #[serde(default)]
    pub request_id: Option<String>,
}

/// Pagination block of a records page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
    pub has_more: bool,
    #[serde(default)]
    pub next_offset: Option<u64>,
    pub total_count: u64,
}

/// One page of records
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub records: Vec<Record>,
    pub pagination: Pagination,
    pub request_id: Option<String>,
}

/// Reset body; unset fields keep their current value on the server
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_records: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

impl ResetOptions {
    pub fn seed(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    pub fn with_total_records(mut self, total_records: u64) -> Self {
        self.total_records = Some(total_records);
        self
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }
}

/// State applied by a reset
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetResult {
    pub dataset: String,
    pub total_records: u64,
    pub seed: u64,
    pub schema: Value,
}

/// A single schema problem
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub rule: String,
    pub message: String,
}

/// Outcome of server-side schema validation
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
}
