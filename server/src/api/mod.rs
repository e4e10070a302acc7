//! HTTP routes
//!
//! Everything under `/api` goes through the optional API key check. Only the
//! records route is subject to fault injection.

pub mod response;

use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::Uri;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::{middleware, Router};
use datamock_core::fault::{FaultConfig, FaultConfigUpdate};
use datamock_core::generator::{GeneratorMetrics, StateSnapshot};
use datamock_core::schema::{validate_schema, ValidationIssue, ValidationReport};
use datamock_core::{Record, ResetRequest, Schema, SchemaDefinition};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::error::{ApiError, Result};
use crate::middleware::{inject_faults, require_api_key};
use crate::state::AppState;
use response::{now_timestamp, Envelope, Pagination};

/// Create the `/api` router
pub fn create_router(state: Arc<AppState>) -> Router {
    let records = Router::new()
        .route("/v1/datasets/:name/records", get(get_records))
        .route_layer(middleware::from_fn_with_state(state.clone(), inject_faults));

    Router::new()
        .route("/v1/datasets", get(list_datasets))
        .route("/v1/datasets/:name/reset", post(reset_dataset))
        .route("/v1/datasets/:name/schema", get(get_schema).put(put_schema))
        .route("/v1/datasets/:name/state", get(get_state))
        .route("/v1/schema/validate", post(validate))
        .route("/v1/faults", get(get_faults).put(put_faults))
        .merge(records)
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .with_state(state)
}

/// Liveness probe; never authenticated, never faulted
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "uptimeSeconds": state.started_at.elapsed().as_secs(),
        "datasets": state.datasets.keys().collect::<Vec<_>>(),
        "timestamp": now_timestamp(),
    }))
}

pub async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let faults = state.faults.current();
    Json(json!({
        "status": "operational",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "datamock",
        "features": {
            "latencyInjection": faults.latency.enabled,
            "errorInjection": faults.errors.enabled,
            "authentication": state.api_key.is_some(),
        }
    }))
}

/// Fallback for unknown routes
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("No route for {}", uri.path()))
}

#[derive(Debug, Deserialize)]
struct RecordsQuery {
    offset: Option<String>,
    limit: Option<String>,
}

fn parse_param(name: &str, raw: Option<&str>, default: u64) -> Result<u64> {
    match raw {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
            ApiError::InvalidParameter(format!(
                "{} must be a non-negative integer, got '{}'",
                name, raw
            ))
        }),
    }
}

async fn get_records(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    query: std::result::Result<Query<RecordsQuery>, QueryRejection>,
) -> Result<Envelope<Vec<Record>>> {
    let Query(query) = query.map_err(|err| ApiError::InvalidParameter(err.body_text()))?;
    let generator = state.dataset(&name)?;

    let offset = parse_param("offset", query.offset.as_deref(), 0)?;
    let limit = parse_param(
        "limit",
        query.limit.as_deref(),
        state.pagination.default_limit,
    )?;
    if limit == 0 {
        return Err(ApiError::InvalidParameter(
            "limit must be at least 1".to_string(),
        ));
    }
    if limit > state.pagination.max_limit {
        return Err(ApiError::InvalidParameter(format!(
            "limit must not exceed {}",
            state.pagination.max_limit
        )));
    }

    let batch = generator.generate_batch(offset, limit);
    let pagination = Pagination::for_batch(offset, limit, &batch);
    Ok(Envelope::paginated(batch.records, pagination))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DatasetSummary {
    name: String,
    total_records: u64,
    seed: u64,
    field_count: usize,
}

async fn list_datasets(State(state): State<Arc<AppState>>) -> Envelope<Vec<DatasetSummary>> {
    let summaries = state
        .datasets
        .iter()
        .map(|(name, generator)| {
            let metrics = generator.get_metrics();
            DatasetSummary {
                name: name.clone(),
                total_records: metrics.total_records,
                seed: metrics.seed,
                field_count: metrics.field_count,
            }
        })
        .collect();
    Envelope::ok(summaries)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResetBody {
    total_records: Option<u64>,
    seed: Option<u64>,
    schema: Option<SchemaDefinition>,
}

fn parse_body<T: serde::de::DeserializeOwned + Default>(body: &Bytes) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|err| ApiError::BadRequest(format!("Invalid request body: {}", err)))
}

fn compile(definition: &SchemaDefinition) -> Result<Schema> {
    Schema::compile(definition).map_err(ApiError::SchemaValidation)
}

async fn reset_dataset(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Envelope<Value>> {
    let generator = state.dataset(&name)?;
    let body: ResetBody = parse_body(&body)?;
    let schema = body.schema.as_ref().map(compile).transpose()?;

    let applied = generator.reset(ResetRequest {
        total_records: body.total_records,
        seed: body.seed,
        schema,
        reference_time: None,
    });
    info!(
        dataset = %name,
        total_records = applied.total_records,
        seed = applied.seed,
        "Dataset reset"
    );

    Ok(Envelope::ok(json!({
        "dataset": name,
        "totalRecords": applied.total_records,
        "seed": applied.seed,
        "schema": applied.schema.definition(),
        "referenceTime": applied.reference_time,
    })))
}

async fn get_schema(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Envelope<SchemaDefinition>> {
    let generator = state.dataset(&name)?;
    Ok(Envelope::ok(generator.schema().definition().clone()))
}

async fn put_schema(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Envelope<Value>> {
    let generator = state.dataset(&name)?;
    let definition: SchemaDefinition = serde_json::from_slice(&body)
        .map_err(|err| ApiError::BadRequest(format!("Invalid schema body: {}", err)))?;
    let schema = compile(&definition)?;

    let applied = generator.update_schema(schema);
    info!(dataset = %name, fields = applied.schema.len(), "Schema replaced");

    Ok(Envelope::ok(json!({
        "dataset": name,
        "schema": applied.schema.definition(),
        "fieldCount": applied.schema.len(),
    })))
}

#[derive(Debug, Serialize)]
struct DatasetState {
    state: StateSnapshot,
    metrics: GeneratorMetrics,
}

async fn get_state(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Envelope<DatasetState>> {
    let generator = state.dataset(&name)?;
    Ok(Envelope::ok(DatasetState {
        state: generator.get_state(),
        metrics: generator.get_metrics(),
    }))
}

/// Always 200; problems are reported in the body
async fn validate(body: Bytes) -> Envelope<ValidationReport> {
    let parsed = serde_json::from_slice::<Value>(&body)
        .map_err(|err| err.to_string())
        .and_then(|value| SchemaDefinition::from_value(value).map_err(|err| err.to_string()));

    let report = match parsed {
        Ok(definition) => validate_schema(&definition),
        Err(message) => ValidationReport {
            valid: false,
            errors: vec![ValidationIssue {
                field: String::new(),
                rule: "format".to_string(),
                message,
            }],
        },
    };
    Envelope::ok(report)
}

async fn get_faults(State(state): State<Arc<AppState>>) -> Envelope<FaultConfig> {
    Envelope::ok(state.faults.current().as_ref().clone())
}

async fn put_faults(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Envelope<FaultConfig>> {
    let update: FaultConfigUpdate = parse_body(&body)?;
    let applied = state.faults.update(&update)?;
    info!(
        latency_enabled = applied.latency.enabled,
        errors_enabled = applied.errors.enabled,
        error_rate = applied.errors.error_rate,
        "Fault configuration updated"
    );
    Ok(Envelope::ok(applied.as_ref().clone()))
}
