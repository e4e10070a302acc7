//! Success envelope

use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{SecondsFormat, Utc};
use datamock_core::Batch;
use serde::Serialize;

use crate::middleware::current_request_id;

/// Current time as RFC 3339 with milliseconds
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Pagination block of a records response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<u64>,
    pub total_count: u64,
}

impl Pagination {
    pub fn for_batch(offset: u64, limit: u64, batch: &Batch) -> Self {
        Self {
            offset,
            limit,
            has_more: batch.has_more,
            next_offset: batch.next_offset,
            total_count: batch.total_count,
        }
    }
}

/// `{ success: true, data, pagination?, timestamp, requestId }`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pagination: Option<Pagination>,
    timestamp: String,
    request_id: String,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            pagination: None,
            timestamp: now_timestamp(),
            request_id: current_request_id(),
        }
    }

    pub fn paginated(data: T, pagination: Pagination) -> Self {
        Self {
            pagination: Some(pagination),
            ..Self::ok(data)
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
