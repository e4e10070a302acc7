//! HTTP client for the datamock server

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::types::{
    FailureEnvelope, Page, Record, ResetOptions, ResetResult, SuccessEnvelope, ValidationResult,
};

/// Error type for client operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a failure envelope, injected or not
    #[error("API error {status} {code}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
        details: Option<Value>,
        request_id: Option<String>,
    },

    /// Non-success status without a failure envelope
    #[error("Server error {status}: {body}")]
    Server { status: u16, body: String },

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Response did not follow the API contract
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl ClientError {
    /// Status code of a server-side failure
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } | ClientError::Server { status, .. } => Some(*status),
            ClientError::Network(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True for failures a caller would normally retry: 429, 5xx and timeouts
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Network(err) => err.is_timeout() || err.is_connect(),
            _ => matches!(self.status(), Some(429) | Some(500..=599)),
        }
    }
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client for the datamock API
#[derive(Debug, Clone)]
pub struct DatamockClient {
    /// Base URL of the server, without a trailing slash
    base_url: String,

    /// HTTP client
    client: Client,

    /// Timeout for requests
    timeout: Duration,

    /// Sent as `X-Api-Key` when set
    api_key: Option<String>,
}

impl DatamockClient {
    /// Create a new client
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(30),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }

    /// Set the timeout for requests
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<(StatusCode, String)> {
        let mut request = request.timeout(self.timeout);
        if let Some(key) = &self.api_key {
            request = request.header("X-Api-Key", key);
        }
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<FailureEnvelope>(&body) {
                Ok(failure) => ClientError::Api {
                    status: status.as_u16(),
                    code: failure.error,
                    message: failure.message,
                    details: failure.details,
                    request_id: failure.request_id,
                },
                Err(_) => ClientError::Server {
                    status: status.as_u16(),
                    body,
                },
            });
        }
        Ok((status, body))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<SuccessEnvelope<T>> {
        let (_, body) = self.execute(request).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Fetch records `[offset, offset + limit)` of a dataset
    pub async fn fetch_page(&self, dataset: &str, offset: u64, limit: u64) -> Result<Page> {
        let request = self
            .client
            .get(self.url(&format!("/api/v1/datasets/{}/records", dataset)))
            .query(&[("offset", offset), ("limit", limit)]);
        let envelope: SuccessEnvelope<Vec<Record>> = self.send(request).await?;

        let pagination = envelope
            .pagination
            .ok_or_else(|| ClientError::Protocol("records response without pagination".to_string()))?;
        Ok(Page {
            records: envelope.data,
            pagination,
            request_id: envelope.request_id,
        })
    }

    /// Fetch a whole dataset, following `nextOffset` until `hasMore` is false
    pub async fn fetch_all(&self, dataset: &str, page_size: u64) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        let mut offset = 0;

        loop {
            let page = self.fetch_page(dataset, offset, page_size).await?;
            records.extend(page.records);

            if !page.pagination.has_more {
                return Ok(records);
            }
            match page.pagination.next_offset {
                Some(next) if next > offset => offset = next,
                other => {
                    return Err(ClientError::Protocol(format!(
                        "nextOffset {:?} does not advance past {}",
                        other, offset
                    )))
                }
            }
        }
    }

    /// Replace any subset of a dataset's seed, record count and schema
    pub async fn reset(&self, dataset: &str, options: &ResetOptions) -> Result<ResetResult> {
        let request = self
            .client
            .post(self.url(&format!("/api/v1/datasets/{}/reset", dataset)))
            .json(options);
        Ok(self.send(request).await?.data)
    }

    /// Current schema definition of a dataset
    pub async fn schema(&self, dataset: &str) -> Result<Value> {
        let request = self
            .client
            .get(self.url(&format!("/api/v1/datasets/{}/schema", dataset)));
        Ok(self.send(request).await?.data)
    }

    /// State snapshot and counters of a dataset
    pub async fn dataset_state(&self, dataset: &str) -> Result<Value> {
        let request = self
            .client
            .get(self.url(&format!("/api/v1/datasets/{}/state", dataset)));
        Ok(self.send(request).await?.data)
    }

    /// Validate a schema without applying it
    pub async fn validate_schema(&self, schema: &Value) -> Result<ValidationResult> {
        let request = self
            .client
            .post(self.url("/api/v1/schema/validate"))
            .json(schema);
        Ok(self.send(request).await?.data)
    }

    /// Current fault configuration
    pub async fn fault_config(&self) -> Result<Value> {
        let request = self.client.get(self.url("/api/v1/faults"));
        Ok(self.send(request).await?.data)
    }

    /// Partially update the fault configuration; returns the applied config
    pub async fn update_faults(&self, update: &Value) -> Result<Value> {
        let request = self.client.put(self.url("/api/v1/faults")).json(update);
        Ok(self.send(request).await?.data)
    }

    /// Liveness probe
    pub async fn health(&self) -> Result<Value> {
        let (_, body) = self.execute(self.client.get(self.url("/health"))).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn page_body(ids: &[&str], offset: u64, next: Option<u64>, total: u64) -> String {
        let records: Vec<Value> = ids.iter().map(|id| json!({ "id": id })).collect();
        let mut pagination = json!({
            "offset": offset,
            "limit": 2,
            "hasMore": next.is_some(),
            "totalCount": total,
        });
        if let Some(next) = next {
            pagination["nextOffset"] = json!(next);
        }
        json!({
            "success": true,
            "data": records,
            "pagination": pagination,
            "timestamp": "2025-01-01T00:00:00.000Z",
            "requestId": "req-1",
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_fetch_page() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/datasets/records/records")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("offset".into(), "4".into()),
                Matcher::UrlEncoded("limit".into(), "2".into()),
            ]))
            .with_header("content-type", "application/json")
            .with_body(page_body(&["a", "b"], 4, Some(6), 10))
            .create_async()
            .await;

        let client = DatamockClient::new(&server.url());
        let page = client.fetch_page("records", 4, 2).await.unwrap();

        mock.assert_async().await;
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.pagination.next_offset, Some(6));
        assert_eq!(page.request_id.as_deref(), Some("req-1"));
    }

    #[tokio::test]
    async fn test_fetch_all_follows_next_offset() {
        let mut server = Server::new_async().await;
        let pages = [
            ("0", page_body(&["a", "b"], 0, Some(2), 5)),
            ("2", page_body(&["c", "d"], 2, Some(4), 5)),
            ("4", page_body(&["e"], 4, None, 5)),
        ];
        let mut mocks = Vec::new();
        for (offset, body) in pages {
            mocks.push(
                server
                    .mock("GET", "/api/v1/datasets/logs/records")
                    .match_query(Matcher::UrlEncoded("offset".into(), offset.into()))
                    .with_body(body)
                    .create_async()
                    .await,
            );
        }

        let client = DatamockClient::new(&format!("{}/", server.url()));
        let records = client.fetch_all("logs", 2).await.unwrap();

        let ids: Vec<&str> = records.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d", "e"]);
        for mock in mocks {
            mock.assert_async().await;
        }
    }

    #[tokio::test]
    async fn test_fetch_all_rejects_stuck_cursor() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v1/datasets/logs/records")
            .match_query(Matcher::Any)
            .with_body(page_body(&["a"], 0, Some(0), 5))
            .create_async()
            .await;

        let client = DatamockClient::new(&server.url());
        let err = client.fetch_all("logs", 2).await.unwrap_err();
        assert!(matches!(err, ClientError::Protocol(_)));
    }

    #[tokio::test]
    async fn test_injected_error_surfaces_as_api_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v1/datasets/records/records")
            .match_query(Matcher::Any)
            .with_status(503)
            .with_body(
                json!({
                    "success": false,
                    "error": "SERVICE_UNAVAILABLE",
                    "message": "Service temporarily unavailable",
                    "timestamp": "2025-01-01T00:00:00.000Z",
                    "requestId": "req-9",
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = DatamockClient::new(&server.url());
        let err = client.fetch_page("records", 0, 10).await.unwrap_err();

        match &err {
            ClientError::Api {
                status,
                code,
                request_id,
                details,
                ..
            } => {
                assert_eq!(*status, 503);
                assert!(details.is_none());
                assert_eq!(code, "SERVICE_UNAVAILABLE");
                assert_eq!(request_id.as_deref(), Some("req-9"));
            }
            other => panic!("Expected Api error, got {other:?}"),
        }
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_plain_error_body() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let client = DatamockClient::new(&server.url());
        let err = client.health().await.unwrap_err();
        assert!(matches!(err, ClientError::Server { status: 502, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_reset_sends_only_given_fields_and_api_key() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/datasets/records/reset")
            .match_header("x-api-key", "sekrit")
            .match_body(Matcher::Json(json!({ "seed": 999 })))
            .with_body(
                json!({
                    "success": true,
                    "data": { "dataset": "records", "totalRecords": 50, "seed": 999,
                              "schema": {}, "referenceTime": "2025-01-01T00:00:00Z" },
                    "timestamp": "2025-01-01T00:00:00.000Z",
                    "requestId": "req-2",
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = DatamockClient::new(&server.url()).with_api_key("sekrit");
        let result = client.reset("records", &ResetOptions::seed(999)).await.unwrap();

        mock.assert_async().await;
        assert_eq!(result.seed, 999);
        assert_eq!(result.total_records, 50);
    }

    #[tokio::test]
    async fn test_validate_schema() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/v1/schema/validate")
            .with_body(
                json!({
                    "success": true,
                    "data": { "valid": false, "errors": [
                        { "field": "status", "rule": "enum", "message": "enum field requires a non-empty enum list" }
                    ] },
                    "timestamp": "2025-01-01T00:00:00.000Z",
                    "requestId": "req-3",
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = DatamockClient::new(&server.url());
        let result = client
            .validate_schema(&json!({ "status": { "type": "enum" } }))
            .await
            .unwrap();
        assert!(!result.valid);
        assert_eq!(result.errors[0].rule, "enum");
    }

    #[tokio::test]
    async fn test_fault_config_round_trip() {
        let mut server = Server::new_async().await;
        let faults = json!({
            "latency": { "enabled": true, "minMs": 5, "maxMs": 50, "distribution": "normal" },
            "errors": { "enabled": false, "errorRate": 0.1, "errorTypes": [] },
            "hangMs": 30000,
        });
        let envelope = |data: &Value| {
            json!({
                "success": true,
                "data": data,
                "timestamp": "2025-01-01T00:00:00.000Z",
                "requestId": "req-4",
            })
            .to_string()
        };
        let get_mock = server
            .mock("GET", "/api/v1/faults")
            .with_body(envelope(&faults))
            .create_async()
            .await;
        let update = json!({ "latency": { "enabled": true, "minMs": 5, "maxMs": 50 } });
        let put_mock = server
            .mock("PUT", "/api/v1/faults")
            .match_body(Matcher::Json(update.clone()))
            .with_body(envelope(&faults))
            .create_async()
            .await;

        let client = DatamockClient::new(&server.url());
        let applied = client.update_faults(&update).await.unwrap();
        let current = client.fault_config().await.unwrap();

        put_mock.assert_async().await;
        get_mock.assert_async().await;
        assert_eq!(applied, faults);
        assert_eq!(current["latency"]["distribution"], "normal");
    }

    #[test]
    fn test_retryable_statuses() {
        let api = |status| ClientError::Api {
            status,
            code: "X".to_string(),
            message: String::new(),
            details: None,
            request_id: None,
        };
        assert!(api(429).is_retryable());
        assert!(api(504).is_retryable());
        assert!(!api(400).is_retryable());
        assert!(!ClientError::Protocol("x".to_string()).is_retryable());
    }
}
