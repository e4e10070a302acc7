//! Request pipeline: request ids, API key check and fault injection

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use datamock_core::fault::FaultDecision;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
pub const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");
pub const INJECTED_LATENCY_HEADER: HeaderName = HeaderName::from_static("x-injected-latency");
pub const LATENCY_DISTRIBUTION_HEADER: HeaderName =
    HeaderName::from_static("x-latency-distribution");
pub const INJECTED_ERROR_HEADER: HeaderName = HeaderName::from_static("x-injected-error");
pub const ERROR_RATE_HEADER: HeaderName = HeaderName::from_static("x-error-rate");

const MAX_REQUEST_ID_LEN: usize = 128;

tokio::task_local! {
    static REQUEST_ID: String;
}

/// Id of the request being served, empty outside a request
pub fn current_request_id() -> String {
    REQUEST_ID.try_with(|id| id.clone()).unwrap_or_default()
}

/// Honour a client `X-Request-Id` or mint one, and echo it back
pub async fn request_id(request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty() && value.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut response = REQUEST_ID.scope(id.clone(), next.run(request)).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Accept `X-Api-Key: <key>` or `Authorization: Bearer <key>` when a key is configured
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.api_key.as_deref() else {
        return next.run(request).await;
    };

    if presented_key(request.headers()) == Some(expected) {
        next.run(request).await
    } else {
        warn!(
            request_id = %current_request_id(),
            path = %request.uri().path(),
            "Rejected request without a valid API key"
        );
        ApiError::Unauthorized.into_response()
    }
}

fn presented_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(&API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
        })
}

/// Delay and/or fail the request according to the current fault snapshot
///
/// The snapshot is read once, so an update mid-request does not affect it.
/// Sleeps are timer-based and never block other connections.
pub async fn inject_faults(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let config = state.faults.current();
    let decision = config.decide(&mut rand::thread_rng());

    if let Some(latency) = decision.latency {
        debug!(
            request_id = %current_request_id(),
            delay_ms = latency.millis,
            distribution = %latency.distribution,
            "Injecting latency"
        );
        tokio::time::sleep(Duration::from_millis(latency.millis)).await;
    }

    let mut response = match &decision.error {
        Some(category) => {
            if category.is_timeout() {
                tokio::time::sleep(Duration::from_millis(decision.hang_ms)).await;
            }
            warn!(
                request_id = %current_request_id(),
                error_type = %category.kind,
                status = category.status_code,
                "Injecting error"
            );
            ApiError::Injected(category.clone()).into_response()
        }
        None => next.run(request).await,
    };

    set_debug_headers(response.headers_mut(), &decision, config.errors.enabled);
    response
}

fn set_debug_headers(headers: &mut HeaderMap, decision: &FaultDecision, errors_enabled: bool) {
    if let Some(latency) = decision.latency {
        if let Ok(value) = HeaderValue::from_str(&format!("{}ms", latency.millis)) {
            headers.insert(INJECTED_LATENCY_HEADER, value);
        }
        headers.insert(
            LATENCY_DISTRIBUTION_HEADER,
            HeaderValue::from_static(latency.distribution.as_str()),
        );
    }
    if let Some(category) = &decision.error {
        if let Ok(value) = HeaderValue::from_str(&category.kind) {
            headers.insert(INJECTED_ERROR_HEADER, value);
        }
    }
    if errors_enabled {
        if let Ok(value) = HeaderValue::from_str(&decision.error_rate.to_string()) {
            headers.insert(ERROR_RATE_HEADER, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datamock_core::fault::{default_error_types, Distribution, InjectedLatency};

    #[test]
    fn test_presented_key() {
        let mut headers = HeaderMap::new();
        assert_eq!(presented_key(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(presented_key(&headers), Some("abc"));

        headers.insert(API_KEY_HEADER, HeaderValue::from_static("xyz"));
        assert_eq!(presented_key(&headers), Some("xyz"));

        let mut basic = HeaderMap::new();
        basic.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(presented_key(&basic), None);
    }

    #[test]
    fn test_debug_headers() {
        let decision = FaultDecision {
            latency: Some(InjectedLatency {
                millis: 237,
                distribution: Distribution::Normal,
            }),
            error: Some(default_error_types().remove(0)),
            error_rate: 0.25,
            hang_ms: 10,
        };
        let mut headers = HeaderMap::new();
        set_debug_headers(&mut headers, &decision, true);

        assert_eq!(headers[INJECTED_LATENCY_HEADER], "237ms");
        assert_eq!(headers[LATENCY_DISTRIBUTION_HEADER], "normal");
        assert_eq!(headers[INJECTED_ERROR_HEADER], "internal_error");
        assert_eq!(headers[ERROR_RATE_HEADER], "0.25");
    }

    #[test]
    fn test_no_headers_for_clean_decision() {
        let decision = FaultDecision {
            latency: None,
            error: None,
            error_rate: 0.1,
            hang_ms: 10,
        };
        let mut headers = HeaderMap::new();
        set_debug_headers(&mut headers, &decision, false);
        assert!(headers.is_empty());
    }

    #[test]
    fn test_request_id_outside_request() {
        assert_eq!(current_request_id(), "");
    }
}
