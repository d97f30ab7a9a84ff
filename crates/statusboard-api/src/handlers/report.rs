//! Status report submission handler.
//!
//! Reads the body up to the configured size limit, parses it as a status
//! report and hands it to the recorder. The recorder's outcome is turned into
//! a JSON response here.

use axum::{
    body::Body,
    extract::State,
    http::{header::CONTENT_LENGTH, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use statusboard_core::{StatusError, StatusReport};
use tracing::{error, info, instrument, warn};

use crate::AppState;

/// Body returned when the token does not match the shared secret.
#[derive(Debug, Serialize)]
pub struct UnauthorizedResponse {
    /// Always `Unauthorized`
    pub error: &'static str,
}

/// Error response with code and message.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code from the taxonomy (E1001-E3003)
    pub code: String,
    /// Canonical reason phrase of the status code
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Whether resending the same request may succeed
    pub retryable: bool,
}

/// Accepts a status report and appends its rows to the status table.
///
/// Responds `{"ok": true, "written": n}` on success and
/// `{"error": "Unauthorized"}` when the token does not match.
///
/// # Errors
///
/// Returns appropriate HTTP status codes:
/// - 400: Body is not JSON or has the wrong shape
/// - 413: Body exceeds `max_payload_bytes`
/// - 500: Table store failure
/// - 503: Secret provider failure
#[instrument(
    name = "submit_status",
    skip(state, headers, body),
    fields(
        content_length = headers.get(CONTENT_LENGTH).and_then(|v| v.to_str().ok()).unwrap_or("unknown"),
    )
)]
pub async fn submit_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    info!("Processing status report");

    let body = match read_body(&headers, body, state.max_payload_bytes).await {
        Ok(body) => body,
        Err(e) => return error_response(&e),
    };

    let report = match StatusReport::from_slice(&body) {
        Ok(report) => report,
        Err(e) => return error_response(&e),
    };

    match state.recorder.record(&report).await {
        Ok(ack) => (StatusCode::OK, Json(ack)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Collects the body, rejecting it as soon as it exceeds `limit` bytes.
async fn read_body(headers: &HeaderMap, body: Body, limit: usize) -> Result<Bytes, StatusError> {
    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());

    if declared.is_some_and(|len| len > limit) {
        return Err(StatusError::PayloadTooLarge { limit_bytes: limit });
    }

    axum::body::to_bytes(body, limit).await.map_err(|e| {
        warn!(error = %e, limit, "Failed to read request body within limit");
        StatusError::PayloadTooLarge { limit_bytes: limit }
    })
}

/// Maps an error to its HTTP status code.
fn status_code(error: &StatusError) -> StatusCode {
    match error {
        StatusError::InvalidPayload { .. } => StatusCode::BAD_REQUEST,
        StatusError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        StatusError::Unauthorized => StatusCode::OK,
        StatusError::UnknownRoute { .. } => StatusCode::NOT_FOUND,
        StatusError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
        StatusError::SecretUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        StatusError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        StatusError::Timeout { .. } => StatusCode::REQUEST_TIMEOUT,
    }
}

/// Creates the JSON response for an error.
pub(crate) fn error_response(error: &StatusError) -> Response {
    let status = status_code(error);

    if matches!(error, StatusError::Unauthorized) {
        return (status, Json(UnauthorizedResponse { error: "Unauthorized" })).into_response();
    }

    let retryable = error.is_retryable();
    if status.is_server_error() {
        error!(error = %error, code = error.code(), retryable, "Status report failed");
    } else {
        warn!(error = %error, code = error.code(), retryable, "Status report rejected");
    }

    let body = ErrorResponse {
        code: error.code().to_string(),
        error: status.canonical_reason().unwrap_or("Error").to_string(),
        message: error.to_string(),
        retryable,
    };

    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use statusboard_core::CoreError;

    use super::*;

    #[test]
    fn unauthorized_keeps_success_status() {
        let response = error_response(&StatusError::Unauthorized);
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn error_statuses_follow_taxonomy() {
        assert_eq!(
            status_code(&StatusError::InvalidPayload { reason: "x".into() }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_code(&StatusError::PayloadTooLarge { limit_bytes: 1 }),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            status_code(&StatusError::SecretUnavailable("vault".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_code(&StatusError::Storage(CoreError::Database("down".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_code(&StatusError::UnknownRoute { path: "/x".into() }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_code(&StatusError::MethodNotAllowed { method: "GET".into(), path: "/".into() }),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            status_code(&StatusError::Timeout { timeout_ms: 5 }),
            StatusCode::REQUEST_TIMEOUT
        );
    }

    #[tokio::test]
    async fn error_body_reports_retryability() {
        let response = error_response(&StatusError::Storage(CoreError::Database("down".into())));
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["retryable"], true);

        let response = error_response(&StatusError::InvalidPayload { reason: "bad".into() });
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["retryable"], false);
    }

    #[tokio::test]
    async fn declared_length_over_limit_is_rejected_early() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, "2048".parse().unwrap());

        let result = read_body(&headers, Body::from("{}"), 1024).await;

        assert!(matches!(result, Err(StatusError::PayloadTooLarge { limit_bytes: 1024 })));
    }

    #[tokio::test]
    async fn body_within_limit_is_returned() {
        let body = read_body(&HeaderMap::new(), Body::from("{\"mods\":{}}"), 1024).await.unwrap();
        assert_eq!(&body[..], b"{\"mods\":{}}");
    }
}
