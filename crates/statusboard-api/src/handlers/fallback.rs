//! JSON answers for requests no handler accepts.

use axum::{
    http::{Method, Uri},
    response::Response,
};
use statusboard_core::StatusError;

use super::report::error_response;

/// Answers requests for paths with no route.
pub async fn unknown_route(uri: Uri) -> Response {
    error_response(&StatusError::UnknownRoute { path: uri.path().to_string() })
}

/// Answers requests whose path exists under another method.
pub async fn method_not_allowed(method: Method, uri: Uri) -> Response {
    error_response(&StatusError::MethodNotAllowed {
        method: method.to_string(),
        path: uri.path().to_string(),
    })
}
