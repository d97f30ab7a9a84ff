//! Error types and result handling for status recording.
//!
//! `CoreError` covers storage-level failures reported by a table backend.
//! `StatusError` is the request-level taxonomy: every way a status report can
//! fail maps to exactly one variant, and every variant carries a stable code
//! so the HTTP layer can produce a deterministic response.

use thiserror::Error;

/// Result type alias using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Storage-level error raised by table backends and secret providers.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Table or row not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Constraint violation.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Invalid input handed to the store.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound("requested row not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::ConstraintViolation(format!("unique constraint violation: {db_err}"))
            },
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                Self::ConstraintViolation(format!("foreign key constraint violation: {db_err}"))
            },
            _ => Self::Database(err.to_string()),
        }
    }
}

/// Request-level errors with codes for client disambiguation.
#[derive(Debug, Error)]
pub enum StatusError {
    /// Body is not valid JSON or does not have the report shape (E1001).
    #[error("[E1001] Invalid payload: {reason}")]
    InvalidPayload {
        /// What was wrong with the payload
        reason: String,
    },

    /// Body exceeds the configured size limit (E1002).
    #[error("[E1002] Payload too large: exceeds {limit_bytes} byte limit")]
    PayloadTooLarge {
        /// Configured limit in bytes
        limit_bytes: usize,
    },

    /// Shared-secret token missing or wrong (E1003).
    #[error("[E1003] Unauthorized")]
    Unauthorized,

    /// No route matches the request path (E1004).
    #[error("[E1004] No route for {path}")]
    UnknownRoute {
        /// Requested path
        path: String,
    },

    /// The path exists but not for this HTTP method (E1005).
    #[error("[E1005] Method {method} not allowed for {path}")]
    MethodNotAllowed {
        /// Requested method
        method: String,
        /// Requested path
        path: String,
    },

    /// The secret provider could not be read (E3001).
    #[error("[E3001] Secret unavailable: {0}")]
    SecretUnavailable(String),

    /// The table store failed (E3002).
    #[error("[E3002] Storage error: {0}")]
    Storage(#[from] CoreError),

    /// The request did not finish within the configured timeout (E3003).
    #[error("[E3003] Request timed out after {timeout_ms} ms")]
    Timeout {
        /// Configured timeout in milliseconds
        timeout_ms: u64,
    },
}

impl StatusError {
    /// Returns the error code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidPayload { .. } => "E1001",
            Self::PayloadTooLarge { .. } => "E1002",
            Self::Unauthorized => "E1003",
            Self::UnknownRoute { .. } => "E1004",
            Self::MethodNotAllowed { .. } => "E1005",
            Self::SecretUnavailable(_) => "E3001",
            Self::Storage(_) => "E3002",
            Self::Timeout { .. } => "E3003",
        }
    }

    /// Returns whether the caller may retry the same request unchanged.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::SecretUnavailable(_) | Self::Storage(_) | Self::Timeout { .. })
    }
}

impl From<serde_json::Error> for StatusError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidPayload { reason: err.to_string() }
    }
}
