//! HTTP server configuration and request routing.
//!
//! Requests flow through middleware in order:
//! 1. Request ID generation
//! 2. Request/response logging
//! 3. Timeout enforcement (`request_timeout`, 30s default), answered with a
//!    JSON 408
//! 4. Handler execution
//!
//! Status reports are accepted on both `POST /` and `POST /status`. Unknown
//! paths and methods get JSON 404 and 405 bodies.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    error_handling::HandleErrorLayer,
    extract::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    BoxError, Router,
};
use statusboard_core::{SecretProvider, StatusError, StatusRecorder, TableStore};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::Config,
    handlers::{self, report::error_response},
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Records reports into the status table
    pub recorder: Arc<StatusRecorder>,
    /// Largest accepted request body in bytes
    pub max_payload_bytes: usize,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl AppState {
    /// Creates state from configuration, a store and a secret provider.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn TableStore>,
        secrets: Arc<dyn SecretProvider>,
    ) -> Self {
        let recorder = StatusRecorder::new(store, secrets, config.table_layout());
        Self {
            recorder: Arc::new(recorder),
            max_payload_bytes: config.max_payload_bytes,
            request_timeout: config.request_timeout(),
        }
    }

    /// Overrides the body size limit.
    #[must_use]
    pub fn with_max_payload_bytes(mut self, limit: usize) -> Self {
        self.max_payload_bytes = limit;
        self
    }

    /// Overrides the per-request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Creates the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use statusboard_api::{create_router, AppState, Config};
/// use statusboard_core::{MemoryTableStore, StaticSecret};
///
/// let config = Config::default();
/// let state = AppState::from_config(
///     &config,
///     Arc::new(MemoryTableStore::new()),
///     Arc::new(StaticSecret::disabled()),
/// );
/// let app = create_router(state);
/// ```
pub fn create_router(state: AppState) -> Router {
    let health_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/live", get(handlers::liveness_check));

    let report_routes = Router::new()
        .route("/", post(handlers::submit_status))
        .route("/status", post(handlers::submit_status));

    let request_timeout = state.request_timeout;

    Router::new()
        .merge(health_routes)
        .merge(report_routes)
        .fallback(handlers::unknown_route)
        .method_not_allowed_fallback(handlers::method_not_allowed)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(move |err: BoxError| async move {
                    timeout_response(&err, request_timeout)
                }))
                .timeout(request_timeout),
        )
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(inject_request_id))
        .with_state(state)
}

/// Answers a request cut off by the timeout layer. Routes are infallible, so
/// the only error reaching here is the elapsed timeout.
fn timeout_response(err: &BoxError, timeout: Duration) -> Response {
    let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    warn!(error = %err, timeout_ms, "Request timed out");
    error_response(&StatusError::Timeout { timeout_ms })
}

/// Middleware to inject request ID into all responses.
///
/// Adds X-Request-Id header for tracing requests across services.
async fn inject_request_id(req: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();

    let mut req = req;
    req.extensions_mut().insert(request_id.clone());

    let mut response = next.run(req).await;

    if let Ok(header_value) = request_id.parse() {
        response.headers_mut().insert("X-Request-Id", header_value);
    }

    response
}

/// Starts the HTTP server with graceful shutdown support.
///
/// # Errors
///
/// Returns `std::io::Error` if the address cannot be bound.
pub async fn start_server(state: AppState, addr: SocketAddr) -> Result<(), std::io::Error> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("HTTP server listening on {}", actual_addr);

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("HTTP server stopped gracefully");
    Ok(())
}

/// Waits for shutdown signal (CTRL+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received CTRL+C, starting graceful shutdown");
        },
        () = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    warn!("Waiting for in-flight requests to complete");
}
