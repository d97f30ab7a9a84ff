//! HTTP request handlers for the statusboard API.
//!
//! - `report` - status report submission
//! - `health` - health, readiness and liveness checks
//! - `fallback` - unknown paths and methods
//!
//! Every response body is JSON. Authorization failures keep the legacy
//! `{"error":"Unauthorized"}` body with a 200 status; every other failure
//! carries a status code and an error code from the taxonomy (E1001-E3003).

pub mod fallback;
pub mod health;
pub mod report;

pub use fallback::{method_not_allowed, unknown_route};
pub use health::{health_check, liveness_check, readiness_check};
pub use report::submit_status;
