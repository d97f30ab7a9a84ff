//! statusboard HTTP API.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod handlers;
pub mod server;

pub use config::{Config, StorageBackend};
pub use server::{create_router, start_server, AppState};
