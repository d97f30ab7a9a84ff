//! Core domain model, error taxonomy and table storage for statusboard.
//!
//! Defines the status report payload and the rows it projects into, the
//! repository abstraction over the tabular store, the shared-secret provider,
//! and the [`StatusRecorder`] that ties them together. The HTTP layer and the
//! binary depend on these types and never talk to a backend directly.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod models;
pub mod recorder;
pub mod secret;
pub mod storage;

pub use error::{CoreError, Result, StatusError};
pub use models::{
    ModInfo, StatusAck, StatusReport, StatusRow, TableHandle, TableLayout, DEFAULT_TABLE_NAME,
    STATUS_HEADER,
};
pub use recorder::StatusRecorder;
pub use secret::{SecretProvider, SecretToken, StaticSecret};
pub use storage::{memory::MemoryTableStore, postgres::PgTableStore, TableStore};
