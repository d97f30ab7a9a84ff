//! Tabular store abstraction for status rows.
//!
//! The [`TableStore`] trait is the only way the recorder touches persisted
//! tables. A table is looked up (or created with its header) once per request
//! and rows are appended to it in a single bulk write. Two backends exist:
//! [`postgres::PgTableStore`] for production and [`memory::MemoryTableStore`]
//! for tests and throwaway deployments.

use std::{future::Future, pin::Pin};

use crate::{
    error::Result,
    models::{TableHandle, TableLayout},
};

pub mod memory;
pub mod postgres;

/// Storage operations required to record status reports.
///
/// Implementations must keep the header as row 1 of every table they create,
/// and must land each `append_rows` call as one contiguous block after the
/// table's current last row.
pub trait TableStore: Send + Sync + 'static {
    /// Finds the table named by `layout`, creating it if it does not exist.
    ///
    /// On creation the header row is written and the bold and frozen row
    /// counts from the layout are recorded. An existing table is returned
    /// as-is; its header is not checked or repaired.
    fn get_or_create<'a>(
        &'a self,
        layout: &'a TableLayout,
    ) -> Pin<Box<dyn Future<Output = Result<TableHandle>> + Send + 'a>>;

    /// Appends rows after the current last row of the table.
    ///
    /// Returns the number of rows written. An empty batch writes nothing.
    fn append_rows<'a>(
        &'a self,
        handle: &'a TableHandle,
        rows: Vec<Vec<String>>,
    ) -> Pin<Box<dyn Future<Output = Result<usize>> + Send + 'a>>;

    /// Reads every row of the table, header first, in row order.
    fn read_rows<'a>(
        &'a self,
        handle: &'a TableHandle,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<String>>>> + Send + 'a>>;

    /// Verifies the backend is reachable.
    fn health_check(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}
