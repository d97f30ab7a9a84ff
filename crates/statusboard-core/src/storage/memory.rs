//! In-memory table store.
//!
//! Keeps tables in process memory behind an async lock. Used by tests and by
//! the `memory` storage backend, where losing rows on restart is acceptable.
//! Failures and latency can be injected to exercise error paths without a
//! database.

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use tokio::sync::RwLock;

use super::TableStore;
use crate::{
    error::{CoreError, Result},
    models::{TableHandle, TableLayout},
};

/// Snapshot of one in-memory table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryTable {
    /// Table name
    pub name: String,
    /// All rows, header first
    pub rows: Vec<Vec<String>>,
    /// Number of header rows at the top of `rows`
    pub header_rows: usize,
    /// Leading rows rendered bold
    pub bold_rows: u32,
    /// Leading rows kept visible when scrolling
    pub frozen_rows: u32,
}

impl MemoryTable {
    /// Rows after the header.
    pub fn data_rows(&self) -> &[Vec<String>] {
        &self.rows[self.header_rows.min(self.rows.len())..]
    }
}

/// Table store holding everything in memory.
#[derive(Clone, Default)]
pub struct MemoryTableStore {
    tables: Arc<RwLock<Vec<MemoryTable>>>,
    failure: Arc<RwLock<Option<String>>>,
    latency: Arc<RwLock<Option<Duration>>>,
}

impl MemoryTableStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent operation fail with a database error.
    pub async fn fail_with(&self, message: impl Into<String>) {
        *self.failure.write().await = Some(message.into());
    }

    /// Clears an injected failure.
    pub async fn clear_failure(&self) {
        *self.failure.write().await = None;
    }

    /// Delays every subsequent operation by `delay`.
    pub async fn delay_with(&self, delay: Duration) {
        *self.latency.write().await = Some(delay);
    }

    /// Returns a snapshot of the named table, if it exists.
    pub async fn table(&self, name: &str) -> Option<MemoryTable> {
        self.tables.read().await.iter().find(|t| t.name == name).cloned()
    }

    /// Number of tables in the store.
    pub async fn table_count(&self) -> usize {
        self.tables.read().await.len()
    }

    async fn check_failure(&self) -> Result<()> {
        let latency = *self.latency.read().await;
        if let Some(delay) = latency {
            tokio::time::sleep(delay).await;
        }

        match self.failure.read().await.as_ref() {
            Some(message) => Err(CoreError::Database(message.clone())),
            None => Ok(()),
        }
    }

    fn index_of(handle: &TableHandle) -> Result<usize> {
        usize::try_from(handle.id)
            .map_err(|_| CoreError::NotFound(format!("table {} not found", handle.name)))
    }

    async fn get_or_create_impl(&self, layout: &TableLayout) -> Result<TableHandle> {
        self.check_failure().await?;

        let mut tables = self.tables.write().await;

        if let Some(index) = tables.iter().position(|t| t.name == layout.name) {
            return Ok(TableHandle { id: to_id(index)?, name: layout.name.clone(), created: false });
        }

        let rows = if layout.header.is_empty() { Vec::new() } else { vec![layout.header.clone()] };
        tables.push(MemoryTable {
            name: layout.name.clone(),
            header_rows: rows.len(),
            rows,
            bold_rows: layout.bold_rows,
            frozen_rows: layout.frozen_rows,
        });

        Ok(TableHandle { id: to_id(tables.len() - 1)?, name: layout.name.clone(), created: true })
    }

    async fn append_rows_impl(&self, handle: &TableHandle, rows: Vec<Vec<String>>) -> Result<usize> {
        self.check_failure().await?;

        let index = Self::index_of(handle)?;
        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(index)
            .ok_or_else(|| CoreError::NotFound(format!("table {} not found", handle.name)))?;

        let written = rows.len();
        table.rows.extend(rows);
        Ok(written)
    }

    async fn read_rows_impl(&self, handle: &TableHandle) -> Result<Vec<Vec<String>>> {
        self.check_failure().await?;

        let index = Self::index_of(handle)?;
        self.tables
            .read()
            .await
            .get(index)
            .map(|t| t.rows.clone())
            .ok_or_else(|| CoreError::NotFound(format!("table {} not found", handle.name)))
    }
}

fn to_id(index: usize) -> Result<i64> {
    i64::try_from(index).map_err(|_| CoreError::InvalidInput("too many tables".to_string()))
}

impl TableStore for MemoryTableStore {
    fn get_or_create<'a>(
        &'a self,
        layout: &'a TableLayout,
    ) -> Pin<Box<dyn Future<Output = Result<TableHandle>> + Send + 'a>> {
        Box::pin(self.get_or_create_impl(layout))
    }

    fn append_rows<'a>(
        &'a self,
        handle: &'a TableHandle,
        rows: Vec<Vec<String>>,
    ) -> Pin<Box<dyn Future<Output = Result<usize>> + Send + 'a>> {
        Box::pin(self.append_rows_impl(handle, rows))
    }

    fn read_rows<'a>(
        &'a self,
        handle: &'a TableHandle,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<String>>>> + Send + 'a>> {
        Box::pin(self.read_rows_impl(handle))
    }

    fn health_check(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(self.check_failure())
    }
}
