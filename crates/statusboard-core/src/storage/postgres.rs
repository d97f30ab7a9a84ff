//! PostgreSQL table store.
//!
//! Tables live in `sheets`, their rows in `sheet_rows` keyed by
//! `(sheet_id, row_number)`. Row 1 is the header. `sheets.last_row` tracks
//! the current last row; appends take a row lock on the sheet so concurrent
//! writers land as separate contiguous blocks.

use std::{future::Future, pin::Pin, sync::Arc};

use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;

use super::TableStore;
use crate::{
    error::{CoreError, Result},
    models::{TableHandle, TableLayout},
};

/// Rows per INSERT statement; keeps bind parameters under the protocol limit.
const INSERT_CHUNK_ROWS: usize = 1000;

/// Table store backed by PostgreSQL.
#[derive(Clone)]
pub struct PgTableStore {
    pool: Arc<PgPool>,
}

impl PgTableStore {
    /// Creates a store over the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Creates the `sheets` and `sheet_rows` tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns error if the DDL cannot be executed.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS sheets (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                frozen_rows INTEGER NOT NULL DEFAULT 0,
                bold_rows INTEGER NOT NULL DEFAULT 0,
                last_row INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            ",
        )
        .execute(&*self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS sheet_rows (
                sheet_id BIGINT NOT NULL REFERENCES sheets(id) ON DELETE CASCADE,
                row_number INTEGER NOT NULL,
                cells TEXT[] NOT NULL,
                PRIMARY KEY (sheet_id, row_number)
            )
            ",
        )
        .execute(&*self.pool)
        .await?;

        Ok(())
    }

    async fn get_or_create_impl(&self, layout: &TableLayout) -> Result<TableHandle> {
        if let Some(id) = self.find_sheet_id(&layout.name).await? {
            return Ok(TableHandle { id, name: layout.name.clone(), created: false });
        }

        let frozen_rows = to_row_count(layout.frozen_rows)?;
        let bold_rows = to_row_count(layout.bold_rows)?;
        let header_rows = i32::from(!layout.header.is_empty());

        let mut tx = self.pool.begin().await?;

        // Loses quietly to a concurrent creator; the SELECT below then sees
        // the committed sheet.
        let inserted: Option<i64> = sqlx::query_scalar(
            r"
            INSERT INTO sheets (name, frozen_rows, bold_rows, last_row)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (name) DO NOTHING
            RETURNING id
            ",
        )
        .bind(&layout.name)
        .bind(frozen_rows)
        .bind(bold_rows)
        .bind(header_rows)
        .fetch_optional(&mut *tx)
        .await?;

        let handle = match inserted {
            Some(id) => {
                if header_rows > 0 {
                    sqlx::query(
                        "INSERT INTO sheet_rows (sheet_id, row_number, cells) VALUES ($1, 1, $2)",
                    )
                    .bind(id)
                    .bind(&layout.header)
                    .execute(&mut *tx)
                    .await?;
                }
                debug!(sheet_id = id, table = %layout.name, "Created table with header");
                TableHandle { id, name: layout.name.clone(), created: true }
            },
            None => {
                let id: i64 = sqlx::query_scalar("SELECT id FROM sheets WHERE name = $1")
                    .bind(&layout.name)
                    .fetch_one(&mut *tx)
                    .await?;
                TableHandle { id, name: layout.name.clone(), created: false }
            },
        };

        tx.commit().await?;
        Ok(handle)
    }

    async fn find_sheet_id(&self, name: &str) -> Result<Option<i64>> {
        let id = sqlx::query_scalar("SELECT id FROM sheets WHERE name = $1")
            .bind(name)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(id)
    }

    async fn append_rows_impl(&self, handle: &TableHandle, rows: Vec<Vec<String>>) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let written = rows.len();
        let count = i32::try_from(written)
            .map_err(|_| CoreError::InvalidInput(format!("{written} rows in one append")))?;

        let mut tx = self.pool.begin().await?;

        let last_row: i32 = sqlx::query_scalar("SELECT last_row FROM sheets WHERE id = $1 FOR UPDATE")
            .bind(handle.id)
            .fetch_one(&mut *tx)
            .await?;

        let new_last_row = last_row
            .checked_add(count)
            .ok_or_else(|| CoreError::InvalidInput("table row limit exceeded".to_string()))?;

        let numbered: Vec<(i32, Vec<String>)> = (last_row + 1..=new_last_row).zip(rows).collect();

        for chunk in numbered.chunks(INSERT_CHUNK_ROWS) {
            let mut builder =
                QueryBuilder::<Postgres>::new("INSERT INTO sheet_rows (sheet_id, row_number, cells) ");
            builder.push_values(chunk, |mut b, (row_number, cells)| {
                b.push_bind(handle.id).push_bind(*row_number).push_bind(cells.clone());
            });
            builder.build().execute(&mut *tx).await?;
        }

        sqlx::query("UPDATE sheets SET last_row = $2 WHERE id = $1")
            .bind(handle.id)
            .bind(new_last_row)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(
            sheet_id = handle.id,
            first_row = last_row + 1,
            last_row = new_last_row,
            "Appended rows"
        );
        Ok(written)
    }

    async fn read_rows_impl(&self, handle: &TableHandle) -> Result<Vec<Vec<String>>> {
        let rows: Vec<Vec<String>> = sqlx::query_scalar(
            "SELECT cells FROM sheet_rows WHERE sheet_id = $1 ORDER BY row_number",
        )
        .bind(handle.id)
        .fetch_all(&*self.pool)
        .await?;

        Ok(rows)
    }

    async fn health_check_impl(&self) -> Result<()> {
        let _: (i32,) = sqlx::query_as("SELECT 1").fetch_one(&*self.pool).await?;
        Ok(())
    }
}

fn to_row_count(rows: u32) -> Result<i32> {
    i32::try_from(rows).map_err(|_| CoreError::InvalidInput(format!("row count {rows} too large")))
}

impl TableStore for PgTableStore {
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
        Box::pin(self.health_check_impl())
    }
}
