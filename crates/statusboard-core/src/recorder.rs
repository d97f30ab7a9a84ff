//! Records status reports into the status table.
//!
//! Authorizes the report against the shared secret, makes sure the
//! destination table exists, and appends one row per mod in a single write.
//! Nothing is written when authorization fails.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::{
    error::StatusError,
    models::{StatusAck, StatusReport, StatusRow, TableLayout},
    secret::{token_matches, SecretProvider},
    storage::TableStore,
};

/// Applies status reports to a table store.
pub struct StatusRecorder {
    store: Arc<dyn TableStore>,
    secrets: Arc<dyn SecretProvider>,
    layout: TableLayout,
}

impl StatusRecorder {
    /// Creates a recorder writing to the table described by `layout`.
    pub fn new(
        store: Arc<dyn TableStore>,
        secrets: Arc<dyn SecretProvider>,
        layout: TableLayout,
    ) -> Self {
        Self { store, secrets, layout }
    }

    /// The underlying table store.
    pub fn store(&self) -> &Arc<dyn TableStore> {
        &self.store
    }

    /// Checks the report's token against the configured secret.
    ///
    /// # Errors
    ///
    /// Returns `StatusError::Unauthorized` on a mismatch and
    /// `StatusError::SecretUnavailable` if the secret cannot be read.
    pub async fn authorize(&self, report: &StatusReport) -> Result<(), StatusError> {
        let secret = self
            .secrets
            .secret_token()
            .await
            .map_err(|e| StatusError::SecretUnavailable(e.to_string()))?;

        if secret.is_none() {
            debug!("No shared secret configured, skipping token check");
        }

        if token_matches(secret.as_ref(), report.token_str()) {
            Ok(())
        } else {
            warn!(token_present = report.token.is_some(), "Rejected report with bad token");
            Err(StatusError::Unauthorized)
        }
    }

    /// Authorizes the report and appends its rows to the status table.
    ///
    /// The table is created with its header if missing. Rows are appended as
    /// one block; an empty `mods` mapping writes nothing and still succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StatusError::Unauthorized` without touching the store when
    /// the token does not match, and `StatusError::Storage` when the store
    /// fails.
    #[instrument(
        name = "record_status",
        skip(self, report),
        fields(table = %self.layout.name, mods = report.mod_count())
    )]
    pub async fn record(&self, report: &StatusReport) -> Result<StatusAck, StatusError> {
        self.authorize(report).await?;

        let handle = self.store.get_or_create(&self.layout).await?;
        if handle.created {
            info!(table = %handle.name, "Created status table with header row");
        }

        let rows: Vec<Vec<String>> = report.rows().into_iter().map(StatusRow::into_cells).collect();
        if rows.is_empty() {
            debug!("Report has no mods, nothing to append");
            return Ok(StatusAck::written(0));
        }

        let written = self.store.append_rows(&handle, rows).await?;
        info!(written, "Appended status rows");

        Ok(StatusAck::written(written))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        secret::{SecretToken, StaticSecret},
        storage::memory::MemoryTableStore,
    };

    fn recorder(store: &MemoryTableStore, secret: Option<&str>) -> StatusRecorder {
        StatusRecorder::new(
            Arc::new(store.clone()),
            Arc::new(StaticSecret::new(secret.map(SecretToken::new))),
            TableLayout::default(),
        )
    }

    fn report(json: &str) -> StatusReport {
        StatusReport::from_slice(json.as_bytes()).unwrap()
    }

    #[tokio::test]
    async fn example_report_is_recorded() {
        let store = MemoryTableStore::new();
        let recorder = recorder(&store, Some("abc"));

        let ack = recorder
            .record(&report(
                r#"{"token":"abc","timestamp":"2024-01-01T00:00:00Z","mods":{"mod1":{"status":"OK","reason":" none "}}}"#,
            ))
            .await
            .unwrap();

        assert_eq!(ack, StatusAck { ok: true, written: 1 });
        let table = store.table("Status").await.unwrap();
        assert_eq!(table.data_rows(), &[vec![
            "2024-01-01T00:00:00Z".to_string(),
            "mod1".to_string(),
            "OK".to_string(),
            "none".to_string()
        ]]);
    }

    #[tokio::test]
    async fn unauthorized_report_touches_nothing() {
        let store = MemoryTableStore::new();
        let recorder = recorder(&store, Some("abc"));

        let err = recorder
            .record(&report(r#"{"token":"nope","timestamp":"t","mods":{"m":{}}}"#))
            .await
            .unwrap_err();

        assert!(matches!(err, StatusError::Unauthorized));
        assert_eq!(store.table_count().await, 0);
    }

    #[tokio::test]
    async fn empty_mods_still_creates_table() {
        let store = MemoryTableStore::new();
        let recorder = recorder(&store, None);

        let ack = recorder.record(&report(r#"{"timestamp":"t"}"#)).await.unwrap();

        assert_eq!(ack.written, 0);
        let table = store.table("Status").await.unwrap();
        assert_eq!(table.rows.len(), 1);
        assert!(table.data_rows().is_empty());
    }

    #[tokio::test]
    async fn storage_failures_propagate() {
        let store = MemoryTableStore::new();
        store.fail_with("disk on fire").await;
        let recorder = recorder(&store, None);

        let err = recorder.record(&report(r#"{"mods":{"m":{}}}"#)).await.unwrap_err();

        assert_eq!(err.code(), "E3002");
        assert!(err.to_string().contains("disk on fire"));
    }
}
