//! Status report payloads, table rows and table layout.
//!
//! A [`StatusReport`] is what a client posts; it projects into one
//! [`StatusRow`] per `mods` entry, in the order the entries appear in the
//! document. A [`TableLayout`] describes the destination table so that a
//! backend can create it with the right header on first use.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::StatusError;

/// Name of the table status rows are appended to unless configured otherwise.
pub const DEFAULT_TABLE_NAME: &str = "Status";

/// Header row of the status table.
pub const STATUS_HEADER: [&str; 4] = ["Timestamp", "Project ID", "Status", "Motivo"];

/// Reported status of a single mod.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModInfo {
    /// Free-form status, e.g. `OK`
    #[serde(default)]
    pub status: Option<String>,
    /// Free-form explanation of the status
    #[serde(default)]
    pub reason: Option<String>,
}

/// Body of a status report request.
///
/// Every field is optional on the wire. `token` is kept as raw JSON so that a
/// non-string token is an authorization failure rather than a parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusReport {
    /// Shared-secret token supplied by the client
    #[serde(default)]
    pub token: Option<serde_json::Value>,
    /// Caller-supplied timestamp, stored verbatim
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Mod id to reported status, in document order
    #[serde(default)]
    pub mods: Option<IndexMap<String, Option<ModInfo>>>,
}

impl StatusReport {
    /// Parses a report from a raw request body.
    ///
    /// # Errors
    ///
    /// Returns `StatusError::InvalidPayload` if the body is not JSON or a
    /// field has the wrong type (for example `mods` given as an array).
    pub fn from_slice(body: &[u8]) -> Result<Self, StatusError> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Returns the token if it was supplied as a JSON string.
    pub fn token_str(&self) -> Option<&str> {
        self.token.as_ref().and_then(serde_json::Value::as_str)
    }

    /// Number of mods in the report.
    pub fn mod_count(&self) -> usize {
        self.mods.as_ref().map_or(0, IndexMap::len)
    }

    /// Projects the report into table rows, one per mod, in document order.
    pub fn rows(&self) -> Vec<StatusRow> {
        let timestamp = self.timestamp.as_deref().unwrap_or_default();

        self.mods
            .iter()
            .flatten()
            .map(|(mod_id, info)| StatusRow::from_entry(timestamp, mod_id, info.as_ref()))
            .collect()
    }
}

/// One appended row: `(Timestamp, Project ID, Status, Motivo)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    /// Timestamp copied from the report
    pub timestamp: String,
    /// The `mods` key
    pub project_id: String,
    /// Trimmed status, empty when missing
    pub status: String,
    /// Trimmed reason, empty when missing
    pub reason: String,
}

impl StatusRow {
    /// Builds a row from one `mods` entry.
    pub fn from_entry(timestamp: &str, mod_id: &str, info: Option<&ModInfo>) -> Self {
        let field = |value: Option<&String>| value.map_or("", |v| v.trim()).to_string();

        Self {
            timestamp: timestamp.to_string(),
            project_id: mod_id.to_string(),
            status: field(info.and_then(|i| i.status.as_ref())),
            reason: field(info.and_then(|i| i.reason.as_ref())),
        }
    }

    /// Converts the row into cells in header order.
    pub fn into_cells(self) -> Vec<String> {
        vec![self.timestamp, self.project_id, self.status, self.reason]
    }
}

/// Acknowledgement returned for an accepted report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusAck {
    /// Always `true`
    pub ok: bool,
    /// Number of rows appended
    pub written: usize,
}

impl StatusAck {
    /// Acknowledges `written` appended rows.
    pub const fn written(written: usize) -> Self {
        Self { ok: true, written }
    }
}

/// Shape of a table as it is created on first use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    /// Table name, unique within the store
    pub name: String,
    /// Header cells written as row 1
    pub header: Vec<String>,
    /// Number of leading rows rendered bold
    pub bold_rows: u32,
    /// Number of leading rows kept visible when scrolling
    pub frozen_rows: u32,
}

impl TableLayout {
    /// Layout of the status table: four-column header, bold and frozen.
    pub fn status(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            header: STATUS_HEADER.iter().map(ToString::to_string).collect(),
            bold_rows: 1,
            frozen_rows: 1,
        }
    }
}

impl Default for TableLayout {
    fn default() -> Self {
        Self::status(DEFAULT_TABLE_NAME)
    }
}

/// Reference to a table obtained from `TableStore::get_or_create`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableHandle {
    /// Backend-assigned identifier
    pub id: i64,
    /// Table name
    pub name: String,
    /// Whether the lookup created the table
    pub created: bool,
}
