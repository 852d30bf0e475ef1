//! Collaborator contract for the remote tabular store.
//!
//! The engine only ever talks to the store through this trait; the
//! concrete HTTP client lives in `tabload-link`. Tests drive the
//! engine with in-memory recording fakes.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ApiError;

/// A single row as submitted to the store: flat column-name → scalar
/// map, nulls represented explicitly.
pub type JsonRow = serde_json::Map<String, Value>;

/// Narrow ingestion surface of a REST-style tabular store.
///
/// All calls are time-bounded by the implementation; a call that never
/// returns must not block the engine indefinitely. An empty-body
/// "no content" success is treated identically to a body-bearing one.
#[async_trait]
pub trait IngestionApi: Send + Sync {
    /// Cheap existence probe for a table.
    async fn table_exists(&self, table: &str) -> Result<bool, ApiError>;

    /// Execute a table-definition statement (CREATE TABLE / ALTER
    /// TABLE). Statements submitted through here are idempotent by
    /// construction; the engine never sends destructive DDL.
    async fn execute_ddl(&self, sql: &str) -> Result<(), ApiError>;

    /// Insert one chunk of rows. With `ignore_duplicates`, duplicate
    /// key conflicts within the chunk are not an error.
    async fn insert_batch(
        &self,
        table: &str,
        rows: &[JsonRow],
        ignore_duplicates: bool,
    ) -> Result<(), ApiError>;

    /// Number of rows currently in the table.
    async fn row_count(&self, table: &str) -> Result<u64, ApiError>;
}
