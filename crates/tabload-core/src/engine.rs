//! Per-extract pipeline: parse, resolve, ensure table, pre-check,
//! bulk load.
//!
//! One extract is carried to completion before the next begins. Only
//! an unparseable file or a table that cannot be created at all stops
//! an extract; every other failure degrades and is recorded on the
//! report. The run itself always finishes.

use std::path::Path;

use crate::api::IngestionApi;
use crate::catalogue::Catalogue;
use crate::config::LoaderConfig;
use crate::error::CoreError;
use crate::load::{BulkLoader, LoadResult};
use crate::reader;
use crate::schema::{self, TableSchema};

/// Final state of one extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    /// All chunks landed.
    Loaded,
    /// Some chunks exhausted their retries.
    Partial,
    /// Table was already populated.
    Skipped,
}

/// What happened to one extract, for the run summary and the log.
#[derive(Debug)]
pub struct ExtractReport {
    pub file_name: String,
    pub table: String,
    pub rows_read: usize,
    pub columns: usize,
    pub result: LoadResult,
}

impl ExtractReport {
    pub fn status(&self) -> ReportStatus {
        if self.result.skipped {
            ReportStatus::Skipped
        } else if self.result.is_complete() {
            ReportStatus::Loaded
        } else {
            ReportStatus::Partial
        }
    }
}

/// Drives the full pipeline for one extract at a time against a
/// single ingestion client and a read-only catalogue.
pub struct Engine<'a> {
    client: &'a dyn IngestionApi,
    catalogue: &'a Catalogue,
    config: LoaderConfig,
}

impl<'a> Engine<'a> {
    pub fn new(client: &'a dyn IngestionApi, catalogue: &'a Catalogue, config: LoaderConfig) -> Self {
        Self { client, catalogue, config }
    }

    /// Process one raw extract end to end.
    ///
    /// Errors out only with `ParseFailure` (skip this file) or
    /// `CreateTableFailed` (not even a minimal table could be
    /// created). Partial batch failures come back inside the report.
    pub async fn process_extract(
        &self,
        bytes: &[u8],
        file_name: &str,
        period: Option<&str>,
    ) -> Result<ExtractReport, CoreError> {
        let extract = reader::parse(bytes, file_name)?;

        let stem = Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name);
        let table_id = schema::table_identifier(stem, period);

        let table_schema = schema::resolve(&extract, self.catalogue, &table_id);
        self.ensure_table(&table_schema).await?;

        let existing = match self.client.row_count(&table_id).await {
            Ok(count) => count,
            Err(err) => {
                log::warn!(
                    "could not check row count for {}: {}; assuming empty",
                    table_id,
                    err
                );
                0
            }
        };

        let mut loader = BulkLoader::from_config(&self.config);
        let result = loader.load(&table_schema, &extract, existing, self.client).await;

        Ok(ExtractReport {
            file_name: file_name.to_string(),
            table: table_id,
            rows_read: extract.row_count(),
            columns: extract.column_count(),
            result,
        })
    }

    /// Create the table if absent. A rejected full statement degrades
    /// to a minimal single-column table plus one ALTER per column,
    /// accepting partial column loss over total failure.
    async fn ensure_table(&self, table_schema: &TableSchema) -> Result<(), CoreError> {
        match self.client.table_exists(&table_schema.table).await {
            Ok(true) => {
                log::info!("table {} already exists", table_schema.table);
                return Ok(());
            }
            Ok(false) => {}
            Err(err) => {
                log::warn!(
                    "existence check for {} failed: {}; attempting creation anyway",
                    table_schema.table,
                    err
                );
            }
        }

        match self.client.execute_ddl(&table_schema.create_sql()).await {
            Ok(()) => {
                log::info!("created table {}", table_schema.table);
                return Ok(());
            }
            Err(err) => {
                log::error!(
                    "failed to create table {}: {}; falling back to minimal table",
                    table_schema.table,
                    err
                );
            }
        }

        self.client
            .execute_ddl(&table_schema.minimal_create_sql())
            .await
            .map_err(|err| CoreError::CreateTableFailed {
                table: table_schema.table.clone(),
                reason: err.to_string(),
            })?;

        let mut added = 0usize;
        let mut failed = 0usize;
        for plan in &table_schema.columns {
            match self.client.execute_ddl(&table_schema.add_column_sql(plan)).await {
                Ok(()) => added += 1,
                Err(err) => {
                    failed += 1;
                    log::warn!(
                        "failed to add column {} to {}: {}",
                        plan.name,
                        table_schema.table,
                        err
                    );
                }
            }
        }
        log::info!(
            "added {} columns to {} ({} failed)",
            added,
            table_schema.table,
            failed
        );
        Ok(())
    }
}
