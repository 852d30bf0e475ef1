//! Bulk Loader: chunked, retrying, rate-limited row submission with
//! partial-failure bookkeeping.
//!
//! Loads are idempotent at table granularity only: a table that
//! already reports rows is skipped wholesale. There is no row-level
//! reconciliation, so re-running against a partially loaded table
//! either skips it entirely or double-inserts; a known limitation.

use serde_json::Value;

use crate::api::{IngestionApi, JsonRow};
use crate::config::LoaderConfig;
use crate::error::ApiError;
use crate::extract::{Cell, Extract};
use crate::retry::{BackoffPolicy, RateLimiter};
use crate::schema::{PhysicalType, TableSchema};

/// Text values canonicalized to the explicit absent marker.
const NULL_SENTINELS: &[&str] = &["nan", "NaN", "None"];

/// One chunk that exhausted its attempts. The rest of the extract
/// still loads; the failure is reported, not raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedBatch {
    pub index: usize,
    pub rows: usize,
    pub error: String,
}

/// Outcome of loading one extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadResult {
    pub inserted: usize,
    /// Table was already populated; nothing was submitted.
    pub skipped: bool,
    pub failed_batches: Vec<FailedBatch>,
}

impl LoadResult {
    pub fn is_complete(&self) -> bool {
        self.failed_batches.is_empty()
    }
}

/// Drives chunked submission through an [`IngestionApi`].
pub struct BulkLoader {
    chunk_size: usize,
    backoff: BackoffPolicy,
    limiter: RateLimiter,
}

impl BulkLoader {
    pub fn new(chunk_size: usize, backoff: BackoffPolicy, limiter: RateLimiter) -> Self {
        Self { chunk_size: chunk_size.max(1), backoff, limiter }
    }

    pub fn from_config(config: &LoaderConfig) -> Self {
        Self::new(
            config.chunk_size,
            config.backoff(),
            RateLimiter::per_second(config.requests_per_second),
        )
    }

    /// Load one extract into its table.
    ///
    /// `existing_row_count > 0` short-circuits to a skip with zero
    /// insert calls. Chunks are submitted strictly sequentially; a
    /// chunk that exhausts its attempts is recorded and the next one
    /// is still attempted.
    pub async fn load(
        &mut self,
        schema: &TableSchema,
        extract: &Extract,
        existing_row_count: u64,
        client: &dyn IngestionApi,
    ) -> LoadResult {
        if existing_row_count > 0 {
            log::info!(
                "table {} already has {} rows, skipping insertion",
                schema.table,
                existing_row_count
            );
            return LoadResult { inserted: 0, skipped: true, failed_batches: Vec::new() };
        }

        let rows = normalize_rows(schema, extract);
        let total = rows.len();
        let mut inserted = 0;
        let mut failed_batches = Vec::new();

        for (index, chunk) in rows.chunks(self.chunk_size).enumerate() {
            self.limiter.acquire().await;

            let start_row = index * self.chunk_size + 1;
            let end_row = start_row + chunk.len() - 1;

            match self.submit_chunk(&schema.table, chunk, index, client).await {
                Ok(()) => {
                    inserted += chunk.len();
                    log::info!(
                        "{}: inserted rows {} to {} of {}",
                        schema.table,
                        start_row,
                        end_row,
                        total
                    );
                }
                Err(err) => {
                    log::error!(
                        "{}: chunk {} (rows {} to {}) failed after {} attempts: {}",
                        schema.table,
                        index,
                        start_row,
                        end_row,
                        self.backoff.max_attempts,
                        err
                    );
                    if let Some(first) = chunk.first() {
                        log::error!(
                            "first record of failed chunk {}: {}",
                            index,
                            Value::Object(first.clone())
                        );
                    }
                    failed_batches.push(FailedBatch {
                        index,
                        rows: chunk.len(),
                        error: err.to_string(),
                    });
                }
            }
        }

        LoadResult { inserted, skipped: false, failed_batches }
    }

    async fn submit_chunk(
        &self,
        table: &str,
        chunk: &[JsonRow],
        index: usize,
        client: &dyn IngestionApi,
    ) -> Result<(), ApiError> {
        let mut last_error = ApiError::Transport("no attempt made".to_string());
        for attempt in 1..=self.backoff.max_attempts {
            match client.insert_batch(table, chunk, true).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    if attempt < self.backoff.max_attempts && err.is_retryable() {
                        log::warn!(
                            "{}: retry {}/{} for chunk {} after error: {}",
                            table,
                            attempt,
                            self.backoff.max_attempts,
                            index,
                            err
                        );
                        last_error = err;
                        self.backoff.wait().await;
                    } else {
                        return Err(err);
                    }
                }
            }
        }
        Err(last_error)
    }
}

/// Convert extract rows to submission rows: null/NaN/sentinel values
/// become explicit nulls, TEXT-typed columns are stringified even
/// when the in-memory value is numeric, and keys take the sanitized
/// column identifiers so they match the created table exactly.
pub fn normalize_rows(schema: &TableSchema, extract: &Extract) -> Vec<JsonRow> {
    extract
        .rows
        .iter()
        .map(|row| {
            let mut record = JsonRow::new();
            for (plan, cell) in schema.columns.iter().zip(row.iter()) {
                record.insert(plan.name.clone(), json_value(cell, plan.physical));
            }
            record
        })
        .collect()
}

fn json_value(cell: &Cell, physical: PhysicalType) -> Value {
    let text_target = physical == PhysicalType::Text;
    match cell {
        Cell::Null => Value::Null,
        Cell::Int(v) => {
            if text_target {
                Value::String(v.to_string())
            } else {
                Value::from(*v)
            }
        }
        Cell::Float(v) => {
            if !v.is_finite() {
                return Value::Null;
            }
            if text_target {
                Value::String(v.to_string())
            } else {
                serde_json::Number::from_f64(*v).map(Value::Number).unwrap_or(Value::Null)
            }
        }
        Cell::Timestamp(ts) => Value::String(ts.format("%Y-%m-%dT%H:%M:%S").to_string()),
        Cell::Text(text) => {
            // NUL bytes break the store's JSON handling.
            let cleaned: String = text.chars().filter(|&c| c != '\u{0}').collect();
            let trimmed = cleaned.trim();
            if trimmed.is_empty() || NULL_SENTINELS.contains(&trimmed) {
                Value::Null
            } else {
                Value::String(trimmed.to_string())
            }
        }
    }
}
