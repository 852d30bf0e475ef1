//! # tabload-core: schema inference and resilient bulk load
//!
//! Turns raw delimited extracts of unknown encoding and separator
//! into typed tables in a remote tabular store, without corrupting or
//! rejecting data on the way:
//!
//! - **reader** detects encoding/delimiter and infers a value kind
//!   per column;
//! - **catalogue** merges externally supplied column-type description
//!   files, with underscore/hyphen name normalization;
//! - **schema** decides one physical type per column from an ordered
//!   rule chain (join-key pins, high-risk keywords, table-class
//!   overrides, catalogue lookups, statistical fallback) and emits
//!   idempotent DDL;
//! - **load** pushes rows in small retried chunks, pacing itself
//!   under the store's rate limit and bookkeeping partial failures;
//! - **engine** runs the pipeline for one extract at a time.
//!
//! The store itself is only ever reached through the [`api::IngestionApi`]
//! trait; the HTTP implementation lives in `tabload-link`.
//!
//! The typing bias is deliberately conservative: when signals
//! conflict, columns widen (NUMERIC, TEXT) rather than risk a
//! rejected load. Exact numeric fidelity is a non-goal.

pub mod api;
pub mod catalogue;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod load;
pub mod reader;
pub mod retry;
pub mod schema;

pub use api::{IngestionApi, JsonRow};
pub use catalogue::Catalogue;
pub use config::LoaderConfig;
pub use engine::{Engine, ExtractReport, ReportStatus};
pub use error::{ApiError, ConfigError, CoreError};
pub use extract::{Cell, Extract, ValueKind};
pub use load::{BulkLoader, FailedBatch, LoadResult};
pub use retry::{BackoffPolicy, RateLimiter};
pub use schema::{ColumnPlan, PhysicalType, PlanSource, TableSchema};
