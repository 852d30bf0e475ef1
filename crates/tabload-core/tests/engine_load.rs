//! End-to-end engine tests against a recording in-memory store.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tabload_core::{
    ApiError, Catalogue, CoreError, Engine, IngestionApi, JsonRow, LoaderConfig, ReportStatus,
};

/// Scriptable fake of the remote store. DDL and insert outcomes are
/// popped from queues (empty queue means success), every call is
/// recorded for assertions.
#[derive(Default)]
struct FakeStore {
    table_exists: bool,
    existing_rows: u64,
    row_count_fails: bool,
    ddl_outcomes: Mutex<VecDeque<bool>>,
    insert_outcomes: Mutex<VecDeque<bool>>,
    ddl_log: Mutex<Vec<String>>,
    insert_log: Mutex<Vec<usize>>,
}

impl FakeStore {
    fn with_insert_outcomes(outcomes: &[bool]) -> Self {
        Self {
            insert_outcomes: Mutex::new(outcomes.iter().copied().collect()),
            ..Self::default()
        }
    }

    fn ddl_statements(&self) -> Vec<String> {
        self.ddl_log.lock().unwrap().clone()
    }

    fn insert_calls(&self) -> Vec<usize> {
        self.insert_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl IngestionApi for FakeStore {
    async fn table_exists(&self, _table: &str) -> Result<bool, ApiError> {
        Ok(self.table_exists)
    }

    async fn execute_ddl(&self, sql: &str) -> Result<(), ApiError> {
        self.ddl_log.lock().unwrap().push(sql.to_string());
        let ok = self.ddl_outcomes.lock().unwrap().pop_front().unwrap_or(true);
        if ok {
            Ok(())
        } else {
            Err(ApiError::Status { status: 400, body: "ddl rejected".to_string() })
        }
    }

    async fn insert_batch(
        &self,
        _table: &str,
        rows: &[JsonRow],
        _ignore_duplicates: bool,
    ) -> Result<(), ApiError> {
        self.insert_log.lock().unwrap().push(rows.len());
        let ok = self.insert_outcomes.lock().unwrap().pop_front().unwrap_or(true);
        if ok {
            Ok(())
        } else {
            Err(ApiError::Status { status: 500, body: "insert rejected".to_string() })
        }
    }

    async fn row_count(&self, _table: &str) -> Result<u64, ApiError> {
        if self.row_count_fails {
            Err(ApiError::Timeout)
        } else {
            Ok(self.existing_rows)
        }
    }
}

fn test_config() -> LoaderConfig {
    LoaderConfig {
        chunk_size: 2,
        requests_per_second: 100_000.0,
        retry_delay_ms: 0,
        ..LoaderConfig::default()
    }
}

const FIVE_ROWS: &[u8] =
    b"cu_number,name,total_assets\n\
      101,Alpha,4000000000\n\
      102,Beta,200\n\
      103,Gamma,300\n\
      104,Delta,400\n\
      105,Epsilon,500\n";

#[tokio::test]
async fn test_end_to_end_large_integers_widen_and_all_rows_land() {
    let store = FakeStore::default();
    let catalogue = Catalogue::empty();
    let engine = Engine::new(&store, &catalogue, test_config());

    let report = engine
        .process_extract(FIVE_ROWS, "fs220a.txt", Some("2024_03"))
        .await
        .expect("process extract");

    assert_eq!(report.table, "fs220a_2024_03");
    assert_eq!(report.status(), ReportStatus::Loaded);
    assert_eq!(report.result.inserted, 5);
    assert!(report.result.failed_batches.is_empty());

    let ddl = store.ddl_statements();
    assert_eq!(ddl.len(), 1);
    assert!(ddl[0].starts_with("CREATE TABLE IF NOT EXISTS fs220a_2024_03"));
    assert!(ddl[0].contains("cu_number INTEGER"));
    assert!(ddl[0].contains("name TEXT"));
    assert!(ddl[0].contains("total_assets NUMERIC"));

    // 5 rows at chunk size 2: three sequential insert calls.
    assert_eq!(store.insert_calls(), vec![2, 2, 1]);
}

#[tokio::test]
async fn test_populated_table_is_skipped_with_zero_insert_calls() {
    let store = FakeStore { existing_rows: 10, ..FakeStore::default() };
    let catalogue = Catalogue::empty();
    let engine = Engine::new(&store, &catalogue, test_config());

    let report = engine
        .process_extract(FIVE_ROWS, "fs220a.txt", Some("2024_03"))
        .await
        .expect("process extract");

    assert_eq!(report.status(), ReportStatus::Skipped);
    assert!(report.result.skipped);
    assert_eq!(report.result.inserted, 0);
    assert!(store.insert_calls().is_empty());
}

#[tokio::test]
async fn test_exhausted_chunk_is_recorded_and_next_chunk_still_runs() {
    // Chunk 0 succeeds; chunk 1 fails all three attempts; chunk 2
    // must still be attempted and succeed.
    let store = FakeStore::with_insert_outcomes(&[true, false, false, false, true]);
    let catalogue = Catalogue::empty();
    let engine = Engine::new(&store, &catalogue, test_config());

    let report = engine
        .process_extract(FIVE_ROWS, "fs220a.txt", Some("2024_03"))
        .await
        .expect("process extract");

    assert_eq!(report.status(), ReportStatus::Partial);
    assert_eq!(report.result.inserted, 3);
    assert_eq!(report.result.failed_batches.len(), 1);
    assert_eq!(report.result.failed_batches[0].index, 1);
    assert_eq!(report.result.failed_batches[0].rows, 2);
    // 1 + 3 + 1 insert calls in strict order.
    assert_eq!(store.insert_calls(), vec![2, 2, 2, 2, 1]);
}

#[tokio::test]
async fn test_rejected_ddl_degrades_to_minimal_table_plus_alters() {
    let store = FakeStore {
        // Full CREATE rejected; minimal CREATE and the ALTERs succeed.
        ddl_outcomes: Mutex::new(VecDeque::from(vec![false])),
        ..FakeStore::default()
    };
    let catalogue = Catalogue::empty();
    let engine = Engine::new(&store, &catalogue, test_config());

    let report = engine
        .process_extract(FIVE_ROWS, "fs220a.txt", Some("2024_03"))
        .await
        .expect("process extract");

    assert_eq!(report.status(), ReportStatus::Loaded);
    let ddl = store.ddl_statements();
    // full create, minimal create, one ALTER per column
    assert_eq!(ddl.len(), 2 + 3);
    assert_eq!(
        ddl[1],
        "CREATE TABLE IF NOT EXISTS fs220a_2024_03 (id SERIAL PRIMARY KEY);"
    );
    assert!(ddl[2..].iter().all(|sql| sql.contains("ADD COLUMN IF NOT EXISTS")));
}

#[tokio::test]
async fn test_minimal_table_rejection_is_create_table_failed() {
    let store = FakeStore {
        ddl_outcomes: Mutex::new(VecDeque::from(vec![false, false])),
        ..FakeStore::default()
    };
    let catalogue = Catalogue::empty();
    let engine = Engine::new(&store, &catalogue, test_config());

    let err = engine
        .process_extract(FIVE_ROWS, "fs220a.txt", Some("2024_03"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::CreateTableFailed { .. }));
    assert!(store.insert_calls().is_empty());
}

#[tokio::test]
async fn test_unreadable_extract_is_a_parse_failure() {
    let store = FakeStore::default();
    let catalogue = Catalogue::empty();
    let engine = Engine::new(&store, &catalogue, test_config());

    let err = engine
        .process_extract(b"no structure here\n", "junk.txt", None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ParseFailure { .. }));
    assert!(store.ddl_statements().is_empty());
}

#[tokio::test]
async fn test_row_count_failure_assumes_empty_and_loads() {
    let store = FakeStore { row_count_fails: true, ..FakeStore::default() };
    let catalogue = Catalogue::empty();
    let engine = Engine::new(&store, &catalogue, test_config());

    let report = engine
        .process_extract(FIVE_ROWS, "fs220a.txt", Some("2024_03"))
        .await
        .expect("process extract");
    assert_eq!(report.status(), ReportStatus::Loaded);
    assert_eq!(report.result.inserted, 5);
}

#[tokio::test]
async fn test_existing_table_gets_no_ddl() {
    let store = FakeStore { table_exists: true, ..FakeStore::default() };
    let catalogue = Catalogue::empty();
    let engine = Engine::new(&store, &catalogue, test_config());

    let report = engine
        .process_extract(FIVE_ROWS, "fs220a.txt", Some("2024_03"))
        .await
        .expect("process extract");
    assert_eq!(report.status(), ReportStatus::Loaded);
    assert!(store.ddl_statements().is_empty());
}
