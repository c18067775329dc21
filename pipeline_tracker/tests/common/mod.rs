#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use diesel::QueryableByName;
use diesel::prelude::*;
use diesel::sql_types::{Integer, Text};
use pipeline_tracker::{
    PipelineSettings, RecordFilter, RecordUpdate, Result, SqliteTrackingStore, TrackerError,
    TrackingRecord, TrackingStore,
    config::PipelineConfig,
    db::{connection, migrate},
    record::PipelineStatus,
};
use std::path::PathBuf;
use tempfile::TempDir;

#[derive(QueryableByName)]
struct JournalMode {
    #[diesel(sql_type = Text)]
    journal_mode: String,
}
#[derive(QueryableByName)]
struct ForeignKeys {
    #[diesel(sql_type = Integer)]
    foreign_keys: i32,
}
#[derive(QueryableByName)]
struct BusyTimeout {
    #[diesel(sql_type = Integer, column_name = "timeout")]
    busy_timeout: i32,
}

pub struct TestDb {
    _dir: TempDir,    // keep alive for the life of the test
    pub path: String, // <tmpdir>/test.db
}

pub fn setup_db() -> (TestDb, SqliteTrackingStore) {
    let dir = TempDir::new().expect("tempdir");
    let mut p = PathBuf::from(dir.path());
    p.push("test.db");
    let path = p.to_string_lossy().to_string();

    migrate::run_sqlite(&path).expect("migrations");

    let conn = connection::connect_sqlite(&path).expect("connect");
    (TestDb { _dir: dir, path }, SqliteTrackingStore::new(conn))
}

pub fn assert_sqlite_pragmas(conn: &mut SqliteConnection) {
    use diesel::sql_query;

    let jm: JournalMode = sql_query("PRAGMA journal_mode;").get_result(conn).unwrap();
    assert_eq!(jm.journal_mode.to_lowercase(), "wal"); // WAL is persistent per DB file

    let fk: ForeignKeys = sql_query("PRAGMA foreign_keys;").get_result(conn).unwrap();
    assert_eq!(fk.foreign_keys, 1);

    let bt: BusyTimeout = sql_query("PRAGMA busy_timeout;").get_result(conn).unwrap();
    assert_eq!(bt.busy_timeout, 5000);
}

pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
}

/// Hourly UTC pipeline with no freshness hold-back.
pub fn hourly_settings(pipeline: &str, config: &str) -> PipelineSettings {
    settings(pipeline, config, "UTC", "1h", "0h", 10)
}

pub fn settings(
    pipeline: &str,
    config: &str,
    timezone: &str,
    interval: &str,
    freshness: &str,
    max_pending: usize,
) -> PipelineSettings {
    PipelineConfig {
        pipeline_name: Some(pipeline.into()),
        config_name: Some(config.into()),
        timezone: Some(timezone.into()),
        query_interval_window: Some(interval.into()),
        data_freshness_block_window: Some(freshness.into()),
        max_pending_records: Some(max_pending),
        ..PipelineConfig::default()
    }
    .resolve()
    .expect("valid test settings")
}

/// Seeds the pair with a single window `[end - interval, end)`.
pub fn seed_last_end(
    store: &mut impl TrackingStore,
    settings: &PipelineSettings,
    end: DateTime<Utc>,
) {
    let start = end - settings.query_interval_window.as_delta();
    pipeline_tracker::bootstrap_first_window(store, settings, start)
        .expect("bootstrap")
        .expect("pair had no history");
}

pub fn all_records(
    store: &mut impl TrackingStore,
    settings: &PipelineSettings,
) -> Vec<TrackingRecord> {
    PipelineStatus::ALL
        .into_iter()
        .flat_map(|status| {
            store
                .fetch_by_status(
                    status,
                    &RecordFilter::pair(&settings.pipeline_name, &settings.config_name),
                    10_000,
                )
                .unwrap()
        })
        .collect()
}

/// Wraps a real store and injects failures.
pub struct FlakyStore<S> {
    pub inner: S,
    /// Fail every `fetch_max_window_end` with a connection error.
    pub fail_max_end: bool,
    /// Fail every `fetch_by_status` with a query error.
    pub fail_fetch: bool,
    /// Persist only this many rows of the next `insert_many`, then fail.
    pub insert_cutoff: Option<usize>,
}

impl<S> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_max_end: false,
            fail_fetch: false,
            insert_cutoff: None,
        }
    }
}

impl<S: TrackingStore> TrackingStore for FlakyStore<S> {
    fn fetch_max_window_end(
        &mut self,
        pipeline_name: &str,
        config_name: &str,
    ) -> Result<Option<DateTime<Utc>>> {
        if self.fail_max_end {
            return Err(TrackerError::StoreConnection("connection refused".into()));
        }
        self.inner.fetch_max_window_end(pipeline_name, config_name)
    }

    fn insert_many(&mut self, records: &[TrackingRecord]) -> Result<usize> {
        match self.insert_cutoff.take() {
            Some(cutoff) if cutoff < records.len() => {
                let inserted_count = self.inner.insert_many(&records[..cutoff])?;
                Err(TrackerError::StoreQuery {
                    operation: "insert_many",
                    message: "connection reset".into(),
                    inserted_count,
                })
            }
            _ => self.inner.insert_many(records),
        }
    }

    fn fetch_by_status(
        &mut self,
        status: PipelineStatus,
        filter: &RecordFilter,
        limit: usize,
    ) -> Result<Vec<TrackingRecord>> {
        if self.fail_fetch {
            return Err(TrackerError::StoreQuery {
                operation: "fetch_by_status",
                message: "disk I/O error".into(),
                inserted_count: 0,
            });
        }
        self.inner.fetch_by_status(status, filter, limit)
    }

    fn update_fields(&mut self, tracking_id: i64, update: &RecordUpdate) -> Result<usize> {
        self.inner.update_fields(tracking_id, update)
    }

    fn fetch_by_tracking_id(&mut self, tracking_id: i64) -> Result<Option<TrackingRecord>> {
        self.inner.fetch_by_tracking_id(tracking_id)
    }

    fn fetch_last_completed_window_end(
        &mut self,
        pipeline_name: &str,
        config_name: &str,
    ) -> Result<Option<DateTime<Utc>>> {
        self.inner
            .fetch_last_completed_window_end(pipeline_name, config_name)
    }
}
