//! SQLite-backed [`TrackingStore`].

use chrono::{DateTime, Utc};
use diesel::{dsl::max, prelude::*};
use tracing::{debug, warn};

use crate::{
    db::connection::connect_sqlite,
    error::{Result, TrackerError},
    record::{PipelineStatus, RecordUpdate, TrackingRecord},
    schema::pipeline_run_tracking::dsl as prt,
    store::{
        RecordFilter, TrackingStore,
        models::{NewTrackingRow, TrackingChangeset, TrackingRow},
    },
    tz,
};

/// Rows written per INSERT statement unless configured otherwise.
pub const DEFAULT_INSERT_BATCH_SIZE: usize = 500;

/// Repository for tracking records in a SQLite database.
pub struct SqliteTrackingStore {
    conn: SqliteConnection,
    insert_batch_size: usize,
}

impl SqliteTrackingStore {
    /// Wraps an open connection. The schema must already be migrated.
    pub fn new(conn: SqliteConnection) -> Self {
        Self {
            conn,
            insert_batch_size: DEFAULT_INSERT_BATCH_SIZE,
        }
    }

    /// Opens `database_url` with the usual PRAGMAs applied.
    pub fn open(database_url: &str) -> Result<Self> {
        connect_sqlite(database_url).map(Self::new)
    }

    /// Caps each INSERT at `size` rows (at least one).
    pub fn with_insert_batch_size(mut self, size: usize) -> Self {
        self.insert_batch_size = size.max(1);
        self
    }

    /// The underlying connection, e.g. for running migrations.
    pub fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }

    fn max_window_end(
        &mut self,
        operation: &'static str,
        pipeline_name: &str,
        config_name: &str,
        status: Option<PipelineStatus>,
    ) -> Result<Option<DateTime<Utc>>> {
        let mut query = prt::pipeline_run_tracking
            .filter(prt::pipeline_name.eq(pipeline_name))
            .filter(prt::config_name.eq(config_name))
            .select(max(prt::query_window_end))
            .into_boxed();
        if let Some(status) = status {
            query = query.filter(prt::pipeline_status.eq(status.as_str()));
        }

        // Every stored instant is UTC millisecond text, so MAX() on text is MAX() on time.
        let latest: Option<String> = query
            .get_result(&mut self.conn)
            .map_err(|e| TrackerError::store_query(operation, e))?;
        latest.as_deref().map(tz::parse_rfc3339_utc).transpose()
    }
}

impl TrackingStore for SqliteTrackingStore {
    fn fetch_max_window_end(
        &mut self,
        pipeline_name: &str,
        config_name: &str,
    ) -> Result<Option<DateTime<Utc>>> {
        self.max_window_end("fetch_max_window_end", pipeline_name, config_name, None)
    }

    fn insert_many(&mut self, records: &[TrackingRecord]) -> Result<usize> {
        let rows = records
            .iter()
            .map(NewTrackingRow::from_record)
            .collect::<Result<Vec<_>>>()?;

        let mut inserted = 0usize;
        for batch in rows.chunks(self.insert_batch_size) {
            match diesel::insert_into(prt::pipeline_run_tracking)
                .values(batch)
                .execute(&mut self.conn)
            {
                Ok(n) => {
                    inserted += n;
                    debug!(batch = batch.len(), inserted, "inserted tracking batch");
                }
                Err(e) => {
                    warn!(inserted, error = %e, "tracking insert failed part-way");
                    return Err(TrackerError::StoreQuery {
                        operation: "insert_many",
                        message: e.to_string(),
                        inserted_count: inserted,
                    });
                }
            }
        }
        Ok(inserted)
    }

    fn fetch_by_status(
        &mut self,
        status: PipelineStatus,
        filter: &RecordFilter,
        limit: usize,
    ) -> Result<Vec<TrackingRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut query = prt::pipeline_run_tracking
            .select(TrackingRow::as_select())
            .filter(prt::pipeline_status.eq(status.as_str()))
            .into_boxed();
        if let Some(name) = filter.pipeline_name.as_deref() {
            query = query.filter(prt::pipeline_name.eq(name));
        }
        if let Some(name) = filter.config_name.as_deref() {
            query = query.filter(prt::config_name.eq(name));
        }

        let rows: Vec<TrackingRow> = query
            .order((prt::query_window_start.asc(), prt::tracking_id.asc()))
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .load(&mut self.conn)
            .map_err(|e| TrackerError::store_query("fetch_by_status", e))?;

        rows.into_iter().map(TrackingRecord::try_from).collect()
    }

    fn update_fields(&mut self, tracking_id: i64, update: &RecordUpdate) -> Result<usize> {
        let changes = TrackingChangeset::from_update(update)?;
        diesel::update(prt::pipeline_run_tracking.find(tracking_id))
            .set(&changes)
            .execute(&mut self.conn)
            .map_err(|e| TrackerError::store_query("update_fields", e))
    }

    fn fetch_by_tracking_id(&mut self, tracking_id: i64) -> Result<Option<TrackingRecord>> {
        prt::pipeline_run_tracking
            .find(tracking_id)
            .select(TrackingRow::as_select())
            .first(&mut self.conn)
            .optional()
            .map_err(|e| TrackerError::store_query("fetch_by_tracking_id", e))?
            .map(TrackingRecord::try_from)
            .transpose()
    }

    fn fetch_last_completed_window_end(
        &mut self,
        pipeline_name: &str,
        config_name: &str,
    ) -> Result<Option<DateTime<Utc>>> {
        self.max_window_end(
            "fetch_last_completed_window_end",
            pipeline_name,
            config_name,
            Some(PipelineStatus::Completed),
        )
    }
}
