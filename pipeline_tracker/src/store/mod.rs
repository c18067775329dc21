//! Tracking store abstraction.
//!
//! [`TrackingStore`] is the only shared mutable resource of the tracker. The
//! orchestrators depend on the trait; [`SqliteTrackingStore`] is the shipped
//! implementation.

use chrono::{DateTime, Utc};

use crate::{
    error::Result,
    record::{PipelineStatus, RecordUpdate, TrackingRecord},
};

pub mod models;
pub mod sqlite;

pub use sqlite::SqliteTrackingStore;

/// Optional pipeline/config narrowing for status reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Only rows of this pipeline.
    pub pipeline_name: Option<String>,
    /// Only rows of this configuration.
    pub config_name: Option<String>,
}

impl RecordFilter {
    /// Filter on both names.
    pub fn pair(pipeline_name: impl Into<String>, config_name: impl Into<String>) -> Self {
        Self {
            pipeline_name: Some(pipeline_name.into()),
            config_name: Some(config_name.into()),
        }
    }

    /// `true` when `record` passes this filter.
    pub fn matches(&self, record: &TrackingRecord) -> bool {
        self.pipeline_name
            .as_deref()
            .is_none_or(|name| name == record.pipeline_name)
            && self
                .config_name
                .as_deref()
                .is_none_or(|name| name == record.config_name)
    }
}

/// Persistence contract for tracking records.
///
/// Reads must observe every insert committed before them. Apart from that
/// each call is atomic on its own; there are no cross-call transactions.
pub trait TrackingStore {
    /// Latest `query_window_end` for the pair across every status, or `None`
    /// when the pair has no rows.
    fn fetch_max_window_end(
        &mut self,
        pipeline_name: &str,
        config_name: &str,
    ) -> Result<Option<DateTime<Utc>>>;

    /// Persists `records` in order and returns how many were written.
    ///
    /// On failure the error is `STORE_QUERY_ERROR` and its `inserted_count`
    /// tells how many rows landed before the failing write.
    fn insert_many(&mut self, records: &[TrackingRecord]) -> Result<usize>;

    /// Up to `limit` records in `status`, oldest `query_window_start` first.
    fn fetch_by_status(
        &mut self,
        status: PipelineStatus,
        filter: &RecordFilter,
        limit: usize,
    ) -> Result<Vec<TrackingRecord>>;

    /// Applies the set fields of `update` to one record and stamps
    /// `updated_at`. Returns the number of rows changed (0 for unknown ids).
    fn update_fields(&mut self, tracking_id: i64, update: &RecordUpdate) -> Result<usize>;

    /// A single record by key.
    fn fetch_by_tracking_id(&mut self, tracking_id: i64) -> Result<Option<TrackingRecord>>;

    /// Latest `query_window_end` among COMPLETED rows of the pair.
    fn fetch_last_completed_window_end(
        &mut self,
        pipeline_name: &str,
        config_name: &str,
    ) -> Result<Option<DateTime<Utc>>>;
}
