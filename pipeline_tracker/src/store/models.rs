//! Insertable/Queryable helper structs for `pipeline_run_tracking`.
//!
//! Rows hold everything as stored text; conversion to and from
//! [`TrackingRecord`] happens here so the repository only moves rows.

use chrono::{NaiveDate, Utc};
use diesel::prelude::*;

use crate::{
    error::{Result, TrackerError},
    record::{PipelineExecutionDetails, PipelineStatus, RecordUpdate, TrackingRecord},
    schema::pipeline_run_tracking,
    tz,
};

const DAY_FORMAT: &str = "%Y-%m-%d";

fn encode_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| TrackerError::store_query("encode_json", e))
}

fn decode_json<T: serde::de::DeserializeOwned>(column: &str, text: &str) -> Result<T> {
    serde_json::from_str(text)
        .map_err(|e| TrackerError::store_query("decode_json", format!("{column}: {e}")))
}

/// A full row as read back from the table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = pipeline_run_tracking, check_for_backend(diesel::sqlite::Sqlite))]
pub struct TrackingRow {
    /// Primary key.
    pub tracking_id: i64,
    /// Pipeline name.
    pub pipeline_name: String,
    /// Configuration name.
    pub config_name: String,
    /// Window start, RFC-3339 UTC.
    pub query_window_start: String,
    /// Window end, RFC-3339 UTC.
    pub query_window_end: String,
    /// Local day of the window start, `YYYY-MM-DD`.
    pub query_window_day: String,
    /// Configured window length text.
    pub query_window_duration: String,
    /// Execution document as JSON.
    pub pipeline_execution_details: String,
    /// Source row count.
    pub source_count: Option<i64>,
    /// Stage counts as JSON.
    pub stage_count: Option<String>,
    /// Target row count.
    pub target_count: Option<i64>,
    /// Status text.
    pub pipeline_status: String,
    /// Insert time, RFC-3339 UTC.
    pub created_at: String,
    /// Last update time, RFC-3339 UTC.
    pub updated_at: String,
}

impl TryFrom<TrackingRow> for TrackingRecord {
    type Error = TrackerError;

    fn try_from(row: TrackingRow) -> Result<Self> {
        let query_window_day = NaiveDate::parse_from_str(&row.query_window_day, DAY_FORMAT)
            .map_err(|e| {
                TrackerError::store_query(
                    "decode_day",
                    format!("bad query_window_day '{}': {e}", row.query_window_day),
                )
            })?;
        let pipeline_status = row
            .pipeline_status
            .parse::<PipelineStatus>()
            .map_err(|e| TrackerError::store_query("decode_status", e))?;
        let stage_count = row
            .stage_count
            .as_deref()
            .map(|text| decode_json("stage_count", text))
            .transpose()?;

        Ok(TrackingRecord {
            tracking_id: Some(row.tracking_id),
            query_window_start: tz::parse_rfc3339(&row.query_window_start)?,
            query_window_end: tz::parse_rfc3339(&row.query_window_end)?,
            query_window_day,
            pipeline_execution_details: decode_json::<PipelineExecutionDetails>(
                "pipeline_execution_details",
                &row.pipeline_execution_details,
            )?,
            source_count: row.source_count,
            stage_count,
            target_count: row.target_count,
            pipeline_status,
            created_at: Some(tz::parse_rfc3339_utc(&row.created_at)?),
            updated_at: Some(tz::parse_rfc3339_utc(&row.updated_at)?),
            pipeline_name: row.pipeline_name,
            config_name: row.config_name,
            query_window_duration: row.query_window_duration,
        })
    }
}

/// Insertable form; the store assigns key and timestamps.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = pipeline_run_tracking, treat_none_as_default_value = false)]
pub(crate) struct NewTrackingRow {
    pub(crate) pipeline_name: String,
    pub(crate) config_name: String,
    pub(crate) query_window_start: String, // RFC3339 UTC
    pub(crate) query_window_end: String,   // RFC3339 UTC
    pub(crate) query_window_day: String,
    pub(crate) query_window_duration: String,
    pub(crate) pipeline_execution_details: String,
    pub(crate) source_count: Option<i64>,
    pub(crate) stage_count: Option<String>,
    pub(crate) target_count: Option<i64>,
    pub(crate) pipeline_status: String,
}

impl NewTrackingRow {
    pub(crate) fn from_record(record: &TrackingRecord) -> Result<Self> {
        Ok(Self {
            pipeline_name: record.pipeline_name.clone(),
            config_name: record.config_name.clone(),
            query_window_start: tz::to_rfc3339_millis(&record.query_window_start),
            query_window_end: tz::to_rfc3339_millis(&record.query_window_end),
            query_window_day: record.query_window_day.format(DAY_FORMAT).to_string(),
            query_window_duration: record.query_window_duration.clone(),
            pipeline_execution_details: encode_json(&record.pipeline_execution_details)?,
            source_count: record.source_count,
            stage_count: record.stage_count.as_ref().map(encode_json).transpose()?,
            target_count: record.target_count,
            pipeline_status: record.pipeline_status.as_str().to_string(),
        })
    }
}

/// Changeset for `update_fields`; `None` columns are left alone.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = pipeline_run_tracking)]
pub(crate) struct TrackingChangeset {
    pub(crate) pipeline_status: Option<String>,
    pub(crate) pipeline_execution_details: Option<String>,
    pub(crate) source_count: Option<Option<i64>>,
    pub(crate) stage_count: Option<Option<String>>,
    pub(crate) target_count: Option<Option<i64>>,
    pub(crate) updated_at: String,
}

impl TrackingChangeset {
    pub(crate) fn from_update(update: &RecordUpdate) -> Result<Self> {
        Ok(Self {
            pipeline_status: update.pipeline_status.map(|s| s.as_str().to_string()),
            pipeline_execution_details: update
                .pipeline_execution_details
                .as_ref()
                .map(encode_json)
                .transpose()?,
            source_count: update.source_count,
            stage_count: update
                .stage_count
                .as_ref()
                .map(|counts| counts.as_ref().map(encode_json).transpose())
                .transpose()?,
            target_count: update.target_count,
            updated_at: tz::to_rfc3339_millis(&Utc::now()),
        })
    }
}
