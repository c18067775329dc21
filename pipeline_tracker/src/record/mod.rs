//! Tracking record data model.
//!
//! One [`TrackingRecord`] describes one pipeline run over one query window. The
//! `(pipeline_name, config_name, query_window_start)` triple is unique in the
//! store; everything else is lifecycle state owned by whoever runs the pipeline.

use std::{fmt, str::FromStr};

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, TrackerError},
    window::TimeWindow,
};

pub mod builder;

pub use builder::RecordBuilder;

/// Lifecycle state of a tracked window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStatus {
    /// Created by gap fill, not yet picked up.
    Pending,
    /// Claimed by a worker.
    Running,
    /// Finished successfully.
    Completed,
    /// Failed; may be retried.
    Failed,
    /// Failed and will not be retried.
    FailedPermanently,
}

impl PipelineStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [PipelineStatus; 5] = [
        PipelineStatus::Pending,
        PipelineStatus::Running,
        PipelineStatus::Completed,
        PipelineStatus::Failed,
        PipelineStatus::FailedPermanently,
    ];

    /// Text stored in the `pipeline_status` column.
    pub const fn as_str(self) -> &'static str {
        match self {
            PipelineStatus::Pending => "PENDING",
            PipelineStatus::Running => "RUNNING",
            PipelineStatus::Completed => "COMPLETED",
            PipelineStatus::Failed => "FAILED",
            PipelineStatus::FailedPermanently => "FAILED_PERMANENTLY",
        }
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineStatus {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_uppercase();
        PipelineStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| {
                TrackerError::InvalidConfiguration(format!("unknown pipeline status '{s}'"))
            })
    }
}

/// A named stage of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelinePhase {
    /// Pre-run validation.
    PreValidation,
    /// Copy from the source system into staging.
    SourceToStageTransfer,
    /// Copy from staging into the target.
    StageToTargetTransfer,
    /// Compare source and staging counts.
    SourceVsStageAudit,
    /// Compare source and target counts.
    SourceVsTargetAudit,
    /// Clear staging artifacts.
    StageCleaning,
    /// Tidy the target after load.
    TargetCleaning,
}

impl PipelinePhase {
    /// Canonical phase order of a fresh record.
    pub const CANONICAL: [PipelinePhase; 7] = [
        PipelinePhase::PreValidation,
        PipelinePhase::SourceToStageTransfer,
        PipelinePhase::StageToTargetTransfer,
        PipelinePhase::SourceVsStageAudit,
        PipelinePhase::SourceVsTargetAudit,
        PipelinePhase::StageCleaning,
        PipelinePhase::TargetCleaning,
    ];

    /// Skip list used when a pipeline does not configure one.
    pub const DEFAULT_SKIPPED: [PipelinePhase; 1] = [PipelinePhase::SourceVsStageAudit];

    /// Upper-snake name as it appears in config and stored JSON.
    pub const fn as_str(self) -> &'static str {
        match self {
            PipelinePhase::PreValidation => "PRE_VALIDATION",
            PipelinePhase::SourceToStageTransfer => "SOURCE_TO_STAGE_TRANSFER",
            PipelinePhase::StageToTargetTransfer => "STAGE_TO_TARGET_TRANSFER",
            PipelinePhase::SourceVsStageAudit => "SOURCE_VS_STAGE_AUDIT",
            PipelinePhase::SourceVsTargetAudit => "SOURCE_VS_TARGET_AUDIT",
            PipelinePhase::StageCleaning => "STAGE_CLEANING",
            PipelinePhase::TargetCleaning => "TARGET_CLEANING",
        }
    }
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelinePhase {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_uppercase();
        PipelinePhase::CANONICAL
            .into_iter()
            .find(|phase| phase.as_str() == wanted)
            .ok_or_else(|| {
                TrackerError::InvalidConfiguration(format!("unknown pipeline phase '{s}'"))
            })
    }
}

/// Per-run execution document stored as JSON next to each record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineExecutionDetails {
    /// When the run started.
    pub pipeline_started_at: Option<DateTime<FixedOffset>>,
    /// When the run ended.
    pub pipeline_ended_at: Option<DateTime<FixedOffset>>,
    /// Deadline after which a RUNNING record counts as stuck.
    pub pipeline_max_run_threshold: Option<DateTime<FixedOffset>>,
    /// Status as last reported by the run itself.
    pub pipeline_status: Option<PipelineStatus>,
    /// Phase currently executing.
    pub running_phase: Option<PipelinePhase>,
    /// Phases still to run.
    pub pending_phases: Vec<PipelinePhase>,
    /// Phases the operator asked to skip.
    pub user_requested_to_skip_phases: Vec<PipelinePhase>,
    /// Phases already finished.
    pub completed_phases: Vec<PipelinePhase>,
    /// Retry counter.
    pub retry_attempt_number: Option<u32>,
}

impl PipelineExecutionDetails {
    /// Details of a record nobody has run yet: every canonical phase pending.
    pub fn fresh(skip_phases: &[PipelinePhase]) -> Self {
        Self {
            pending_phases: PipelinePhase::CANONICAL.to_vec(),
            user_requested_to_skip_phases: skip_phases.to_vec(),
            ..Self::default()
        }
    }
}

/// One tracked pipeline run over one query window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingRecord {
    /// Store-assigned key; `None` until persisted.
    pub tracking_id: Option<i64>,
    /// Logical pipeline name.
    pub pipeline_name: String,
    /// Configuration variant of the pipeline.
    pub config_name: String,
    /// Inclusive window start.
    pub query_window_start: DateTime<FixedOffset>,
    /// Exclusive window end.
    pub query_window_end: DateTime<FixedOffset>,
    /// Local calendar date of the window start.
    pub query_window_day: NaiveDate,
    /// Configured window length text, kept for audit.
    pub query_window_duration: String,
    /// Execution document.
    pub pipeline_execution_details: PipelineExecutionDetails,
    /// Rows read from the source.
    pub source_count: Option<i64>,
    /// Free-form per-stage row counts.
    pub stage_count: Option<serde_json::Value>,
    /// Rows written to the target.
    pub target_count: Option<i64>,
    /// Lifecycle state.
    pub pipeline_status: PipelineStatus,
    /// Set by the store on insert.
    pub created_at: Option<DateTime<Utc>>,
    /// Set by the store on insert and every update.
    pub updated_at: Option<DateTime<Utc>>,
}

impl TrackingRecord {
    /// The record's `[start, end)` window.
    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.query_window_start,
            end: self.query_window_end,
        }
    }
}

/// Partial update applied by [`crate::store::TrackingStore::update_fields`].
///
/// `None` leaves a column untouched. The counts are nullable, so for them
/// `Some(None)` clears the column. Identity columns (pipeline, config and
/// window) are not updatable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordUpdate {
    /// New lifecycle state.
    pub pipeline_status: Option<PipelineStatus>,
    /// Replacement execution document.
    pub pipeline_execution_details: Option<PipelineExecutionDetails>,
    /// Rows read from the source.
    pub source_count: Option<Option<i64>>,
    /// Per-stage counts.
    pub stage_count: Option<Option<serde_json::Value>>,
    /// Rows written to the target.
    pub target_count: Option<Option<i64>>,
}

impl RecordUpdate {
    /// `true` when no column would change.
    pub fn is_empty(&self) -> bool {
        self == &RecordUpdate::default()
    }

    /// Update that only moves the lifecycle state.
    pub fn status(status: PipelineStatus) -> Self {
        Self {
            pipeline_status: Some(status),
            ..Self::default()
        }
    }
}
