//! Gap fill: create exactly the missing PENDING records up to the freshness boundary.
//!
//! Stages, in order:
//! `Start → TimeContextComputed → LastEndFetched → GapEvaluated → WindowsEnumerated
//! → RecordsBuilt → Inserted`. Any stage may end early with a no-op or a failure.
//!
//! Nothing is retried here. Re-running is safe: the next run reads the newest
//! persisted window end and resumes from it, including after a partial insert.

use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::{
    config::PipelineSettings,
    error::{ErrorKind, TrackerError},
    store::TrackingStore,
    time_context::compute_time_context,
    window::{TimeWindow, enumerate_windows},
};

/// Last stage a gap-fill run reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GapFillStage {
    /// Nothing computed yet.
    Start,
    /// Freshness boundary known.
    TimeContextComputed,
    /// Latest recorded window end known.
    LastEndFetched,
    /// Gap bounds known.
    GapEvaluated,
    /// Windows tiling the gap known.
    WindowsEnumerated,
    /// Records built, not yet persisted.
    RecordsBuilt,
    /// Records persisted.
    Inserted,
}

impl GapFillStage {
    /// Upper-snake name used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            GapFillStage::Start => "START",
            GapFillStage::TimeContextComputed => "TIME_CONTEXT_COMPUTED",
            GapFillStage::LastEndFetched => "LAST_END_FETCHED",
            GapFillStage::GapEvaluated => "GAP_EVALUATED",
            GapFillStage::WindowsEnumerated => "WINDOWS_ENUMERATED",
            GapFillStage::RecordsBuilt => "RECORDS_BUILT",
            GapFillStage::Inserted => "INSERTED",
        }
    }
}

impl fmt::Display for GapFillStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a run had nothing to insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoOpReason {
    /// The pair has no records yet; bootstrap it first.
    NoHistory,
    /// The latest record already reaches the freshness boundary.
    CaughtUp,
    /// The gap is shorter than one window.
    SubWindowGap,
}

/// Terminal success state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GapFillOutcome {
    /// New records were persisted.
    Inserted,
    /// Nothing to do.
    NoOp(NoOpReason),
}

/// What a successful run saw and did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapFillReport {
    /// Terminal state.
    pub outcome: GapFillOutcome,
    /// Freshness boundary, with the pipeline zone's offset.
    pub candidate_start: DateTime<FixedOffset>,
    /// Latest recorded window end, if any.
    pub last_recorded_end: Option<DateTime<Utc>>,
    /// Windows that were inserted (empty for no-ops).
    pub windows: Vec<TimeWindow>,
    /// Rows persisted by this run.
    pub inserted_count: usize,
}

impl GapFillReport {
    fn no_op(
        reason: NoOpReason,
        candidate_start: DateTime<FixedOffset>,
        last_recorded_end: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            outcome: GapFillOutcome::NoOp(reason),
            candidate_start,
            last_recorded_end,
            windows: Vec::new(),
            inserted_count: 0,
        }
    }
}

/// A failed run: where it stopped, why, and how many rows landed anyway.
#[derive(Debug, Error)]
#[error("gap fill failed at {stage} with {inserted_count} row(s) inserted: {error}")]
pub struct GapFillFailure {
    /// Last stage reached before the failure.
    pub stage: GapFillStage,
    /// Underlying error.
    #[source]
    pub error: TrackerError,
    /// Rows the store confirmed before failing.
    pub inserted_count: usize,
}

impl GapFillFailure {
    fn at(stage: GapFillStage) -> impl FnOnce(TrackerError) -> Self {
        move |error| {
            let inserted_count = error.inserted_count();
            Self {
                stage,
                error,
                inserted_count,
            }
        }
    }

    /// Kind of the underlying error.
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}

/// Runs one gap fill for `settings` at `now`.
///
/// A pair without any record is a no-op: the first window is created by
/// [`crate::bootstrap::bootstrap_first_window`], never here.
#[instrument(
    name = "gap_fill",
    skip(store, settings),
    fields(pipeline = %settings.pipeline_name, config = %settings.config_name)
)]
pub fn run_gap_fill<S>(
    store: &mut S,
    settings: &PipelineSettings,
    now: DateTime<Utc>,
) -> Result<GapFillReport, GapFillFailure>
where
    S: TrackingStore + ?Sized,
{
    let ctx = compute_time_context(
        now,
        settings.timezone,
        settings.query_interval_window,
        settings.data_freshness_block_window,
    )
    .map_err(GapFillFailure::at(GapFillStage::Start))?;
    let candidate_start = ctx.candidate_start.fixed_offset();

    let last_recorded_end = store
        .fetch_max_window_end(&settings.pipeline_name, &settings.config_name)
        .map_err(GapFillFailure::at(GapFillStage::TimeContextComputed))?;
    let Some(last_end) = last_recorded_end else {
        info!(%candidate_start, "no records yet; nothing to fill");
        return Ok(GapFillReport::no_op(NoOpReason::NoHistory, candidate_start, None));
    };

    let gap_start = last_end.with_timezone(&settings.timezone);
    let gap_end = ctx.candidate_start;
    if gap_start >= gap_end {
        debug!(%gap_start, %gap_end, "already caught up");
        return Ok(GapFillReport::no_op(
            NoOpReason::CaughtUp,
            candidate_start,
            last_recorded_end,
        ));
    }

    let windows = enumerate_windows(&gap_start, &gap_end, settings.query_interval_window)
        .map_err(GapFillFailure::at(GapFillStage::GapEvaluated))?;
    if windows.is_empty() {
        debug!(%gap_start, %gap_end, "gap shorter than one window");
        return Ok(GapFillReport::no_op(
            NoOpReason::SubWindowGap,
            candidate_start,
            last_recorded_end,
        ));
    }

    let records = settings
        .record_builder()
        .and_then(|builder| builder.build_many(&windows))
        .map_err(GapFillFailure::at(GapFillStage::WindowsEnumerated))?;

    let inserted_count = match store.insert_many(&records) {
        Ok(n) => n,
        Err(error) => {
            let failure = GapFillFailure::at(GapFillStage::RecordsBuilt)(error);
            warn!(
                inserted = failure.inserted_count,
                windows = records.len(),
                error = %failure.error,
                "gap fill insert failed"
            );
            return Err(failure);
        }
    };

    info!(
        %gap_start,
        %gap_end,
        windows = windows.len(),
        inserted = inserted_count,
        "gap filled"
    );
    Ok(GapFillReport {
        outcome: GapFillOutcome::Inserted,
        candidate_start,
        last_recorded_end,
        windows,
        inserted_count,
    })
}
