//! Pending fetch: gap fill, then hand out the oldest PENDING records.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::{
    config::PipelineSettings,
    error::{ErrorKind, TrackerError},
    gap_fill::{GapFillFailure, GapFillReport, run_gap_fill},
    record::{PipelineStatus, TrackingRecord},
    store::TrackingStore,
};

/// Records ready to run, plus what the preceding gap fill did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingBatch {
    /// PENDING records, oldest window first.
    pub records: Vec<TrackingRecord>,
    /// Rows the gap fill inserted on this call.
    pub new_records_created: usize,
    /// `records.len()`.
    pub total_returned: usize,
    /// The gap-fill report of this call.
    pub gap_fill: GapFillReport,
}

/// Why [`get_next_n`] returned nothing.
#[derive(Debug, Error)]
pub enum PendingFetchError {
    /// The gap fill failed; stale PENDING rows are not served in that case.
    #[error(transparent)]
    GapFill(#[from] GapFillFailure),

    /// The gap fill succeeded but the PENDING read failed.
    #[error("pending fetch failed: {0}")]
    Fetch(#[source] TrackerError),
}

impl PendingFetchError {
    /// Kind of the underlying error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PendingFetchError::GapFill(failure) => failure.kind(),
            PendingFetchError::Fetch(err) => err.kind(),
        }
    }

    /// Rows the gap fill persisted before failing.
    pub fn inserted_count(&self) -> usize {
        match self {
            PendingFetchError::GapFill(failure) => failure.inserted_count,
            PendingFetchError::Fetch(_) => 0,
        }
    }
}

/// Runs the gap fill for `settings`, then returns up to `max_pending_records`
/// PENDING records matching the configured fetch filter, FIFO by window start.
///
/// A no-op gap fill is not an error. A failed one fails this call too.
#[instrument(
    name = "get_next_n",
    skip(store, settings),
    fields(pipeline = %settings.pipeline_name, config = %settings.config_name)
)]
pub fn get_next_n<S>(
    store: &mut S,
    settings: &PipelineSettings,
    now: DateTime<Utc>,
) -> Result<PendingBatch, PendingFetchError>
where
    S: TrackingStore + ?Sized,
{
    let gap_fill = run_gap_fill(store, settings, now).inspect_err(|failure| {
        warn!(
            stage = %failure.stage,
            kind = %failure.kind(),
            inserted = failure.inserted_count,
            "gap fill failed; not serving pending records"
        );
    })?;

    let records = store
        .fetch_by_status(
            PipelineStatus::Pending,
            &settings.fetch_filter,
            settings.max_pending_records,
        )
        .map_err(PendingFetchError::Fetch)?;

    let total_returned = records.len();
    info!(
        new_records = gap_fill.inserted_count,
        returned = total_returned,
        limit = settings.max_pending_records,
        "fetched pending records"
    );
    Ok(PendingBatch {
        records,
        new_records_created: gap_fill.inserted_count,
        total_returned,
        gap_fill,
    })
}
