//! First-window bootstrap for a pipeline/config pair with no history.
//!
//! Gap fill never creates the first record of a pair; this does, once.

use chrono::{DateTime, TimeZone};
use tracing::{info, instrument};

use crate::{
    bucket::floor_to_interval,
    config::PipelineSettings,
    error::{Result, TrackerError},
    record::TrackingRecord,
    store::TrackingStore,
    tz,
    window::TimeWindow,
};

/// Inserts the window `[start, start + query_interval_window)` when the pair
/// has no records. Returns the inserted record, or `None` if the pair already
/// has history.
///
/// `start` is used as given; see [`aligned_start`] to snap it first.
#[instrument(
    name = "bootstrap",
    skip(store, settings),
    fields(pipeline = %settings.pipeline_name, config = %settings.config_name)
)]
pub fn bootstrap_first_window<S, Z>(
    store: &mut S,
    settings: &PipelineSettings,
    start: DateTime<Z>,
) -> Result<Option<TrackingRecord>>
where
    S: TrackingStore + ?Sized,
    Z: TimeZone,
{
    if let Some(last_end) =
        store.fetch_max_window_end(&settings.pipeline_name, &settings.config_name)?
    {
        info!(%last_end, "pair already has records; bootstrap skipped");
        return Ok(None);
    }

    let start = start.with_timezone(&settings.timezone).fixed_offset();
    let end = start
        .checked_add_signed(settings.query_interval_window.as_delta())
        .ok_or_else(|| TrackerError::InvalidWindow {
            start: tz::to_rfc3339_millis(&start),
            end: "out of range".to_string(),
            expected: settings.query_interval_text.clone(),
        })?;
    let window = TimeWindow { start, end };
    let record = settings.record_builder()?.build(&window)?;
    store.insert_many(std::slice::from_ref(&record))?;

    info!(start = %window.start, end = %window.end, "bootstrapped first window");
    Ok(Some(record))
}

/// Floors `instant` onto the pipeline's window grid in its own zone.
pub fn aligned_start<Z: TimeZone>(
    settings: &PipelineSettings,
    instant: &DateTime<Z>,
) -> Result<DateTime<chrono_tz::Tz>> {
    floor_to_interval(
        &instant.with_timezone(&settings.timezone),
        settings.query_interval_window,
    )
}
