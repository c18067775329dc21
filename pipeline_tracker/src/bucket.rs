//! Midnight-anchored bucket flooring.
//!
//! - Buckets restart at local midnight of the instant's own zone.
//! - Width is the span's whole seconds; sub-second input precision is dropped.
//! - A width that does not divide 24h leaves a short last bucket before midnight.
//! - The result keeps the input's zone. DST edges resolve with
//!   [`DstPolicy::ShiftForward`], so the floor is never later than the input.

use chrono::{DateTime, NaiveTime, TimeDelta, TimeZone, Timelike};

use crate::{
    duration::{Span, format_duration},
    error::{Result, TrackerError},
    tz::{self, DstPolicy},
};

fn width_secs(span: Span) -> Result<i64> {
    let secs = span.num_seconds();
    if secs <= 0 {
        return Err(TrackerError::NonPositiveDuration {
            what: "bucket width".to_string(),
            value: format_duration(span),
        });
    }
    Ok(secs)
}

/// How many whole buckets of `span` have elapsed since local midnight.
pub fn intervals_since_midnight<Z: TimeZone>(instant: &DateTime<Z>, span: Span) -> Result<i64> {
    let width = width_secs(span)?;
    let secs = instant.naive_local().time().num_seconds_from_midnight() as i64;
    Ok(secs.div_euclid(width))
}

/// Start of the `span`-wide bucket containing `instant`, counted from local midnight.
///
/// Errors with `NON_POSITIVE_DURATION` when `span` is shorter than one second.
pub fn floor_to_interval<Z: TimeZone>(instant: &DateTime<Z>, span: Span) -> Result<DateTime<Z>> {
    let width = width_secs(span)?;
    let buckets = intervals_since_midnight(instant, span)?;

    let midnight = instant.naive_local().date().and_time(NaiveTime::MIN);
    let floored = midnight + TimeDelta::seconds(buckets * width);
    tz::resolve_local(floored, &instant.timezone(), DstPolicy::ShiftForward)
}
