//! Freshness boundary: the newest window-aligned instant whose data may be queried.
//!
//! `candidate_start = floor(now in pipeline zone, query_interval + freshness_block)`.
//! The freshness block holds back late-arriving data; adding the query interval
//! keeps the boundary on whole-window edges.

use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::{
    bucket::floor_to_interval,
    duration::{Span, format_duration},
    error::{Result, TrackerError},
};

/// Everything derived while computing the boundary, kept for logging and reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeContext {
    /// `now` expressed in the pipeline's zone.
    pub now_local: DateTime<Tz>,
    /// `query_interval + data_freshness_block`.
    pub combined: Span,
    /// Latest instant before which data is considered complete.
    pub candidate_start: DateTime<Tz>,
}

/// Computes the freshness boundary for `now`.
///
/// `query_interval` must be strictly positive and `freshness_block` must not be
/// negative (zero is allowed). Errors with `NON_POSITIVE_DURATION` otherwise.
pub fn compute_time_context(
    now: DateTime<Utc>,
    tz: Tz,
    query_interval: Span,
    freshness_block: Span,
) -> Result<TimeContext> {
    query_interval.ensure_positive("query_interval_window")?;
    if freshness_block.as_delta() < TimeDelta::zero() {
        return Err(TrackerError::NonPositiveDuration {
            what: "data_freshness_block_window".to_string(),
            value: format_duration(freshness_block),
        });
    }

    let combined = query_interval
        .checked_add(freshness_block)
        .ok_or_else(|| {
            let input = format!("{query_interval}+{freshness_block}");
            TrackerError::invalid_duration(&input, "duration is too large")
        })?
        .ensure_positive("combined window")?;
    let now_local = now.with_timezone(&tz);
    let candidate_start = floor_to_interval(&now_local, combined)?;

    debug!(
        timezone = %tz,
        now_local = %now_local,
        combined = %combined,
        candidate_start = %candidate_start,
        "computed time context"
    );

    Ok(TimeContext {
        now_local,
        combined,
        candidate_start,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::parse_duration;
    use chrono::TimeZone;

    fn span(s: &str) -> Span {
        parse_duration(s).unwrap()
    }

    #[test]
    fn hourly_window_without_freshness_block() {
        let now = Utc.with_ymd_and_hms(2025, 11, 27, 5, 33, 11).unwrap();
        let ctx = compute_time_context(now, Tz::UTC, span("1h"), span("0h")).unwrap();
        assert_eq!(
            ctx.candidate_start,
            Utc.with_ymd_and_hms(2025, 11, 27, 5, 0, 0).unwrap()
        );
        assert_eq!(ctx.combined, span("1h"));
    }

    #[test]
    fn freshness_block_widens_the_alignment() {
        // 1h + 1h = 2h buckets: 05:33 -> 04:00.
        let now = Utc.with_ymd_and_hms(2025, 11, 27, 5, 33, 11).unwrap();
        let ctx = compute_time_context(now, Tz::UTC, span("1h"), span("1h")).unwrap();
        assert_eq!(
            ctx.candidate_start,
            Utc.with_ymd_and_hms(2025, 11, 27, 4, 0, 0).unwrap()
        );
    }

    #[test]
    fn boundary_is_aligned_in_pipeline_zone() {
        // 05:33Z is 11:03 in Kolkata (+05:30); 1d buckets floor to local midnight.
        let now = Utc.with_ymd_and_hms(2025, 11, 27, 5, 33, 0).unwrap();
        let tz: Tz = "Asia/Kolkata".parse().unwrap();
        let ctx = compute_time_context(now, tz, span("1d"), span("0s")).unwrap();
        assert_eq!(ctx.candidate_start, tz.with_ymd_and_hms(2025, 11, 27, 0, 0, 0).unwrap());
        assert_eq!(
            ctx.candidate_start.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2025, 11, 26, 18, 30, 0).unwrap()
        );
    }

    #[test]
    fn zero_query_interval_is_rejected() {
        let now = Utc.with_ymd_and_hms(2025, 11, 27, 5, 33, 11).unwrap();
        let err = compute_time_context(now, Tz::UTC, span("0d"), span("1h")).unwrap_err();
        assert_eq!(err.kind().as_str(), "NON_POSITIVE_DURATION");

        let negative = Span::from_delta(TimeDelta::minutes(-5));
        let err = compute_time_context(now, Tz::UTC, span("1h"), negative).unwrap_err();
        assert!(err.to_string().contains("data_freshness_block_window"));
    }
}
