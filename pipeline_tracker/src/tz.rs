//! Time zone parsing and conversion helpers.
//!
//! What this module provides:
//! - [`parse_timezone`]: Parse an IANA zone name (e.g., "America/New_York").
//! - [`resolve_local`]: Turn a naive local wall time into an instant of that zone,
//!   handling DST gaps (spring-forward) and ambiguous times (fall-back) via [`DstPolicy`].
//! - [`to_rfc3339_millis`] / [`parse_rfc3339_utc`]: the text form used for every
//!   timestamp column in the tracking table.
//!
//! Notes:
//! - All database writes are RFC-3339 UTC strings with millisecond precision, so
//!   string order equals time order. Local times only exist at the edges (window
//!   alignment, `query_window_day`).
//!
//! Examples
//! - New York "fall back" ambiguity (2024-11-03 01:30 occurs twice):
//!   PreferEarliest -> 05:30Z, PreferLatest -> 06:30Z.

use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{Result, TrackerError};

/// Policy for handling DST edge cases when resolving local wall times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DstPolicy {
    /// Error on ambiguous (fall-back) or nonexistent (spring-forward) local times.
    Strict,
    /// For ambiguous local times pick the earlier instant.
    PreferEarliest,
    /// For ambiguous local times pick the later instant.
    PreferLatest,
    /// For nonexistent local times step forward one minute at a time until the
    /// first valid instant (capped at 2 hours). Ambiguous times resolve to the
    /// earlier instant.
    ShiftForward,
}

/// Parse an IANA time zone name.
///
/// Errors with `INVALID_CONFIGURATION` for unknown names.
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| TrackerError::InvalidConfiguration(format!("unknown time zone '{name}'")))
}

/// Resolve a naive local timestamp to an instant in `tz` under `policy`.
///
/// Behavior:
/// - Single mapping: returned as is.
/// - Ambiguous (fall-back): PreferEarliest/ShiftForward -> earlier, PreferLatest -> later,
///   Strict -> error.
/// - Nonexistent (spring-forward gap): ShiftForward -> first valid minute after the gap,
///   everything else -> error.
pub fn resolve_local<Z: TimeZone>(
    naive: NaiveDateTime,
    tz: &Z,
    policy: DstPolicy,
) -> Result<DateTime<Z>> {
    use chrono::offset::LocalResult::*;
    match tz.from_local_datetime(&naive) {
        Single(dt) => Ok(dt),
        Ambiguous(a, b) => match policy {
            DstPolicy::PreferEarliest | DstPolicy::ShiftForward => Ok(a),
            DstPolicy::PreferLatest => Ok(b),
            DstPolicy::Strict => Err(TrackerError::InvalidConfiguration(format!(
                "ambiguous local time {naive}"
            ))),
        },
        None => match policy {
            DstPolicy::ShiftForward => {
                let mut t = naive;
                for _ in 0..120 {
                    t += TimeDelta::minutes(1);
                    match tz.from_local_datetime(&t) {
                        Single(dt) | Ambiguous(dt, _) => return Ok(dt),
                        None => {}
                    }
                }
                Err(TrackerError::InvalidConfiguration(format!(
                    "nonexistent local time {naive}"
                )))
            }
            _ => Err(TrackerError::InvalidConfiguration(format!(
                "nonexistent local time {naive}"
            ))),
        },
    }
}

/// Format any instant as an RFC-3339 UTC string with millisecond precision.
pub fn to_rfc3339_millis<Z: TimeZone>(dt: &DateTime<Z>) -> String {
    dt.with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored RFC-3339 timestamp, keeping the offset it was written with.
pub fn parse_rfc3339(s: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s)
        .map_err(|e| {
            TrackerError::store_query("decode_timestamp", format!("bad rfc3339 '{s}': {e}"))
        })
}

/// Parse a stored RFC-3339 timestamp and convert it to UTC.
pub fn parse_rfc3339_utc(s: &str) -> Result<DateTime<Utc>> {
    parse_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}
