//! Fixed-length, half-open query windows and gap tiling.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::{duration::Span, error::Result};

/// A half-open interval `[start, end)` of one configured window length.
///
/// Both ends keep the offset of the pipeline zone they were produced in, so
/// [`TimeWindow::day`] is the local calendar day of the start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Inclusive start.
    pub start: DateTime<FixedOffset>,
    /// Exclusive end.
    pub end: DateTime<FixedOffset>,
}

impl TimeWindow {
    /// Local calendar date of the window start.
    pub fn day(&self) -> NaiveDate {
        self.start.date_naive()
    }

    /// `true` when the two half-open windows share any instant.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Tiles `[gap_start, gap_end)` with contiguous windows of exactly `length`.
///
/// Returns an empty list when `gap_start >= gap_end`. A tail shorter than
/// `length` is left uncovered; no window ever ends after `gap_end`.
/// Errors with `NON_POSITIVE_DURATION` when `length` is not positive.
pub fn enumerate_windows<Z: TimeZone>(
    gap_start: &DateTime<Z>,
    gap_end: &DateTime<Z>,
    length: Span,
) -> Result<Vec<TimeWindow>> {
    let length = length.ensure_positive("query_interval_window")?;
    if gap_start >= gap_end {
        return Ok(Vec::new());
    }

    let mut windows = Vec::new();
    let mut cursor = gap_start.clone();
    loop {
        let Some(next) = cursor.clone().checked_add_signed(length.as_delta()) else {
            break;
        };
        if next > *gap_end {
            break;
        }
        windows.push(TimeWindow {
            start: cursor.fixed_offset(),
            end: next.fixed_offset(),
        });
        cursor = next;
    }
    Ok(windows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::parse_duration;
    use chrono::{TimeDelta, Utc};
    use chrono_tz::Tz;
    use proptest::prelude::*;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 27, h, m, 0).unwrap()
    }

    #[test]
    fn three_hourly_windows_fill_the_gap() {
        let got = enumerate_windows(&at(2, 0), &at(5, 0), parse_duration("1h").unwrap()).unwrap();
        let bounds: Vec<_> = got.iter().map(|w| (w.start, w.end)).collect();
        assert_eq!(
            bounds,
            vec![
                (at(2, 0).fixed_offset(), at(3, 0).fixed_offset()),
                (at(3, 0).fixed_offset(), at(4, 0).fixed_offset()),
                (at(4, 0).fixed_offset(), at(5, 0).fixed_offset()),
            ]
        );
    }

    #[test]
    fn empty_or_inverted_gap_yields_nothing() {
        let hour = parse_duration("1h").unwrap();
        assert!(enumerate_windows(&at(5, 0), &at(5, 0), hour).unwrap().is_empty());
        assert!(enumerate_windows(&at(6, 0), &at(5, 0), hour).unwrap().is_empty());
    }

    #[test]
    fn sub_window_tail_is_dropped() {
        let hour = parse_duration("1h").unwrap();
        assert!(enumerate_windows(&at(4, 40), &at(5, 0), hour).unwrap().is_empty());

        let got = enumerate_windows(&at(1, 40), &at(5, 0), hour).unwrap();
        assert_eq!(got.len(), 3);
        assert_eq!(got[2].end, at(4, 40).fixed_offset());
    }

    #[test]
    fn non_positive_length_is_an_error() {
        let err =
            enumerate_windows(&at(1, 0), &at(5, 0), parse_duration("0m").unwrap()).unwrap_err();
        assert_eq!(err.kind().as_str(), "NON_POSITIVE_DURATION");
    }

    #[test]
    fn day_uses_the_local_date_of_the_start() {
        let tz: Tz = "America/Los_Angeles".parse().unwrap();
        let start = tz.with_ymd_and_hms(2025, 11, 26, 23, 0, 0).unwrap();
        let end = start + TimeDelta::hours(1);
        let w = enumerate_windows(&start, &end, parse_duration("1h").unwrap()).unwrap();
        assert_eq!(w[0].day(), NaiveDate::from_ymd_opt(2025, 11, 26).unwrap());
        let next = TimeWindow {
            start: w[0].end,
            end: w[0].end + TimeDelta::hours(1),
        };
        assert!(!w[0].overlaps(&next));
    }

    proptest! {
        #[test]
        fn windows_tile_the_gap(
            start_secs in 0i64..2_000_000_000,
            gap_secs in 1i64..400_000,
            len_secs in 1i64..20_000,
        ) {
            let start = Utc.timestamp_opt(start_secs, 0).single().unwrap();
            let end = start + TimeDelta::seconds(gap_secs);
            let len = TimeDelta::seconds(len_secs);
            let out = enumerate_windows(&start, &end, Span::from_delta(len)).unwrap();

            prop_assert_eq!(out.len() as i64, gap_secs / len_secs);
            if let (Some(first), Some(last)) = (out.first(), out.last()) {
                prop_assert_eq!(first.start, start.fixed_offset());
                prop_assert!(last.end <= end);
                prop_assert!(end < last.end + len);
            }
            for w in &out {
                prop_assert_eq!(w.end - w.start, len);
            }
            for pair in out.windows(2) {
                prop_assert_eq!(pair[0].end, pair[1].start);
                prop_assert!(!pair[0].overlaps(&pair[1]));
            }
        }
    }
}
