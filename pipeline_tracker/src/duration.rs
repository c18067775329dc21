//! Compact duration strings such as `"1h"`, `"2h30m"` or `"1d2h30m15s500ms"`.
//!
//! Grammar: an ordered sequence of `<unsigned integer><unit>` components drawn
//! from `y, mon, w, d, h, m, s, ms`. Each unit may appear at most once and only
//! in that order. Matching is case-insensitive and whitespace between tokens is
//! ignored. Years count as 365 days and months as 30 days; this is a fixed
//! approximation, not calendar arithmetic.
//!
//! ```
//! use pipeline_tracker::duration::{Span, format_duration, parse_duration};
//!
//! let span = parse_duration("2h30m").unwrap();
//! assert_eq!(span.as_delta().num_minutes(), 150);
//! assert_eq!(format_duration(span), "2h30m");
//! assert!(parse_duration("2m1h").is_err());
//! ```

use std::{fmt, str::FromStr};

use chrono::TimeDelta;

use crate::error::{Result, TrackerError};

const MS_PER_SECOND: i64 = 1_000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;
const MS_PER_WEEK: i64 = 7 * MS_PER_DAY;
const DAYS_PER_YEAR: i64 = 365;
const DAYS_PER_MONTH: i64 = 30;

/// Units in the only order they may appear.
const UNIT_ORDER: [&str; 8] = ["y", "mon", "w", "d", "h", "m", "s", "ms"];

/// The raw components of a parsed duration string, before folding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DurationComponents {
    /// `y`, folded as 365 days.
    pub years: u64,
    /// `mon`, folded as 30 days.
    pub months: u64,
    /// `w`
    pub weeks: u64,
    /// `d`
    pub days: u64,
    /// `h`
    pub hours: u64,
    /// `m`
    pub minutes: u64,
    /// `s`
    pub seconds: u64,
    /// `ms`
    pub milliseconds: u64,
}

impl DurationComponents {
    fn slot(&mut self, unit_index: usize) -> &mut u64 {
        match unit_index {
            0 => &mut self.years,
            1 => &mut self.months,
            2 => &mut self.weeks,
            3 => &mut self.days,
            4 => &mut self.hours,
            5 => &mut self.minutes,
            6 => &mut self.seconds,
            _ => &mut self.milliseconds,
        }
    }

    /// Folds the components into a single span (years → 365d, months → 30d).
    ///
    /// Errors with `INVALID_DURATION_FORMAT` if the total overflows.
    pub fn to_span(&self, input: &str) -> Result<Span> {
        let int = |v: u64| i64::try_from(v).map_err(|_| too_large(input));
        let days = DAYS_PER_YEAR
            .checked_mul(int(self.years)?)
            .zip(DAYS_PER_MONTH.checked_mul(int(self.months)?))
            .and_then(|(y, m)| y.checked_add(m))
            .zip(int(self.days).ok())
            .and_then(|(d, extra)| d.checked_add(extra));

        let parts = [
            (int(self.weeks)?, MS_PER_WEEK),
            (days.ok_or_else(|| too_large(input))?, MS_PER_DAY),
            (int(self.hours)?, MS_PER_HOUR),
            (int(self.minutes)?, MS_PER_MINUTE),
            (int(self.seconds)?, MS_PER_SECOND),
            (int(self.milliseconds)?, 1),
        ];

        let mut total_ms: i64 = 0;
        for (amount, unit_ms) in parts {
            total_ms = amount
                .checked_mul(unit_ms)
                .and_then(|v| total_ms.checked_add(v))
                .ok_or_else(|| too_large(input))?;
        }
        TimeDelta::try_milliseconds(total_ms)
            .map(Span)
            .ok_or_else(|| too_large(input))
    }
}

fn too_large(input: &str) -> TrackerError {
    TrackerError::invalid_duration(input, "duration is too large")
}

/// A signed span of time expressed in the duration grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Span(TimeDelta);

impl Span {
    /// Wraps an existing delta.
    pub const fn from_delta(delta: TimeDelta) -> Self {
        Self(delta)
    }

    /// The underlying chrono delta.
    pub const fn as_delta(&self) -> TimeDelta {
        self.0
    }

    /// Whole seconds in this span (truncated toward zero).
    pub fn num_seconds(&self) -> i64 {
        self.0.num_seconds()
    }

    /// `true` for spans longer than zero.
    pub fn is_positive(&self) -> bool {
        self.0 > TimeDelta::zero()
    }

    /// `self + rhs`, or `None` on overflow.
    pub fn checked_add(self, rhs: Span) -> Option<Span> {
        self.0.checked_add(&rhs.0).map(Span)
    }

    /// Returns `self` if it is strictly positive, else `NON_POSITIVE_DURATION`
    /// naming `what`.
    pub fn ensure_positive(self, what: &str) -> Result<Self> {
        if self.is_positive() {
            Ok(self)
        } else {
            Err(TrackerError::NonPositiveDuration {
                what: what.to_string(),
                value: format_duration(self),
            })
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_duration(*self))
    }
}

impl FromStr for Span {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self> {
        parse_duration(s)
    }
}

/// Splits a duration string into its ordered components without folding them.
pub fn parse_components(input: &str) -> Result<DurationComponents> {
    let text = input.trim().to_lowercase();
    if text.is_empty() {
        return Err(TrackerError::invalid_duration(input, "duration string is empty"));
    }

    let mut components = DurationComponents::default();
    let mut last_unit: Option<usize> = None;
    let mut rest = text.as_str();

    while !rest.is_empty() {
        let digits_len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits_len == 0 {
            return Err(TrackerError::invalid_duration(
                input,
                format!("unexpected '{rest}', expected a number"),
            ));
        }
        let (digits, tail) = rest.split_at(digits_len);
        let value: u64 = digits
            .parse()
            .map_err(|_| TrackerError::invalid_duration(input, format!("bad number '{digits}'")))?;

        let tail = tail.trim_start();
        let unit_len = tail
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(tail.len());
        if unit_len == 0 {
            return Err(TrackerError::invalid_duration(
                input,
                format!("number {value} has no unit"),
            ));
        }
        let (unit, tail) = tail.split_at(unit_len);

        let Some(unit_index) = UNIT_ORDER.iter().position(|u| *u == unit) else {
            return Err(TrackerError::invalid_duration(
                input,
                format!("unknown unit '{unit}', expected one of y, mon, w, d, h, m, s, ms"),
            ));
        };
        if let Some(prev) = last_unit.filter(|prev| unit_index <= *prev) {
            return Err(TrackerError::invalid_duration(
                input,
                format!(
                    "'{unit}' found after '{}'; units appear once, ordered y mon w d h m s ms",
                    UNIT_ORDER[prev]
                ),
            ));
        }
        last_unit = Some(unit_index);
        *components.slot(unit_index) = value;

        rest = tail.trim_start();
    }

    Ok(components)
}

/// Parses a duration string into a [`Span`].
///
/// Accepts any ordered subset of components, including `"0d"`.
pub fn parse_duration(input: &str) -> Result<Span> {
    parse_components(input)?.to_span(input)
}

/// Formats a span as `d, h, m, s, ms` components, skipping zeros.
///
/// Years, months and weeks are never re-derived. A zero span formats as
/// `"0s"` and a negative span gets a leading `-`. Precision below one
/// millisecond is dropped.
pub fn format_duration(span: Span) -> String {
    let total_ms = span.0.num_milliseconds();
    if total_ms == 0 {
        return "0s".to_string();
    }

    let mut out = String::new();
    if total_ms < 0 {
        out.push('-');
    }
    let mut remaining = total_ms.unsigned_abs();

    for (unit, unit_ms) in [
        ("d", MS_PER_DAY as u64),
        ("h", MS_PER_HOUR as u64),
        ("m", MS_PER_MINUTE as u64),
        ("s", MS_PER_SECOND as u64),
        ("ms", 1),
    ] {
        let amount = remaining / unit_ms;
        remaining %= unit_ms;
        if amount > 0 {
            out.push_str(&amount.to_string());
            out.push_str(unit);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use proptest::prelude::*;

    fn kind_of(input: &str) -> ErrorKind {
        parse_duration(input).unwrap_err().kind()
    }

    #[test]
    fn parses_every_unit_in_order() {
        let c = parse_components("1y2mon1w2d3h44m33s45ms").unwrap();
        assert_eq!(
            c,
            DurationComponents {
                years: 1,
                months: 2,
                weeks: 1,
                days: 2,
                hours: 3,
                minutes: 44,
                seconds: 33,
                milliseconds: 45,
            }
        );

        let span = c.to_span("1y2mon1w2d3h44m33s45ms").unwrap();
        let days = 365 + 60 + 7 + 2;
        let expected = TimeDelta::days(days)
            + TimeDelta::hours(3)
            + TimeDelta::minutes(44)
            + TimeDelta::seconds(33)
            + TimeDelta::milliseconds(45);
        assert_eq!(span.as_delta(), expected);
    }

    #[test]
    fn accepts_subsets_case_and_spacing() {
        assert_eq!(parse_duration("3h40m").unwrap().as_delta(), TimeDelta::minutes(220));
        assert_eq!(parse_duration("0d").unwrap().as_delta(), TimeDelta::zero());
        assert_eq!(parse_duration(" 2H 30M ").unwrap().as_delta(), TimeDelta::minutes(150));
        assert_eq!(parse_duration("1MON").unwrap().as_delta(), TimeDelta::days(30));
        assert_eq!(parse_duration("500ms").unwrap().as_delta(), TimeDelta::milliseconds(500));
        assert_eq!(parse_duration("1m500ms").unwrap().as_delta(), TimeDelta::milliseconds(60_500));
    }

    #[test]
    fn rejects_wrong_order_repeats_and_junk() {
        assert_eq!(kind_of("2m1h"), ErrorKind::InvalidDurationFormat);
        assert_eq!(kind_of("1h1h"), ErrorKind::InvalidDurationFormat);
        assert_eq!(kind_of("1x"), ErrorKind::InvalidDurationFormat);
        assert_eq!(kind_of("1h30"), ErrorKind::InvalidDurationFormat);
        assert_eq!(kind_of("h"), ErrorKind::InvalidDurationFormat);
        assert_eq!(kind_of("1h-5m"), ErrorKind::InvalidDurationFormat);
        assert_eq!(kind_of(""), ErrorKind::InvalidDurationFormat);
        assert_eq!(kind_of("99999999999999999999d"), ErrorKind::InvalidDurationFormat);
    }

    #[test]
    fn formats_days_down_to_millis() {
        let span = Span::from_delta(
            TimeDelta::days(1)
                + TimeDelta::hours(2)
                + TimeDelta::minutes(30)
                + TimeDelta::seconds(15)
                + TimeDelta::milliseconds(500),
        );
        assert_eq!(format_duration(span), "1d2h30m15s500ms");
        assert_eq!(format_duration(Span::default()), "0s");
        assert_eq!(format_duration(parse_duration("1w").unwrap()), "7d");
        assert_eq!(format_duration(Span::from_delta(TimeDelta::hours(-2))), "-2h");
    }

    #[test]
    fn oversized_component_reports_the_whole_input() {
        let input = "1d18446744073709551615ms";
        let err = parse_duration(input).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidDurationFormat);
        assert!(err.to_string().contains(input), "{err}");
    }

    #[test]
    fn ensure_positive_names_the_setting() {
        let err = parse_duration("0h")
            .unwrap()
            .ensure_positive("query_interval_window")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NonPositiveDuration);
        assert!(err.to_string().contains("query_interval_window"));
    }

    proptest! {
        #[test]
        fn format_then_parse_is_identity(
            days in 0i64..2000,
            hours in 0i64..24,
            minutes in 0i64..60,
            seconds in 0i64..60,
            millis in 0i64..1000,
        ) {
            let span = Span::from_delta(
                TimeDelta::days(days)
                    + TimeDelta::hours(hours)
                    + TimeDelta::minutes(minutes)
                    + TimeDelta::seconds(seconds)
                    + TimeDelta::milliseconds(millis),
            );
            let text = format_duration(span);
            prop_assert_eq!(parse_duration(&text).unwrap(), span);
        }
    }
}
