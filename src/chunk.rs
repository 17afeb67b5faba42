use crate::error::PipelineError;
use std::fmt;
use std::str::FromStr;
use time::macros::format_description;
use time::{Date, Duration, Month};

/// Calendar granularity for splitting an extraction range into chunks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Granularity {
    Day,
    Week,
    Month,
    Year,
}

impl FromStr for Granularity {
    type Err = PipelineError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            other => Err(PipelineError::config(format!(
                "unknown granularity `{other}` (expected day, week, month or year)"
            ))),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        };
        f.write_str(s)
    }
}

/// Half-open `[start, end)` extraction window. Planner output is contiguous,
/// non-overlapping and ascending, so `(subreddit, chunk)` is a stable
/// checkpoint key across re-runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateChunk {
    pub start: Date,
    pub end: Date,
}

impl DateChunk {
    /// Inclusive lower bound as epoch seconds (midnight UTC of `start`).
    pub fn start_epoch(&self) -> i64 {
        self.start.midnight().assume_utc().unix_timestamp()
    }

    /// Exclusive upper bound as epoch seconds (midnight UTC of `end`).
    pub fn end_epoch(&self) -> i64 {
        self.end.midnight().assume_utc().unix_timestamp()
    }

    /// Filename-safe key fragment, e.g. `2021-01-01_2021-02-01`.
    pub fn label(&self) -> String {
        format!("{}_{}", fmt_date(self.start), fmt_date(self.end))
    }
}

impl fmt::Display for DateChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ~ {}", fmt_date(self.start), fmt_date(self.end))
    }
}

const DATE_FMT: &[time::format_description::FormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<Date, PipelineError> {
    Date::parse(s.trim(), DATE_FMT)
        .map_err(|e| PipelineError::config(format!("invalid date `{s}`: {e}")))
}

/// Format a date as `YYYY-MM-DD`.
pub fn fmt_date(d: Date) -> String {
    d.format(DATE_FMT).unwrap_or_else(|_| format!("{d:?}"))
}

/// Split `[start, end)` into ordered chunks at the given granularity.
///
/// Month and year chunks align to calendar-unit starts (the 1st / Jan 1), with
/// the first and last chunks clipped to `[start, end)`. Week chunks stride
/// seven days from `start` — there is no universal week origin, and anchoring
/// at `start` keeps a one-week range a single chunk. Deterministic and free of
/// side effects.
pub fn plan_chunks(
    start: Date,
    end: Date,
    granularity: Granularity,
) -> Result<Vec<DateChunk>, PipelineError> {
    if start >= end {
        return Err(PipelineError::InvalidRange { start, end });
    }
    let mut chunks = Vec::new();
    let mut cur = start;
    while cur < end {
        let boundary = next_boundary(cur, granularity).ok_or_else(|| {
            PipelineError::config(format!("date out of supported range after {}", fmt_date(cur)))
        })?;
        let chunk_end = boundary.min(end);
        chunks.push(DateChunk { start: cur, end: chunk_end });
        cur = chunk_end;
    }
    Ok(chunks)
}

/// Smallest boundary strictly greater than `d` for the granularity.
fn next_boundary(d: Date, granularity: Granularity) -> Option<Date> {
    match granularity {
        Granularity::Day => d.next_day(),
        Granularity::Week => d.checked_add(Duration::days(7)),
        Granularity::Month => {
            let (year, month) = match d.month() {
                Month::December => (d.year() + 1, Month::January),
                m => (d.year(), m.next()),
            };
            Date::from_calendar_date(year, month, 1).ok()
        }
        Granularity::Year => Date::from_calendar_date(d.year() + 1, Month::January, 1).ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Date {
        parse_date(s).unwrap()
    }

    #[test]
    fn month_chunks_align_to_first_of_month() {
        let chunks = plan_chunks(d("2021-01-15"), d("2021-03-10"), Granularity::Month).unwrap();
        assert_eq!(
            chunks,
            vec![
                DateChunk { start: d("2021-01-15"), end: d("2021-02-01") },
                DateChunk { start: d("2021-02-01"), end: d("2021-03-01") },
                DateChunk { start: d("2021-03-01"), end: d("2021-03-10") },
            ]
        );
    }

    #[test]
    fn chunks_are_contiguous_and_cover_range() {
        for g in [Granularity::Day, Granularity::Week, Granularity::Month, Granularity::Year] {
            let (s, e) = (d("2020-11-17"), d("2021-02-03"));
            let chunks = plan_chunks(s, e, g).unwrap();
            assert_eq!(chunks.first().unwrap().start, s);
            assert_eq!(chunks.last().unwrap().end, e);
            for w in chunks.windows(2) {
                assert_eq!(w[0].end, w[1].start, "gap/overlap at {g}");
                assert!(w[0].start < w[0].end);
            }
        }
    }

    #[test]
    fn planning_is_deterministic() {
        let a = plan_chunks(d("2019-03-02"), d("2020-07-19"), Granularity::Week).unwrap();
        let b = plan_chunks(d("2019-03-02"), d("2020-07-19"), Granularity::Week).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = plan_chunks(d("2021-02-01"), d("2021-01-01"), Granularity::Day).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRange { .. }));
        let err = plan_chunks(d("2021-01-01"), d("2021-01-01"), Granularity::Day).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRange { .. }));
    }

    #[test]
    fn one_week_range_is_a_single_week_chunk() {
        let chunks = plan_chunks(d("2021-01-01"), d("2021-01-08"), Granularity::Week).unwrap();
        assert_eq!(chunks, vec![DateChunk { start: d("2021-01-01"), end: d("2021-01-08") }]);
    }

    #[test]
    fn epoch_bounds_are_midnight_utc() {
        let c = DateChunk { start: d("2021-01-01"), end: d("2021-01-08") };
        assert_eq!(c.start_epoch(), 1_609_459_200);
        assert_eq!(c.end_epoch(), 1_609_459_200 + 7 * 86_400);
        assert_eq!(c.label(), "2021-01-01_2021-01-08");
    }
}
