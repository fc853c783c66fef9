use chrono::{DateTime, Duration, TimeZone, Utc};
use thiserror::Error;

/// Settling buffer between wall-clock now and the latest time considered
/// safe to read (writes inside the buffer may still be landing).
pub const STABLE_SECONDS: i64 = 5;

/// Error raised while decoding canonical position text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty position text")]
    Empty,
    #[error("position text is not UTF-8")]
    InvalidUtf8,
    #[error("unexpected segment count {found} in {text}")]
    SegmentCount { text: String, found: usize },
    #[error("non-numeric segment {segment} in {text}")]
    InvalidNumber { text: String, segment: String },
    #[error("no such timestamp: {text}")]
    InvalidTimestamp { text: String },
}

/// Time granularities used for bucketing and path encoding.
///
/// Each unit owns a canonical slash-separated path format; the formats nest,
/// so a finer unit's text always extends a coarser unit's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Window length in seconds.
    pub fn period_seconds(self) -> u32 {
        match self {
            TimeUnit::Seconds => 1,
            TimeUnit::Minutes => 60,
            TimeUnit::Hours => 3_600,
            TimeUnit::Days => 86_400,
        }
    }

    /// Window length as a duration.
    pub fn period(self) -> Duration {
        Duration::seconds(i64::from(self.period_seconds()))
    }

    /// Lowercase unit label used in link names and diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            TimeUnit::Seconds => "second",
            TimeUnit::Minutes => "minute",
            TimeUnit::Hours => "hour",
            TimeUnit::Days => "day",
        }
    }

    /// Start of the window containing `time`.
    pub fn round(self, time: DateTime<Utc>) -> DateTime<Utc> {
        let period = i64::from(self.period_seconds());
        let ts = time.timestamp();
        let start = ts - ts.rem_euclid(period);
        DateTime::from_timestamp(start, 0).expect("rounded timestamp stays in range")
    }

    /// Canonical path text for `time` at this granularity.
    pub fn format(self, time: DateTime<Utc>) -> String {
        time.format(self.format_spec()).to_string()
    }

    /// Decodes canonical path text; exact inverse of [`TimeUnit::format`].
    pub fn parse(self, text: &str) -> Result<DateTime<Utc>, ParseError> {
        let segments: Vec<&str> = text.split('/').collect();
        if segments.len() != self.segment_count() {
            return Err(ParseError::SegmentCount {
                text: text.to_string(),
                found: segments.len(),
            });
        }
        let mut fields = [0_u32; 6];
        for (idx, segment) in segments.iter().enumerate() {
            fields[idx] = segment.parse().map_err(|_| ParseError::InvalidNumber {
                text: text.to_string(),
                segment: (*segment).to_string(),
            })?;
        }
        let [year, month, day, hour, minute, second] = fields;
        Utc.with_ymd_and_hms(year as i32, month, day, hour, minute, second)
            .single()
            .ok_or_else(|| ParseError::InvalidTimestamp {
                text: text.to_string(),
            })
    }

    fn segment_count(self) -> usize {
        match self {
            TimeUnit::Seconds => 6,
            TimeUnit::Minutes => 5,
            TimeUnit::Hours => 4,
            TimeUnit::Days => 3,
        }
    }

    fn format_spec(self) -> &'static str {
        match self {
            TimeUnit::Seconds => "%Y/%m/%d/%H/%M/%S",
            TimeUnit::Minutes => "%Y/%m/%d/%H/%M",
            TimeUnit::Hours => "%Y/%m/%d/%H",
            TimeUnit::Days => "%Y/%m/%d",
        }
    }
}

/// Latest instant considered safe to read: `now` rounded to the second,
/// minus the ingest settling buffer.
pub fn stable(now: DateTime<Utc>) -> DateTime<Utc> {
    TimeUnit::Seconds.round(now) - Duration::seconds(STABLE_SECONDS)
}
