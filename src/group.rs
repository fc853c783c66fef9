use crate::position::{ContentKey, ContentPath};
use crate::time::TimeUnit;
use chrono::{DateTime, Timelike, Utc};
use thiserror::Error;

/// Seconds past a window boundary at which aggregation is emitted, leaving
/// room for clock and processing jitter at the top of the window.
pub const EMISSION_SKEW_SECONDS: u32 = 6;

/// Error raised while bucketing keys into a window.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GroupError {
    #[error("key {key} falls outside the {unit} window starting {window}")]
    KeyOutsideWindow {
        key: ContentKey,
        unit: &'static str,
        window: DateTime<Utc>,
    },
}

/// Aggregate node built at a window boundary: the window position plus the
/// keys written inside the window, sorted and deduplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowKeys {
    path: ContentPath,
    keys: Vec<ContentKey>,
}

impl WindowKeys {
    /// Position of the owning window.
    pub fn path(&self) -> &ContentPath {
        &self.path
    }

    /// Keys owned by the window, in stream order.
    pub fn keys(&self) -> &[ContentKey] {
        &self.keys
    }
}

/// Bucketing policy for one time granularity.
///
/// The variants form a closed hierarchy: seconds roll into minutes, minutes
/// into hours, hours into days. Each variant defines the window period, the
/// emission offset, and the boundary considered safe to replicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimedGroup {
    Second,
    Minute,
    Hour,
    Day,
}

impl TimedGroup {
    /// Granularity this policy buckets at.
    pub fn unit(self) -> TimeUnit {
        match self {
            TimedGroup::Second => TimeUnit::Seconds,
            TimedGroup::Minute => TimeUnit::Minutes,
            TimedGroup::Hour => TimeUnit::Hours,
            TimedGroup::Day => TimeUnit::Days,
        }
    }

    /// Window length in seconds.
    pub fn period_seconds(self) -> u32 {
        self.unit().period_seconds()
    }

    /// Seconds from `now` until the next emission tick.
    ///
    /// Emission aligns to second 6 past the window boundary; exactly on the
    /// tick the offset is zero. Always in `[0, period)`, which degenerates to
    /// a constant zero for one-second windows.
    pub fn offset_seconds(self, now: DateTime<Utc>) -> u32 {
        let period = self.period_seconds();
        let into_window = now.timestamp().rem_euclid(i64::from(period)) as u32;
        (EMISSION_SKEW_SECONDS + period - into_window) % period
    }

    /// Ordering minimum for this granularity, stored as the default cursor
    /// value before any window has completed.
    pub fn none(self) -> ContentPath {
        let epoch = DateTime::UNIX_EPOCH;
        match self {
            TimedGroup::Second => ContentPath::Second(epoch),
            TimedGroup::Minute => ContentPath::Minute(epoch),
            TimedGroup::Hour => ContentPath::Hour(epoch),
            TimedGroup::Day => ContentPath::Day(epoch),
        }
    }

    /// Buckets `keys` into the window containing `window_start`.
    ///
    /// Every key must fall inside that window; keys are returned sorted with
    /// duplicates removed.
    pub fn bucket(
        self,
        window_start: DateTime<Utc>,
        keys: impl IntoIterator<Item = ContentKey>,
    ) -> Result<WindowKeys, GroupError> {
        let unit = self.unit();
        let window = unit.round(window_start);
        let mut bucketed = Vec::new();
        for key in keys {
            if unit.round(key.time()) != window {
                return Err(GroupError::KeyOutsideWindow {
                    key,
                    unit: unit.label(),
                    window,
                });
            }
            bucketed.push(key);
        }
        bucketed.sort();
        bucketed.dedup();
        let path = match self {
            TimedGroup::Second => ContentPath::Second(window),
            TimedGroup::Minute => ContentPath::Minute(window),
            TimedGroup::Hour => ContentPath::Hour(window),
            TimedGroup::Day => ContentPath::Day(window),
        };
        Ok(WindowKeys {
            path,
            keys: bucketed,
        })
    }

    /// Boundary considered safe to replicate for a channel whose cursor sits
    /// at `path`: the most recent window unlikely to receive further writes.
    ///
    /// A second position at second 59 of its minute, or a bare key, may still
    /// be inside a window ingestion is writing to, so the boundary backs off
    /// to the previous window; any other position yields its own window.
    pub fn replicating_stable(self, path: &ContentPath) -> DateTime<Utc> {
        let unit = self.unit();
        match path {
            ContentPath::Second(time) if time.second() == 59 => unit.round(*time - unit.period()),
            ContentPath::Key(key) => unit.round(key.time() - unit.period()),
            other => unit.round(other.time()),
        }
    }
}
