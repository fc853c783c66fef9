use crate::time::{ParseError, TimeUnit};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Finest-grained stream position: a second-truncated timestamp plus an
/// intra-second sequence discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentKey {
    time: DateTime<Utc>,
    seq: u32,
}

impl ContentKey {
    /// Creates a key, truncating `time` to the second.
    pub fn new(time: DateTime<Utc>, seq: u32) -> Self {
        Self {
            time: TimeUnit::Seconds.round(time),
            seq,
        }
    }

    /// Second-truncated write time.
    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    /// Intra-second sequence discriminator.
    pub fn seq(&self) -> u32 {
        self.seq
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", TimeUnit::Seconds.format(self.time), self.seq)
    }
}

impl FromStr for ContentKey {
    type Err = ParseError;

    fn from_str(text: &str) -> Result<Self, ParseError> {
        let segments: Vec<&str> = text.split('/').collect();
        if segments.len() != 7 {
            return Err(ParseError::SegmentCount {
                text: text.to_string(),
                found: segments.len(),
            });
        }
        let time = TimeUnit::Seconds.parse(&segments[..6].join("/"))?;
        let seq = segments[6].parse().map_err(|_| ParseError::InvalidNumber {
            text: text.to_string(),
            segment: segments[6].to_string(),
        })?;
        Ok(Self { time, seq })
    }
}

/// Any position in a channel's stream, at one of the closed set of
/// granularities. Aggregate variants carry the start of their window,
/// truncated to the window's unit.
///
/// Ordering is total: positions compare by start instant, then by
/// granularity rank (a coarser window starting at the same instant covers
/// more of the stream and sorts greater), and two keys tie-break on their
/// sequence. The canonical text encoding round-trips through
/// [`ContentPath::from_str`] and preserves this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentPath {
    Key(ContentKey),
    Second(DateTime<Utc>),
    Minute(DateTime<Utc>),
    Hour(DateTime<Utc>),
    Day(DateTime<Utc>),
}

impl ContentPath {
    /// Second window containing `time`.
    pub fn second(time: DateTime<Utc>) -> Self {
        ContentPath::Second(TimeUnit::Seconds.round(time))
    }

    /// Minute window containing `time`.
    pub fn minute(time: DateTime<Utc>) -> Self {
        ContentPath::Minute(TimeUnit::Minutes.round(time))
    }

    /// Hour window containing `time`.
    pub fn hour(time: DateTime<Utc>) -> Self {
        ContentPath::Hour(TimeUnit::Hours.round(time))
    }

    /// Day window containing `time`.
    pub fn day(time: DateTime<Utc>) -> Self {
        ContentPath::Day(TimeUnit::Days.round(time))
    }

    /// Start instant of the position's window (the key's own second for a
    /// bare key).
    pub fn time(&self) -> DateTime<Utc> {
        match self {
            ContentPath::Key(key) => key.time(),
            ContentPath::Second(time)
            | ContentPath::Minute(time)
            | ContentPath::Hour(time)
            | ContentPath::Day(time) => *time,
        }
    }

    /// Granularity of the position's window.
    pub fn unit(&self) -> TimeUnit {
        match self {
            ContentPath::Key(_) | ContentPath::Second(_) => TimeUnit::Seconds,
            ContentPath::Minute(_) => TimeUnit::Minutes,
            ContentPath::Hour(_) => TimeUnit::Hours,
            ContentPath::Day(_) => TimeUnit::Days,
        }
    }

    /// UTF-8 payload stored in the coordination store.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    /// Decodes a coordination-store payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        let text = std::str::from_utf8(bytes).map_err(|_| ParseError::InvalidUtf8)?;
        text.parse()
    }

    fn rank(&self) -> u8 {
        match self {
            ContentPath::Key(_) => 0,
            ContentPath::Second(_) => 1,
            ContentPath::Minute(_) => 2,
            ContentPath::Hour(_) => 3,
            ContentPath::Day(_) => 4,
        }
    }
}

impl Ord for ContentPath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time()
            .cmp(&other.time())
            .then_with(|| self.rank().cmp(&other.rank()))
            .then_with(|| match (self, other) {
                (ContentPath::Key(a), ContentPath::Key(b)) => a.seq().cmp(&b.seq()),
                _ => Ordering::Equal,
            })
    }
}

impl PartialOrd for ContentPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ContentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentPath::Key(key) => key.fmt(f),
            aggregate => f.write_str(&aggregate.unit().format(aggregate.time())),
        }
    }
}

impl FromStr for ContentPath {
    type Err = ParseError;

    fn from_str(text: &str) -> Result<Self, ParseError> {
        if text.is_empty() {
            return Err(ParseError::Empty);
        }
        let segments = text.split('/').count();
        match segments {
            7 => Ok(ContentPath::Key(text.parse()?)),
            6 => Ok(ContentPath::Second(TimeUnit::Seconds.parse(text)?)),
            5 => Ok(ContentPath::Minute(TimeUnit::Minutes.parse(text)?)),
            4 => Ok(ContentPath::Hour(TimeUnit::Hours.parse(text)?)),
            3 => Ok(ContentPath::Day(TimeUnit::Days.parse(text)?)),
            found => Err(ParseError::SegmentCount {
                text: text.to_string(),
                found,
            }),
        }
    }
}

impl From<ContentKey> for ContentPath {
    fn from(key: ContentKey) -> Self {
        ContentPath::Key(key)
    }
}
