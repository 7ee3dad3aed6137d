use crate::Granularity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Half-open candle period `[begin, begin + granularity)`.
///
/// The end is always derived from the granularity and cannot be set on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    begin: DateTime<Utc>,
    end: DateTime<Utc>,
    granularity: Granularity,
}

impl TimeWindow {
    pub fn new(begin: DateTime<Utc>, granularity: Granularity) -> Result<Self, TimeWindowError> {
        let end = begin
            .checked_add_signed(granularity.duration())
            .ok_or(TimeWindowError::EndOutOfRange { begin, granularity })?;
        Ok(Self {
            begin,
            end,
            granularity,
        })
    }

    pub fn begin(&self) -> DateTime<Utc> {
        self.begin
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.begin && instant < self.end()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TimeWindowError {
    #[error("{granularity} window starting at {begin} ends past the supported date range")]
    EndOutOfRange {
        begin: DateTime<Utc>,
        granularity: Granularity,
    },
}

/// Request range handed to the upstream candle endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchWindow {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

impl FetchWindow {
    /// `[now - lookback, now)` for the given granularity.
    pub fn trailing(now: DateTime<Utc>, granularity: Granularity) -> Self {
        Self {
            from: now - granularity.lookback(),
            to: now,
        }
    }

    pub fn from(&self) -> DateTime<Utc> {
        self.from
    }

    pub fn to(&self) -> DateTime<Utc> {
        self.to
    }
}
