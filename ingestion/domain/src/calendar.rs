use crate::Granularity;
use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Exchange-local timezone every boundary and session check is evaluated in.
pub const TRADING_TZ: Tz = chrono_tz::Europe::Moscow;

pub const SESSION_OPEN_HOUR: u32 = 10;
pub const SESSION_CLOSE_HOUR: u32 = 23;

/// Business-hours filter applied to a target at boundary time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionGate {
    open_hour: u32,
    close_hour: u32,
    weekdays_only: bool,
}

impl SessionGate {
    pub fn new(
        open_hour: u32,
        close_hour: u32,
        weekdays_only: bool,
    ) -> Result<Self, CalendarError> {
        if open_hour >= close_hour || close_hour > 24 {
            return Err(CalendarError::InvalidSession {
                open_hour,
                close_hour,
            });
        }
        Ok(Self {
            open_hour,
            close_hour,
            weekdays_only,
        })
    }

    /// 10:00–23:00, Monday to Friday.
    pub const fn regular() -> Self {
        Self {
            open_hour: SESSION_OPEN_HOUR,
            close_hour: SESSION_CLOSE_HOUR,
            weekdays_only: true,
        }
    }

    /// 10:00–23:00, every day.
    pub const fn weekend() -> Self {
        Self {
            open_hour: SESSION_OPEN_HOUR,
            close_hour: SESSION_CLOSE_HOUR,
            weekdays_only: false,
        }
    }

    pub fn is_open<T: TimeZone>(&self, at: &DateTime<T>) -> bool {
        if self.weekdays_only && is_weekend_day(at.weekday()) {
            return false;
        }
        (self.open_hour..self.close_hour).contains(&at.hour())
    }
}

fn is_weekend_day(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

/// First boundary aligned to `granularity` in `tz` that is strictly after `now`.
pub fn next_boundary(
    now: DateTime<Utc>,
    granularity: Granularity,
    tz: &Tz,
) -> Result<DateTime<Utc>, CalendarError> {
    let local = now.with_timezone(tz);
    let minute_of_day = i64::from(local.hour()) * 60 + i64::from(local.minute());
    let into_step = Duration::minutes(minute_of_day % granularity.minutes())
        + Duration::seconds(i64::from(local.second()))
        + Duration::nanoseconds(i64::from(local.nanosecond()));

    now.checked_sub_signed(into_step)
        .and_then(|floor| floor.checked_add_signed(granularity.duration()))
        .ok_or(CalendarError::OutOfRange(now))
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CalendarError {
    #[error("Invalid session hours {open_hour}..{close_hour}")]
    InvalidSession { open_hour: u32, close_hour: u32 },

    #[error("Boundary out of range after {0}")]
    OutOfRange(DateTime<Utc>),
}
