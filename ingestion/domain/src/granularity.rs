use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed duration of one candle window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    TenMinutes,
    Hour,
}

impl Granularity {
    pub const fn minutes(&self) -> i64 {
        match self {
            Granularity::TenMinutes => 10,
            Granularity::Hour => 60,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::minutes(self.minutes())
    }

    /// Number of steps fetched behind "now" to absorb provider publication lag.
    pub const fn lookback_steps(&self) -> i32 {
        match self {
            Granularity::TenMinutes => 1,
            Granularity::Hour => 2,
        }
    }

    pub fn lookback(&self) -> Duration {
        self.duration() * self.lookback_steps()
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Granularity::TenMinutes => "10m",
            Granularity::Hour => "1h",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
