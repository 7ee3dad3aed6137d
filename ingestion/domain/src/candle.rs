use crate::{Granularity, Quotation, TimeWindow};
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Candle begin time as it arrived from the provider.
///
/// Resolved exactly once, when the candle is turned into a [`CandleRow`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandleTimestamp {
    Typed(DateTime<Utc>),
    Raw(String),
    /// Any other shape; holds a description of what was received.
    Unsupported(String),
}

impl CandleTimestamp {
    pub fn resolve(&self) -> Result<DateTime<Utc>, CandleError> {
        match self {
            CandleTimestamp::Typed(ts) => Ok(*ts),
            CandleTimestamp::Raw(raw) => parse_iso8601(raw),
            CandleTimestamp::Unsupported(shape) => {
                Err(CandleError::UnsupportedTimestamp(shape.clone()))
            }
        }
    }
}

/// ISO-8601 parsing; values without an offset are taken as UTC.
fn parse_iso8601(raw: &str) -> Result<DateTime<Utc>, CandleError> {
    let trimmed = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(trimmed, format) {
            return Ok(ts.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(CandleError::MalformedTimestamp(raw.to_string()))
}

/// One OHLC price as it arrived from the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandlePrice {
    Quoted(Quotation),
    /// Undecodable units or fraction; holds the reason.
    Malformed(String),
}

impl CandlePrice {
    pub fn resolve(&self) -> Result<Decimal, CandleError> {
        match self {
            CandlePrice::Quoted(quotation) => Ok(quotation.to_decimal()),
            CandlePrice::Malformed(reason) => Err(CandleError::MalformedPrice(reason.clone())),
        }
    }
}

impl From<Quotation> for CandlePrice {
    fn from(quotation: Quotation) -> Self {
        CandlePrice::Quoted(quotation)
    }
}

/// OHLC candle exactly as returned by the upstream API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedCandle {
    pub time: CandleTimestamp,
    pub open: CandlePrice,
    pub high: CandlePrice,
    pub low: CandlePrice,
    pub close: CandlePrice,
    /// False while the provider is still updating the current period.
    pub is_complete: bool,
}

/// Persisted candle. Unique by `(ticker, begin_time)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandleRow {
    ticker: String,
    begin_time: DateTime<Utc>,
    close_time: DateTime<Utc>,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
}

impl CandleRow {
    pub fn new(
        ticker: impl Into<String>,
        window: TimeWindow,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            begin_time: window.begin(),
            close_time: window.end(),
            open,
            high,
            low,
            close,
        }
    }

    pub fn from_fetched(
        ticker: &str,
        candle: &FetchedCandle,
        granularity: Granularity,
    ) -> Result<Self, CandleError> {
        let begin_time = candle.time.resolve()?;
        let window = TimeWindow::new(begin_time, granularity)
            .map_err(|e| CandleError::MalformedTimestamp(e.to_string()))?;
        Ok(Self::new(
            ticker,
            window,
            candle.open.resolve()?,
            candle.high.resolve()?,
            candle.low.resolve()?,
            candle.close.resolve()?,
        ))
    }

    /// Rebuilds a row read back from storage, keeping its stored close time.
    pub fn from_stored(
        ticker: String,
        begin_time: DateTime<Utc>,
        close_time: DateTime<Utc>,
        prices: [Decimal; 4],
    ) -> Self {
        let [open, high, low, close] = prices;
        Self {
            ticker,
            begin_time,
            close_time,
            open,
            high,
            low,
            close,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn begin_time(&self) -> DateTime<Utc> {
        self.begin_time
    }

    pub fn close_time(&self) -> DateTime<Utc> {
        self.close_time
    }

    pub fn open(&self) -> Decimal {
        self.open
    }

    pub fn high(&self) -> Decimal {
        self.high
    }

    pub fn low(&self) -> Decimal {
        self.low
    }

    pub fn close(&self) -> Decimal {
        self.close
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CandleError {
    #[error("Malformed candle timestamp: {0}")]
    MalformedTimestamp(String),

    #[error("Unsupported candle timestamp type: {0}")]
    UnsupportedTimestamp(String),

    #[error("Malformed candle price: {0}")]
    MalformedPrice(String),
}
