use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ingestion_domain::{CandleRow, FetchWindow, FetchedCandle, Granularity, Instrument, TableName};
use shaku::Interface;
use std::time::Duration;

/// Upstream market-data API.
#[async_trait]
pub trait MarketDataProvider: Interface {
    async fn list_instruments(&self) -> Result<Vec<Instrument>, ProviderError>;

    async fn get_candles(
        &self,
        figi: &str,
        window: FetchWindow,
        granularity: Granularity,
    ) -> Result<Vec<FetchedCandle>, ProviderError>;
}

#[async_trait]
pub trait CandleRepository: Interface {
    /// Create-if-absent for a candle table.
    async fn ensure_table(&self, table: &TableName) -> Result<(), RepositoryError>;

    /// Insert unless a row with the same `(ticker, begin_time)` already exists.
    async fn insert_if_absent(
        &self,
        table: &TableName,
        row: &CandleRow,
    ) -> Result<InsertOutcome, RepositoryError>;

    async fn recent(&self, query: &CandleQuery) -> Result<Vec<CandleRow>, RepositoryError>;
}

pub trait Clock: Interface {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

/// Read-only filter for the reporting tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandleQuery {
    pub table: TableName,
    pub limit: u32,
    pub ticker: Option<String>,
    pub begin_from: Option<DateTime<Utc>>,
    /// Exclusive.
    pub begin_to: Option<DateTime<Utc>>,
}

impl CandleQuery {
    pub fn latest(table: TableName, limit: u32) -> Self {
        Self {
            table,
            limit,
            ticker: None,
            begin_from: None,
            begin_to: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Rate limit exceeded (reset hint: {reset_after:?})")]
    Throttled { reset_after: Option<Duration> },

    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),
}
