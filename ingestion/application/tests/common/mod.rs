#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use ingestion_application::{
    CandleQuery, CandleRepository, Clock, InsertOutcome, MarketDataProvider, ProviderError,
    RepositoryError,
};
use ingestion_domain::{
    CandleRow, CandleTimestamp, FetchWindow, FetchedCandle, Granularity, Instrument, Quotation,
    TableName, TRADING_TZ,
};

pub fn moscow(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    TRADING_TZ
        .with_ymd_and_hms(y, m, d, h, min, 0)
        .unwrap()
        .with_timezone(&Utc)
}

pub fn candle_at(begin: DateTime<Utc>, units: i64) -> FetchedCandle {
    FetchedCandle {
        time: CandleTimestamp::Typed(begin),
        open: Quotation::new(units, 250_000_000).unwrap().into(),
        high: Quotation::new(units + 1, 0).unwrap().into(),
        low: Quotation::new(units - 1, 500_000_000).unwrap().into(),
        close: Quotation::new(units, 750_000_000).unwrap().into(),
        is_complete: true,
    }
}

pub fn raw_candle(time: &str, units: i64) -> FetchedCandle {
    FetchedCandle {
        time: CandleTimestamp::Raw(time.to_string()),
        ..candle_at(Utc::now(), units)
    }
}

#[derive(Debug, Clone)]
pub struct ProviderCall {
    pub figi: String,
    pub window: FetchWindow,
    pub granularity: Granularity,
    pub at: tokio::time::Instant,
}

/// Provider double: scripted per-FIGI responses, then a fixed fallback.
#[derive(Default)]
pub struct ScriptedProvider {
    instruments: Option<Vec<Instrument>>,
    scripted: Mutex<HashMap<String, VecDeque<Result<Vec<FetchedCandle>, ProviderError>>>>,
    fallback: HashMap<String, Vec<FetchedCandle>>,
    calls: Mutex<Vec<ProviderCall>>,
}

impl ScriptedProvider {
    pub fn with_instruments(instruments: Vec<Instrument>) -> Self {
        Self {
            instruments: Some(instruments),
            ..Self::default()
        }
    }

    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn candles_for(mut self, figi: &str, candles: Vec<FetchedCandle>) -> Self {
        self.fallback.insert(figi.to_string(), candles);
        self
    }

    pub fn then(self, figi: &str, response: Result<Vec<FetchedCandle>, ProviderError>) -> Self {
        self.scripted
            .lock()
            .unwrap()
            .entry(figi.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called_figis(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.figi).collect()
    }
}

#[async_trait]
impl MarketDataProvider for ScriptedProvider {
    async fn list_instruments(&self) -> Result<Vec<Instrument>, ProviderError> {
        self.instruments
            .clone()
            .ok_or_else(|| ProviderError::Unavailable("connection refused".to_string()))
    }

    async fn get_candles(
        &self,
        figi: &str,
        window: FetchWindow,
        granularity: Granularity,
    ) -> Result<Vec<FetchedCandle>, ProviderError> {
        self.calls.lock().unwrap().push(ProviderCall {
            figi: figi.to_string(),
            window,
            granularity,
            at: tokio::time::Instant::now(),
        });

        let scripted = self
            .scripted
            .lock()
            .unwrap()
            .get_mut(figi)
            .and_then(|queue| queue.pop_front());

        match scripted {
            Some(response) => response,
            None => Ok(self.fallback.get(figi).cloned().unwrap_or_default()),
        }
    }
}

/// First-write-wins store keyed like the real unique constraint.
#[derive(Default)]
pub struct InMemoryCandleRepository {
    rows: Mutex<BTreeMap<(String, String, DateTime<Utc>), CandleRow>>,
    fail_inserts: AtomicBool,
}

impl InMemoryCandleRepository {
    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::Relaxed);
    }

    pub fn rows(&self, table: &str) -> Vec<CandleRow> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|((t, _, _), _)| t == table)
            .map(|(_, row)| row.clone())
            .collect()
    }

    pub fn total(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl CandleRepository for InMemoryCandleRepository {
    async fn ensure_table(&self, _table: &TableName) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn insert_if_absent(
        &self,
        table: &TableName,
        row: &CandleRow,
    ) -> Result<InsertOutcome, RepositoryError> {
        if self.fail_inserts.load(Ordering::Relaxed) {
            return Err(RepositoryError::ConnectionFailed(
                "connection reset by peer".to_string(),
            ));
        }

        let key = (
            table.as_str().to_string(),
            row.ticker().to_string(),
            row.begin_time(),
        );
        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(&key) {
            return Ok(InsertOutcome::Duplicate);
        }
        rows.insert(key, row.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn recent(&self, query: &CandleQuery) -> Result<Vec<CandleRow>, RepositoryError> {
        let mut rows: Vec<CandleRow> = self
            .rows(query.table.as_str())
            .into_iter()
            .filter(|row| query.ticker.as_deref().map_or(true, |t| row.ticker() == t))
            .collect();
        rows.sort_by_key(|row| std::cmp::Reverse(row.begin_time()));
        rows.truncate(query.limit as usize);
        Ok(rows)
    }
}

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Wall clock that follows tokio's (pausable) time source.
pub struct TokioClock {
    origin: DateTime<Utc>,
    start: tokio::time::Instant,
}

impl TokioClock {
    pub fn starting_at(origin: DateTime<Utc>) -> Self {
        Self {
            origin,
            start: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.start.elapsed()).unwrap();
        self.origin + elapsed
    }
}
