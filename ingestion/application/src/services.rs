use crate::catalog::{Catalog, InstrumentCatalog};
use crate::fetcher::CandleFetcher;
use crate::ports::Clock;
use crate::store::{CandleStore, StoreError, StoreOutcome};
use async_trait::async_trait;
use ingestion_domain::{FetchWindow, IngestionTarget, TableName};
use shaku::{Component, Interface};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// One ingestion pass for a target. Never fails: every per-instrument or
/// per-candle problem is logged and counted in the report.
#[async_trait]
pub trait IngestionService: Interface {
    async fn run(&self, target: &IngestionTarget) -> RunReport;

    /// Same as [`IngestionService::run`] against an already resolved catalog.
    async fn run_with_catalog(&self, target: &IngestionTarget, catalog: &Catalog) -> RunReport;
}

#[derive(Component)]
#[shaku(interface = IngestionService)]
pub struct IngestionServiceImpl {
    #[shaku(inject)]
    catalog: Arc<dyn InstrumentCatalog>,
    #[shaku(inject)]
    fetcher: Arc<dyn CandleFetcher>,
    #[shaku(inject)]
    store: Arc<dyn CandleStore>,
    #[shaku(inject)]
    clock: Arc<dyn Clock>,
}

impl IngestionServiceImpl {
    pub fn new(
        catalog: Arc<dyn InstrumentCatalog>,
        fetcher: Arc<dyn CandleFetcher>,
        store: Arc<dyn CandleStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            fetcher,
            store,
            clock,
        }
    }
}

#[async_trait]
impl IngestionService for IngestionServiceImpl {
    async fn run(&self, target: &IngestionTarget) -> RunReport {
        let catalog = self.catalog.snapshot().await;
        self.run_with_catalog(target, &catalog).await
    }

    async fn run_with_catalog(&self, target: &IngestionTarget, catalog: &Catalog) -> RunReport {
        let mut report = RunReport::new(target.table().clone());
        info!(
            run_id = %report.run_id,
            "Starting {} {} run into {}",
            target.granularity(),
            target.segment(),
            target.table()
        );

        for instrument in catalog.in_segment(target.segment()) {
            report.instruments_selected += 1;

            let window = FetchWindow::trailing(self.clock.now(), target.granularity());
            let candles = match self
                .fetcher
                .fetch(instrument, window, target.granularity())
                .await
            {
                Ok(candles) => candles,
                Err(e) => {
                    warn!("Skipping {} for this run: {}", instrument.ticker(), e);
                    report.instruments_skipped += 1;
                    continue;
                }
            };
            report.instruments_fetched += 1;

            for candle in &candles {
                match self.store.store(candle, instrument, target).await {
                    Ok(StoreOutcome::Inserted) => report.inserted += 1,
                    Ok(StoreOutcome::DuplicateSkipped) => report.duplicates += 1,
                    Err(StoreError::MalformedCandle(_)) => report.malformed += 1,
                    Err(StoreError::StoreFailed(_)) => report.store_failures += 1,
                }
            }
        }

        info!(run_id = %report.run_id, "{}", report);
        report
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: Uuid,
    pub table: TableName,
    pub instruments_selected: usize,
    pub instruments_fetched: usize,
    pub instruments_skipped: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub malformed: usize,
    pub store_failures: usize,
}

impl RunReport {
    pub fn new(table: TableName) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            table,
            instruments_selected: 0,
            instruments_fetched: 0,
            instruments_skipped: 0,
            inserted: 0,
            duplicates: 0,
            malformed: 0,
            store_failures: 0,
        }
    }
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Run into {} finished: {} selected, {} fetched, {} skipped, ",
            self.table,
            self.instruments_selected,
            self.instruments_fetched,
            self.instruments_skipped,
        )?;
        write!(
            f,
            "{} inserted, {} duplicates, {} malformed, {} store failures",
            self.inserted,
            self.duplicates,
            self.malformed,
            self.store_failures
        )
    }
}
