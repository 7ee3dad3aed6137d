use crate::ports::{CandleRepository, InsertOutcome, RepositoryError};
use async_trait::async_trait;
use ingestion_domain::{CandleError, CandleRow, FetchedCandle, IngestionTarget, Instrument};
use shaku::{Component, Interface};
use std::sync::Arc;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    Inserted,
    DuplicateSkipped,
}

#[async_trait]
pub trait CandleStore: Interface {
    async fn store(
        &self,
        candle: &FetchedCandle,
        instrument: &Instrument,
        target: &IngestionTarget,
    ) -> Result<StoreOutcome, StoreError>;
}

#[derive(Component)]
#[shaku(interface = CandleStore)]
pub struct CandleStoreImpl {
    #[shaku(inject)]
    repository: Arc<dyn CandleRepository>,
}

impl CandleStoreImpl {
    pub fn new(repository: Arc<dyn CandleRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl CandleStore for CandleStoreImpl {
    async fn store(
        &self,
        candle: &FetchedCandle,
        instrument: &Instrument,
        target: &IngestionTarget,
    ) -> Result<StoreOutcome, StoreError> {
        debug!("Candle.time: {:?}", candle.time);
        if !candle.is_complete {
            debug!("Candle for {} is still forming", instrument.ticker());
        }

        let row = CandleRow::from_fetched(instrument.ticker(), candle, target.granularity())
            .map_err(|e| {
                error!("Skipping candle for {}: {}", instrument.ticker(), e);
                StoreError::MalformedCandle(e)
            })?;

        debug!(
            "Resolved begin_time {} close_time {}",
            row.begin_time(),
            row.close_time()
        );

        let outcome = self
            .repository
            .insert_if_absent(target.table(), &row)
            .await
            .map_err(|e| {
                error!(
                    "Failed to store candle data for {}: {}",
                    instrument.ticker(),
                    e
                );
                StoreError::StoreFailed(e)
            })?;

        match outcome {
            InsertOutcome::Inserted => {
                info!(
                    "Stored candle data for {} in {}.",
                    instrument.ticker(),
                    target.table()
                );
                Ok(StoreOutcome::Inserted)
            }
            InsertOutcome::Duplicate => {
                debug!(
                    "Candle {} @ {} already in {}",
                    instrument.ticker(),
                    row.begin_time(),
                    target.table()
                );
                Ok(StoreOutcome::DuplicateSkipped)
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Malformed candle: {0}")]
    MalformedCandle(#[from] CandleError),

    #[error("Store failed: {0}")]
    StoreFailed(#[from] RepositoryError),
}
