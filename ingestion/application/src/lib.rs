pub mod catalog;
pub mod fetcher;
pub mod ports;
pub mod scheduler;
pub mod services;
pub mod store;

pub use catalog::{Catalog, CatalogError, InstrumentCatalog, InstrumentCatalogImpl};
pub use fetcher::{CandleFetcher, CandleFetcherImpl, FetchError, ThrottlePolicy};
pub use ports::{
    CandleQuery, CandleRepository, Clock, InsertOutcome, MarketDataProvider, ProviderError,
    RepositoryError,
};
pub use scheduler::{
    ScheduledTarget, Scheduler, SchedulerConfig, SchedulerError, SchedulerState,
};
pub use services::{IngestionService, IngestionServiceImpl, RunReport};
pub use store::{CandleStore, CandleStoreImpl, StoreError, StoreOutcome};
