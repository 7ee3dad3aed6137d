use crate::ports::{MarketDataProvider, ProviderError};
use async_trait::async_trait;
use ingestion_domain::{FetchWindow, FetchedCandle, Granularity, Instrument};
use shaku::{Component, Interface};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrottlePolicy {
    /// Suspension used when a throttled response carries no reset hint.
    pub default_reset: Duration,
    /// Pause after every request attempt, successful or not.
    pub request_pause: Duration,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            default_reset: Duration::from_secs(60),
            request_pause: Duration::from_millis(100),
        }
    }
}

#[async_trait]
pub trait CandleFetcher: Interface {
    async fn fetch(
        &self,
        instrument: &Instrument,
        window: FetchWindow,
        granularity: Granularity,
    ) -> Result<Vec<FetchedCandle>, FetchError>;
}

#[derive(Component)]
#[shaku(interface = CandleFetcher)]
pub struct CandleFetcherImpl {
    #[shaku(inject)]
    provider: Arc<dyn MarketDataProvider>,
    policy: ThrottlePolicy,
}

impl CandleFetcherImpl {
    pub fn new(provider: Arc<dyn MarketDataProvider>, policy: ThrottlePolicy) -> Self {
        Self { provider, policy }
    }

    async fn attempt(
        &self,
        instrument: &Instrument,
        window: FetchWindow,
        granularity: Granularity,
    ) -> Result<Vec<FetchedCandle>, ProviderError> {
        let result = self
            .provider
            .get_candles(instrument.figi(), window, granularity)
            .await;
        tokio::time::sleep(self.policy.request_pause).await;
        result
    }
}

#[async_trait]
impl CandleFetcher for CandleFetcherImpl {
    async fn fetch(
        &self,
        instrument: &Instrument,
        window: FetchWindow,
        granularity: Granularity,
    ) -> Result<Vec<FetchedCandle>, FetchError> {
        info!(
            "Fetching candles for {} (FIGI: {}) from {} to {}",
            instrument.ticker(),
            instrument.figi(),
            window.from().to_rfc3339(),
            window.to().to_rfc3339()
        );

        let reset_after = match self.attempt(instrument, window, granularity).await {
            Ok(candles) => {
                debug!(
                    "Number of candles fetched for {}: {}",
                    instrument.ticker(),
                    candles.len()
                );
                return Ok(candles);
            }
            Err(ProviderError::Throttled { reset_after }) => {
                reset_after.unwrap_or(self.policy.default_reset)
            }
            Err(e) => {
                error!("Failed to fetch candles for {}: {}", instrument.ticker(), e);
                return Err(FetchError::Transient(e));
            }
        };

        warn!(
            "Rate limit exceeded for {}. Sleeping for {} seconds.",
            instrument.ticker(),
            reset_after.as_secs_f64()
        );
        tokio::time::sleep(reset_after).await;

        match self.attempt(instrument, window, granularity).await {
            Ok(candles) => {
                debug!(
                    "Number of candles fetched for {} after retry: {}",
                    instrument.ticker(),
                    candles.len()
                );
                Ok(candles)
            }
            Err(ProviderError::Throttled { .. }) => {
                error!(
                    "Retry for {} throttled again, skipping until next run",
                    instrument.ticker()
                );
                Err(FetchError::Throttled)
            }
            Err(e) => {
                error!("Retry failed for {}: {}", instrument.ticker(), e);
                Err(FetchError::Transient(e))
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Throttled after retry")]
    Throttled,

    #[error("Fetch failed: {0}")]
    Transient(#[source] ProviderError),
}
