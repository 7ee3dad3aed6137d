mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{candle_at, moscow, ScriptedProvider};
use ingestion_application::{
    CandleFetcher, CandleFetcherImpl, FetchError, ProviderError, ThrottlePolicy,
};
use ingestion_domain::{FetchWindow, Granularity, Instrument, TradingStatus};

const FIGI: &str = "BBG004730N88";

fn sber() -> Instrument {
    Instrument::new(FIGI, "SBER", TradingStatus::NormalTrading, false)
}

fn window() -> FetchWindow {
    FetchWindow::trailing(moscow(2025, 3, 12, 14, 0), Granularity::TenMinutes)
}

fn throttled(secs: Option<u64>) -> Result<Vec<ingestion_domain::FetchedCandle>, ProviderError> {
    Err(ProviderError::Throttled {
        reset_after: secs.map(Duration::from_secs),
    })
}

fn fetcher(provider: Arc<ScriptedProvider>) -> CandleFetcherImpl {
    CandleFetcherImpl::new(provider, ThrottlePolicy::default())
}

#[tokio::test(start_paused = true)]
async fn retries_once_after_provider_reset_hint() {
    let candle = candle_at(moscow(2025, 3, 12, 13, 50), 300);
    let provider = Arc::new(
        ScriptedProvider::with_instruments(vec![sber()])
            .then(FIGI, throttled(Some(5)))
            .then(FIGI, Ok(vec![candle.clone()])),
    );

    let candles = fetcher(provider.clone())
        .fetch(&sber(), window(), Granularity::TenMinutes)
        .await
        .unwrap();

    assert_eq!(candles, vec![candle]);
    let calls = provider.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[1].at - calls[0].at >= Duration::from_secs(5));
    assert_eq!(calls[0].window, calls[1].window);
}

#[tokio::test(start_paused = true)]
async fn second_throttle_skips_instrument() {
    let provider = Arc::new(
        ScriptedProvider::with_instruments(vec![sber()])
            .then(FIGI, throttled(Some(5)))
            .then(FIGI, throttled(Some(5)))
            .then(FIGI, Ok(vec![candle_at(moscow(2025, 3, 12, 13, 50), 300)])),
    );

    let result = fetcher(provider.clone())
        .fetch(&sber(), window(), Granularity::TenMinutes)
        .await;

    assert!(matches!(result, Err(FetchError::Throttled)));
    assert_eq!(provider.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn missing_reset_hint_waits_default_sixty_seconds() {
    let provider = Arc::new(
        ScriptedProvider::with_instruments(vec![sber()])
            .then(FIGI, throttled(None))
            .then(FIGI, Ok(Vec::new())),
    );

    let started = tokio::time::Instant::now();
    let candles = fetcher(provider.clone())
        .fetch(&sber(), window(), Granularity::TenMinutes)
        .await
        .unwrap();

    assert!(candles.is_empty());
    assert!(started.elapsed() >= Duration::from_secs(60));
    let calls = provider.calls();
    assert!(calls[1].at - calls[0].at >= Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn non_throttling_failure_is_not_retried() {
    let provider = Arc::new(
        ScriptedProvider::with_instruments(vec![sber()]).then(
            FIGI,
            Err(ProviderError::Unavailable("502 Bad Gateway".to_string())),
        ),
    );

    let result = fetcher(provider.clone())
        .fetch(&sber(), window(), Granularity::TenMinutes)
        .await;

    assert!(matches!(
        result,
        Err(FetchError::Transient(ProviderError::Unavailable(_)))
    ));
    assert_eq!(provider.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn failure_on_retry_is_transient() {
    let provider = Arc::new(
        ScriptedProvider::with_instruments(vec![sber()])
            .then(FIGI, throttled(Some(1)))
            .then(
                FIGI,
                Err(ProviderError::InvalidResponse("missing field `candles`".to_string())),
            ),
    );

    let result = fetcher(provider.clone())
        .fetch(&sber(), window(), Granularity::TenMinutes)
        .await;

    assert!(matches!(
        result,
        Err(FetchError::Transient(ProviderError::InvalidResponse(_)))
    ));
    assert_eq!(provider.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn pauses_after_every_attempt() {
    let provider = Arc::new(ScriptedProvider::with_instruments(vec![sber()]));
    let fetcher = fetcher(provider.clone());

    let started = tokio::time::Instant::now();
    fetcher
        .fetch(&sber(), window(), Granularity::TenMinutes)
        .await
        .unwrap();
    assert!(started.elapsed() >= Duration::from_millis(100));

    fetcher
        .fetch(&sber(), window(), Granularity::TenMinutes)
        .await
        .unwrap();
    let calls = provider.calls();
    assert!(calls[1].at - calls[0].at >= Duration::from_millis(100));
}
