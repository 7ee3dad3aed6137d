use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ingestion_application::ports::{MarketDataProvider, ProviderError};
use ingestion_domain::{
    CandlePrice, CandleTimestamp, FetchWindow, FetchedCandle, Granularity, Instrument, Quotation,
    TradingStatus,
};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shaku::Component;
use std::time::Duration;
use tracing::debug;

use crate::settings::ApiSettings;

const SHARES_METHOD: &str = "tinkoff.public.invest.api.contract.v1.InstrumentsService/Shares";
const CANDLES_METHOD: &str = "tinkoff.public.invest.api.contract.v1.MarketDataService/GetCandles";
const RATE_LIMIT_RESET_HEADER: &str = "x-ratelimit-reset";

/// Market data over the Tinkoff Invest REST gateway.
#[derive(Component)]
#[shaku(interface = MarketDataProvider)]
pub struct TinkoffRestProvider {
    client: reqwest::Client,
    api: ApiSettings,
}

impl TinkoffRestProvider {
    pub fn new(api: ApiSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            api,
        }
    }

    async fn call<B, R>(&self, method: &str, body: &B) -> Result<R, ProviderError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.api.base_url.trim_end_matches('/'), method);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api.token)
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let reset_after = response
                .headers()
                .get(RATE_LIMIT_RESET_HEADER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(ProviderError::Throttled { reset_after });
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ProviderError::Unavailable(format!(
                "{} returned {}: {}",
                method, status, detail
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ProviderError::InvalidResponse(format!("{}: {}", method, e)))
    }
}

#[async_trait]
impl MarketDataProvider for TinkoffRestProvider {
    async fn list_instruments(&self) -> Result<Vec<Instrument>, ProviderError> {
        let response: SharesResponse = self
            .call(
                SHARES_METHOD,
                &SharesRequest {
                    instrument_status: "INSTRUMENT_STATUS_BASE",
                },
            )
            .await?;

        Ok(response
            .instruments
            .into_iter()
            .map(|share| {
                Instrument::new(
                    share.figi,
                    share.ticker,
                    share.trading_status,
                    share.weekend_flag,
                )
            })
            .collect())
    }

    async fn get_candles(
        &self,
        figi: &str,
        window: FetchWindow,
        granularity: Granularity,
    ) -> Result<Vec<FetchedCandle>, ProviderError> {
        debug!(
            "Requesting {} candles for {} from {} to {}",
            granularity,
            figi,
            window.from(),
            window.to()
        );

        let response: CandlesResponse = self
            .call(
                CANDLES_METHOD,
                &CandlesRequest {
                    figi,
                    from: window.from(),
                    to: window.to(),
                    interval: candle_interval(granularity),
                },
            )
            .await?;

        Ok(response
            .candles
            .into_iter()
            .map(CandleDto::into_candle)
            .collect())
    }
}

fn candle_interval(granularity: Granularity) -> &'static str {
    match granularity {
        Granularity::TenMinutes => "CANDLE_INTERVAL_10_MIN",
        Granularity::Hour => "CANDLE_INTERVAL_HOUR",
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SharesRequest {
    instrument_status: &'static str,
}

#[derive(Serialize)]
struct CandlesRequest<'a> {
    figi: &'a str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    interval: &'static str,
}

#[derive(Deserialize)]
struct SharesResponse {
    #[serde(default)]
    instruments: Vec<ShareDto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShareDto {
    figi: String,
    ticker: String,
    #[serde(default = "unspecified_status")]
    trading_status: TradingStatus,
    // Zero-valued fields are omitted from gateway JSON.
    #[serde(default)]
    weekend_flag: bool,
}

fn unspecified_status() -> TradingStatus {
    TradingStatus::Unspecified
}

#[derive(Deserialize)]
struct CandlesResponse {
    #[serde(default)]
    candles: Vec<CandleDto>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CandleDto {
    open: QuotationDto,
    high: QuotationDto,
    low: QuotationDto,
    close: QuotationDto,
    #[serde(default)]
    time: Option<serde_json::Value>,
    #[serde(default)]
    is_complete: bool,
}

impl CandleDto {
    fn into_candle(self) -> FetchedCandle {
        FetchedCandle {
            time: candle_timestamp(self.time),
            open: self.open.into_price(),
            high: self.high.into_price(),
            low: self.low.into_price(),
            close: self.close.into_price(),
            is_complete: self.is_complete,
        }
    }
}

fn candle_timestamp(value: Option<serde_json::Value>) -> CandleTimestamp {
    match value {
        Some(serde_json::Value::String(raw)) => match DateTime::parse_from_rfc3339(&raw) {
            Ok(ts) => CandleTimestamp::Typed(ts.with_timezone(&Utc)),
            Err(_) => CandleTimestamp::Raw(raw),
        },
        Some(other) => CandleTimestamp::Unsupported(other.to_string()),
        None => CandleTimestamp::Unsupported("missing".to_string()),
    }
}

/// int64 values arrive as JSON strings; plain numbers are accepted too.
#[derive(Deserialize)]
#[serde(untagged)]
enum Int64Repr {
    Number(i64),
    Text(String),
}

impl Default for Int64Repr {
    fn default() -> Self {
        Int64Repr::Number(0)
    }
}

#[derive(Deserialize)]
struct QuotationDto {
    #[serde(default)]
    units: Int64Repr,
    #[serde(default)]
    nano: i32,
}

impl QuotationDto {
    fn into_price(self) -> CandlePrice {
        let units = match self.units {
            Int64Repr::Number(units) => units,
            Int64Repr::Text(raw) => match raw.trim().parse::<i64>() {
                Ok(units) => units,
                Err(e) => return CandlePrice::Malformed(format!("units {:?}: {}", raw, e)),
            },
        };
        match Quotation::new(units, self.nano) {
            Ok(quotation) => CandlePrice::Quoted(quotation),
            Err(e) => CandlePrice::Malformed(e.to_string()),
        }
    }
}
