use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use common::models::Candle;

use crate::remote::{PriceResponse, TimeSeriesResponse};
use crate::traits::{MarketDataError, MarketDataProvider};

const DEFAULT_BASE_URL: &str = "https://api.twelvedata.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// TwelveData REST client. A missing api key is not fatal at startup;
/// every fetch then fails with `MissingApiKey` and the engine degrades
/// to stabilizer signals.
#[derive(Clone)]
pub struct TwelveDataClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl TwelveDataClient {
    pub fn from_env() -> Self {
        let api_key = env::var("TWELVE_DATA_API_KEY").ok();
        if api_key.is_none() {
            warn!("TWELVE_DATA_API_KEY not set, market data disabled (stabilizer only)");
        }
        let base_url =
            env::var("TWELVE_DATA_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
            base_url,
            api_key,
        }
    }

    fn api_key(&self) -> Result<&str, MarketDataError> {
        self.api_key.as_deref().ok_or(MarketDataError::MissingApiKey)
    }
}

#[async_trait]
impl MarketDataProvider for TwelveDataClient {
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let api_key = self.api_key()?;
        let url = format!("{}/time_series", self.base_url);

        debug!(symbol, interval, limit, "fetching candle series");

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("symbol", symbol),
                ("interval", interval),
                ("outputsize", &limit.to_string()),
                ("apikey", api_key),
            ])
            .send()
            .await?
            .error_for_status()?;

        let series: TimeSeriesResponse = resp.json().await?;
        let candles = series.into_candles()?;
        debug!(symbol, count = candles.len(), "received candle series");
        Ok(candles)
    }

    async fn fetch_current_price(&self, symbol: &str) -> Result<f64, MarketDataError> {
        let api_key = self.api_key()?;
        let url = format!("{}/price", self.base_url);

        let resp = self
            .client
            .get(&url)
            .query(&[("symbol", symbol), ("apikey", api_key)])
            .send()
            .await?
            .error_for_status()?;

        let quote: PriceResponse = resp.json().await?;
        quote.into_price()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockMarketDataProvider;

    #[tokio::test]
    async fn test_missing_api_key_is_a_distinguishable_error() {
        let client = TwelveDataClient {
            client: Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
        };
        assert!(matches!(
            client.fetch_candles("EUR/USD", "15min", 50).await,
            Err(MarketDataError::MissingApiKey)
        ));
        assert!(matches!(
            client.fetch_current_price("EUR/USD").await,
            Err(MarketDataError::MissingApiKey)
        ));
    }

    #[tokio::test]
    async fn test_provider_trait_is_mockable() {
        let mut mock = MockMarketDataProvider::new();
        mock.expect_fetch_current_price()
            .returning(|_| Ok(1.0858));
        assert_eq!(mock.fetch_current_price("EUR/USD").await.unwrap(), 1.0858);
    }
}
