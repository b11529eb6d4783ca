use async_trait::async_trait;
use thiserror::Error;

use common::models::Candle;

/// Upstream failures must be distinguishable; the provider never returns
/// a silently empty series.
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upstream rejected request: {0}")]
    Upstream(String),
    #[error("malformed upstream response: {0}")]
    Malformed(String),
    #[error("market data api key not configured")]
    MissingApiKey,
}

/// Market data collaborator: OHLC history plus a current-price quote.
/// Candle sequences are returned oldest first.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn fetch_candles(
        &self,
        symbol: &str,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketDataError>;

    async fn fetch_current_price(&self, symbol: &str) -> Result<f64, MarketDataError>;
}
