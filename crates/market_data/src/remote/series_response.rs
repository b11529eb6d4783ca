use serde::Deserialize;

use common::models::Candle;

use crate::traits::MarketDataError;

/// `/time_series` payload. On error the API answers 200 with a `status`
/// of "error" and a message instead of `values`.
#[derive(Debug, Deserialize)]
pub struct TimeSeriesResponse {
    pub status: Option<String>,
    pub code: Option<i64>,
    pub message: Option<String>,
    pub values: Option<Vec<RawBar>>,
}

/// One bar as delivered upstream: prices are decimal strings, rows are
/// ordered newest first.
#[derive(Debug, Deserialize)]
pub struct RawBar {
    pub datetime: String,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
}

impl RawBar {
    pub fn to_candle(&self) -> Result<Candle, MarketDataError> {
        let parse = |field: &str, raw: &str| {
            raw.parse::<f64>().map_err(|_| {
                MarketDataError::Malformed(format!("bad {field} price {raw:?} at {}", self.datetime))
            })
        };
        Ok(Candle {
            open: parse("open", &self.open)?,
            high: parse("high", &self.high)?,
            low: parse("low", &self.low)?,
            close: parse("close", &self.close)?,
        })
    }
}

impl TimeSeriesResponse {
    /// Chronological candles (oldest first), or a distinguishable error.
    pub fn into_candles(self) -> Result<Vec<Candle>, MarketDataError> {
        if self.status.as_deref() == Some("error") || self.code.is_some() {
            return Err(MarketDataError::Upstream(
                self.message.unwrap_or_else(|| "unknown api error".to_string()),
            ));
        }
        let rows = self
            .values
            .ok_or_else(|| MarketDataError::Malformed("missing values array".to_string()))?;
        let mut candles = rows
            .iter()
            .map(RawBar::to_candle)
            .collect::<Result<Vec<_>, _>>()?;
        candles.reverse();
        Ok(candles)
    }
}

/// `/price` payload.
#[derive(Debug, Deserialize)]
pub struct PriceResponse {
    pub price: Option<String>,
    pub status: Option<String>,
    pub message: Option<String>,
}

impl PriceResponse {
    pub fn into_price(self) -> Result<f64, MarketDataError> {
        if self.status.as_deref() == Some("error") {
            return Err(MarketDataError::Upstream(
                self.message.unwrap_or_else(|| "unknown api error".to_string()),
            ));
        }
        let raw = self
            .price
            .ok_or_else(|| MarketDataError::Malformed("missing price field".to_string()))?;
        raw.parse::<f64>()
            .map_err(|_| MarketDataError::Malformed(format!("bad price {raw:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_is_reversed_to_chronological_order() {
        let json = r#"{
            "status": "ok",
            "values": [
                {"datetime": "2026-01-17 10:15:00", "open": "1.0852", "high": "1.0860", "low": "1.0850", "close": "1.0858"},
                {"datetime": "2026-01-17 10:00:00", "open": "1.0845", "high": "1.0855", "low": "1.0843", "close": "1.0852"}
            ]
        }"#;
        let resp: TimeSeriesResponse = serde_json::from_str(json).unwrap();
        let candles = resp.into_candles().unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].close, 1.0852);
        assert_eq!(candles[1].close, 1.0858);
    }

    #[test]
    fn test_upstream_error_payload_is_distinguishable() {
        let json = r#"{"code": 400, "message": "symbol not found", "status": "error"}"#;
        let resp: TimeSeriesResponse = serde_json::from_str(json).unwrap();
        match resp.into_candles() {
            Err(MarketDataError::Upstream(msg)) => assert!(msg.contains("symbol not found")),
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[test]
    fn test_unparseable_price_is_malformed() {
        let json = r#"{
            "values": [
                {"datetime": "2026-01-17 10:00:00", "open": "x", "high": "1.0", "low": "1.0", "close": "1.0"}
            ]
        }"#;
        let resp: TimeSeriesResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(
            resp.into_candles(),
            Err(MarketDataError::Malformed(_))
        ));
    }

    #[test]
    fn test_price_response_parses() {
        let resp: PriceResponse = serde_json::from_str(r#"{"price": "1.08500"}"#).unwrap();
        assert_eq!(resp.into_price().unwrap(), 1.085);
    }
}
