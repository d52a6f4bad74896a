//! Binance REST endpoints (USD-M futures and spot)

use super::{Bar, FeedError, RestClient, Source};
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;

/// Premium index response (funding)
#[derive(Debug, Deserialize)]
struct PremiumIndex {
    #[serde(rename = "lastFundingRate")]
    last_funding_rate: String,
}

/// Ticker price response
#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: String,
}

/// Binance futures and spot REST adapter
pub struct BinanceRest {
    http: Arc<RestClient>,
    futures_url: String,
    spot_url: String,
}

impl BinanceRest {
    pub fn new(http: Arc<RestClient>, futures_url: &str, spot_url: &str) -> Self {
        Self {
            http,
            futures_url: futures_url.trim_end_matches('/').to_string(),
            spot_url: spot_url.trim_end_matches('/').to_string(),
        }
    }

    /// Futures klines, oldest first
    pub async fn futures_klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<Bar>, FeedError> {
        let url = format!("{}/fapi/v1/klines", self.futures_url);
        self.klines(Source::BinanceFutures, &url, symbol, interval, limit)
            .await
    }

    /// Spot klines, oldest first
    pub async fn spot_klines(
        &self,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<Bar>, FeedError> {
        let url = format!("{}/api/v3/klines", self.spot_url);
        self.klines(Source::BinanceSpot, &url, symbol, interval, limit)
            .await
    }

    async fn klines(
        &self,
        source: Source,
        url: &str,
        symbol: &str,
        interval: &str,
        limit: u32,
    ) -> Result<Vec<Bar>, FeedError> {
        let query = [
            ("symbol", symbol.to_string()),
            ("interval", interval.to_string()),
            ("limit", limit.to_string()),
        ];
        let rows: Vec<Vec<Value>> = self.http.get_json(source, url, &query).await?;
        parse_klines(&rows).ok_or_else(|| FeedError::Decode {
            url: url.to_string(),
            reason: "malformed kline row".to_string(),
        })
    }

    /// Latest funding rate from the premium index
    pub async fn funding_rate(&self, symbol: &str) -> Result<Decimal, FeedError> {
        let url = format!("{}/fapi/v1/premiumIndex", self.futures_url);
        let query = [("symbol", symbol.to_string())];
        let index: PremiumIndex = self
            .http
            .get_json(Source::BinanceFutures, &url, &query)
            .await?;
        parse_decimal(&index.last_funding_rate).ok_or_else(|| FeedError::Decode {
            url,
            reason: format!("bad funding rate {:?}", index.last_funding_rate),
        })
    }

    /// Latest futures trade price
    pub async fn ticker_price(&self, symbol: &str) -> Result<Decimal, FeedError> {
        let url = format!("{}/fapi/v1/ticker/price", self.futures_url);
        let query = [("symbol", symbol.to_string())];
        let ticker: TickerPrice = self
            .http
            .get_json(Source::BinanceFutures, &url, &query)
            .await?;
        parse_decimal(&ticker.price).ok_or_else(|| FeedError::Decode {
            url,
            reason: format!("bad price {:?}", ticker.price),
        })
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

fn value_decimal(v: &Value) -> Option<Decimal> {
    match v {
        Value::String(s) => parse_decimal(s),
        Value::Number(n) => parse_decimal(&n.to_string()),
        _ => None,
    }
}

/// Parse kline rows `[open_time, open, high, low, close, ...]`
pub(crate) fn parse_klines(rows: &[Vec<Value>]) -> Option<Vec<Bar>> {
    rows.iter()
        .map(|row| {
            if row.len() < 5 {
                return None;
            }
            let open_ms = row[0].as_i64()?;
            Some(Bar {
                open_time: Utc.timestamp_millis_opt(open_ms).single()?,
                open: value_decimal(&row[1])?,
                high: value_decimal(&row[2])?,
                low: value_decimal(&row[3])?,
                close: value_decimal(&row[4])?,
            })
        })
        .collect()
}
