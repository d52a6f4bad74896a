//! Bybit open interest history

use super::indicators::oi_delta;
use super::{FeedError, RestClient, Source};
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct OiResponse {
    result: OiResult,
}

#[derive(Debug, Deserialize)]
struct OiResult {
    #[serde(default)]
    list: Vec<OiPoint>,
}

#[derive(Debug, Deserialize)]
struct OiPoint {
    #[serde(rename = "openInterest")]
    open_interest: String,
    timestamp: String,
}

/// Bybit v5 market adapter
pub struct BybitRest {
    http: Arc<RestClient>,
    base_url: String,
}

impl BybitRest {
    pub fn new(http: Arc<RestClient>, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Open interest change over the last 15 minutes (four 5 minute points)
    pub async fn oi_delta_15m(&self, symbol: &str) -> Result<Decimal, FeedError> {
        let url = format!("{}/v5/market/open-interest", self.base_url);
        let query = [
            ("category", "linear".to_string()),
            ("symbol", symbol.to_string()),
            ("intervalTime", "5min".to_string()),
            ("limit", "4".to_string()),
        ];
        let response: OiResponse = self.http.get_json(Source::Bybit, &url, &query).await?;

        let points = parse_points(&response.result.list);
        oi_delta(&points).ok_or_else(|| FeedError::Decode {
            url,
            reason: format!("{} usable open interest points", points.len()),
        })
    }
}

fn parse_points(list: &[OiPoint]) -> Vec<(DateTime<Utc>, Decimal)> {
    list.iter()
        .filter_map(|p| {
            let ms = p.timestamp.parse::<i64>().ok()?;
            let ts = Utc.timestamp_millis_opt(ms).single()?;
            let oi = Decimal::from_str(&p.open_interest).ok()?;
            Some((ts, oi))
        })
        .collect()
}
