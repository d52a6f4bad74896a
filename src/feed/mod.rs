//! Indicator feed module
//!
//! Polls exchange REST endpoints and assembles [`IndicatorSnapshot`]s for the
//! scanner and latest prices for the paper engine

mod binance;
mod bybit;
mod exchange;
mod health;
mod http;
pub mod indicators;
mod types;

pub use binance::BinanceRest;
pub use bybit::BybitRest;
pub use exchange::ExchangeFeed;
pub use health::{HealthEvent, HealthMonitor, Source};
pub use http::RestClient;
pub use types::{AltQuote, Bar, IndicatorSnapshot, ReferenceIndicators, Zones};

use crate::retry::Retryable;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Data source errors
#[derive(Debug, Error)]
pub enum FeedError {
    /// Network failure, timeout, or interrupted body
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// Non-success HTTP status
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },
    /// Response did not have the expected shape
    #[error("bad response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

impl Retryable for FeedError {
    fn is_retryable(&self) -> bool {
        match self {
            FeedError::Transport { .. } => true,
            FeedError::Status { status, .. } => *status == 429 || *status >= 500,
            FeedError::Decode { .. } => false,
        }
    }
}

/// Source of indicator snapshots for the scanner
#[async_trait]
pub trait IndicatorFeed: Send + Sync {
    /// Poll all sources once. Missing data shows up as `None` fields or
    /// absent alts, not as an error.
    async fn snapshot(&self) -> anyhow::Result<IndicatorSnapshot>;

    /// Health transitions observed since the last call
    fn drain_health_events(&self) -> Vec<HealthEvent> {
        Vec::new()
    }
}

/// Source of latest prices for the paper engine
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Latest price per symbol; symbols that could not be priced are absent
    async fn latest_prices(
        &self,
        symbols: &BTreeSet<String>,
    ) -> anyhow::Result<BTreeMap<String, Decimal>>;
}
