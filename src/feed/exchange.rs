//! Composite feed over Binance and Bybit

use super::indicators::{atr, compute_zones, pct_change_15m, ATR_PERIOD};
use super::{
    AltQuote, BinanceRest, BybitRest, FeedError, HealthEvent, IndicatorFeed, IndicatorSnapshot,
    PriceSource, ReferenceIndicators, RestClient,
};
use crate::config::{FeedConfig, ScannerConfig};
use async_trait::async_trait;
use chrono::Utc;
use futures_util::future::join_all;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

const KLINES_1M_LIMIT: u32 = 240;
const KLINES_15M_LIMIT: u32 = 80;

/// Live indicator feed and price source
pub struct ExchangeFeed {
    http: Arc<RestClient>,
    binance: BinanceRest,
    bybit: BybitRest,
    reference_symbol: String,
    alt_symbols: Vec<String>,
    cross_pairs: BTreeSet<String>,
    zone_lookback: usize,
}

impl ExchangeFeed {
    pub fn new(feed: &FeedConfig, scanner: &ScannerConfig) -> anyhow::Result<Self> {
        let http = Arc::new(RestClient::new(feed)?);
        Ok(Self {
            binance: BinanceRest::new(
                http.clone(),
                &feed.binance_futures_url,
                &feed.binance_spot_url,
            ),
            bybit: BybitRest::new(http.clone(), &feed.bybit_url),
            http,
            reference_symbol: scanner.reference_symbol.clone(),
            alt_symbols: scanner.alt_symbols.clone(),
            cross_pairs: scanner.cross_pairs.iter().cloned().collect(),
            zone_lookback: scanner.zone_lookback_minutes,
        })
    }

    async fn reference(&self) -> ReferenceIndicators {
        let symbol = self.reference_symbol.as_str();
        let (funding, bars_1m, bars_15m, oi) = tokio::join!(
            self.binance.funding_rate(symbol),
            self.binance.futures_klines(symbol, "1m", KLINES_1M_LIMIT),
            self.binance.futures_klines(symbol, "15m", KLINES_15M_LIMIT),
            self.bybit.oi_delta_15m(symbol),
        );

        let bars_1m = ok_or_log(bars_1m, symbol, "1m klines").unwrap_or_default();
        let atr_15m = ok_or_log(bars_15m, symbol, "15m klines")
            .and_then(|bars| atr(&bars, ATR_PERIOD));

        ReferenceIndicators {
            price: bars_1m.last().map(|b| b.close),
            px_change_15m_pct: pct_change_15m(&bars_1m),
            funding_rate: ok_or_log(funding, symbol, "funding"),
            oi_delta_15m: ok_or_log(oi, symbol, "open interest"),
            zones: compute_zones(&bars_1m, atr_15m, self.zone_lookback),
        }
    }

    async fn alt_quote(&self, symbol: &str) -> Option<AltQuote> {
        let (bars_1m, bars_15m) = tokio::join!(
            self.binance.futures_klines(symbol, "1m", KLINES_1M_LIMIT),
            self.binance.futures_klines(symbol, "15m", KLINES_15M_LIMIT),
        );
        let bars_1m = ok_or_log(bars_1m, symbol, "1m klines")?;
        let bars_15m = ok_or_log(bars_15m, symbol, "15m klines")?;

        if bars_1m.len() < 3 {
            return None;
        }
        let zones = compute_zones(&bars_1m, atr(&bars_15m, ATR_PERIOD), self.zone_lookback)?;
        let last_bar = bars_1m[bars_1m.len() - 1];
        let prev_bar = bars_1m[bars_1m.len() - 2];

        Some(AltQuote {
            symbol: symbol.to_string(),
            price: last_bar.close,
            last_bar,
            prev_bar,
            zones,
            cross_pair_change_15m_pct: self.cross_pair_change(symbol).await,
        })
    }

    /// 15m change of the alt/BTC spot cross, if that cross is watched
    async fn cross_pair_change(&self, symbol: &str) -> Option<Decimal> {
        let cross = cross_pair_for(symbol)?;
        if !self.cross_pairs.contains(&cross) {
            return None;
        }
        let bars = self
            .binance
            .spot_klines(&cross, "1m", KLINES_1M_LIMIT)
            .await;
        ok_or_log(bars, &cross, "cross-pair klines").and_then(|bars| pct_change_15m(&bars))
    }
}

/// `ETHUSDT` -> `ETHBTC`
fn cross_pair_for(symbol: &str) -> Option<String> {
    let base = symbol.strip_suffix("USDT")?;
    (!base.is_empty()).then(|| format!("{}BTC", base))
}

fn ok_or_log<T>(result: Result<T, FeedError>, symbol: &str, what: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(symbol, what, error = %e, "Data unavailable this tick");
            None
        }
    }
}

#[async_trait]
impl IndicatorFeed for ExchangeFeed {
    async fn snapshot(&self) -> anyhow::Result<IndicatorSnapshot> {
        let timestamp = Utc::now();
        let reference = self.reference().await;

        let quotes = join_all(self.alt_symbols.iter().map(|s| self.alt_quote(s))).await;
        let alts = quotes
            .into_iter()
            .flatten()
            .map(|q| (q.symbol.clone(), q))
            .collect();

        Ok(IndicatorSnapshot {
            timestamp,
            reference,
            alts,
        })
    }

    fn drain_health_events(&self) -> Vec<HealthEvent> {
        self.http.drain_health_events()
    }
}

#[async_trait]
impl PriceSource for ExchangeFeed {
    async fn latest_prices(
        &self,
        symbols: &BTreeSet<String>,
    ) -> anyhow::Result<BTreeMap<String, Decimal>> {
        let results = join_all(symbols.iter().map(|s| async move {
            let price = self.binance.ticker_price(s).await;
            ok_or_log(price, s, "ticker price").map(|p| (s.clone(), p))
        }))
        .await;

        Ok(results.into_iter().flatten().collect())
    }
}
