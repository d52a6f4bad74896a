//! Shared fixtures for integration tests

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use regime_gate::config::PaperConfig;
use regime_gate::data::{TradeRecord, TradeRecordSink};
use regime_gate::execution::{EngineState, PaperExecutor};
use regime_gate::feed::{PriceSource, Zones};
use regime_gate::regime::Regime;
use regime_gate::retry::RetryPolicy;
use regime_gate::signal::{SetupSignal, SetupType};
use regime_gate::sink::JsonlSignalLog;
use regime_gate::store::JsonStore;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub fn t(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(secs)
}

#[derive(Default)]
pub struct StaticPrices {
    prices: Mutex<BTreeMap<String, Decimal>>,
}

impl StaticPrices {
    pub fn set(&self, symbol: &str, price: Decimal) {
        self.prices
            .lock()
            .unwrap()
            .insert(symbol.to_string(), price);
    }
}

#[async_trait]
impl PriceSource for StaticPrices {
    async fn latest_prices(
        &self,
        symbols: &BTreeSet<String>,
    ) -> anyhow::Result<BTreeMap<String, Decimal>> {
        let prices = self.prices.lock().unwrap();
        Ok(prices
            .iter()
            .filter(|(s, _)| symbols.contains(*s))
            .map(|(s, p)| (s.clone(), *p))
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryRecords {
    pub records: Mutex<Vec<TradeRecord>>,
}

impl MemoryRecords {
    pub fn snapshot(&self) -> Vec<TradeRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl TradeRecordSink for MemoryRecords {
    async fn record(&self, record: &TradeRecord) -> anyhow::Result<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// LONG mean-revert signal with explicit levels
pub fn long_signal(
    symbol: &str,
    ts: DateTime<Utc>,
    entry: Decimal,
    stop: Decimal,
    tp1: Decimal,
    tp2: Decimal,
) -> SetupSignal {
    SetupSignal {
        id: SetupSignal::derive_id(ts, symbol, SetupType::MeanRevertLong),
        timestamp: ts,
        symbol: symbol.to_string(),
        setup_type: SetupType::MeanRevertLong,
        direction: SetupType::MeanRevertLong.direction(),
        entry_price_reference: entry,
        stop_price: stop,
        take_profit: [tp1, tp2],
        regime_at_detection: Regime::Range,
        zones: Zones {
            upper_lo: tp2,
            upper_hi: tp2 + dec!(1),
            lower_lo: entry - dec!(1),
            lower_hi: entry,
            width_pct: dec!(0.3),
        },
        close: entry + dec!(0.5),
        width_pct: dec!(0.3),
        oi_delta_15m: None,
    }
}

pub struct PaperFixture {
    pub log: Arc<JsonlSignalLog>,
    pub prices: Arc<StaticPrices>,
    pub records: Arc<MemoryRecords>,
    pub state_path: PathBuf,
    pub config: PaperConfig,
}

impl PaperFixture {
    pub fn new(dir: &Path, config: PaperConfig) -> Self {
        Self {
            log: Arc::new(JsonlSignalLog::new(dir.join("signals.jsonl"))),
            prices: Arc::new(StaticPrices::default()),
            records: Arc::new(MemoryRecords::default()),
            state_path: dir.join("paper_state.json"),
            config,
        }
    }

    pub async fn executor(&self) -> PaperExecutor {
        PaperExecutor::open(
            &self.config,
            self.log.clone(),
            self.prices.clone(),
            JsonStore::new(&self.state_path),
            self.records.clone(),
            RetryPolicy::default().max_attempts(1),
            t(0),
        )
        .await
        .unwrap()
    }

    pub async fn stored_state(&self) -> Option<EngineState> {
        JsonStore::new(&self.state_path).load().await.unwrap()
    }
}
