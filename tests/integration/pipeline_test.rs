//! Scanner to signal log to paper executor

use crate::common::{t, PaperFixture};
use async_trait::async_trait;
use chrono::Duration;
use regime_gate::config::{Config, PaperConfig};
use regime_gate::engine::Scanner;
use regime_gate::execution::{CloseReason, TradeState};
use regime_gate::feed::{
    AltQuote, Bar, IndicatorFeed, IndicatorSnapshot, ReferenceIndicators, Zones,
};
use regime_gate::notify::LogNotifier;
use regime_gate::regime::Regime;
use regime_gate::signal::{SetupSignal, SetupType};
use regime_gate::sink::SignalSource;
use regime_gate::store::JsonStore;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;

struct ScriptedFeed {
    snapshots: Mutex<VecDeque<IndicatorSnapshot>>,
}

#[async_trait]
impl IndicatorFeed for ScriptedFeed {
    async fn snapshot(&self) -> anyhow::Result<IndicatorSnapshot> {
        self.snapshots
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("script exhausted"))
    }
}

fn zones() -> Zones {
    Zones {
        upper_lo: dec!(110),
        upper_hi: dec!(111),
        lower_lo: dec!(99),
        lower_hi: dec!(100),
        width_pct: dec!(0.3),
    }
}

/// Quiet tape (RANGE) while ETHUSDT wicks into the lower zone and closes
/// back above it
fn range_snapshot(secs: i64) -> IndicatorSnapshot {
    let ts = t(secs);
    let bar = |open_time, high: Decimal, low: Decimal, close: Decimal| Bar {
        open_time,
        open: close,
        high,
        low,
        close,
    };
    let quote = AltQuote {
        symbol: "ETHUSDT".to_string(),
        price: dec!(100.5),
        last_bar: bar(ts, dec!(101), dec!(99.8), dec!(100.5)),
        prev_bar: bar(ts - Duration::minutes(1), dec!(102), dec!(101), dec!(101.5)),
        zones: zones(),
        cross_pair_change_15m_pct: Some(dec!(0)),
    };
    IndicatorSnapshot {
        timestamp: ts,
        reference: ReferenceIndicators {
            price: Some(dec!(40000)),
            px_change_15m_pct: Some(dec!(0)),
            funding_rate: Some(dec!(0.0001)),
            oi_delta_15m: Some(dec!(-10)),
            zones: Some(zones()),
        },
        alts: BTreeMap::from([("ETHUSDT".to_string(), quote)]),
    }
}

async fn scan_once(dir: &TempDir, fx: &PaperFixture) -> Regime {
    let feed = ScriptedFeed {
        snapshots: Mutex::new(VecDeque::from([range_snapshot(0)])),
    };
    // Quiet OI never passes the contra filter
    let mut config = Config::default();
    config.detector.oi_contra_filter = false;
    let mut scanner = Scanner::open(
        &config,
        Arc::new(feed),
        fx.log.clone(),
        Arc::new(LogNotifier),
        JsonStore::new(dir.path().join("scanner_state.json")),
    )
    .await
    .unwrap();

    let report = scanner.tick().await.unwrap();
    assert_eq!(report.emitted, 1);
    assert_eq!(report.appended, 1);
    report.regime
}

async fn append_raw(fx: &PaperFixture, bytes: &[u8]) {
    let mut file = tokio::fs::OpenOptions::new()
        .append(true)
        .open(fx.log.path())
        .await
        .unwrap();
    file.write_all(bytes).await.unwrap();
    file.flush().await.unwrap();
}

#[tokio::test]
async fn test_scanned_setup_trades_to_completion() {
    let dir = TempDir::new().unwrap();
    let fx = PaperFixture::new(dir.path(), PaperConfig::default());

    assert_eq!(scan_once(&dir, &fx).await, Regime::Range);
    append_raw(&fx, b"{\"not\": \"a signal\"}\n\n").await;
    let log_len = tokio::fs::metadata(fx.log.path()).await.unwrap().len();

    let mut executor = fx.executor().await;
    let report = executor.tick(t(1)).await.unwrap();
    assert_eq!(report.accepted, 1);
    assert_eq!(report.malformed, 1);
    assert_eq!(executor.state().offset, log_len);

    let signal: SetupSignal = {
        let lines = fx.log.read_from(0, 1).await.unwrap();
        serde_json::from_slice(&lines[0].line).unwrap()
    };
    assert_eq!(signal.setup_type, SetupType::MeanRevertLong);
    assert_eq!(signal.regime_at_detection, Regime::Range);
    assert_eq!(signal.entry_price_reference, dec!(100));

    let path = [
        (2, signal.entry_price_reference),
        (3, signal.take_profit[0]),
        (4, signal.take_profit[1]),
    ];
    for (secs, px) in path {
        fx.prices.set("ETHUSDT", px);
        executor.tick(t(secs)).await.unwrap();
    }

    let trade = executor.state().trades.values().next().unwrap();
    assert_eq!(trade.signal_id, signal.id);
    assert_eq!(trade.state, TradeState::Closed);
    assert_eq!(trade.close_reason, Some(CloseReason::TakeProfit2));
    assert!(trade.realized_pnl > dec!(0));
    assert_eq!(executor.state().equity, dec!(1000) + trade.realized_pnl);

    let states: Vec<TradeState> = fx.records.snapshot().iter().map(|r| r.state).collect();
    assert_eq!(
        states,
        vec![TradeState::Open, TradeState::PartialClosed, TradeState::Closed]
    );
}

#[tokio::test]
async fn test_failed_save_blocks_progress_until_cleared() {
    let dir = TempDir::new().unwrap();
    let fx = PaperFixture::new(dir.path(), PaperConfig::default());
    scan_once(&dir, &fx).await;

    // A directory where the temp file goes makes every save fail
    let blocker = dir.path().join("paper_state.json.tmp");
    std::fs::create_dir(&blocker).unwrap();

    let mut executor = fx.executor().await;
    assert!(executor.tick(t(1)).await.is_err());
    assert_eq!(executor.state().offset, 0);
    assert!(executor.state().trades.is_empty());
    assert!(fx.stored_state().await.is_none());

    std::fs::remove_dir(&blocker).unwrap();
    let report = executor.tick(t(2)).await.unwrap();
    assert_eq!(report.accepted, 1);
    assert_eq!(fx.stored_state().await.unwrap().trades.len(), 1);
}
