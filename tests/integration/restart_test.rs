//! Restart safety of the paper executor

use crate::common::{long_signal, t, MemoryRecords, PaperFixture};
use async_trait::async_trait;
use regime_gate::config::PaperConfig;
use regime_gate::data::{TradeRecord, TradeRecordSink};
use regime_gate::execution::{PaperExecutor, TradeState};
use regime_gate::retry::RetryPolicy;
use regime_gate::sink::SignalSink;
use regime_gate::store::JsonStore;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Price path per tick: (tick second, ETH, SOL)
const PATH: [(i64, &str, &str); 6] = [
    (1, "101", "51"),
    (2, "100", "50"),
    (3, "104", "47"),
    (4, "105", "47"),
    (5, "111", "44"),
    (6, "111", "44"),
];

async fn seed(fx: &PaperFixture) {
    fx.log
        .append(&long_signal("ETHUSDT", t(0), dec!(100), dec!(95), dec!(105), dec!(110)))
        .await
        .unwrap();
    fx.log
        .append(&long_signal("SOLUSDT", t(0), dec!(50), dec!(45), dec!(55), dec!(60)))
        .await
        .unwrap();
}

async fn step(executor: &mut PaperExecutor, fx: &PaperFixture, i: usize) {
    let (secs, eth, sol) = PATH[i];
    fx.prices.set("ETHUSDT", eth.parse::<Decimal>().unwrap());
    fx.prices.set("SOLUSDT", sol.parse::<Decimal>().unwrap());
    executor.tick(t(secs)).await.unwrap();
}

#[tokio::test]
async fn test_restart_reproduces_uninterrupted_run() {
    let straight_dir = TempDir::new().unwrap();
    let straight = PaperFixture::new(straight_dir.path(), PaperConfig::default());
    seed(&straight).await;
    let mut executor = straight.executor().await;
    for i in 0..PATH.len() {
        step(&mut executor, &straight, i).await;
    }

    let restarted_dir = TempDir::new().unwrap();
    let restarted = PaperFixture::new(restarted_dir.path(), PaperConfig::default());
    seed(&restarted).await;
    for i in 0..PATH.len() {
        // Fresh process every tick
        let mut executor = restarted.executor().await;
        step(&mut executor, &restarted, i).await;
    }

    let a = straight.stored_state().await.unwrap();
    let b = restarted.stored_state().await.unwrap();
    assert_eq!(a, b);
    assert_eq!(straight.records.snapshot(), restarted.records.snapshot());

    // ETH: TP1 then TP2; SOL: stopped out
    let states: Vec<TradeState> = a.trades.values().map(|t| t.state).collect();
    assert!(states.iter().all(|s| *s == TradeState::Closed));
    assert_ne!(a.equity, dec!(1000));
}

#[tokio::test]
async fn test_reopened_executor_does_not_reingest() {
    let dir = TempDir::new().unwrap();
    let fx = PaperFixture::new(dir.path(), PaperConfig::default());
    seed(&fx).await;

    let mut first = fx.executor().await;
    first.tick(t(1)).await.unwrap();
    let offset = first.state().offset;
    drop(first);

    let mut second = fx.executor().await;
    assert_eq!(second.state().offset, offset);
    let report = second.tick(t(2)).await.unwrap();
    assert_eq!(report.accepted, 0);
    assert_eq!(second.state().trades.len(), 2);
}

struct FlakyRecords {
    down: AtomicBool,
    inner: MemoryRecords,
}

#[async_trait]
impl TradeRecordSink for FlakyRecords {
    async fn record(&self, record: &TradeRecord) -> anyhow::Result<()> {
        if self.down.load(Ordering::SeqCst) {
            anyhow::bail!("disk full");
        }
        self.inner.record(record).await
    }
}

#[tokio::test]
async fn test_unwritten_records_survive_restart() {
    let dir = TempDir::new().unwrap();
    let fx = PaperFixture::new(dir.path(), PaperConfig::default());
    seed(&fx).await;
    let records = Arc::new(FlakyRecords {
        down: AtomicBool::new(true),
        inner: MemoryRecords::default(),
    });

    let open = || {
        PaperExecutor::open(
            &fx.config,
            fx.log.clone(),
            fx.prices.clone(),
            JsonStore::new(&fx.state_path),
            records.clone(),
            RetryPolicy::default().max_attempts(1),
            t(0),
        )
    };

    let mut executor = open().await.unwrap();
    executor.tick(t(1)).await.unwrap();
    fx.prices.set("ETHUSDT", dec!(100));
    executor.tick(t(2)).await.unwrap();
    assert_eq!(executor.state().outbox.len(), 1);
    drop(executor);

    records.down.store(false, Ordering::SeqCst);
    let mut executor = open().await.unwrap();
    let report = executor.tick(t(3)).await.unwrap();

    assert_eq!(report.records_flushed, 1);
    assert!(executor.state().outbox.is_empty());
    let written = records.inner.snapshot();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].state, TradeState::Open);
}
