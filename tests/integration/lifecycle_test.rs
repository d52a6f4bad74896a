//! Paper trade lifecycle through the executor

use crate::common::{long_signal, t, PaperFixture};
use regime_gate::config::PaperConfig;
use regime_gate::execution::{CloseReason, StopFillMode, TradeState};
use regime_gate::sink::SignalSink;
use rust_decimal_macros::dec;
use tempfile::TempDir;

fn config() -> PaperConfig {
    PaperConfig {
        tp1_close_fraction: dec!(0.5),
        move_stop_to_break_even: true,
        break_even_buffer_pct: dec!(0),
        ..PaperConfig::default()
    }
}

#[tokio::test]
async fn test_partial_take_profit_then_break_even_exit() {
    let dir = TempDir::new().unwrap();
    let fx = PaperFixture::new(dir.path(), config());
    fx.log
        .append(&long_signal("ETHUSDT", t(0), dec!(100), dec!(95), dec!(105), dec!(110)))
        .await
        .unwrap();
    let mut executor = fx.executor().await;

    executor.tick(t(1)).await.unwrap();
    // 1000 * 0.005 / 5 * 5
    let trade = executor.state().trades.values().next().unwrap().clone();
    assert_eq!(trade.size, dec!(5));

    for (secs, px) in [(2, dec!(100)), (3, dec!(105)), (4, dec!(100))] {
        fx.prices.set("ETHUSDT", px);
        executor.tick(t(secs)).await.unwrap();
    }

    let trade = &executor.state().trades[&trade.id];
    assert_eq!(trade.state, TradeState::Closed);
    assert_eq!(trade.close_reason, Some(CloseReason::BreakEvenStop));
    assert_eq!(trade.tp1_closed_size, dec!(2.5));
    assert_eq!(trade.stop_price, dec!(100));
    assert_eq!(trade.realized_pnl, dec!(12.5));
    assert_eq!(executor.state().equity, dec!(1012.5));

    let records = fx.records.snapshot();
    assert_eq!(records.len(), 3);
    assert_eq!(records[1].state, TradeState::PartialClosed);
    assert_eq!(records[1].closed_size, dec!(2.5));
    assert_eq!(records[1].tp1_fraction, dec!(0.5));
    assert_eq!(records[2].pnl, dec!(0));
    assert_eq!(records[2].pnl_pct_equity, Some(dec!(1.25)));
}

#[tokio::test]
async fn test_unfilled_entry_cancelled_at_timeout() {
    let dir = TempDir::new().unwrap();
    let fx = PaperFixture::new(dir.path(), config());
    fx.log
        .append(&long_signal("ETHUSDT", t(0), dec!(100), dec!(95), dec!(105), dec!(110)))
        .await
        .unwrap();
    let mut executor = fx.executor().await;
    executor.tick(t(1)).await.unwrap();

    // Price never comes back to the entry
    fx.prices.set("ETHUSDT", dec!(102));
    executor.tick(t(1799)).await.unwrap();
    assert_eq!(executor.state().active_trades().count(), 1);

    executor.tick(t(1800)).await.unwrap();
    let trade = executor.state().trades.values().next().unwrap();
    assert_eq!(trade.state, TradeState::Cancelled);
    assert_eq!(trade.close_reason, Some(CloseReason::EntryTimeout));
    assert_eq!(trade.realized_pnl, dec!(0));
    assert_eq!(executor.state().equity, dec!(1000));
}

#[tokio::test]
async fn test_gap_through_stop_fills_at_stop_when_capped() {
    let dir = TempDir::new().unwrap();
    let fx = PaperFixture::new(dir.path(), config());
    fx.log
        .append(&long_signal("ETHUSDT", t(0), dec!(100), dec!(95), dec!(105), dec!(110)))
        .await
        .unwrap();
    let mut executor = fx.executor().await;
    executor.tick(t(1)).await.unwrap();

    fx.prices.set("ETHUSDT", dec!(100));
    executor.tick(t(2)).await.unwrap();
    fx.prices.set("ETHUSDT", dec!(90));
    executor.tick(t(3)).await.unwrap();

    let trade = executor.state().trades.values().next().unwrap();
    assert_eq!(trade.close_reason, Some(CloseReason::StopLoss));
    assert_eq!(trade.exit_price, Some(dec!(95)));
    assert_eq!(trade.realized_pnl, dec!(-25));
}

#[tokio::test]
async fn test_gap_through_stop_fills_at_market_when_configured() {
    let dir = TempDir::new().unwrap();
    let fx = PaperFixture::new(
        dir.path(),
        PaperConfig {
            stop_fill_mode: StopFillMode::Market,
            ..config()
        },
    );
    fx.log
        .append(&long_signal("ETHUSDT", t(0), dec!(100), dec!(95), dec!(105), dec!(110)))
        .await
        .unwrap();
    let mut executor = fx.executor().await;
    executor.tick(t(1)).await.unwrap();

    fx.prices.set("ETHUSDT", dec!(100));
    executor.tick(t(2)).await.unwrap();
    fx.prices.set("ETHUSDT", dec!(90));
    executor.tick(t(3)).await.unwrap();

    let trade = executor.state().trades.values().next().unwrap();
    assert_eq!(trade.exit_price, Some(dec!(90)));
    assert_eq!(trade.realized_pnl, dec!(-50));
}

#[tokio::test]
async fn test_new_trade_allowed_after_previous_closes() {
    let dir = TempDir::new().unwrap();
    let fx = PaperFixture::new(dir.path(), config());
    fx.log
        .append(&long_signal("ETHUSDT", t(0), dec!(100), dec!(95), dec!(105), dec!(110)))
        .await
        .unwrap();
    let mut executor = fx.executor().await;
    executor.tick(t(1)).await.unwrap();
    executor.tick(t(1800)).await.unwrap();

    fx.log
        .append(&long_signal("ETHUSDT", t(1900), dec!(100), dec!(95), dec!(105), dec!(110)))
        .await
        .unwrap();
    let report = executor.tick(t(1901)).await.unwrap();
    assert_eq!(report.accepted, 1);
    assert_eq!(executor.state().trades.len(), 2);
}
