//! Engine module
//!
//! Wires configuration into the two long-running loops: the regime scanner
//! and the paper executor. They share nothing in memory; the signal log and
//! the state files are the only channel between them.

mod runner;
mod scanner;

pub use runner::{run_worker, shutdown_channel, Worker};
pub use scanner::{ScanReport, Scanner, ScannerState};

use crate::config::Config;
use crate::data::FileTradeRecorder;
use crate::execution::PaperExecutor;
use crate::feed::ExchangeFeed;
use crate::notify::LogNotifier;
use crate::retry::RetryPolicy;
use crate::sink::JsonlSignalLog;
use crate::store::JsonStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Retry policy for local signal log reads
fn log_read_retry() -> RetryPolicy {
    RetryPolicy::default()
        .max_attempts(3)
        .initial_delay(Duration::from_millis(100))
        .max_delay(Duration::from_secs(1))
}

/// Scanner backed by the live exchange feed
pub async fn open_scanner(config: &Config) -> anyhow::Result<Scanner> {
    let feed = Arc::new(ExchangeFeed::new(&config.feed, &config.scanner)?);
    let sink = Arc::new(JsonlSignalLog::new(&config.data.signals_file));
    Scanner::open(
        config,
        feed,
        sink,
        Arc::new(LogNotifier),
        JsonStore::new(&config.data.scanner_state_file),
    )
    .await
}

/// Paper executor reading the signal log and pricing from the exchange
pub async fn open_paper(config: &Config) -> anyhow::Result<PaperExecutor> {
    let prices = Arc::new(ExchangeFeed::new(&config.feed, &config.scanner)?);
    let source = Arc::new(JsonlSignalLog::new(&config.data.signals_file));
    let records = Arc::new(FileTradeRecorder::new(
        &config.data.trades_jsonl,
        &config.data.trades_csv,
    ));
    PaperExecutor::open(
        &config.paper,
        source,
        prices,
        JsonStore::new(&config.data.state_file),
        records,
        log_read_retry(),
        Utc::now(),
    )
    .await
}
