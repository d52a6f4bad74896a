//! Paper trade executor
//!
//! Each tick flushes pending trade records, advances open trades against
//! the latest prices, then ingests new signals from the log. Every change is
//! staged on a copy of the state, saved atomically, and only then swapped in
//! and reported. A failed save aborts the tick with the previous state intact.

use super::lifecycle::{evaluate, LifecycleParams, Transition};
use super::state::EngineState;
use super::types::{PaperTrade, TradeState};
use crate::config::{chrono_secs, PaperConfig};
use crate::data::{TradeRecord, TradeRecordSink};
use crate::feed::PriceSource;
use crate::retry::RetryPolicy;
use crate::risk::RiskSizer;
use crate::signal::SetupSignal;
use crate::sink::{FeedItem, SignalFeedReader, SignalSource};
use crate::store::{JsonStore, StoreError};
use crate::telemetry::{self, CounterMetric, GaugeMetric};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use uuid::Uuid;

/// Why a well-formed signal did not open a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Already seen, or its trade already exists
    Duplicate,
    /// The symbol has a non-terminal trade
    SymbolBusy,
    /// Size came out non-positive
    Unsizeable,
}

impl IgnoreReason {
    pub fn label(self) -> &'static str {
        match self {
            IgnoreReason::Duplicate => "duplicate",
            IgnoreReason::SymbolBusy => "symbol_busy",
            IgnoreReason::Unsizeable => "unsizeable",
        }
    }
}

/// What one tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub transitions: usize,
    pub accepted: usize,
    pub ignored: usize,
    pub malformed: usize,
    pub records_flushed: usize,
    /// Finished trades dropped from the state
    pub pruned: usize,
}

/// Turns signals into paper trades and drives their lifecycle
pub struct PaperExecutor {
    config: PaperConfig,
    params: LifecycleParams,
    sizer: RiskSizer,
    reader: SignalFeedReader,
    prices: Arc<dyn PriceSource>,
    store: JsonStore<EngineState>,
    records: Arc<dyn TradeRecordSink>,
    state: EngineState,
}

impl PaperExecutor {
    /// Resume from the stored state, or start fresh when there is none.
    ///
    /// A corrupt state file is an error, never silently replaced.
    pub async fn open(
        config: &PaperConfig,
        source: Arc<dyn SignalSource>,
        prices: Arc<dyn PriceSource>,
        store: JsonStore<EngineState>,
        records: Arc<dyn TradeRecordSink>,
        retry: RetryPolicy,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Self> {
        let state = match store.load().await? {
            Some(state) => {
                tracing::info!(
                    offset = state.offset,
                    equity = %state.equity,
                    trades = state.trades.len(),
                    "Resuming paper state"
                );
                state
            }
            None => {
                tracing::info!(equity = %config.start_equity, "Starting fresh paper state");
                EngineState::new(config.start_equity, now)
            }
        };

        let reader = SignalFeedReader::new(source, state.offset, retry);
        Ok(Self {
            config: config.clone(),
            params: LifecycleParams::from_config(config),
            sizer: RiskSizer::from_config(config),
            reader,
            prices,
            store,
            records,
            state,
        })
    }

    /// Committed state
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Run one tick at `now`
    pub async fn tick(&mut self, now: DateTime<Utc>) -> anyhow::Result<TickReport> {
        let mut report = TickReport {
            records_flushed: self.flush_outbox().await?,
            ..TickReport::default()
        };

        report.transitions = self.advance_trades(now).await?;
        self.ingest_signals(now, &mut report).await?;
        report.records_flushed += self.flush_outbox().await?;
        report.pruned = self.prune_finished(now).await?;

        self.publish_gauges();
        Ok(report)
    }

    async fn persist(&mut self, staged: EngineState) -> Result<(), StoreError> {
        self.store.save(&staged).await?;
        self.state = staged;
        Ok(())
    }

    /// Write saved-but-unreported records, oldest first
    async fn flush_outbox(&mut self) -> anyhow::Result<usize> {
        let mut written = 0;
        for record in &self.state.outbox {
            if let Err(e) = self.records.record(record).await {
                tracing::warn!(
                    trade_id = %record.trade_id,
                    event_seq = record.event_seq,
                    error = %e,
                    "Trade record write failed; will retry"
                );
                break;
            }
            written += 1;
        }
        if written == 0 {
            return Ok(0);
        }

        let mut staged = self.state.clone();
        staged.outbox.drain(..written);
        self.persist(staged).await?;
        Ok(written)
    }

    /// Forget trades that finished longer than the retention ago
    async fn prune_finished(&mut self, now: DateTime<Utc>) -> anyhow::Result<usize> {
        let Some(cutoff) = now.checked_sub_signed(chrono_secs(self.config.retain_finished_secs))
        else {
            return Ok(0);
        };
        let mut staged = self.state.clone();
        let pruned = staged.prune_finished(cutoff);
        if pruned == 0 {
            return Ok(0);
        }

        staged.updated_at = now;
        self.persist(staged).await?;
        tracing::debug!(pruned, trades = self.state.trades.len(), "Pruned finished trades");
        Ok(pruned)
    }

    async fn advance_trades(&mut self, now: DateTime<Utc>) -> anyhow::Result<usize> {
        let active: Vec<Uuid> = self.state.active_trades().map(|t| t.id).collect();
        if active.is_empty() {
            return Ok(0);
        }

        let symbols: BTreeSet<String> = self
            .state
            .active_trades()
            .map(|t| t.symbol.clone())
            .collect();
        let prices = match self.prices.latest_prices(&symbols).await {
            Ok(prices) => prices,
            Err(e) => {
                // Deadlines still fire without prices
                tracing::warn!(error = %e, "Price fetch failed");
                BTreeMap::new()
            }
        };

        let mut count = 0;
        for id in active {
            let Some(trade) = self.state.trades.get(&id) else {
                continue;
            };
            let price = prices.get(&trade.symbol).copied();
            let Some(Transition { trade: next, event }) =
                evaluate(trade, price, now, &self.params)?
            else {
                continue;
            };

            let mut staged = self.state.clone();
            if next.state == TradeState::Closed {
                staged.equity += next.realized_pnl;
            }
            let record = TradeRecord::from_event(&next, &event, staged.equity);
            staged.outbox.push(record);
            staged.trades.insert(next.id, next.clone());
            staged.updated_at = now;
            self.persist(staged).await?;

            count += 1;
            telemetry::increment_labeled(CounterMetric::Transitions, event.to.as_str());
            tracing::info!(
                trade_id = %next.id,
                symbol = %next.symbol,
                from = %event.from,
                to = %event.to,
                price = ?event.price,
                pnl = %event.pnl,
                reason = ?event.reason,
                "Trade transition"
            );
        }
        Ok(count)
    }

    async fn ingest_signals(
        &mut self,
        now: DateTime<Utc>,
        report: &mut TickReport,
    ) -> anyhow::Result<()> {
        let batch = self.reader.poll().await?;

        for item in batch.items {
            let offset = item.offset();
            let mut staged = self.state.clone();

            match item {
                FeedItem::Malformed { offset, error } => {
                    tracing::warn!(offset, error = %error, "Skipping malformed signal record");
                    telemetry::increment(CounterMetric::MalformedRecords);
                    report.malformed += 1;
                }
                FeedItem::Signal { signal, .. } => match self.admit(&staged, &signal) {
                    Ok(size) => {
                        let trade = PaperTrade::from_signal(
                            &signal,
                            size,
                            self.config.entry_timeout_secs,
                            now,
                        );
                        tracing::info!(
                            trade_id = %trade.id,
                            symbol = %trade.symbol,
                            setup = %trade.setup_type,
                            entry = %trade.entry_price,
                            stop = %trade.stop_price,
                            size = %trade.size,
                            "Paper trade pending entry"
                        );
                        staged.remember_signal(signal.id, self.config.dedup_window);
                        staged.trades.insert(trade.id, trade);
                        report.accepted += 1;
                    }
                    Err(reason) => {
                        tracing::info!(
                            signal_id = %signal.id,
                            symbol = %signal.symbol,
                            reason = reason.label(),
                            "Ignoring signal"
                        );
                        if reason != IgnoreReason::Duplicate {
                            staged.remember_signal(signal.id, self.config.dedup_window);
                        }
                        telemetry::increment_labeled(CounterMetric::SignalsIgnored, reason.label());
                        report.ignored += 1;
                    }
                },
            }

            staged.offset = offset;
            staged.updated_at = now;
            self.persist(staged).await?;
            self.reader.commit(offset);
        }

        // Trailing blank lines
        if batch.end_offset > self.state.offset {
            let mut staged = self.state.clone();
            staged.offset = batch.end_offset;
            staged.updated_at = now;
            self.persist(staged).await?;
            self.reader.commit(batch.end_offset);
        }
        Ok(())
    }

    /// Size for a new trade, or why the signal is ignored
    fn admit(&self, state: &EngineState, signal: &SetupSignal) -> Result<Decimal, IgnoreReason> {
        if state.has_seen(signal.id)
            || state
                .trades
                .contains_key(&PaperTrade::id_for_signal(signal.id))
        {
            return Err(IgnoreReason::Duplicate);
        }
        if state.active_trade_for(&signal.symbol).is_some() {
            return Err(IgnoreReason::SymbolBusy);
        }
        self.sizer
            .size(state.equity, signal.entry_price_reference, signal.stop_price)
            .ok_or(IgnoreReason::Unsizeable)
    }

    fn publish_gauges(&self) {
        let to_f64 = |d: Decimal| d.to_f64().unwrap_or_default();
        telemetry::set_gauge(GaugeMetric::Equity, to_f64(self.state.equity));
        telemetry::set_gauge(GaugeMetric::RealizedPnl, to_f64(self.state.realized_pnl()));
        telemetry::set_gauge(
            GaugeMetric::OpenTrades,
            self.state.active_trades().count() as f64,
        );
        telemetry::set_gauge(GaugeMetric::SignalOffset, self.state.offset as f64);
    }
}
