//! Persisted paper engine state

use super::types::PaperTrade;
use crate::data::TradeRecord;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use uuid::Uuid;

/// Everything the paper engine needs to resume after a restart.
///
/// Rewritten atomically after every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineState {
    /// Signal log offset; everything before it has been processed
    pub offset: u64,
    pub equity: Decimal,
    pub trades: BTreeMap<Uuid, PaperTrade>,
    /// Recently seen signal ids, oldest first
    pub recent_signal_ids: VecDeque<Uuid>,
    /// Records persisted but not yet written to the trade record sink
    #[serde(default)]
    pub outbox: Vec<TradeRecord>,
    /// Realised PnL of finished trades already pruned from `trades`
    #[serde(default)]
    pub pruned_pnl: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl EngineState {
    pub fn new(equity: Decimal, now: DateTime<Utc>) -> Self {
        Self {
            offset: 0,
            equity,
            trades: BTreeMap::new(),
            recent_signal_ids: VecDeque::new(),
            outbox: Vec::new(),
            pruned_pnl: Decimal::ZERO,
            updated_at: now,
        }
    }

    /// The non-terminal trade on `symbol`, if any
    pub fn active_trade_for(&self, symbol: &str) -> Option<&PaperTrade> {
        self.trades
            .values()
            .find(|t| !t.is_terminal() && t.symbol == symbol)
    }

    pub fn active_trades(&self) -> impl Iterator<Item = &PaperTrade> {
        self.trades.values().filter(|t| !t.is_terminal())
    }

    pub fn has_seen(&self, signal_id: Uuid) -> bool {
        self.recent_signal_ids.contains(&signal_id)
    }

    /// Remember a signal id, dropping the oldest beyond `window`
    pub fn remember_signal(&mut self, signal_id: Uuid, window: usize) {
        self.recent_signal_ids.push_back(signal_id);
        while self.recent_signal_ids.len() > window {
            self.recent_signal_ids.pop_front();
        }
    }

    /// Realised PnL over closed trades, pruned ones included
    pub fn realized_pnl(&self) -> Decimal {
        self.pruned_pnl
            + self
                .trades
                .values()
                .filter(|t| t.is_terminal())
                .map(|t| t.realized_pnl)
                .sum::<Decimal>()
    }

    /// Drop terminal trades finished before `cutoff` with no record left in
    /// the outbox. Duplicate signals are still caught by the id window.
    pub fn prune_finished(&mut self, cutoff: DateTime<Utc>) -> usize {
        let unflushed: BTreeSet<Uuid> = self.outbox.iter().map(|r| r.trade_id).collect();
        let expired: Vec<Uuid> = self
            .trades
            .values()
            .filter(|t| t.is_terminal() && !unflushed.contains(&t.id))
            .filter(|t| t.closed_at.is_some_and(|at| at < cutoff))
            .map(|t| t.id)
            .collect();

        for id in &expired {
            if let Some(trade) = self.trades.remove(id) {
                self.pruned_pnl += trade.realized_pnl;
            }
        }
        expired.len()
    }
}
