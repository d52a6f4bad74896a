//! Trade records written for later analysis

use crate::execution::{CloseReason, PaperTrade, TradeEvent, TradeState};
use crate::regime::Regime;
use crate::signal::{Direction, SetupType};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row per lifecycle transition.
///
/// Flat so it serialises the same way to JSONL and CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub trade_id: Uuid,
    pub signal_id: Uuid,
    pub event_seq: u64,
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub setup_type: SetupType,
    pub direction: Direction,
    pub regime: Regime,
    pub from_state: TradeState,
    pub state: TradeState,
    pub close_reason: Option<CloseReason>,
    pub entry_price: Option<Decimal>,
    pub stop_price: Decimal,
    pub tp1: Decimal,
    pub tp2: Decimal,
    /// Fill or exit price of this transition
    pub price: Option<Decimal>,
    pub size: Decimal,
    pub closed_size: Decimal,
    pub tp1_closed_size: Decimal,
    pub tp1_fraction: Decimal,
    pub remaining_size: Decimal,
    /// Realised by this transition
    pub pnl: Decimal,
    /// Realised over the trade so far
    pub realized_pnl: Decimal,
    /// Trade PnL as a percentage of equity before it; set on close
    pub pnl_pct_equity: Option<Decimal>,
    pub equity: Decimal,
    pub opened_at: DateTime<Utc>,
    pub filled_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl TradeRecord {
    /// Build the record for `event`, which produced `trade`.
    ///
    /// `equity` is the paper equity after the transition.
    pub fn from_event(trade: &PaperTrade, event: &TradeEvent, equity: Decimal) -> Self {
        let tp1_fraction = if trade.size.is_zero() {
            Decimal::ZERO
        } else {
            (trade.tp1_closed_size / trade.size).round_dp(6)
        };
        let pnl_pct_equity = (event.to == TradeState::Closed).then(|| {
            let before = equity - trade.realized_pnl;
            if before.is_zero() {
                Decimal::ZERO
            } else {
                (trade.realized_pnl / before * Decimal::ONE_HUNDRED).round_dp(4)
            }
        });

        Self {
            trade_id: trade.id,
            signal_id: trade.signal_id,
            event_seq: trade.event_seq,
            timestamp: event.at,
            symbol: trade.symbol.clone(),
            setup_type: trade.setup_type,
            direction: trade.direction,
            regime: trade.regime,
            from_state: event.from,
            state: event.to,
            close_reason: trade.close_reason,
            entry_price: trade.filled_entry_price,
            stop_price: trade.stop_price,
            tp1: trade.tp1(),
            tp2: trade.tp2(),
            price: event.price,
            size: trade.size,
            closed_size: event.closed_size,
            tp1_closed_size: trade.tp1_closed_size,
            tp1_fraction,
            remaining_size: trade.remaining_size,
            pnl: event.pnl,
            realized_pnl: trade.realized_pnl,
            pnl_pct_equity,
            equity,
            opened_at: trade.opened_at,
            filled_at: trade.filled_at,
            closed_at: trade.closed_at,
        }
    }
}
