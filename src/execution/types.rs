//! Paper trade types

use crate::config::chrono_secs;
use crate::regime::Regime;
use crate::signal::{Direction, SetupSignal, SetupType};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Namespace for trade ids derived from signal ids
const TRADE_NAMESPACE: Uuid = Uuid::from_u128(0x0c7e_51d2_a843_4b6f_9d21_e08a_35f4_c6b9);

/// Lifecycle state of a paper trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeState {
    /// Waiting for price to reach the planned entry
    PendingEntry,
    Open,
    /// TP1 taken, remainder running
    PartialClosed,
    Closed,
    /// Entry never filled before the deadline
    Cancelled,
}

impl TradeState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TradeState::Closed | TradeState::Cancelled)
    }

    /// Legal edges of the lifecycle
    pub fn can_transition_to(self, next: TradeState) -> bool {
        use TradeState::*;
        matches!(
            (self, next),
            (PendingEntry, Open)
                | (PendingEntry, Cancelled)
                | (Open, PartialClosed)
                | (Open, Closed)
                | (PartialClosed, Closed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TradeState::PendingEntry => "PENDING_ENTRY",
            TradeState::Open => "OPEN",
            TradeState::PartialClosed => "PARTIAL_CLOSED",
            TradeState::Closed => "CLOSED",
            TradeState::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for TradeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a trade reached a terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloseReason {
    EntryTimeout,
    StopLoss,
    /// Stop hit after it was moved to break-even
    BreakEvenStop,
    /// TP1 closed the whole position
    TakeProfitFull,
    TakeProfit2,
}

impl CloseReason {
    pub fn as_str(self) -> &'static str {
        match self {
            CloseReason::EntryTimeout => "ENTRY_TIMEOUT",
            CloseReason::StopLoss => "STOP_LOSS",
            CloseReason::BreakEvenStop => "BREAK_EVEN_STOP",
            CloseReason::TakeProfitFull => "TAKE_PROFIT_FULL",
            CloseReason::TakeProfit2 => "TAKE_PROFIT_2",
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("illegal transition {from} -> {to} for trade {trade_id}")]
    IllegalTransition {
        trade_id: Uuid,
        from: TradeState,
        to: TradeState,
    },
}

/// A simulated trade opened from one accepted signal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperTrade {
    pub id: Uuid,
    pub signal_id: Uuid,
    pub symbol: String,
    pub setup_type: SetupType,
    pub direction: Direction,
    /// Regime when the setup was detected
    pub regime: Regime,
    pub state: TradeState,
    /// Planned entry
    pub entry_price: Decimal,
    /// Current stop; moves to break-even after TP1
    pub stop_price: Decimal,
    pub initial_stop_price: Decimal,
    /// `[tp1, tp2]`
    pub take_profit: [Decimal; 2],
    pub size: Decimal,
    pub filled_entry_price: Option<Decimal>,
    pub remaining_size: Decimal,
    pub tp1_closed_size: Decimal,
    pub realized_pnl: Decimal,
    pub exit_price: Option<Decimal>,
    pub close_reason: Option<CloseReason>,
    pub opened_at: DateTime<Utc>,
    pub filled_at: Option<DateTime<Utc>>,
    pub entry_deadline: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    /// Number of transitions applied
    pub event_seq: u64,
}

impl PaperTrade {
    /// Trade id for a signal; the same signal always maps to the same trade
    pub fn id_for_signal(signal_id: Uuid) -> Uuid {
        Uuid::new_v5(&TRADE_NAMESPACE, signal_id.as_bytes())
    }

    /// New pending trade for an accepted signal
    pub fn from_signal(
        signal: &SetupSignal,
        size: Decimal,
        entry_timeout_secs: u64,
        now: DateTime<Utc>,
    ) -> Self {
        let timeout = chrono_secs(entry_timeout_secs);
        Self {
            id: Self::id_for_signal(signal.id),
            signal_id: signal.id,
            symbol: signal.symbol.clone(),
            setup_type: signal.setup_type,
            direction: signal.direction,
            regime: signal.regime_at_detection,
            state: TradeState::PendingEntry,
            entry_price: signal.entry_price_reference,
            stop_price: signal.stop_price,
            initial_stop_price: signal.stop_price,
            take_profit: signal.take_profit,
            size,
            filled_entry_price: None,
            remaining_size: size,
            tp1_closed_size: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            exit_price: None,
            close_reason: None,
            opened_at: now,
            filled_at: None,
            entry_deadline: signal.timestamp + timeout,
            closed_at: None,
            event_seq: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn tp1(&self) -> Decimal {
        self.take_profit[0]
    }

    pub fn tp2(&self) -> Decimal {
        self.take_profit[1]
    }

    /// Move to `next`, rejecting edges the lifecycle does not have
    pub(crate) fn transition_to(&mut self, next: TradeState) -> Result<(), LifecycleError> {
        if !self.state.can_transition_to(next) {
            return Err(LifecycleError::IllegalTransition {
                trade_id: self.id,
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        self.event_seq += 1;
        Ok(())
    }
}
