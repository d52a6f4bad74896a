//! Paper trade lifecycle
//!
//! `evaluate` is pure: it looks at one trade, the latest price and the
//! current time, and returns at most one transition. Checks run in a fixed
//! order: entry deadline, entry fill, stop, TP1, TP2.

use super::types::{CloseReason, LifecycleError, PaperTrade, TradeState};
use super::StopFillMode;
use crate::config::PaperConfig;
use crate::signal::Direction;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Exit parameters applied to every trade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleParams {
    pub tp1_close_fraction: Decimal,
    pub move_stop_to_break_even: bool,
    /// Fraction of entry added beyond break-even (0.001 = 0.1%)
    pub break_even_buffer_pct: Decimal,
    pub stop_fill_mode: StopFillMode,
}

impl LifecycleParams {
    pub fn from_config(config: &PaperConfig) -> Self {
        Self {
            tp1_close_fraction: config.tp1_close_fraction,
            move_stop_to_break_even: config.move_stop_to_break_even,
            break_even_buffer_pct: config.break_even_buffer_pct,
            stop_fill_mode: config.stop_fill_mode,
        }
    }
}

/// What one transition did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeEvent {
    pub trade_id: Uuid,
    pub from: TradeState,
    pub to: TradeState,
    pub at: DateTime<Utc>,
    /// Fill or exit price; `None` for a cancellation
    pub price: Option<Decimal>,
    /// Quantity closed by this transition
    pub closed_size: Decimal,
    /// PnL realised by this transition
    pub pnl: Decimal,
    pub reason: Option<CloseReason>,
}

/// A trade after one transition, with the event describing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub trade: PaperTrade,
    pub event: TradeEvent,
}

/// Evaluate one trade against the latest price.
///
/// Returns `Ok(None)` when nothing happens, including for terminal trades.
/// A missing price only allows the entry deadline to fire.
pub fn evaluate(
    trade: &PaperTrade,
    price: Option<Decimal>,
    now: DateTime<Utc>,
    params: &LifecycleParams,
) -> Result<Option<Transition>, LifecycleError> {
    let direction = trade.direction;
    match trade.state {
        TradeState::PendingEntry => {
            if now >= trade.entry_deadline {
                return step(trade, TradeState::Cancelled, now, None, |next| {
                    next.close_reason = Some(CloseReason::EntryTimeout);
                    next.remaining_size = Decimal::ZERO;
                    next.closed_at = Some(now);
                    (Decimal::ZERO, Decimal::ZERO)
                })
                .map(Some);
            }
            match price {
                Some(px) if direction.at_or_below(px, trade.entry_price) => {
                    let entry = trade.entry_price;
                    step(trade, TradeState::Open, now, Some(entry), |next| {
                        next.filled_entry_price = Some(entry);
                        next.filled_at = Some(now);
                        (Decimal::ZERO, Decimal::ZERO)
                    })
                    .map(Some)
                }
                _ => Ok(None),
            }
        }
        TradeState::Open | TradeState::PartialClosed => {
            let Some(px) = price else {
                return Ok(None);
            };

            if direction.at_or_below(px, trade.stop_price) {
                let exit = match params.stop_fill_mode {
                    StopFillMode::Capped => trade.stop_price,
                    StopFillMode::Market => px,
                };
                let reason = if trade.stop_price == trade.initial_stop_price {
                    CloseReason::StopLoss
                } else {
                    CloseReason::BreakEvenStop
                };
                return step(trade, TradeState::Closed, now, Some(exit), |next| {
                    close_remaining(next, exit, reason, now)
                })
                .map(Some);
            }

            if trade.state == TradeState::Open && direction.at_or_above(px, trade.tp1()) {
                let tp1 = trade.tp1();
                if params.tp1_close_fraction >= Decimal::ONE {
                    return step(trade, TradeState::Closed, now, Some(tp1), |next| {
                        next.tp1_closed_size = next.remaining_size;
                        close_remaining(next, tp1, CloseReason::TakeProfitFull, now)
                    })
                    .map(Some);
                }
                return step(trade, TradeState::PartialClosed, now, Some(tp1), |next| {
                    take_partial(next, tp1, params)
                })
                .map(Some);
            }

            if trade.state == TradeState::PartialClosed && direction.at_or_above(px, trade.tp2()) {
                let tp2 = trade.tp2();
                return step(trade, TradeState::Closed, now, Some(tp2), |next| {
                    close_remaining(next, tp2, CloseReason::TakeProfit2, now)
                })
                .map(Some);
            }

            Ok(None)
        }
        TradeState::Closed | TradeState::Cancelled => Ok(None),
    }
}

/// Apply `mutate` to a copy of `trade` moved to `to`; `mutate` returns
/// the closed size and realised PnL of the step
fn step<F>(
    trade: &PaperTrade,
    to: TradeState,
    now: DateTime<Utc>,
    price: Option<Decimal>,
    mutate: F,
) -> Result<Transition, LifecycleError>
where
    F: FnOnce(&mut PaperTrade) -> (Decimal, Decimal),
{
    let mut next = trade.clone();
    next.transition_to(to)?;
    let (closed_size, pnl) = mutate(&mut next);

    let event = TradeEvent {
        trade_id: trade.id,
        from: trade.state,
        to,
        at: now,
        price,
        closed_size,
        pnl,
        reason: next.close_reason,
    };
    Ok(Transition { trade: next, event })
}

fn close_remaining(
    trade: &mut PaperTrade,
    exit: Decimal,
    reason: CloseReason,
    now: DateTime<Utc>,
) -> (Decimal, Decimal) {
    let entry = trade.filled_entry_price.unwrap_or(trade.entry_price);
    let qty = trade.remaining_size;
    let pnl = trade.direction.pnl(entry, exit, qty);

    trade.realized_pnl += pnl;
    trade.remaining_size = Decimal::ZERO;
    trade.exit_price = Some(exit);
    trade.close_reason = Some(reason);
    trade.closed_at = Some(now);
    (qty, pnl)
}

fn take_partial(trade: &mut PaperTrade, tp1: Decimal, params: &LifecycleParams) -> (Decimal, Decimal) {
    let entry = trade.filled_entry_price.unwrap_or(trade.entry_price);
    let qty = (trade.remaining_size * params.tp1_close_fraction).round_dp(6);
    let pnl = trade.direction.pnl(entry, tp1, qty);

    trade.tp1_closed_size = qty;
    trade.remaining_size -= qty;
    trade.realized_pnl += pnl;

    if params.move_stop_to_break_even {
        let buffer = entry * params.break_even_buffer_pct;
        // Never loosen the stop
        trade.stop_price = match trade.direction {
            Direction::Long => trade.stop_price.max(entry + buffer),
            Direction::Short => trade.stop_price.min(entry - buffer),
        };
    }
    (qty, pnl)
}
