//! Trade plan geometry from range zones

use super::{Direction, EntryPriceMode};
use crate::feed::Zones;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Decimal places kept on planned prices
const PRICE_DP: u32 = 4;
/// Minimum stop padding beyond the zone edge
const MIN_PAD: Decimal = dec!(0.5);

/// Planned entry, stop and take-profit tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradePlan {
    pub entry: Decimal,
    pub stop: Decimal,
    pub tp1: Decimal,
    pub tp2: Decimal,
}

impl TradePlan {
    /// Distance between entry and stop
    pub fn risk_per_unit(&self) -> Decimal {
        (self.entry - self.stop).abs()
    }
}

/// Plan a trade from the zones.
///
/// The stop sits beyond the far edge of the entry zone by 1.5 zone heights
/// (at least [`MIN_PAD`]). TP2 targets the opposite zone, TP1 35% of the way
/// there. Returns `None` when rounding leaves no risk distance.
pub fn plan_trade(direction: Direction, zones: &Zones, mode: EntryPriceMode) -> Option<TradePlan> {
    let min_height = dec!(0.000000001);

    let plan = match direction {
        Direction::Long => {
            let entry = match mode {
                EntryPriceMode::Zone => zones.lower_hi,
                EntryPriceMode::LoHi => zones.lower_lo,
            };
            let height = (zones.lower_hi - zones.lower_lo).max(min_height);
            let pad = MIN_PAD.max(height * dec!(1.5));
            let stop = zones.lower_lo - pad;
            let risk = (entry - stop).abs();

            let mut tp1 = zones.upper_lo.min(entry + (zones.upper_lo - entry) * dec!(0.35));
            let mut tp2 = zones.upper_lo;
            if tp2 <= entry {
                tp2 = (entry * dec!(1.001)).max(entry + risk * dec!(1.2));
            }
            if tp1 <= entry {
                tp1 = entry + risk * dec!(0.6);
            }
            TradePlan {
                entry,
                stop,
                tp1,
                tp2,
            }
        }
        Direction::Short => {
            let entry = match mode {
                EntryPriceMode::Zone => zones.upper_lo,
                EntryPriceMode::LoHi => zones.upper_hi,
            };
            let height = (zones.upper_hi - zones.upper_lo).max(min_height);
            let pad = MIN_PAD.max(height * dec!(1.5));
            let stop = zones.upper_hi + pad;
            let risk = (entry - stop).abs();

            let mut tp1 = zones.lower_hi.max(entry - (entry - zones.lower_hi) * dec!(0.35));
            let mut tp2 = zones.lower_hi;
            if tp2 >= entry {
                tp2 = (entry * dec!(0.999)).min(entry - risk * dec!(1.2));
            }
            if tp1 >= entry {
                tp1 = entry - risk * dec!(0.6);
            }
            TradePlan {
                entry,
                stop,
                tp1,
                tp2,
            }
        }
    };

    let rounded = TradePlan {
        entry: plan.entry.round_dp(PRICE_DP),
        stop: plan.stop.round_dp(PRICE_DP),
        tp1: plan.tp1.round_dp(PRICE_DP),
        tp2: plan.tp2.round_dp(PRICE_DP),
    };
    (rounded.risk_per_unit() > Decimal::ZERO).then_some(rounded)
}
