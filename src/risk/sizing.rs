//! Position sizing
//!
//! Risk a fixed fraction of paper equity on the distance between entry and
//! stop, scaled by leverage.

use crate::config::PaperConfig;
use rust_decimal::Decimal;

/// Decimal places kept on a computed quantity
const QTY_DP: u32 = 6;

/// Fixed-risk position sizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskSizer {
    /// Fraction of equity at risk per trade (e.g. 0.005 = 0.5%)
    pub risk_pct: Decimal,
    pub leverage: u32,
}

impl RiskSizer {
    pub fn new(risk_pct: Decimal, leverage: u32) -> Self {
        Self { risk_pct, leverage }
    }

    pub fn from_config(config: &PaperConfig) -> Self {
        Self::new(config.risk_pct, config.leverage)
    }

    /// Quantity for a trade, or `None` when the plan cannot be sized
    pub fn size(&self, equity: Decimal, entry: Decimal, stop: Decimal) -> Option<Decimal> {
        let risk_per_unit = (entry - stop).abs();
        if risk_per_unit.is_zero() || equity <= Decimal::ZERO {
            return None;
        }

        let qty = (equity * self.risk_pct / risk_per_unit * Decimal::from(self.leverage))
            .round_dp(QTY_DP);
        (qty > Decimal::ZERO).then_some(qty)
    }
}

impl Default for RiskSizer {
    fn default() -> Self {
        Self::from_config(&PaperConfig::default())
    }
}
