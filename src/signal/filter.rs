//! Setup quality filters

use super::{Direction, SetupType};
use crate::config::DetectorConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of applying filters to a candidate setup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterResult {
    /// Setup passed all filters
    Pass,
    /// Setup rejected
    Reject(RejectReason),
}

/// Reason for setup rejection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Zone width above the mean-revert maximum
    RangeTooWide(Decimal),
    /// |OI delta| below the contra minimum
    OiTooQuiet(Decimal),
    /// OI moving with the trade instead of against it
    OiNotContra(Decimal),
    /// Alt/BTC cross moving against the trade
    CrossPairAgainst(Decimal),
}

impl RejectReason {
    /// Short label for metrics
    pub fn label(&self) -> &'static str {
        match self {
            RejectReason::RangeTooWide(_) => "range_too_wide",
            RejectReason::OiTooQuiet(_) => "oi_too_quiet",
            RejectReason::OiNotContra(_) => "oi_not_contra",
            RejectReason::CrossPairAgainst(_) => "cross_pair_against",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::RangeTooWide(w) => write!(f, "zone width {:.2}% too wide", w),
            RejectReason::OiTooQuiet(oi) => write!(f, "|OI delta| {:.0} too small", oi.abs()),
            RejectReason::OiNotContra(oi) => write!(f, "OI delta {:+.0} not contrarian", oi),
            RejectReason::CrossPairAgainst(ch) => write!(f, "cross pair {:+.2}% against", ch),
        }
    }
}

/// Inputs the filters look at
#[derive(Debug, Clone, Copy)]
pub struct FilterInputs {
    pub width_pct: Decimal,
    pub oi_delta_15m: Option<Decimal>,
    pub cross_pair_change_15m_pct: Option<Decimal>,
}

/// Filter chain for mean-revert setups; sweep setups always pass
pub struct SignalFilter {
    max_width_pct: Decimal,
    oi_contra: bool,
    oi_contra_min_abs: Decimal,
    cross_pair_bias_pct: Decimal,
}

impl SignalFilter {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            max_width_pct: config.mean_revert_max_width_pct,
            oi_contra: config.oi_contra_filter,
            oi_contra_min_abs: config.oi_contra_min_abs,
            cross_pair_bias_pct: config.alt_btc_bias_pct,
        }
    }

    /// Apply all filters to a setup
    pub fn apply(&self, setup: SetupType, inputs: &FilterInputs) -> FilterResult {
        if !setup.is_mean_revert() {
            return FilterResult::Pass;
        }
        let direction = setup.direction();

        if inputs.width_pct > self.max_width_pct {
            return FilterResult::Reject(RejectReason::RangeTooWide(inputs.width_pct));
        }

        // OI contra: LONG wants OI flushing out, SHORT wants OI building
        if let (true, Some(oi)) = (self.oi_contra, inputs.oi_delta_15m) {
            if oi.abs() < self.oi_contra_min_abs {
                return FilterResult::Reject(RejectReason::OiTooQuiet(oi));
            }
            let contra = match direction {
                Direction::Long => oi <= -self.oi_contra_min_abs,
                Direction::Short => oi >= self.oi_contra_min_abs,
            };
            if !contra {
                return FilterResult::Reject(RejectReason::OiNotContra(oi));
            }
        }

        if let Some(change) = inputs.cross_pair_change_15m_pct {
            let against = match direction {
                Direction::Long => change < -self.cross_pair_bias_pct,
                Direction::Short => change > self.cross_pair_bias_pct,
            };
            if against {
                return FilterResult::Reject(RejectReason::CrossPairAgainst(change));
            }
        }

        FilterResult::Pass
    }
}
