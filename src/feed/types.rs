//! Indicator feed types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One OHLC bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    /// Bar open time
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

/// Range zones derived from recent highs and lows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zones {
    pub upper_lo: Decimal,
    pub upper_hi: Decimal,
    pub lower_lo: Decimal,
    pub lower_hi: Decimal,
    /// Gap between the zones as a percentage of the last close
    pub width_pct: Decimal,
}

/// Reference-market indicators; `None` means the source did not deliver it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceIndicators {
    /// Last traded price
    pub price: Option<Decimal>,
    /// 15 minute price change, percent
    pub px_change_15m_pct: Option<Decimal>,
    /// Latest funding rate
    pub funding_rate: Option<Decimal>,
    /// Open interest change over 15 minutes
    pub oi_delta_15m: Option<Decimal>,
    /// Range zones
    pub zones: Option<Zones>,
}

/// Per-alt data needed by the setup detector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AltQuote {
    pub symbol: String,
    /// Last traded price
    pub price: Decimal,
    /// Most recent 1m bar
    pub last_bar: Bar,
    /// The 1m bar before `last_bar`
    pub prev_bar: Bar,
    pub zones: Zones,
    /// 15 minute change of the alt/BTC cross, percent
    pub cross_pair_change_15m_pct: Option<Decimal>,
}

/// Everything observed in one poll of the data sources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorSnapshot {
    /// Observation time
    pub timestamp: DateTime<Utc>,
    pub reference: ReferenceIndicators,
    /// Alts that could be fully quoted this tick
    pub alts: BTreeMap<String, AltQuote>,
}

impl IndicatorSnapshot {
    /// Snapshot with no alt quotes
    pub fn reference_only(timestamp: DateTime<Utc>, reference: ReferenceIndicators) -> Self {
        Self {
            timestamp,
            reference,
            alts: BTreeMap::new(),
        }
    }
}
