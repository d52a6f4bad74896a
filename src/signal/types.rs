//! Signal types

use crate::feed::Zones;
use crate::regime::Regime;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Namespace for content-derived signal ids
const SIGNAL_NAMESPACE: Uuid = Uuid::from_u128(0x6a1f_3c2e_9b47_4d0a_8e15_2f6c_7d90_b3a4);

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Long => "LONG",
            Direction::Short => "SHORT",
        }
    }

    /// PnL of moving `qty` from `entry` to `exit`
    pub fn pnl(self, entry: Decimal, exit: Decimal, qty: Decimal) -> Decimal {
        match self {
            Direction::Long => (exit - entry) * qty,
            Direction::Short => (entry - exit) * qty,
        }
    }

    /// True when `price` is at or beyond `level` in the adverse direction
    pub fn at_or_below(self, price: Decimal, level: Decimal) -> bool {
        match self {
            Direction::Long => price <= level,
            Direction::Short => price >= level,
        }
    }

    /// True when `price` is at or beyond `level` in the favourable direction
    pub fn at_or_above(self, price: Decimal, level: Decimal) -> bool {
        match self {
            Direction::Long => price >= level,
            Direction::Short => price <= level,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Setup families recognised by the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SetupType {
    /// Wick above the upper zone, close back inside
    SweepReclaimShort,
    /// Wick below the lower zone, close back inside
    SweepReclaimLong,
    /// Touch of the upper zone, close below it
    MeanRevertShort,
    /// Touch of the lower zone, close above it
    MeanRevertLong,
}

impl SetupType {
    pub const ALL: [SetupType; 4] = [
        SetupType::SweepReclaimShort,
        SetupType::SweepReclaimLong,
        SetupType::MeanRevertShort,
        SetupType::MeanRevertLong,
    ];

    pub fn direction(self) -> Direction {
        match self {
            SetupType::SweepReclaimShort | SetupType::MeanRevertShort => Direction::Short,
            SetupType::SweepReclaimLong | SetupType::MeanRevertLong => Direction::Long,
        }
    }

    pub fn is_mean_revert(self) -> bool {
        matches!(self, SetupType::MeanRevertShort | SetupType::MeanRevertLong)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SetupType::SweepReclaimShort => "SWEEP_RECLAIM_SHORT",
            SetupType::SweepReclaimLong => "SWEEP_RECLAIM_LONG",
            SetupType::MeanRevertShort => "MEAN_REVERT_SHORT",
            SetupType::MeanRevertLong => "MEAN_REVERT_LONG",
        }
    }
}

impl fmt::Display for SetupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which zone edge becomes the planned entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPriceMode {
    /// Inner edge: LONG at `lower_hi`, SHORT at `upper_lo` (more fills)
    #[default]
    Zone,
    /// Outer edge: LONG at `lower_lo`, SHORT at `upper_hi` (fewer fills)
    LoHi,
}

/// A detected setup, one JSON object per line in the signal log.
///
/// Immutable once appended. Readers ignore fields they do not know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetupSignal {
    /// Content-derived id, the idempotency key downstream
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub setup_type: SetupType,
    pub direction: Direction,
    /// Planned entry price
    pub entry_price_reference: Decimal,
    pub stop_price: Decimal,
    /// `[tp1, tp2]`
    pub take_profit: [Decimal; 2],
    pub regime_at_detection: Regime,
    pub zones: Zones,
    /// Close of the bar that triggered the setup
    pub close: Decimal,
    pub width_pct: Decimal,
    /// Reference OI change at detection time
    #[serde(default)]
    pub oi_delta_15m: Option<Decimal>,
}

impl SetupSignal {
    /// Deterministic id over `bar_open_time|symbol|setup_type`
    pub fn derive_id(bar_open_time: DateTime<Utc>, symbol: &str, setup_type: SetupType) -> Uuid {
        let name = format!("{}|{}|{}", bar_open_time.timestamp_millis(), symbol, setup_type);
        Uuid::new_v5(&SIGNAL_NAMESPACE, name.as_bytes())
    }
}
