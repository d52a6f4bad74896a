//! Regime types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Market regime of the reference instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    /// Tight range, quiet price and OI
    Range,
    /// Anything not clearly one of the others
    Transition,
    /// OI flush without a directional price move
    Deleveraging,
    /// OI flush with price falling
    LongUnwind,
    /// OI flush with price rising
    ShortSqueeze,
}

impl Regime {
    /// Number of regimes
    pub const COUNT: usize = 5;

    /// Every regime, in declaration order
    pub const ALL: [Regime; Regime::COUNT] = [
        Regime::Range,
        Regime::Transition,
        Regime::Deleveraging,
        Regime::LongUnwind,
        Regime::ShortSqueeze,
    ];

    /// Stable position of this regime in [`Regime::ALL`]
    pub fn index(self) -> usize {
        match self {
            Regime::Range => 0,
            Regime::Transition => 1,
            Regime::Deleveraging => 2,
            Regime::LongUnwind => 3,
            Regime::ShortSqueeze => 4,
        }
    }

    /// Wire name (SCREAMING_SNAKE_CASE)
    pub fn as_str(self) -> &'static str {
        match self {
            Regime::Range => "RANGE",
            Regime::Transition => "TRANSITION",
            Regime::Deleveraging => "DELEVERAGING",
            Regime::LongUnwind => "LONG_UNWIND",
            Regime::ShortSqueeze => "SHORT_SQUEEZE",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised regime name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown regime: {0}")]
pub struct ParseRegimeError(pub String);

impl FromStr for Regime {
    type Err = ParseRegimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Regime::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseRegimeError(s.to_string()))
    }
}

/// Result of classifying a single snapshot, before hysteresis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawClassification {
    /// All required fields were present
    Complete(Regime),
    /// A required field was missing; names the first one found
    Incomplete(&'static str),
}

/// Classifier state carried from one snapshot to the next
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegimeState {
    /// Regime currently in force
    pub current: Regime,
    /// Snapshot time at which `current` took effect
    pub since: Option<DateTime<Utc>>,
    /// Regime waiting for confirmation
    pub candidate: Option<Regime>,
    /// Consecutive complete snapshots that agreed with `candidate`
    pub candidate_count: u32,
    /// False until the first complete snapshot
    pub seeded: bool,
    /// Timestamp of the last snapshot applied
    pub last_observed: Option<DateTime<Utc>>,
}

impl RegimeState {
    /// Initial state before any history
    pub fn neutral(regime: Regime) -> Self {
        Self {
            current: regime,
            since: None,
            candidate: None,
            candidate_count: 0,
            seeded: false,
            last_observed: None,
        }
    }
}

/// A confirmed regime change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegimeChange {
    /// Previous regime; `None` when this change seeded the state
    pub from: Option<Regime>,
    /// New regime
    pub to: Regime,
    /// Snapshot time of the change
    pub at: DateTime<Utc>,
}
