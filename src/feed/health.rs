//! Per-source health tracking
//!
//! A source that fails continuously for `degraded_after` is reported
//! degraded once; further reports are suppressed for `gap`. The first success
//! after a reported degradation reports the recovery with the outage length.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upstream data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    BinanceFutures,
    BinanceSpot,
    Bybit,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::BinanceFutures, Source::BinanceSpot, Source::Bybit];

    pub fn as_str(self) -> &'static str {
        match self {
            Source::BinanceFutures => "binance_futures",
            Source::BinanceSpot => "binance_spot",
            Source::Bybit => "bybit",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health transition for one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    Degraded {
        source: Source,
        down_since: DateTime<Utc>,
    },
    Recovered {
        source: Source,
        outage: Duration,
    },
}

/// Failure tracker for a single source
#[derive(Debug, Clone)]
pub struct HealthMonitor {
    source: Source,
    degraded_after: Duration,
    gap: Duration,
    down_since: Option<DateTime<Utc>>,
    degraded_sent: bool,
    last_degraded_sent: Option<DateTime<Utc>>,
}

impl HealthMonitor {
    pub fn new(source: Source, degraded_after: Duration, gap: Duration) -> Self {
        Self {
            source,
            degraded_after,
            gap,
            down_since: None,
            degraded_sent: false,
            last_degraded_sent: None,
        }
    }

    pub fn source(&self) -> Source {
        self.source
    }

    /// True while the source is failing
    pub fn is_down(&self) -> bool {
        self.down_since.is_some()
    }

    /// Record a failed request
    pub fn record_failure(&mut self, now: DateTime<Utc>) -> Option<HealthEvent> {
        let down_since = *self.down_since.get_or_insert(now);

        if now - down_since < self.degraded_after || self.degraded_sent {
            return None;
        }
        if let Some(last) = self.last_degraded_sent {
            if now - last < self.gap {
                return None;
            }
        }

        self.degraded_sent = true;
        self.last_degraded_sent = Some(now);
        Some(HealthEvent::Degraded {
            source: self.source,
            down_since,
        })
    }

    /// Record a successful request
    pub fn record_success(&mut self, now: DateTime<Utc>) -> Option<HealthEvent> {
        let down_since = self.down_since.take()?;
        let was_reported = std::mem::replace(&mut self.degraded_sent, false);

        was_reported.then(|| HealthEvent::Recovered {
            source: self.source,
            outage: now - down_since,
        })
    }
}
