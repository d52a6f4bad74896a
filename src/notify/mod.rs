//! Notification boundary
//!
//! The scanner reports regime changes, new setups and source health here.
//! Delivery to a chat backend lives outside this crate; the default
//! implementation writes structured log events.

use crate::feed::{HealthEvent, Source};
use crate::regime::{Regime, RegimeChange};
use crate::signal::SetupSignal;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

/// Something worth telling a human about
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    RegimeChanged {
        /// `None` for the first classification
        from: Option<Regime>,
        to: Regime,
        at: DateTime<Utc>,
    },
    SetupDetected(Box<SetupSignal>),
    SourceDegraded {
        source: Source,
        down_since: DateTime<Utc>,
    },
    SourceRecovered {
        source: Source,
        outage: Duration,
    },
}

impl Notification {
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::RegimeChanged { .. } => "regime_changed",
            Notification::SetupDetected(_) => "setup_detected",
            Notification::SourceDegraded { .. } => "source_degraded",
            Notification::SourceRecovered { .. } => "source_recovered",
        }
    }
}

impl From<RegimeChange> for Notification {
    fn from(change: RegimeChange) -> Self {
        Notification::RegimeChanged {
            from: change.from,
            to: change.to,
            at: change.at,
        }
    }
}

impl From<HealthEvent> for Notification {
    fn from(event: HealthEvent) -> Self {
        match event {
            HealthEvent::Degraded { source, down_since } => {
                Notification::SourceDegraded { source, down_since }
            }
            HealthEvent::Recovered { source, outage } => {
                Notification::SourceRecovered { source, outage }
            }
        }
    }
}

/// Receives notifications; each occurrence is delivered once
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// Writes notifications as log events
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        match notification {
            Notification::RegimeChanged { from, to, at } => {
                let from = from.map_or("NONE", Regime::as_str);
                tracing::info!(from, to = %to, at = %at, "Regime changed");
            }
            Notification::SetupDetected(signal) => {
                tracing::info!(
                    symbol = %signal.symbol,
                    setup = %signal.setup_type,
                    direction = %signal.direction,
                    entry = %signal.entry_price_reference,
                    stop = %signal.stop_price,
                    tp1 = %signal.take_profit[0],
                    tp2 = %signal.take_profit[1],
                    regime = %signal.regime_at_detection,
                    "Setup detected"
                );
            }
            Notification::SourceDegraded { source, down_since } => {
                tracing::warn!(source = %source, down_since = %down_since, "Data source degraded");
            }
            Notification::SourceRecovered { source, outage } => {
                tracing::info!(
                    source = %source,
                    outage_secs = outage.num_seconds(),
                    "Data source recovered"
                );
            }
        }
        Ok(())
    }
}
