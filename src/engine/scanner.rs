//! Regime scanner
//!
//! One scan: fetch a snapshot, classify the regime, gate and detect alt
//! setups, append the signals, save the scanner state, then notify.

use crate::config::Config;
use crate::feed::IndicatorFeed;
use crate::gate::GatePolicy;
use crate::notify::{Notification, Notifier};
use crate::regime::{Regime, RegimeClassifier, RegimeState};
use crate::signal::{DetectorMemory, SetupDetector, SetupType, SkipReason};
use crate::sink::SignalSink;
use crate::store::JsonStore;
use crate::telemetry::{self, CounterMetric, GaugeMetric};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Scanner memory that survives restarts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerState {
    pub regime: RegimeState,
    /// Last regime a notification was delivered for
    pub last_notified: Option<Regime>,
    #[serde(default)]
    pub detector: DetectorMemory,
}

impl ScannerState {
    pub fn new(neutral: Regime) -> Self {
        Self {
            regime: RegimeState::neutral(neutral),
            last_notified: None,
            detector: DetectorMemory::default(),
        }
    }

    /// True when the regime in force has not been announced yet
    fn regime_unannounced(&self) -> bool {
        self.regime.seeded && self.last_notified != Some(self.regime.current)
    }
}

/// What one scan did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
    pub regime: Regime,
    /// False when the feed failed and nothing was evaluated
    pub evaluated: bool,
    pub regime_changed: bool,
    pub emitted: usize,
    /// Emitted signals written to the signal log
    pub appended: usize,
    pub skipped: usize,
}

/// Owns the classifier, gate and detector for the scan loop
pub struct Scanner {
    classifier: RegimeClassifier,
    gate: GatePolicy,
    detector: SetupDetector,
    sink_setups: Vec<SetupType>,
    feed: Arc<dyn IndicatorFeed>,
    sink: Arc<dyn SignalSink>,
    notifier: Arc<dyn Notifier>,
    store: JsonStore<ScannerState>,
    state: ScannerState,
}

impl Scanner {
    /// Build from config and resume the stored scanner state
    pub async fn open(
        config: &Config,
        feed: Arc<dyn IndicatorFeed>,
        sink: Arc<dyn SignalSink>,
        notifier: Arc<dyn Notifier>,
        store: JsonStore<ScannerState>,
    ) -> anyhow::Result<Self> {
        let gate = GatePolicy::from_config(&config.gate, &config.scanner.alt_symbols)?;
        let state = match store.load().await? {
            Some(state) => {
                tracing::info!(regime = %state.regime.current, "Resuming scanner state");
                state
            }
            None => ScannerState::new(config.regime.neutral),
        };

        Ok(Self {
            classifier: RegimeClassifier::with_state(config.regime.clone(), state.regime.clone()),
            gate,
            detector: SetupDetector::new(&config.detector),
            sink_setups: config.scanner.sink_setups.clone(),
            feed,
            sink,
            notifier,
            store,
            state,
        })
    }

    pub fn state(&self) -> &ScannerState {
        &self.state
    }

    pub fn regime(&self) -> Regime {
        self.classifier.current()
    }

    /// Run one scan
    pub async fn tick(&mut self) -> anyhow::Result<ScanReport> {
        let snapshot = self.feed.snapshot().await;
        self.forward_health_events().await;

        let snapshot = match snapshot {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, regime = %self.regime(), "Snapshot failed; holding regime");
                return Ok(ScanReport {
                    regime: self.regime(),
                    evaluated: false,
                    regime_changed: false,
                    emitted: 0,
                    appended: 0,
                    skipped: 0,
                });
            }
        };

        let (regime_state, change) = self.classifier.evaluate(&snapshot);
        let regime = regime_state.current;
        let decision = self.gate.gate(regime);
        let outcome = self
            .detector
            .detect(&snapshot, regime, decision, &self.state.detector);

        for skipped in &outcome.skipped {
            if let SkipReason::Filtered(reason) = &skipped.reason {
                tracing::debug!(
                    symbol = %skipped.symbol,
                    setup = %skipped.setup_type,
                    reason = %reason,
                    "Setup filtered"
                );
                telemetry::increment_labeled(CounterMetric::SignalsRejected, reason.label());
            }
        }

        let mut appended = 0;
        for signal in &outcome.signals {
            telemetry::increment(CounterMetric::SignalsEmitted);
            if !self.sink_setups.contains(&signal.setup_type) {
                continue;
            }
            self.sink.append(signal).await?;
            appended += 1;

            // Persist the emission before the next append can fail, so a
            // retried scan does not write this signal again
            let mut staged = self.state.clone();
            staged
                .detector
                .mark_emitted(&signal.symbol, signal.setup_type, signal.timestamp);
            self.store.save(&staged).await?;
            self.state = staged;
        }

        let staged = ScannerState {
            regime: regime_state.clone(),
            last_notified: self.state.last_notified,
            detector: outcome.memory,
        };
        self.store.save(&staged).await?;
        self.classifier.commit(regime_state);
        self.state = staged;

        if let Some(change) = &change {
            telemetry::increment(CounterMetric::RegimeChanges);
            tracing::info!(from = ?change.from, to = %change.to, "Regime change confirmed");
        }
        telemetry::set_gauge(GaugeMetric::Regime, regime.index() as f64);

        self.announce_regime().await?;
        for signal in &outcome.signals {
            self.deliver(Notification::SetupDetected(Box::new(signal.clone())))
                .await;
        }

        tracing::debug!(
            regime = %regime,
            alts = snapshot.alts.len(),
            emitted = outcome.signals.len(),
            appended,
            skipped = outcome.skipped.len(),
            "Scan complete"
        );

        Ok(ScanReport {
            regime,
            evaluated: true,
            regime_changed: change.is_some(),
            emitted: outcome.signals.len(),
            appended,
            skipped: outcome.skipped.len(),
        })
    }

    /// Announce the regime in force if it has not been announced, then
    /// record that it was
    async fn announce_regime(&mut self) -> anyhow::Result<()> {
        if !self.state.regime_unannounced() {
            return Ok(());
        }

        let notification = Notification::RegimeChanged {
            from: self.state.last_notified,
            to: self.state.regime.current,
            at: self
                .state
                .regime
                .since
                .or(self.state.regime.last_observed)
                .unwrap_or_else(chrono::Utc::now),
        };
        if !self.deliver(notification).await {
            return Ok(());
        }

        let mut staged = self.state.clone();
        staged.last_notified = Some(staged.regime.current);
        self.store.save(&staged).await?;
        self.state = staged;
        Ok(())
    }

    async fn forward_health_events(&self) {
        for event in self.feed.drain_health_events() {
            let notification = Notification::from(event);
            if let Notification::SourceDegraded { source, .. } = &notification {
                telemetry::increment_labeled(CounterMetric::SourceDegraded, source.as_str());
            }
            self.deliver(notification).await;
        }
    }

    /// Deliver one notification; failures are logged, not retried
    async fn deliver(&self, notification: Notification) -> bool {
        match self.notifier.notify(&notification).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(kind = notification.kind(), error = %e, "Notification failed");
                false
            }
        }
    }
}
