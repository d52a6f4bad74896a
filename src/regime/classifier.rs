//! Regime classification with hysteresis
//!
//! [`raw_classify`] maps one snapshot to a regime (or reports it incomplete).
//! [`classify`] folds that raw label into the previous [`RegimeState`],
//! holding the current regime until a candidate has been confirmed on enough
//! consecutive snapshots and the minimum dwell time has passed.

use super::{RawClassification, Regime, RegimeChange, RegimeState};
use crate::config::{chrono_secs, RegimeConfig};
use crate::feed::IndicatorSnapshot;

/// Classify a single snapshot without looking at history
pub fn raw_classify(snapshot: &IndicatorSnapshot, config: &RegimeConfig) -> RawClassification {
    let reference = &snapshot.reference;

    let Some(px) = reference.px_change_15m_pct else {
        return RawClassification::Incomplete("px_change_15m_pct");
    };
    let Some(zones) = reference.zones else {
        return RawClassification::Incomplete("zones");
    };
    if reference.funding_rate.is_none() {
        return RawClassification::Incomplete("funding_rate");
    }
    let oi = reference.oi_delta_15m;
    if oi.is_none() && !config.allow_missing_oi {
        return RawClassification::Incomplete("oi_delta_15m");
    }

    if let Some(oi) = oi {
        if oi < -config.oi_flush_abs {
            let regime = if px < -config.px_move_pct {
                Regime::LongUnwind
            } else if px > config.px_move_pct {
                Regime::ShortSqueeze
            } else {
                Regime::Deleveraging
            };
            return RawClassification::Complete(regime);
        }
    }

    let quiet_oi = oi.map_or(true, |oi| oi.abs() <= config.range_max_oi_abs);
    if zones.width_pct <= config.range_max_width_pct
        && px.abs() <= config.range_max_move_pct
        && quiet_oi
    {
        return RawClassification::Complete(Regime::Range);
    }

    RawClassification::Complete(Regime::Transition)
}

/// Fold a snapshot into the previous state.
///
/// Pure: the same snapshot and state always yield the same result. Returns
/// the confirmed change, if any. Snapshots not newer than the last one
/// applied are ignored.
pub fn classify(
    snapshot: &IndicatorSnapshot,
    previous: &RegimeState,
    config: &RegimeConfig,
) -> (RegimeState, Option<RegimeChange>) {
    let at = snapshot.timestamp;
    if previous.last_observed.is_some_and(|last| at <= last) {
        return (previous.clone(), None);
    }

    let raw = match raw_classify(snapshot, config) {
        RawClassification::Complete(regime) => regime,
        RawClassification::Incomplete(_) => {
            let mut next = previous.clone();
            next.last_observed = Some(at);
            return (next, None);
        }
    };

    let mut next = previous.clone();
    next.last_observed = Some(at);

    if !previous.seeded {
        next.current = raw;
        next.since = Some(at);
        next.candidate = None;
        next.candidate_count = 0;
        next.seeded = true;
        let change = RegimeChange {
            from: None,
            to: raw,
            at,
        };
        return (next, Some(change));
    }

    if raw == previous.current {
        next.candidate = None;
        next.candidate_count = 0;
        return (next, None);
    }

    let count = if previous.candidate == Some(raw) {
        previous.candidate_count.saturating_add(1)
    } else {
        1
    };
    next.candidate = Some(raw);
    next.candidate_count = count;

    let dwell = chrono_secs(config.min_dwell_secs);
    let dwell_ok = previous.since.map_or(true, |since| at - since >= dwell);

    if count >= config.confirmations && dwell_ok {
        next.current = raw;
        next.since = Some(at);
        next.candidate = None;
        next.candidate_count = 0;
        let change = RegimeChange {
            from: Some(previous.current),
            to: raw,
            at,
        };
        return (next, Some(change));
    }

    (next, None)
}

/// Owns the regime state across scanner ticks
#[derive(Debug, Clone)]
pub struct RegimeClassifier {
    config: RegimeConfig,
    state: RegimeState,
}

impl RegimeClassifier {
    /// Start from the configured neutral regime
    pub fn new(config: RegimeConfig) -> Self {
        let state = RegimeState::neutral(config.neutral);
        Self { config, state }
    }

    /// Resume from a persisted state
    pub fn with_state(config: RegimeConfig, state: RegimeState) -> Self {
        Self { config, state }
    }

    /// Apply a snapshot, returning the new state and any confirmed change
    /// without committing it
    pub fn evaluate(&self, snapshot: &IndicatorSnapshot) -> (RegimeState, Option<RegimeChange>) {
        classify(snapshot, &self.state, &self.config)
    }

    /// Commit a state produced by [`RegimeClassifier::evaluate`]
    pub fn commit(&mut self, state: RegimeState) {
        self.state = state;
    }

    /// Regime currently in force
    pub fn current(&self) -> Regime {
        self.state.current
    }

    pub fn state(&self) -> &RegimeState {
        &self.state
    }
}
