//! Setup detection
//!
//! Evaluates every (symbol, setup) pair on each scan: the bar condition, then
//! the gate, then the quality filters. A pair is emitted only on its rising
//! edge and never within the cooldown of its previous emission.

use super::filter::{FilterInputs, FilterResult, RejectReason, SignalFilter};
use super::plan::plan_trade;
use super::{EntryPriceMode, SetupSignal, SetupType};
use crate::config::{chrono_secs, DetectorConfig};
use crate::feed::{AltQuote, IndicatorSnapshot};
use crate::gate::GateDecision;
use crate::regime::Regime;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Edge and cooldown memory, persisted with the scanner state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorMemory {
    /// Pairs (`SYMBOL:SETUP`) that evaluated positive on the last scan
    #[serde(default)]
    pub active: BTreeSet<String>,
    /// Last emission time per pair
    #[serde(default)]
    pub last_emitted: BTreeMap<String, DateTime<Utc>>,
}

impl DetectorMemory {
    /// Record an emission: the pair is active and its cooldown starts at `at`
    pub fn mark_emitted(&mut self, symbol: &str, setup: SetupType, at: DateTime<Utc>) {
        let key = pair_key(symbol, setup);
        self.active.insert(key.clone());
        self.last_emitted.insert(key, at);
    }
}

/// Why a pair that met its bar condition was not emitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Gate does not permit this symbol/setup in the current regime
    Gated,
    /// Quality filter rejected it
    Filtered(RejectReason),
    /// Already positive on the previous scan
    NoEdge,
    /// Emitted too recently
    Cooldown,
    /// Zones gave no usable trade plan
    NoPlan,
}

/// A pair that met its bar condition but was not emitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub symbol: String,
    pub setup_type: SetupType,
    pub reason: SkipReason,
}

/// Result of one detection pass; nothing is committed until the caller
/// adopts `memory`
#[derive(Debug, Clone, Default)]
pub struct DetectionOutcome {
    pub signals: Vec<SetupSignal>,
    pub skipped: Vec<Skipped>,
    pub memory: DetectorMemory,
}

/// Pair key used in [`DetectorMemory`]
pub fn pair_key(symbol: &str, setup: SetupType) -> String {
    format!("{}:{}", symbol, setup)
}

/// Raw bar conditions met by the last two bars against the zones.
///
/// Mean-revert touches only count in RANGE; sweeps are evaluated in every
/// regime and left to the gate.
pub fn bar_conditions(quote: &AltQuote, regime: Regime) -> Vec<SetupType> {
    let z = &quote.zones;
    let (h1, l1, c1) = (quote.last_bar.high, quote.last_bar.low, quote.last_bar.close);
    let (h0, l0) = (quote.prev_bar.high, quote.prev_bar.low);

    let mut met = Vec::new();

    let swept_up = h1 > z.upper_hi || h0 > z.upper_hi;
    if swept_up && c1 < z.upper_lo && h1 > z.upper_lo {
        met.push(SetupType::SweepReclaimShort);
    }

    let swept_down = l1 < z.lower_lo || l0 < z.lower_lo;
    if swept_down && c1 > z.lower_hi && l1 < z.lower_hi {
        met.push(SetupType::SweepReclaimLong);
    }

    if regime != Regime::Range {
        return met;
    }

    if h1 >= z.upper_lo && c1 < z.upper_lo {
        met.push(SetupType::MeanRevertShort);
    }

    if l1 <= z.lower_hi && c1 > z.lower_hi {
        met.push(SetupType::MeanRevertLong);
    }

    met
}

/// Gated, edge-triggered setup detector
pub struct SetupDetector {
    filter: SignalFilter,
    cooldown: Duration,
    entry_mode: EntryPriceMode,
}

impl SetupDetector {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            filter: SignalFilter::new(config),
            cooldown: chrono_secs(config.cooldown_secs),
            entry_mode: config.entry_price_mode,
        }
    }

    /// Evaluate every alt in the snapshot.
    ///
    /// Pairs for symbols absent from the snapshot keep their previous edge
    /// state, so a data gap does not re-arm them.
    pub fn detect(
        &self,
        snapshot: &IndicatorSnapshot,
        regime: Regime,
        decision: &GateDecision,
        memory: &DetectorMemory,
    ) -> DetectionOutcome {
        let now = snapshot.timestamp;
        let oi = snapshot.reference.oi_delta_15m;

        let mut next = memory.clone();
        next.active
            .retain(|key| !snapshot.alts.keys().any(|s| key_belongs_to(key, s)));

        let mut signals = Vec::new();
        let mut skipped = Vec::new();

        for (symbol, quote) in &snapshot.alts {
            for setup in bar_conditions(quote, regime) {
                let key = pair_key(symbol, setup);
                let skip = |reason| Skipped {
                    symbol: symbol.clone(),
                    setup_type: setup,
                    reason,
                };

                if !decision.permits(symbol, setup) {
                    skipped.push(skip(SkipReason::Gated));
                    continue;
                }

                let inputs = FilterInputs {
                    width_pct: quote.zones.width_pct,
                    oi_delta_15m: oi,
                    cross_pair_change_15m_pct: quote.cross_pair_change_15m_pct,
                };
                if let FilterResult::Reject(reason) = self.filter.apply(setup, &inputs) {
                    skipped.push(skip(SkipReason::Filtered(reason)));
                    continue;
                }

                // Positive this scan
                next.active.insert(key.clone());

                if memory.active.contains(&key) {
                    skipped.push(skip(SkipReason::NoEdge));
                    continue;
                }
                if let Some(last) = memory.last_emitted.get(&key) {
                    if now - *last < self.cooldown {
                        skipped.push(skip(SkipReason::Cooldown));
                        continue;
                    }
                }

                let direction = setup.direction();
                let Some(plan) = plan_trade(direction, &quote.zones, self.entry_mode) else {
                    skipped.push(skip(SkipReason::NoPlan));
                    continue;
                };

                next.mark_emitted(symbol, setup, now);
                signals.push(SetupSignal {
                    // Keyed on the bar so a re-detected touch keeps its id
                    id: SetupSignal::derive_id(quote.last_bar.open_time, symbol, setup),
                    timestamp: now,
                    symbol: symbol.clone(),
                    setup_type: setup,
                    direction,
                    entry_price_reference: plan.entry,
                    stop_price: plan.stop,
                    take_profit: [plan.tp1, plan.tp2],
                    regime_at_detection: regime,
                    zones: quote.zones,
                    close: quote.last_bar.close,
                    width_pct: quote.zones.width_pct,
                    oi_delta_15m: oi,
                });
            }
        }

        DetectionOutcome {
            signals,
            skipped,
            memory: next,
        }
    }
}

fn key_belongs_to(key: &str, symbol: &str) -> bool {
    key.strip_prefix(symbol)
        .is_some_and(|rest| rest.starts_with(':'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GateConfig;
    use crate::feed::{Bar, ReferenceIndicators, Zones};
    use crate::gate::GatePolicy;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn zones() -> Zones {
        Zones {
            upper_lo: dec!(110),
            upper_hi: dec!(111),
            lower_lo: dec!(99),
            lower_hi: dec!(100),
            width_pct: dec!(0.30),
        }
    }

    fn bar(high: Decimal, low: Decimal, close: Decimal) -> Bar {
        Bar {
            open_time: ts(0),
            open: close,
            high,
            low,
            close,
        }
    }

    /// Quote whose last bar touched the lower zone and closed above it
    fn lower_touch(symbol: &str) -> AltQuote {
        AltQuote {
            symbol: symbol.to_string(),
            price: dec!(101),
            last_bar: bar(dec!(102), dec!(99.5), dec!(101)),
            prev_bar: bar(dec!(103), dec!(101), dec!(102)),
            zones: zones(),
            cross_pair_change_15m_pct: None,
        }
    }

    /// Quote sitting mid-range, no conditions met
    fn mid_range(symbol: &str) -> AltQuote {
        AltQuote {
            symbol: symbol.to_string(),
            price: dec!(105),
            last_bar: bar(dec!(106), dec!(104), dec!(105)),
            prev_bar: bar(dec!(106), dec!(104), dec!(105)),
            zones: zones(),
            cross_pair_change_15m_pct: None,
        }
    }

    fn snapshot(at: i64, quotes: Vec<AltQuote>) -> IndicatorSnapshot {
        IndicatorSnapshot {
            timestamp: ts(at),
            reference: ReferenceIndicators {
                oi_delta_15m: Some(dec!(-300)),
                ..Default::default()
            },
            alts: quotes.into_iter().map(|q| (q.symbol.clone(), q)).collect(),
        }
    }

    fn range_gate() -> GateDecision {
        let alts = vec!["ETHUSDT".to_string(), "SOLUSDT".to_string()];
        GatePolicy::from_config(&GateConfig::default(), &alts)
            .unwrap()
            .gate(Regime::Range)
            .clone()
    }

    fn create_test_detector() -> SetupDetector {
        SetupDetector::new(&DetectorConfig::default())
    }

    #[test]
    fn test_bar_conditions_lower_touch() {
        assert_eq!(
            bar_conditions(&lower_touch("ETHUSDT"), Regime::Range),
            vec![SetupType::MeanRevertLong]
        );
        assert!(bar_conditions(&mid_range("ETHUSDT"), Regime::Range).is_empty());
    }

    #[test]
    fn test_mean_revert_only_in_range() {
        for regime in Regime::ALL {
            let met = bar_conditions(&lower_touch("ETHUSDT"), regime);
            assert_eq!(met.is_empty(), regime != Regime::Range, "regime {}", regime);
        }

        let mut quote = lower_touch("ETHUSDT");
        quote.last_bar = bar(dec!(102), dec!(98), dec!(101));
        assert_eq!(
            bar_conditions(&quote, Regime::Deleveraging),
            vec![SetupType::SweepReclaimLong]
        );
    }

    #[test]
    fn test_signal_id_follows_bar_not_scan_time() {
        let detector = create_test_detector();
        let gate = range_gate();
        let first = detector.detect(
            &snapshot(0, vec![lower_touch("ETHUSDT")]),
            Regime::Range,
            &gate,
            &DetectorMemory::default(),
        );
        // Same bar observed again on a later scan with memory lost
        let again = detector.detect(
            &snapshot(30, vec![lower_touch("ETHUSDT")]),
            Regime::Range,
            &gate,
            &DetectorMemory::default(),
        );
        assert_eq!(first.signals[0].id, again.signals[0].id);
        assert_ne!(first.signals[0].timestamp, again.signals[0].timestamp);
    }

    #[test]
    fn test_bar_conditions_sweep_reclaim() {
        let mut quote = lower_touch("ETHUSDT");
        quote.last_bar = bar(dec!(102), dec!(98), dec!(101));
        let met = bar_conditions(&quote, Regime::Range);
        assert!(met.contains(&SetupType::SweepReclaimLong));
        assert!(met.contains(&SetupType::MeanRevertLong));

        let mut quote = mid_range("ETHUSDT");
        quote.prev_bar = bar(dec!(112), dec!(108), dec!(109));
        quote.last_bar = bar(dec!(110.5), dec!(108), dec!(109));
        let met = bar_conditions(&quote, Regime::Range);
        assert!(met.contains(&SetupType::SweepReclaimShort));
        assert!(met.contains(&SetupType::MeanRevertShort));
    }

    #[test]
    fn test_emits_on_rising_edge() {
        let detector = create_test_detector();
        let outcome = detector.detect(
            &snapshot(0, vec![lower_touch("ETHUSDT")]),
            Regime::Range,
            &range_gate(),
            &DetectorMemory::default(),
        );

        assert_eq!(outcome.signals.len(), 1);
        let signal = &outcome.signals[0];
        assert_eq!(signal.symbol, "ETHUSDT");
        assert_eq!(signal.setup_type, SetupType::MeanRevertLong);
        assert_eq!(signal.entry_price_reference, dec!(100));
        assert_eq!(signal.stop_price, dec!(97.5));
        assert_eq!(signal.take_profit, [dec!(103.5), dec!(110)]);
        assert_eq!(signal.regime_at_detection, Regime::Range);
        assert!(outcome.memory.active.contains("ETHUSDT:MEAN_REVERT_LONG"));
    }

    #[test]
    fn test_no_repeat_while_condition_holds() {
        let detector = create_test_detector();
        let gate = range_gate();
        let first = detector.detect(
            &snapshot(0, vec![lower_touch("ETHUSDT")]),
            Regime::Range,
            &gate,
            &DetectorMemory::default(),
        );
        let second = detector.detect(
            &snapshot(3600, vec![lower_touch("ETHUSDT")]),
            Regime::Range,
            &gate,
            &first.memory,
        );

        assert!(second.signals.is_empty());
        assert_eq!(second.skipped[0].reason, SkipReason::NoEdge);
    }

    #[test]
    fn test_cooldown_after_rearm() {
        let detector = create_test_detector();
        let gate = range_gate();
        let first = detector.detect(
            &snapshot(0, vec![lower_touch("ETHUSDT")]),
            Regime::Range,
            &gate,
            &DetectorMemory::default(),
        );
        let cleared = detector.detect(
            &snapshot(30, vec![mid_range("ETHUSDT")]),
            Regime::Range,
            &gate,
            &first.memory,
        );
        assert!(cleared.memory.active.is_empty());

        let early = detector.detect(
            &snapshot(60, vec![lower_touch("ETHUSDT")]),
            Regime::Range,
            &gate,
            &cleared.memory,
        );
        assert!(early.signals.is_empty());
        assert_eq!(early.skipped[0].reason, SkipReason::Cooldown);

        let rearmed = detector.detect(
            &snapshot(630, vec![mid_range("ETHUSDT")]),
            Regime::Range,
            &gate,
            &early.memory,
        );
        let late = detector.detect(
            &snapshot(660, vec![lower_touch("ETHUSDT")]),
            Regime::Range,
            &gate,
            &rearmed.memory,
        );
        assert_eq!(late.signals.len(), 1);
    }

    #[test]
    fn test_gate_blocks_emission() {
        let detector = create_test_detector();
        let alts = vec!["ETHUSDT".to_string()];
        let policy = GatePolicy::from_config(&GateConfig::default(), &alts).unwrap();

        let mut sweep = lower_touch("ETHUSDT");
        sweep.last_bar = bar(dec!(102), dec!(98), dec!(101));

        for regime in [Regime::Transition, Regime::ShortSqueeze] {
            let outcome = detector.detect(
                &snapshot(0, vec![sweep.clone()]),
                regime,
                policy.gate(regime),
                &DetectorMemory::default(),
            );
            assert!(outcome.signals.is_empty(), "emitted in {}", regime);
            assert_eq!(outcome.skipped[0].reason, SkipReason::Gated);
            assert!(outcome.memory.active.is_empty());
        }
    }

    #[test]
    fn test_filter_blocks_emission() {
        let detector = create_test_detector();
        let mut snap = snapshot(0, vec![lower_touch("ETHUSDT")]);
        snap.reference.oi_delta_15m = Some(dec!(400));

        let outcome = detector.detect(
            &snap,
            Regime::Range,
            &range_gate(),
            &DetectorMemory::default(),
        );
        assert!(outcome.signals.is_empty());
        assert!(matches!(
            outcome.skipped[0].reason,
            SkipReason::Filtered(RejectReason::OiNotContra(_))
        ));
    }

    #[test]
    fn test_missing_symbol_keeps_edge_state() {
        let detector = create_test_detector();
        let gate = range_gate();
        let first = detector.detect(
            &snapshot(0, vec![lower_touch("ETHUSDT")]),
            Regime::Range,
            &gate,
            &DetectorMemory::default(),
        );
        let gap = detector.detect(
            &snapshot(30, vec![mid_range("SOLUSDT")]),
            Regime::Range,
            &gate,
            &first.memory,
        );
        assert!(gap.memory.active.contains("ETHUSDT:MEAN_REVERT_LONG"));
    }

    #[test]
    fn test_detect_does_not_touch_input_memory() {
        let detector = create_test_detector();
        let memory = DetectorMemory::default();
        let _ = detector.detect(
            &snapshot(0, vec![lower_touch("ETHUSDT")]),
            Regime::Range,
            &range_gate(),
            &memory,
        );
        assert_eq!(memory, DetectorMemory::default());
    }

    #[test]
    fn test_key_belongs_to() {
        assert!(key_belongs_to("ETHUSDT:MEAN_REVERT_LONG", "ETHUSDT"));
        assert!(!key_belongs_to("ETHUSDTX:MEAN_REVERT_LONG", "ETHUSDT"));
        assert!(!key_belongs_to("SOLUSDT:MEAN_REVERT_LONG", "ETHUSDT"));
    }
}
