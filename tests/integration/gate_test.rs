//! No setup is ever emitted outside the gate

use chrono::{Duration, TimeZone, Utc};
use regime_gate::config::{Config, DetectorConfig};
use regime_gate::feed::{AltQuote, Bar, IndicatorSnapshot, ReferenceIndicators, Zones};
use regime_gate::gate::GatePolicy;
use regime_gate::regime::Regime;
use regime_gate::signal::{bar_conditions, DetectorMemory, SetupDetector, SetupType};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, BTreeSet};

const ZONES: Zones = Zones {
    upper_lo: dec!(110),
    upper_hi: dec!(111),
    lower_lo: dec!(99),
    lower_hi: dec!(100),
    width_pct: dec!(0.3),
};

/// (prev high, prev low, last high, last low, last close)
const BAR_SHAPES: [Shape; 5] = [
    // Sweep above and reclaim
    (dec!(108), dec!(105), dec!(112), dec!(107), dec!(109)),
    // Upper touch only
    (dec!(105), dec!(103), dec!(110.5), dec!(106), dec!(109)),
    // Sweep below and reclaim
    (dec!(103), dec!(101), dec!(102), dec!(98), dec!(101)),
    // Lower touch only
    (dec!(103), dec!(101), dec!(102), dec!(99.5), dec!(100.5)),
    // Inside the range
    (dec!(106), dec!(104), dec!(106), dec!(104), dec!(105)),
];

type Shape = (Decimal, Decimal, Decimal, Decimal, Decimal);

fn snapshot(symbols: &[&str], shape: Shape) -> IndicatorSnapshot {
    let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    let (h0, l0, h1, l1, c1) = shape;
    let alts = symbols
        .iter()
        .map(|s| {
            let quote = AltQuote {
                symbol: s.to_string(),
                price: c1,
                last_bar: Bar {
                    open_time: ts,
                    open: c1,
                    high: h1,
                    low: l1,
                    close: c1,
                },
                prev_bar: Bar {
                    open_time: ts - Duration::minutes(1),
                    open: l0,
                    high: h0,
                    low: l0,
                    close: h0,
                },
                zones: ZONES,
                cross_pair_change_15m_pct: None,
            };
            (s.to_string(), quote)
        })
        .collect::<BTreeMap<_, _>>();

    IndicatorSnapshot {
        timestamp: ts,
        reference: ReferenceIndicators::default(),
        alts,
    }
}

#[test]
fn test_emissions_are_exactly_permitted_conditions() {
    let config = Config::default();
    let gate = GatePolicy::from_config(&config.gate, &config.scanner.alt_symbols).unwrap();
    let detector = SetupDetector::new(&DetectorConfig {
        oi_contra_filter: false,
        ..DetectorConfig::default()
    });

    let mut emitted_any = false;
    for regime in Regime::ALL {
        let decision = gate.gate(regime);
        for shape in BAR_SHAPES {
            // An extra symbol outside the configured alts is never permitted
            let snap = snapshot(&["ETHUSDT", "SOLUSDT", "DOGEUSDT"], shape);
            let outcome = detector.detect(&snap, regime, decision, &DetectorMemory::default());

            let emitted: BTreeSet<(String, SetupType)> = outcome
                .signals
                .iter()
                .map(|s| (s.symbol.clone(), s.setup_type))
                .collect();
            let expected: BTreeSet<(String, SetupType)> = snap
                .alts
                .iter()
                .flat_map(|(symbol, quote)| {
                    bar_conditions(quote, regime)
                        .into_iter()
                        .filter(|setup| decision.permits(symbol, *setup))
                        .map(|setup| (symbol.clone(), setup))
                        .collect::<Vec<_>>()
                })
                .collect();

            assert_eq!(emitted, expected, "regime {} shape {:?}", regime, shape);
            assert!(emitted.iter().all(|(s, _)| s != "DOGEUSDT"));
            for signal in &outcome.signals {
                assert_eq!(signal.regime_at_detection, regime);
            }
            emitted_any |= !emitted.is_empty();
        }
    }
    assert!(emitted_any);
}

#[test]
fn test_gate_is_total_and_stable() {
    let config = Config::default();
    let gate = GatePolicy::from_config(&config.gate, &config.scanner.alt_symbols).unwrap();
    let again = GatePolicy::from_config(&config.gate, &config.scanner.alt_symbols).unwrap();

    for regime in Regime::ALL {
        assert_eq!(gate.gate(regime), again.gate(regime));
        assert_eq!(gate.gate(regime), gate.gate(regime));
    }
    assert!(gate.gate(Regime::Transition).is_closed());
}
