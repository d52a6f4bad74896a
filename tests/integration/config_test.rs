//! Configuration loading

use regime_gate::config::Config;
use regime_gate::gate::GatePolicy;
use regime_gate::regime::Regime;
use regime_gate::signal::SetupType;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_example_config_builds_every_component() {
    let config = Config::from_toml(include_str!("../../config.toml.example")).unwrap();
    let gate = GatePolicy::from_config(&config.gate, &config.scanner.alt_symbols).unwrap();

    let transition = gate.gate(Regime::Transition);
    assert!(transition.is_closed());

    let squeeze = gate.gate(Regime::ShortSqueeze);
    assert!(squeeze.permits("ETHUSDT", SetupType::SweepReclaimShort));
    assert!(!squeeze.permits("ETHUSDT", SetupType::MeanRevertLong));
}

#[test]
fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        [scanner]
        interval_secs = 15
        alt_symbols = ["XRPUSDT"]

        [paper]
        tp1_close_fraction = 1.0
        "#
    )
    .unwrap();

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.scanner.interval_secs, 15);
    assert_eq!(config.scanner.alt_symbols, vec!["XRPUSDT"]);
    assert_eq!(config.paper.entry_timeout_secs, 1800);
}

#[test]
fn test_invalid_values_are_fatal() {
    let cases = [
        "[scanner]\ninterval_secs = 0",
        "[scanner]\nalt_symbols = []",
        "[paper]\ntp1_close_fraction = 0",
        "[paper]\nrisk_pct = 1.5",
        "[regime]\nconfirmations = 0",
        "[gate.setups]\nRANGE = []",
        "[paper]\nstop_fill_mode = \"sideways\"",
    ];
    for toml in cases {
        assert!(Config::from_toml(toml).is_err(), "accepted: {}", toml);
    }
}

#[test]
fn test_oversized_durations_are_rejected_not_panicking() {
    let cases = [
        ("[paper]\nentry_timeout_secs = 100000000000000000", "paper.entry_timeout_secs"),
        ("[regime]\nmin_dwell_secs = 9223372036854775807", "regime.min_dwell_secs"),
        ("[detector]\ncooldown_secs = 315360001", "detector.cooldown_secs"),
    ];
    for (toml, field) in cases {
        let err = Config::from_toml(toml).unwrap_err();
        assert!(err.to_string().contains(field), "{}: {}", field, err);
    }

    let config = Config::from_toml("[detector]\ncooldown_secs = 315360000").unwrap();
    assert_eq!(config.detector.cooldown_secs, 315_360_000);
}

#[test]
fn test_missing_file_is_error() {
    assert!(Config::load("/nonexistent/regime-gate.toml").is_err());
}
