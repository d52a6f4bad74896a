//! Gate policy
//!
//! Maps each regime to the setup types and symbols it permits. Built once at
//! startup and total over [`Regime`]: every regime has a decision, so the
//! detector can never fall through to an ungated path.

use crate::config::GateConfig;
use crate::regime::Regime;
use crate::signal::SetupType;
use std::collections::BTreeSet;
use thiserror::Error;

/// Gate construction errors (fatal at startup)
#[derive(Debug, Error)]
pub enum GateError {
    /// A regime has no entry in `gate.setups`
    #[error("regime {0} has no gate mapping")]
    UnmappedRegime(Regime),
    /// `gate.setups` names something that is not a regime
    #[error(transparent)]
    UnknownRegime(#[from] crate::regime::ParseRegimeError),
}

/// What a regime permits
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateDecision {
    pub allowed_setup_types: BTreeSet<SetupType>,
    pub allowed_symbols: BTreeSet<String>,
}

impl GateDecision {
    /// True when `setup` on `symbol` may be emitted
    pub fn permits(&self, symbol: &str, setup: SetupType) -> bool {
        self.allowed_symbols.contains(symbol) && self.allowed_setup_types.contains(&setup)
    }

    /// True when nothing at all is permitted
    pub fn is_closed(&self) -> bool {
        self.allowed_symbols.is_empty() || self.allowed_setup_types.is_empty()
    }
}

/// Regime -> decision table
#[derive(Debug, Clone)]
pub struct GatePolicy {
    decisions: [GateDecision; Regime::COUNT],
}

impl GatePolicy {
    /// Build from config; every regime must be mapped
    pub fn from_config(config: &GateConfig, alt_symbols: &[String]) -> Result<Self, GateError> {
        let mut mapped: [Option<BTreeSet<SetupType>>; Regime::COUNT] = Default::default();
        for (name, setups) in &config.setups {
            let regime: Regime = name.parse()?;
            mapped[regime.index()] = Some(setups.iter().copied().collect());
        }

        let enabled: BTreeSet<Regime> = config.alt_enabled_regimes.iter().copied().collect();
        let symbols: BTreeSet<String> = alt_symbols.iter().cloned().collect();

        let mut decisions: [GateDecision; Regime::COUNT] = Default::default();
        for regime in Regime::ALL {
            let setups = mapped[regime.index()]
                .take()
                .ok_or(GateError::UnmappedRegime(regime))?;
            decisions[regime.index()] = GateDecision {
                allowed_setup_types: setups,
                allowed_symbols: if enabled.contains(&regime) {
                    symbols.clone()
                } else {
                    BTreeSet::new()
                },
            };
        }

        Ok(Self { decisions })
    }

    /// Decision for a regime
    pub fn gate(&self, regime: Regime) -> &GateDecision {
        &self.decisions[regime.index()]
    }
}
