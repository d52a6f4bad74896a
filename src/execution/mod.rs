//! Paper execution module
//!
//! Simulated trades driven by signals from the log: no orders leave the
//! process.

mod lifecycle;
mod paper;
mod state;
mod types;

pub use lifecycle::{evaluate, LifecycleParams, TradeEvent, Transition};
pub use paper::{IgnoreReason, PaperExecutor, TickReport};
pub use state::EngineState;
pub use types::{CloseReason, LifecycleError, PaperTrade, TradeState};

use serde::{Deserialize, Serialize};

/// Exit price used when a stop is crossed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopFillMode {
    /// Fill at the stop price even if the market gapped through it
    #[default]
    Capped,
    /// Fill at the observed price
    Market,
}
