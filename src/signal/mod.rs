//! Signal generation module
//!
//! Detects gated range setups on alt symbols and plans their trades

mod detector;
mod filter;
mod plan;
mod types;

pub use detector::{
    bar_conditions, pair_key, DetectionOutcome, DetectorMemory, SetupDetector, SkipReason, Skipped,
};
pub use filter::{FilterInputs, FilterResult, RejectReason, SignalFilter};
pub use plan::{plan_trade, TradePlan};
pub use types::{Direction, EntryPriceMode, SetupSignal, SetupType};
