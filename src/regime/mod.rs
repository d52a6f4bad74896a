//! Regime classification module
//!
//! Labels the reference market from its indicators, with hysteresis

mod classifier;
mod types;

pub use classifier::{classify, raw_classify, RegimeClassifier};
pub use types::{ParseRegimeError, RawClassification, Regime, RegimeChange, RegimeState};
