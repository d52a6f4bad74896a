//! Risk module
//!
//! Position sizing for paper trades

mod sizing;

pub use sizing::RiskSizer;
