//! regime-gate: BTC regime classifier gating alt setup detection
//!
//! This library provides the core components for:
//! - Indicator feeds from Binance and Bybit REST endpoints
//! - Regime classification with hysteresis
//! - Regime-to-setup gate policy
//! - Edge-triggered alt setup detection and trade planning
//! - Append-only signal log with a resumable reader
//! - Paper trade lifecycle with crash-safe state
//! - Trade records, notifications, logging and metrics

pub mod cli;
pub mod config;
pub mod data;
pub mod engine;
pub mod execution;
pub mod feed;
pub mod gate;
pub mod notify;
pub mod regime;
pub mod retry;
pub mod risk;
pub mod signal;
pub mod sink;
pub mod store;
pub mod telemetry;
