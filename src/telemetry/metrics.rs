//! Prometheus metrics

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{Ipv4Addr, SocketAddr};

/// Counter metric types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterMetric {
    /// Setup signals appended to the log
    SignalsEmitted,
    /// Setups blocked by a filter, labelled by reason
    SignalsRejected,
    /// Signal log lines that failed to decode
    MalformedRecords,
    /// Signals the paper engine did not turn into trades, labelled by reason
    SignalsIgnored,
    /// Lifecycle transitions, labelled by target state
    Transitions,
    /// Confirmed regime changes
    RegimeChanges,
    /// Reported source degradations, labelled by source
    SourceDegraded,
}

impl CounterMetric {
    pub fn name(self) -> &'static str {
        match self {
            CounterMetric::SignalsEmitted => "regime_gate_signals_emitted_total",
            CounterMetric::SignalsRejected => "regime_gate_signals_rejected_total",
            CounterMetric::MalformedRecords => "regime_gate_malformed_records_total",
            CounterMetric::SignalsIgnored => "regime_gate_signals_ignored_total",
            CounterMetric::Transitions => "regime_gate_transitions_total",
            CounterMetric::RegimeChanges => "regime_gate_regime_changes_total",
            CounterMetric::SourceDegraded => "regime_gate_source_degraded_total",
        }
    }
}

/// Gauge metric types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaugeMetric {
    /// Paper equity
    Equity,
    /// Realized P&L over closed trades
    RealizedPnl,
    /// Non-terminal paper trades
    OpenTrades,
    /// Current regime as its index
    Regime,
    /// Committed signal log offset
    SignalOffset,
}

impl GaugeMetric {
    pub fn name(self) -> &'static str {
        match self {
            GaugeMetric::Equity => "regime_gate_equity",
            GaugeMetric::RealizedPnl => "regime_gate_realized_pnl",
            GaugeMetric::OpenTrades => "regime_gate_open_trades",
            GaugeMetric::Regime => "regime_gate_regime",
            GaugeMetric::SignalOffset => "regime_gate_signal_offset",
        }
    }
}

/// Increment a counter by one
pub fn increment(metric: CounterMetric) {
    metrics::counter!(metric.name()).increment(1);
}

/// Increment a counter by one under a `kind` label
pub fn increment_labeled(metric: CounterMetric, kind: &'static str) {
    metrics::counter!(metric.name(), "kind" => kind).increment(1);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    metrics::gauge!(metric.name()).set(value);
}

/// Serve Prometheus metrics on `port`; must run inside a tokio runtime
pub fn init_metrics_exporter(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to start metrics exporter: {}", e))?;
    tracing::info!(%addr, "Metrics exporter listening");
    Ok(())
}
