//! Configuration types for regime-gate

use crate::execution::StopFillMode;
use crate::regime::Regime;
use crate::signal::{EntryPriceMode, SetupType};
use crate::telemetry::LogFormat;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// Upper bound for every seconds-valued setting (ten years)
pub const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Seconds as a chrono duration; saturates instead of panicking
pub fn chrono_secs(secs: u64) -> chrono::Duration {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or(chrono::Duration::MAX)
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub regime: RegimeConfig,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub paper: PaperConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Fatal configuration problems, reported at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be positive")]
    NotPositive { field: &'static str },
    #[error("{field} must be within {range}, got {value}")]
    OutOfRange {
        field: &'static str,
        range: &'static str,
        value: Decimal,
    },
    #[error("regime.confirmations must be at least 1")]
    NoConfirmations,
    #[error("scanner.alt_symbols is empty")]
    NoAltSymbols,
    #[error(transparent)]
    Gate(#[from] crate::gate::GateError),
}

/// Scanner loop configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScannerConfig {
    /// Poll interval for the scanner tick
    #[serde(default = "default_scanner_interval")]
    pub interval_secs: u64,

    /// Reference instrument whose regime gates everything else
    #[serde(default = "default_reference_symbol")]
    pub reference_symbol: String,

    /// Tradable alt symbols
    #[serde(default = "default_alt_symbols")]
    pub alt_symbols: Vec<String>,

    /// Alt/BTC spot pairs used as a cross-pair bias gate
    #[serde(default = "default_cross_pairs")]
    pub cross_pairs: Vec<String>,

    /// 1m lookback used to derive the range zones
    #[serde(default = "default_zone_lookback")]
    pub zone_lookback_minutes: usize,

    /// Setups appended to the signal log for the paper engine; every other
    /// detected setup is only notified
    #[serde(default = "default_sink_setups")]
    pub sink_setups: Vec<SetupType>,
}

fn default_scanner_interval() -> u64 {
    30
}
fn default_reference_symbol() -> String {
    "BTCUSDT".to_string()
}
fn default_alt_symbols() -> Vec<String> {
    vec!["ETHUSDT".to_string(), "SOLUSDT".to_string()]
}
fn default_cross_pairs() -> Vec<String> {
    vec!["ETHBTC".to_string(), "SOLBTC".to_string()]
}
fn default_zone_lookback() -> usize {
    180
}
fn default_sink_setups() -> Vec<SetupType> {
    vec![SetupType::MeanRevertShort, SetupType::MeanRevertLong]
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_scanner_interval(),
            reference_symbol: default_reference_symbol(),
            alt_symbols: default_alt_symbols(),
            cross_pairs: default_cross_pairs(),
            zone_lookback_minutes: default_zone_lookback(),
            sink_setups: default_sink_setups(),
        }
    }
}

/// Regime classification thresholds and hysteresis
#[derive(Debug, Clone, Deserialize)]
pub struct RegimeConfig {
    /// Regime assumed before the first complete snapshot
    #[serde(default = "default_neutral_regime")]
    pub neutral: Regime,

    /// Consecutive confirming snapshots required before a transition
    #[serde(default = "default_confirmations")]
    pub confirmations: u32,

    /// Minimum time a regime must hold before it may change
    #[serde(default)]
    pub min_dwell_secs: u64,

    /// Classify without open interest (only RANGE/TRANSITION reachable)
    #[serde(default)]
    pub allow_missing_oi: bool,

    /// OI drop (contracts) that marks a flush
    #[serde(default = "default_oi_flush_abs")]
    pub oi_flush_abs: Decimal,

    /// 15m price move (percent) that makes a flush directional
    #[serde(default = "default_px_move_pct")]
    pub px_move_pct: Decimal,

    /// Maximum zone width (percent) for RANGE
    #[serde(default = "default_range_max_width_pct")]
    pub range_max_width_pct: Decimal,

    /// Maximum absolute 15m move (percent) for RANGE
    #[serde(default = "default_range_max_move_pct")]
    pub range_max_move_pct: Decimal,

    /// Maximum absolute OI delta for RANGE
    #[serde(default = "default_range_max_oi_abs")]
    pub range_max_oi_abs: Decimal,
}

fn default_neutral_regime() -> Regime {
    Regime::Range
}
fn default_confirmations() -> u32 {
    1
}
fn default_oi_flush_abs() -> Decimal {
    dec!(250)
}
fn default_px_move_pct() -> Decimal {
    dec!(0.20)
}
fn default_range_max_width_pct() -> Decimal {
    dec!(0.30)
}
fn default_range_max_move_pct() -> Decimal {
    dec!(0.25)
}
fn default_range_max_oi_abs() -> Decimal {
    dec!(200)
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            neutral: default_neutral_regime(),
            confirmations: default_confirmations(),
            min_dwell_secs: 0,
            allow_missing_oi: false,
            oi_flush_abs: default_oi_flush_abs(),
            px_move_pct: default_px_move_pct(),
            range_max_width_pct: default_range_max_width_pct(),
            range_max_move_pct: default_range_max_move_pct(),
            range_max_oi_abs: default_range_max_oi_abs(),
        }
    }
}

/// Gate policy: which setups and symbols each regime permits
#[derive(Debug, Clone, Deserialize)]
pub struct GateConfig {
    /// Regimes in which alt symbols may trade at all
    #[serde(default = "default_alt_enabled_regimes")]
    pub alt_enabled_regimes: Vec<Regime>,

    /// Permitted setup types per regime, keyed by regime name.
    /// Every regime must have an entry, even if empty.
    #[serde(default = "default_gate_setups")]
    pub setups: BTreeMap<String, Vec<SetupType>>,
}

fn default_alt_enabled_regimes() -> Vec<Regime> {
    vec![
        Regime::Range,
        Regime::Deleveraging,
        Regime::LongUnwind,
        Regime::ShortSqueeze,
    ]
}

fn default_gate_setups() -> BTreeMap<String, Vec<SetupType>> {
    let mut setups = BTreeMap::new();
    setups.insert(
        Regime::ShortSqueeze.to_string(),
        vec![SetupType::SweepReclaimShort],
    );
    setups.insert(
        Regime::LongUnwind.to_string(),
        vec![SetupType::SweepReclaimLong],
    );
    setups.insert(Regime::Range.to_string(), SetupType::ALL.to_vec());
    // Mean-revert setups are only detected in RANGE
    setups.insert(
        Regime::Deleveraging.to_string(),
        vec![SetupType::SweepReclaimShort, SetupType::SweepReclaimLong],
    );
    setups.insert(Regime::Transition.to_string(), vec![]);
    setups
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            alt_enabled_regimes: default_alt_enabled_regimes(),
            setups: default_gate_setups(),
        }
    }
}

/// Setup detection filters and trade planning
#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfig {
    /// Block mean-revert setups when the zone width (percent) exceeds this
    #[serde(default = "default_mean_revert_max_width_pct")]
    pub mean_revert_max_width_pct: Decimal,

    /// Require contrarian OI flow for mean-revert setups
    #[serde(default = "default_true")]
    pub oi_contra_filter: bool,

    /// Minimum |OI delta| for the contra confirmation
    #[serde(default = "default_oi_contra_min_abs")]
    pub oi_contra_min_abs: Decimal,

    /// Alt/BTC 15m change tolerance (percent) for the bias gate
    #[serde(default = "default_alt_btc_bias_pct")]
    pub alt_btc_bias_pct: Decimal,

    /// Minimum time between two emissions of the same symbol/setup
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Which edge of the zone becomes the planned entry
    #[serde(default)]
    pub entry_price_mode: EntryPriceMode,
}

fn default_true() -> bool {
    true
}
fn default_mean_revert_max_width_pct() -> Decimal {
    dec!(0.45)
}
fn default_oi_contra_min_abs() -> Decimal {
    dec!(250)
}
fn default_alt_btc_bias_pct() -> Decimal {
    dec!(0.03)
}
fn default_cooldown_secs() -> u64 {
    600
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            mean_revert_max_width_pct: default_mean_revert_max_width_pct(),
            oi_contra_filter: true,
            oi_contra_min_abs: default_oi_contra_min_abs(),
            alt_btc_bias_pct: default_alt_btc_bias_pct(),
            cooldown_secs: default_cooldown_secs(),
            entry_price_mode: EntryPriceMode::default(),
        }
    }
}

/// Paper trade lifecycle configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PaperConfig {
    /// Poll interval for the paper tick
    #[serde(default = "default_paper_interval")]
    pub interval_secs: u64,

    /// Pending entries are cancelled this long after the signal time
    #[serde(default = "default_entry_timeout")]
    pub entry_timeout_secs: u64,

    /// Fraction of size closed at the first take-profit tier
    #[serde(default = "default_tp1_close_fraction")]
    pub tp1_close_fraction: Decimal,

    /// Move the stop to break-even after the first take-profit tier
    #[serde(default = "default_true")]
    pub move_stop_to_break_even: bool,

    /// Break-even buffer as a fraction of entry (0.00005 = 0.005%)
    #[serde(default)]
    pub break_even_buffer_pct: Decimal,

    /// Stop fill pricing
    #[serde(default)]
    pub stop_fill_mode: StopFillMode,

    /// Paper equity at first start
    #[serde(default = "default_start_equity")]
    pub start_equity: Decimal,

    /// Equity fraction risked per trade
    #[serde(default = "default_risk_pct")]
    pub risk_pct: Decimal,

    /// Leverage applied to the risk-based size
    #[serde(default = "default_leverage")]
    pub leverage: u32,

    /// Number of recent signal ids remembered for de-duplication
    #[serde(default = "default_dedup_window")]
    pub dedup_window: usize,

    /// Closed and cancelled trades are dropped from the state this long
    /// after they finish, once their records are written
    #[serde(default = "default_retain_finished")]
    pub retain_finished_secs: u64,
}

fn default_paper_interval() -> u64 {
    2
}
fn default_entry_timeout() -> u64 {
    1800
}
fn default_tp1_close_fraction() -> Decimal {
    dec!(0.50)
}
fn default_start_equity() -> Decimal {
    dec!(1000)
}
fn default_risk_pct() -> Decimal {
    dec!(0.005)
}
fn default_leverage() -> u32 {
    5
}
fn default_dedup_window() -> usize {
    4000
}
fn default_retain_finished() -> u64 {
    86_400
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_paper_interval(),
            entry_timeout_secs: default_entry_timeout(),
            tp1_close_fraction: default_tp1_close_fraction(),
            move_stop_to_break_even: true,
            break_even_buffer_pct: Decimal::ZERO,
            stop_fill_mode: StopFillMode::default(),
            start_equity: default_start_equity(),
            risk_pct: default_risk_pct(),
            leverage: default_leverage(),
            dedup_window: default_dedup_window(),
            retain_finished_secs: default_retain_finished(),
        }
    }
}

/// Market data source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_binance_futures_url")]
    pub binance_futures_url: String,
    #[serde(default = "default_binance_spot_url")]
    pub binance_spot_url: String,
    #[serde(default = "default_bybit_url")]
    pub bybit_url: String,

    /// Per-request timeout
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Attempts per request (including the first)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First retry delay, doubled per attempt
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Ceiling for the retry delay
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Continuous failure before a source is reported degraded
    #[serde(default = "default_degraded_after")]
    pub degraded_after_secs: u64,

    /// Minimum gap between two degraded reports for one source
    #[serde(default = "default_degraded_gap")]
    pub degraded_gap_secs: u64,
}

fn default_binance_futures_url() -> String {
    "https://fapi.binance.com".to_string()
}
fn default_binance_spot_url() -> String {
    "https://api.binance.com".to_string()
}
fn default_bybit_url() -> String {
    "https://api.bybit.com".to_string()
}
fn default_request_timeout() -> u64 {
    12
}
fn default_max_attempts() -> u32 {
    3
}
fn default_initial_backoff_ms() -> u64 {
    1000
}
fn default_max_backoff_ms() -> u64 {
    30_000
}
fn default_degraded_after() -> u64 {
    180
}
fn default_degraded_gap() -> u64 {
    1800
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            binance_futures_url: default_binance_futures_url(),
            binance_spot_url: default_binance_spot_url(),
            bybit_url: default_bybit_url(),
            request_timeout_secs: default_request_timeout(),
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            degraded_after_secs: default_degraded_after(),
            degraded_gap_secs: default_degraded_gap(),
        }
    }
}

/// File locations
#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// Append-only signal log shared by scanner and paper engine
    #[serde(default = "default_signals_file")]
    pub signals_file: PathBuf,
    /// Paper engine state (offset + trades)
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
    /// Scanner state (regime + detector memory)
    #[serde(default = "default_scanner_state_file")]
    pub scanner_state_file: PathBuf,
    /// Trade records, one JSON object per line
    #[serde(default = "default_trades_jsonl")]
    pub trades_jsonl: PathBuf,
    /// Trade records as CSV rows
    #[serde(default = "default_trades_csv")]
    pub trades_csv: PathBuf,
}

fn default_signals_file() -> PathBuf {
    PathBuf::from("./data/signals.jsonl")
}
fn default_state_file() -> PathBuf {
    PathBuf::from("./data/paper_state.json")
}
fn default_scanner_state_file() -> PathBuf {
    PathBuf::from("./data/scanner_state.json")
}
fn default_trades_jsonl() -> PathBuf {
    PathBuf::from("./data/paper_trades.jsonl")
}
fn default_trades_csv() -> PathBuf {
    PathBuf::from("./data/paper_trades.csv")
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            signals_file: default_signals_file(),
            state_file: default_state_file(),
            scanner_state_file: default_scanner_state_file(),
            trades_jsonl: default_trades_jsonl(),
            trades_csv: default_trades_csv(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Prometheus exporter port; disabled when absent
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file and validate it
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would weaken gating or the lifecycle
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scanner.interval_secs == 0 {
            return Err(ConfigError::NotPositive {
                field: "scanner.interval_secs",
            });
        }
        if self.paper.interval_secs == 0 {
            return Err(ConfigError::NotPositive {
                field: "paper.interval_secs",
            });
        }
        if self.scanner.alt_symbols.is_empty() {
            return Err(ConfigError::NoAltSymbols);
        }
        if self.regime.confirmations == 0 {
            return Err(ConfigError::NoConfirmations);
        }
        let fraction = self.paper.tp1_close_fraction;
        if fraction <= Decimal::ZERO || fraction > Decimal::ONE {
            return Err(ConfigError::OutOfRange {
                field: "paper.tp1_close_fraction",
                range: "(0, 1]",
                value: fraction,
            });
        }
        let risk = self.paper.risk_pct;
        if risk <= Decimal::ZERO || risk >= Decimal::ONE {
            return Err(ConfigError::OutOfRange {
                field: "paper.risk_pct",
                range: "(0, 1)",
                value: risk,
            });
        }
        let buffer = self.paper.break_even_buffer_pct;
        if buffer < Decimal::ZERO || buffer >= Decimal::ONE {
            return Err(ConfigError::OutOfRange {
                field: "paper.break_even_buffer_pct",
                range: "[0, 1)",
                value: buffer,
            });
        }
        if self.paper.start_equity <= Decimal::ZERO {
            return Err(ConfigError::NotPositive {
                field: "paper.start_equity",
            });
        }
        if self.paper.leverage == 0 {
            return Err(ConfigError::NotPositive {
                field: "paper.leverage",
            });
        }
        let durations = [
            ("scanner.interval_secs", self.scanner.interval_secs),
            ("regime.min_dwell_secs", self.regime.min_dwell_secs),
            ("detector.cooldown_secs", self.detector.cooldown_secs),
            ("paper.interval_secs", self.paper.interval_secs),
            ("paper.entry_timeout_secs", self.paper.entry_timeout_secs),
            ("paper.retain_finished_secs", self.paper.retain_finished_secs),
            ("feed.request_timeout_secs", self.feed.request_timeout_secs),
            ("feed.degraded_after_secs", self.feed.degraded_after_secs),
            ("feed.degraded_gap_secs", self.feed.degraded_gap_secs),
        ];
        for (field, secs) in durations {
            if secs > MAX_DURATION_SECS {
                return Err(ConfigError::OutOfRange {
                    field,
                    range: "[0, 315360000] seconds",
                    value: Decimal::from(secs),
                });
            }
        }
        if self.feed.max_attempts == 0 {
            return Err(ConfigError::NotPositive {
                field: "feed.max_attempts",
            });
        }

        // Building the policy proves every regime is mapped
        crate::gate::GatePolicy::from_config(&self.gate, &self.scanner.alt_symbols)?;
        Ok(())
    }
}
