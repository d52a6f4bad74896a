//! Status command implementation

use crate::config::Config;
use crate::engine::ScannerState;
use crate::execution::EngineState;
use crate::store::JsonStore;
use clap::Args;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print the raw paper state as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let paper: Option<EngineState> = JsonStore::new(&config.data.state_file).load().await?;
        let scanner: Option<ScannerState> =
            JsonStore::new(&config.data.scanner_state_file).load().await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&paper)?);
            return Ok(());
        }

        println!("regime-gate status");
        match &scanner {
            Some(s) => println!(
                "  Regime: {} (since {})",
                s.regime.current,
                s.regime
                    .since
                    .map_or_else(|| "-".to_string(), |t| t.to_rfc3339())
            ),
            None => println!("  Regime: no scanner state"),
        }

        let Some(state) = paper else {
            println!("  Paper: no state at {}", config.data.state_file.display());
            return Ok(());
        };

        println!("  Equity: {}", state.equity);
        println!("  Realized PnL: {}", state.realized_pnl());
        println!("  Signal offset: {}", state.offset);
        println!("  Pending records: {}", state.outbox.len());
        println!("  Updated: {}", state.updated_at.to_rfc3339());

        let active: Vec<_> = state.active_trades().collect();
        println!("  Active trades: {}", active.len());
        for t in active {
            println!(
                "    {} {} {} entry={} stop={} tp1={} tp2={} size={} remaining={}",
                t.symbol,
                t.direction,
                t.state,
                t.entry_price,
                t.stop_price,
                t.tp1(),
                t.tp2(),
                t.size,
                t.remaining_size
            );
        }

        let closed = state.trades.values().filter(|t| t.is_terminal()).count();
        println!("  Finished trades: {}", closed);
        Ok(())
    }
}
