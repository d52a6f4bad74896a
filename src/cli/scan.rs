//! Scan command implementation

use crate::config::Config;
use crate::engine::{open_scanner, run_worker, shutdown_channel};
use clap::Args;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Run a single scan and exit
    #[arg(long)]
    pub once: bool,
}

impl ScanArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let mut scanner = open_scanner(config).await?;

        if self.once {
            let report = scanner.tick().await?;
            println!(
                "regime={} evaluated={} changed={} emitted={} appended={} skipped={}",
                report.regime,
                report.evaluated,
                report.regime_changed,
                report.emitted,
                report.appended,
                report.skipped
            );
            return Ok(());
        }

        let (_tx, shutdown) = shutdown_channel()?;
        let scanner = run_worker(
            scanner,
            Duration::from_secs(config.scanner.interval_secs),
            shutdown,
        )
        .await;
        tracing::info!(regime = %scanner.regime(), "Scanner stopped");
        Ok(())
    }
}
