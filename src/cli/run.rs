//! Run command implementation

use crate::config::Config;
use crate::engine::{open_paper, open_scanner, run_worker, shutdown_channel};
use clap::Args;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct RunArgs {}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let scanner = open_scanner(config).await?;
        let paper = open_paper(config).await?;
        let (_tx, shutdown) = shutdown_channel()?;

        tracing::info!(
            scan_secs = config.scanner.interval_secs,
            paper_secs = config.paper.interval_secs,
            alts = ?config.scanner.alt_symbols,
            "Starting scanner and paper executor"
        );

        let scan_loop = tokio::spawn(run_worker(
            scanner,
            Duration::from_secs(config.scanner.interval_secs),
            shutdown.clone(),
        ));
        let paper_loop = tokio::spawn(run_worker(
            paper,
            Duration::from_secs(config.paper.interval_secs),
            shutdown,
        ));

        let (scanner, paper) = tokio::try_join!(scan_loop, paper_loop)?;
        tracing::info!(
            regime = %scanner.regime(),
            equity = %paper.state().equity,
            offset = paper.state().offset,
            "Shutdown complete"
        );
        Ok(())
    }
}
