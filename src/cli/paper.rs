//! Paper command implementation

use crate::config::Config;
use crate::engine::{open_paper, run_worker, shutdown_channel};
use chrono::Utc;
use clap::Args;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct PaperArgs {
    /// Run a single tick and exit
    #[arg(long)]
    pub once: bool,
}

impl PaperArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let mut paper = open_paper(config).await?;

        if self.once {
            let report = paper.tick(Utc::now()).await?;
            println!("{:?}", report);
            return Ok(());
        }

        let (_tx, shutdown) = shutdown_channel()?;
        let paper = run_worker(
            paper,
            Duration::from_secs(config.paper.interval_secs),
            shutdown,
        )
        .await;
        tracing::info!(
            equity = %paper.state().equity,
            offset = paper.state().offset,
            "Paper executor stopped"
        );
        Ok(())
    }
}
