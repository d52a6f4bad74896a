//! Tick loops and shutdown handling

use super::scanner::Scanner;
use crate::execution::PaperExecutor;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// A component driven by a fixed-interval loop
#[async_trait]
pub trait Worker: Send {
    const NAME: &'static str;

    async fn tick(&mut self, now: DateTime<Utc>) -> anyhow::Result<()>;
}

#[async_trait]
impl Worker for Scanner {
    const NAME: &'static str = "scanner";

    async fn tick(&mut self, _now: DateTime<Utc>) -> anyhow::Result<()> {
        Scanner::tick(self).await.map(|_| ())
    }
}

#[async_trait]
impl Worker for PaperExecutor {
    const NAME: &'static str = "paper";

    async fn tick(&mut self, now: DateTime<Utc>) -> anyhow::Result<()> {
        let report = PaperExecutor::tick(self, now).await?;
        if report != Default::default() {
            tracing::debug!(?report, "Paper tick");
        }
        Ok(())
    }
}

/// Tick `worker` every `period` until `shutdown` flips.
///
/// Shutdown is only observed between ticks, so a running tick always
/// finishes and persists its state.
pub async fn run_worker<W: Worker>(
    mut worker: W,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> W {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::info!(worker = W::NAME, period_secs = period.as_secs_f64(), "Worker started");

    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                // Sender gone counts as shutdown
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = interval.tick() => {
                if let Err(e) = worker.tick(Utc::now()).await {
                    tracing::error!(worker = W::NAME, error = %format!("{:#}", e), "Tick failed");
                }
            }
        }
    }

    tracing::info!(worker = W::NAME, "Worker stopped");
    worker
}

/// Channel that flips to `true` on Ctrl-C or SIGTERM
pub fn shutdown_channel() -> anyhow::Result<(watch::Sender<bool>, watch::Receiver<bool>)> {
    let (tx, rx) = watch::channel(false);

    let on_int = tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received; finishing current tick");
            let _ = on_int.send(true);
        }
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        let on_term = tx.clone();
        tokio::spawn(async move {
            sigterm.recv().await;
            tracing::info!("SIGTERM received; finishing current tick");
            let _ = on_term.send(true);
        });
    }

    Ok((tx, rx))
}
