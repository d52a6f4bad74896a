//! Shared HTTP client with retry and per-source health

use super::{FeedError, HealthEvent, HealthMonitor, Source};
use crate::config::{chrono_secs, FeedConfig};
use crate::retry::{RetryPolicy, Retryable};
use chrono::Utc;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// JSON-over-HTTP client used by every exchange adapter
pub struct RestClient {
    client: reqwest::Client,
    retry: RetryPolicy,
    health: Mutex<BTreeMap<Source, HealthMonitor>>,
    events: Mutex<Vec<HealthEvent>>,
}

impl RestClient {
    /// Build a client with the configured timeout, retry and health settings
    pub fn new(config: &FeedConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("regime-gate/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let retry = RetryPolicy::default()
            .max_attempts(config.max_attempts)
            .initial_delay(Duration::from_millis(config.initial_backoff_ms))
            .max_delay(Duration::from_millis(config.max_backoff_ms));

        let degraded_after = chrono_secs(config.degraded_after_secs);
        let gap = chrono_secs(config.degraded_gap_secs);
        let health = Source::ALL
            .into_iter()
            .map(|s| (s, HealthMonitor::new(s, degraded_after, gap)))
            .collect();

        Ok(Self {
            client,
            retry,
            health: Mutex::new(health),
            events: Mutex::new(Vec::new()),
        })
    }

    /// GET `url` and decode the JSON body, retrying transient failures
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        source: Source,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, FeedError> {
        let result = self
            .retry
            .run(url, || self.get_once(source, url, query))
            .await;

        if let Err(e) = &result {
            tracing::warn!(source = %source, url, error = %e, "Request failed");
        }
        result
    }

    async fn get_once<T: DeserializeOwned>(
        &self,
        source: Source,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, FeedError> {
        let result = self.fetch_body(url, query).await;
        match &result {
            Ok(_) => self.record(source, true),
            Err(e) if e.is_retryable() => self.record(source, false),
            Err(_) => {}
        }

        let body = result?;
        serde_json::from_str(&body).map_err(|e| FeedError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    async fn fetch_body(&self, url: &str, query: &[(&str, String)]) -> Result<String, FeedError> {
        let transport = |source| FeedError::Transport {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(transport)
    }

    fn record(&self, source: Source, ok: bool) {
        let now = Utc::now();
        let event = {
            let mut health = self.health.lock().unwrap_or_else(PoisonError::into_inner);
            health.get_mut(&source).and_then(|monitor| {
                if ok {
                    monitor.record_success(now)
                } else {
                    monitor.record_failure(now)
                }
            })
        };

        if let Some(event) = event {
            self.events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event);
        }
    }

    /// Take the health transitions recorded so far
    pub fn drain_health_events(&self) -> Vec<HealthEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }
}
