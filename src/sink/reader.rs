//! Resumable reader over the signal log

use super::{SignalSource, SinkError};
use crate::retry::RetryPolicy;
use crate::signal::SetupSignal;
use std::sync::Arc;

/// Records read per poll
const DEFAULT_BATCH: usize = 500;

/// One decoded line
#[derive(Debug, Clone, PartialEq)]
pub enum FeedItem {
    /// A well-formed signal
    Signal {
        signal: Box<SetupSignal>,
        /// Offset just past this record
        offset: u64,
    },
    /// A line that could not be decoded; skip it and advance
    Malformed {
        offset: u64,
        error: String,
    },
}

impl FeedItem {
    /// Offset just past this record
    pub fn offset(&self) -> u64 {
        match self {
            FeedItem::Signal { offset, .. } | FeedItem::Malformed { offset, .. } => *offset,
        }
    }
}

/// Result of one poll
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedBatch {
    /// Records in append order
    pub items: Vec<FeedItem>,
    /// Offset past the last complete line read, including blank lines
    pub end_offset: u64,
}

/// Reads signals after a committed offset.
///
/// `poll` never moves the offset; the consumer calls `commit` once it has
/// durably recorded its progress.
pub struct SignalFeedReader {
    source: Arc<dyn SignalSource>,
    offset: u64,
    retry: RetryPolicy,
    batch: usize,
}

impl SignalFeedReader {
    pub fn new(source: Arc<dyn SignalSource>, offset: u64, retry: RetryPolicy) -> Self {
        Self {
            source,
            offset,
            retry,
            batch: DEFAULT_BATCH,
        }
    }

    /// Limit records per poll
    pub fn with_batch(mut self, batch: usize) -> Self {
        self.batch = batch.max(1);
        self
    }

    /// Committed offset
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Record that everything before `offset` has been processed
    pub fn commit(&mut self, offset: u64) {
        if offset > self.offset {
            self.offset = offset;
        }
    }

    /// Read the next records after the committed offset.
    ///
    /// Transient I/O errors are retried; once attempts run out the poll
    /// returns an empty batch. Only an offset past the end of the log is
    /// reported as an error.
    pub async fn poll(&self) -> Result<FeedBatch, SinkError> {
        let offset = self.offset;
        let result = self
            .retry
            .run("signal log read", || self.source.read_from(offset, self.batch))
            .await;

        let records = match result {
            Ok(records) => records,
            Err(e @ SinkError::OffsetBeyondEnd { .. }) => return Err(e),
            Err(e) => {
                tracing::warn!(offset, error = %e, "Signal log unreadable this tick");
                return Ok(FeedBatch {
                    items: Vec::new(),
                    end_offset: offset,
                });
            }
        };

        let end_offset = records.last().map_or(offset, |r| r.end_offset);
        let items = records
            .into_iter()
            .filter(|r| !r.line.iter().all(u8::is_ascii_whitespace))
            .map(|r| match serde_json::from_slice::<SetupSignal>(&r.line) {
                Ok(signal) => FeedItem::Signal {
                    signal: Box::new(signal),
                    offset: r.end_offset,
                },
                Err(e) => FeedItem::Malformed {
                    offset: r.end_offset,
                    error: e.to_string(),
                },
            })
            .collect();

        Ok(FeedBatch { items, end_offset })
    }
}
