//! Append-only signal log
//!
//! The scanner appends [`SetupSignal`]s; the paper engine reads them back
//! from a byte offset it persists. Both sides only see the traits here.

mod jsonl;
mod reader;

pub use jsonl::JsonlSignalLog;
pub use reader::{FeedBatch, FeedItem, SignalFeedReader};

use crate::retry::Retryable;
use crate::signal::SetupSignal;
use async_trait::async_trait;
use thiserror::Error;

/// Signal log errors
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("signal log I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode signal: {0}")]
    Encode(#[from] serde_json::Error),
    /// The committed offset is past the end of the log (truncated or replaced)
    #[error("offset {offset} is beyond end of signal log ({len} bytes)")]
    OffsetBeyondEnd { offset: u64, len: u64 },
}

impl Retryable for SinkError {
    fn is_retryable(&self) -> bool {
        matches!(self, SinkError::Io(_))
    }
}

/// One complete line read from the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Line content without the trailing newline
    pub line: Vec<u8>,
    /// Byte offset just past this line's newline
    pub end_offset: u64,
}

/// Writer side of the log
#[async_trait]
pub trait SignalSink: Send + Sync {
    /// Durably append one signal; returns the offset past it
    async fn append(&self, signal: &SetupSignal) -> Result<u64, SinkError>;
}

/// Reader side of the log: "records after offset O"
#[async_trait]
pub trait SignalSource: Send + Sync {
    /// Complete lines starting at `offset`, at most `max_records`
    async fn read_from(&self, offset: u64, max_records: usize) -> Result<Vec<RawRecord>, SinkError>;
}
